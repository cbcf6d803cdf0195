//! Test doubles for the injected capability ports: scripted sockets and
//! streams, a scripted DoH exchange, a capture observer, and a fixed clock.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use dnsprobe_client::{
    pack_message, ByteStream, Clock, DatagramSocket, Dialer, HttpExchange, HttpReply, QueryEvent,
    QueryObserver, ResponseEvent,
};
use hickory_proto::op::{Message, MessageType, OpCode};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

pub const MOCK_LOCAL_ADDR: &str = "127.0.0.1:54321";
pub const MOCK_PEER_ADDR: &str = "8.8.8.8:53";

/// One scripted outcome of a socket read.
#[derive(Debug, Clone)]
pub enum ScriptedRead {
    Datagram(Vec<u8>),
    Error(io::ErrorKind, String),
}

impl ScriptedRead {
    pub fn deadline_exceeded() -> Self {
        ScriptedRead::Error(io::ErrorKind::TimedOut, "i/o timeout".to_string())
    }
}

/// Dialer handing out scripted sockets and streams, counting dial attempts.
#[derive(Default)]
pub struct MockDialer {
    udp_script: Vec<ScriptedRead>,
    tcp_response: Vec<u8>,
    dial_error: Option<String>,
    dial_count: AtomicUsize,
    written: Arc<Mutex<Vec<u8>>>,
}

impl MockDialer {
    /// UDP sockets whose reads follow `script`, in order.
    pub fn udp(script: Vec<ScriptedRead>) -> Arc<Self> {
        Arc::new(Self {
            udp_script: script,
            ..Self::default()
        })
    }

    /// TCP streams that answer every read from `response` (raw stream
    /// bytes, framing included).
    pub fn tcp(response: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            tcp_response: response,
            ..Self::default()
        })
    }

    /// Every dial fails with the given message.
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            dial_error: Some(message.to_string()),
            ..Self::default()
        })
    }

    pub fn dials(&self) -> usize {
        self.dial_count.load(Ordering::SeqCst)
    }

    /// Bytes written to any stream this dialer handed out.
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial_udp(&self, _address: &str) -> io::Result<Box<dyn DatagramSocket>> {
        self.dial_count.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.dial_error {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, message.clone()));
        }
        Ok(Box::new(ScriptedSocket::new(self.udp_script.clone())))
    }

    async fn dial_tcp(&self, _address: &str) -> io::Result<Box<dyn ByteStream>> {
        self.dial_count.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.dial_error {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, message.clone()));
        }
        Ok(Box::new(MockStream::new(
            self.tcp_response.clone(),
            self.written.clone(),
        )))
    }
}

/// Datagram socket that replays a read script.
pub struct ScriptedSocket {
    script: Mutex<VecDeque<ScriptedRead>>,
}

impl ScriptedSocket {
    pub fn new(script: Vec<ScriptedRead>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl DatagramSocket for ScriptedSocket {
    async fn send(&self, payload: &[u8]) -> io::Result<usize> {
        Ok(payload.len())
    }

    async fn recv(&self, buffer: &mut [u8]) -> io::Result<usize> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(ScriptedRead::Datagram(data)) => {
                let count = data.len().min(buffer.len());
                buffer[..count].copy_from_slice(&data[..count]);
                Ok(count)
            }
            Some(ScriptedRead::Error(kind, message)) => Err(io::Error::new(kind, message)),
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "script exhausted")),
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        Some(MOCK_LOCAL_ADDR.parse().unwrap())
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(MOCK_PEER_ADDR.parse().unwrap())
    }
}

/// Byte stream that records everything written and replays fixed bytes on
/// reads.
pub struct MockStream {
    readable: VecDeque<u8>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    pub fn new(readable: Vec<u8>, written: Arc<Mutex<Vec<u8>>>) -> Self {
        Self {
            readable: readable.into(),
            written,
        }
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.readable.is_empty() {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "mock stream exhausted",
            )));
        }
        while buf.remaining() > 0 {
            match self.readable.pop_front() {
                Some(byte) => buf.put_slice(&[byte]),
                None => break,
            }
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl ByteStream for MockStream {
    fn local_addr(&self) -> Option<SocketAddr> {
        Some(MOCK_LOCAL_ADDR.parse().unwrap())
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(MOCK_PEER_ADDR.parse().unwrap())
    }
}

/// Scripted DoH exchange recording every request it sees.
pub struct MockHttpExchange {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub requests: Mutex<Vec<(String, Bytes, usize)>>,
}

impl MockHttpExchange {
    pub fn replying(status: u16, content_type: &str, body: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            status,
            content_type: Some(content_type.to_string()),
            body,
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl HttpExchange for MockHttpExchange {
    async fn post_dns(
        &self,
        url: &str,
        body: Bytes,
        max_response_size: usize,
    ) -> io::Result<HttpReply> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), body, max_response_size));

        let mut reply_body = self.body.clone();
        reply_body.truncate(max_response_size);
        Ok(HttpReply {
            status: self.status,
            content_type: self.content_type.clone(),
            body: Bytes::from(reply_body),
            local_addr: None,
            remote_addr: Some("1.1.1.1:443".parse().unwrap()),
        })
    }
}

/// Observer capturing event names in arrival order plus the full response
/// events.
#[derive(Default)]
pub struct CaptureObserver {
    pub names: Mutex<Vec<&'static str>>,
    pub responses: Mutex<Vec<ResponseEvent>>,
}

impl CaptureObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.names.lock().unwrap().clone()
    }
}

impl QueryObserver for CaptureObserver {
    fn on_query(&self, _event: &QueryEvent) {
        self.names.lock().unwrap().push("dnsQuery");
    }

    fn on_response(&self, event: &ResponseEvent) {
        self.names.lock().unwrap().push("dnsResponse");
        self.responses.lock().unwrap().push(event.clone());
    }
}

/// Clock pinned to a fixed instant.
pub struct FixedClock(pub SystemTime);

impl FixedClock {
    pub fn epoch_plus(seconds: u64) -> Arc<Self> {
        Arc::new(Self(SystemTime::UNIX_EPOCH + Duration::from_secs(seconds)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

/// Minimal well-formed response for `query`: same id, question echoed,
/// recursion available.
pub fn make_response(query: &Message) -> Message {
    let mut response = Message::new();
    response.set_id(query.id());
    response.set_message_type(MessageType::Response);
    response.set_op_code(OpCode::Query);
    if let Some(question) = query.queries().first() {
        response.add_query(question.clone());
    }
    response.set_recursion_available(true);
    response
}

pub fn packed(message: &Message) -> Vec<u8> {
    pack_message(message).unwrap().to_vec()
}

/// RFC 1035 §4.2.2 stream framing for a packed message.
pub fn framed(message: &Message) -> Vec<u8> {
    let payload = packed(message);
    let mut frame = Vec::with_capacity(2 + payload.len());
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(&payload);
    frame
}
