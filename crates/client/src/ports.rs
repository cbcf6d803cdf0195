//! Injected capabilities the transport composes over: dialing, the DoH
//! round trip, and the clock. Every port is an object-safe trait held as an
//! `Arc<dyn _>`, safe for concurrent use; the sockets and streams a port
//! opens belong to exactly one query.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, UdpSocket};

/// Opens the sockets and streams queries run over.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Opens a datagram socket connected to `address` (`host:port`).
    async fn dial_udp(&self, address: &str) -> io::Result<Box<dyn DatagramSocket>>;

    /// Opens a byte stream connected to `address` (`host:port`).
    async fn dial_tcp(&self, address: &str) -> io::Result<Box<dyn ByteStream>>;
}

/// A connected datagram socket.
#[async_trait]
pub trait DatagramSocket: Send + Sync {
    async fn send(&self, payload: &[u8]) -> io::Result<usize>;
    async fn recv(&self, buffer: &mut [u8]) -> io::Result<usize>;
    fn local_addr(&self) -> Option<SocketAddr>;
    fn peer_addr(&self) -> Option<SocketAddr>;
}

/// A connected byte stream with known endpoints.
pub trait ByteStream: AsyncRead + AsyncWrite + Send + Unpin {
    fn local_addr(&self) -> Option<SocketAddr>;
    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Signals that the query has been fully written. Transports with an
    /// explicit end-of-stream marker (QUIC) override this; for the rest it
    /// is a no-op.
    fn finish_query(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ByteStream for Box<dyn ByteStream> {
    fn local_addr(&self) -> Option<SocketAddr> {
        (**self).local_addr()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        (**self).peer_addr()
    }

    fn finish_query(&mut self) -> io::Result<()> {
        (**self).finish_query()
    }
}

/// Outcome of one DoH POST exchange, with the endpoints the implementation
/// observed on the underlying connection, when it could.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: Option<String>,
    /// Response body, already truncated to the requested cap.
    pub body: Bytes,
    pub local_addr: Option<SocketAddr>,
    pub remote_addr: Option<SocketAddr>,
}

/// Performs one DNS-over-HTTPS round trip (RFC 8484 POST).
///
/// Implementations send `body` with `content-type` and `accept` set to
/// `application/dns-message`, and read at most `max_response_size` octets
/// of the response body.
#[async_trait]
pub trait HttpExchange: Send + Sync {
    async fn post_dns(
        &self,
        url: &str,
        body: Bytes,
        max_response_size: usize,
    ) -> io::Result<HttpReply>;
}

/// Default dialer backed by tokio sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDialer;

#[async_trait]
impl Dialer for TokioDialer {
    async fn dial_udp(&self, address: &str) -> io::Result<Box<dyn DatagramSocket>> {
        let remote = resolve_first(address).await?;
        let bind_addr: SocketAddr = if remote.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(remote).await?;
        Ok(Box::new(socket))
    }

    async fn dial_tcp(&self, address: &str) -> io::Result<Box<dyn ByteStream>> {
        let stream = TcpStream::connect(address).await?;
        Ok(Box::new(stream))
    }
}

#[async_trait]
impl DatagramSocket for UdpSocket {
    async fn send(&self, payload: &[u8]) -> io::Result<usize> {
        UdpSocket::send(self, payload).await
    }

    async fn recv(&self, buffer: &mut [u8]) -> io::Result<usize> {
        UdpSocket::recv(self, buffer).await
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        UdpSocket::local_addr(self).ok()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        UdpSocket::peer_addr(self).ok()
    }
}

impl ByteStream for TcpStream {
    fn local_addr(&self) -> Option<SocketAddr> {
        TcpStream::local_addr(self).ok()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        TcpStream::peer_addr(self).ok()
    }
}

/// First address `host:port` resolves to.
pub(crate) async fn resolve_first(address: &str) -> io::Result<SocketAddr> {
    tokio::net::lookup_host(address).await?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no address found for {address}"),
        )
    })
}
