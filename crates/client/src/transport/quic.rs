//! DNS over dedicated QUIC connections (RFC 9250): one bidirectional
//! stream per query, the shared 2-byte length framing, and message id 0 on
//! the wire.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use dnsprobe_domain::{DnsError, ServerAddr};
use hickory_proto::op::Message;
use quinn::crypto::rustls::QuicClientConfig;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::debug;

use crate::ports::{resolve_first, ByteStream};
use crate::transport::Transport;

const DOQ_ALPN: &[u8] = b"doq";

impl Transport {
    pub(crate) async fn query_doq(
        &self,
        addr: &ServerAddr,
        query: &Message,
    ) -> Result<Message, DnsError> {
        let host = addr
            .host()
            .ok_or_else(|| DnsError::InvalidServerAddr(addr.address().to_string()))?
            .to_string();
        let remote = resolve_first(addr.address()).await?;

        let tls = self.client_tls_config(vec![DOQ_ALPN.to_vec()]);
        let quic = QuicClientConfig::try_from(Arc::new(tls))
            .map_err(|e| DnsError::Io(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        let client_config = quinn::ClientConfig::new(Arc::new(quic));

        let bind_addr: SocketAddr = if remote.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };
        let mut endpoint = quinn::Endpoint::client(bind_addr)?;
        endpoint.set_default_client_config(client_config);

        let connection = endpoint
            .connect(remote, &host)
            .map_err(quic_error)?
            .await
            .map_err(quic_error)?;
        let (send, recv) = connection.open_bi().await.map_err(quic_error)?;
        debug!(server = %addr, "QUIC stream opened");

        // RFC 9250 §4.2.1: the message id must be 0 on the wire.
        let mut query = query.clone();
        query.set_id(0);

        let stream = DoqStream {
            send,
            recv,
            local_addr: endpoint.local_addr().ok(),
            remote_addr: connection.remote_address(),
            _connection: connection,
            _endpoint: endpoint,
        };
        // Dropping the stream on any exit path, cancellation included,
        // closes the QUIC stream, the connection and the endpoint.
        self.query_stream(addr, &query, stream).await
    }
}

fn quic_error<E>(err: E) -> DnsError
where
    E: std::error::Error + Send + Sync + 'static,
{
    DnsError::Io(io::Error::new(io::ErrorKind::Other, err))
}

/// Bidirectional QUIC stream presented as a plain byte stream, with the
/// connection and endpoint kept alive for the duration of the query.
struct DoqStream {
    send: quinn::SendStream,
    recv: quinn::RecvStream,
    local_addr: Option<SocketAddr>,
    remote_addr: SocketAddr,
    _connection: quinn::Connection,
    _endpoint: quinn::Endpoint,
}

impl AsyncRead for DoqStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.recv).poll_read(cx, buf)
    }
}

impl AsyncWrite for DoqStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        AsyncWrite::poll_write(Pin::new(&mut self.send), cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        AsyncWrite::poll_flush(Pin::new(&mut self.send), cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        AsyncWrite::poll_shutdown(Pin::new(&mut self.send), cx)
    }
}

impl ByteStream for DoqStream {
    fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.remote_addr)
    }

    /// Finishing the send side transmits the FIN that marks the end of the
    /// query on a DoQ stream.
    fn finish_query(&mut self) -> io::Result<()> {
        self.send
            .finish()
            .map_err(|e| io::Error::new(io::ErrorKind::NotConnected, e))
    }
}
