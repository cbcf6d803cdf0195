use std::net::SocketAddr;
use std::sync::Arc;

use dnsprobe_domain::{DnsError, ServerAddr};
use hickory_proto::op::Message;
use rustls::pki_types::ServerName;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::ports::ByteStream;
use crate::transport::Transport;

impl Transport {
    /// DNS over TLS (RFC 7858): TCP dial, then a rustls handshake with the
    /// SNI taken from the endpoint hostname. No ALPN; DoT is the raw
    /// protocol on its dedicated port.
    pub(crate) async fn query_dot(
        &self,
        addr: &ServerAddr,
        query: &Message,
    ) -> Result<Message, DnsError> {
        let host = addr
            .host()
            .ok_or_else(|| DnsError::InvalidServerAddr(addr.address().to_string()))?;
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| DnsError::InvalidServerAddr(addr.address().to_string()))?;

        let tcp = self.dialer.dial_tcp(addr.address()).await?;
        let connector = TlsConnector::from(Arc::new(self.client_tls_config(Vec::new())));
        let stream = connector.connect(server_name, tcp).await?;
        debug!(server = %addr, hostname = %host, "TLS connection established");

        self.query_stream(addr, query, stream).await
    }
}

impl ByteStream for TlsStream<Box<dyn ByteStream>> {
    fn local_addr(&self) -> Option<SocketAddr> {
        self.get_ref().0.local_addr()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.get_ref().0.peer_addr()
    }
}
