//! The transport dispatcher and the per-protocol query engines.

pub mod https;
pub mod quic;
pub mod stream;
pub mod tcp;
pub mod tls;
pub mod udp;

use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};
use std::time::SystemTime;

use bytes::Bytes;
use dnsprobe_domain::{DnsError, Protocol, ServerAddr};
use hickory_proto::op::Message;
use rustls::RootCertStore;
use tokio::sync::mpsc;

use crate::context::QueryContext;
use crate::observe::{addr_or_unspecified, Clock, QueryEvent, QueryObserver, ResponseEvent, SystemClock};
use crate::ports::{Dialer, HttpExchange, TokioDialer};
use crate::transport::https::ReqwestExchange;

/// Item of the duplicate-response stream: one decoded message, or the error
/// that terminated the stream.
pub type MessageOrError = Result<Message, DnsError>;

/// Default cap on DoH response bodies.
pub const DEFAULT_MAX_HTTP_RESPONSE_SIZE: usize = 8 << 20;

/// Buffer of the duplicate-response channel; producers never block longer
/// than it takes the consumer to drain a handful of datagrams.
const DUPLICATE_STREAM_BUFFER: usize = 4;

static DEFAULT_ROOT_STORE: LazyLock<Arc<RootCertStore>> = LazyLock::new(|| {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    Arc::new(roots)
});

fn ensure_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Issues DNS queries over the wire protocol named by each [`ServerAddr`].
///
/// The transport holds only injected capabilities and no cross-query state:
/// every query opens, exclusively owns, and closes its own socket or
/// stream, so concurrent queries never interfere. Cloning is cheap and
/// clones share the capabilities.
#[derive(Clone)]
pub struct Transport {
    dialer: Arc<dyn Dialer>,
    http: Arc<dyn HttpExchange>,
    clock: Arc<dyn Clock>,
    observer: Option<Arc<dyn QueryObserver>>,
    root_store: Arc<RootCertStore>,
    max_http_response_size: usize,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        Self {
            dialer: Arc::new(TokioDialer),
            http: Arc::new(ReqwestExchange::new()),
            clock: Arc::new(SystemClock),
            observer: None,
            root_store: DEFAULT_ROOT_STORE.clone(),
            max_http_response_size: DEFAULT_MAX_HTTP_RESPONSE_SIZE,
        }
    }

    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = dialer;
        self
    }

    pub fn with_http_exchange(mut self, http: Arc<dyn HttpExchange>) -> Self {
        self.http = http;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Root CAs for DoT and DoQ handshakes. Defaults to the webpki roots.
    pub fn with_root_store(mut self, root_store: Arc<RootCertStore>) -> Self {
        self.root_store = root_store;
        self
    }

    pub fn with_max_http_response_size(mut self, max: usize) -> Self {
        self.max_http_response_size = max;
        self
    }

    /// Sends `query` to `addr` and returns the first response received.
    ///
    /// A context that is already cancelled fails with
    /// [`DnsError::Cancelled`] before any network effect. The returned
    /// message is the server's first answer and is not guaranteed to be
    /// valid for the query; callers still run
    /// [`validate_response`](crate::message::validate_response) and
    /// [`rcode_to_error`](crate::message::rcode_to_error).
    pub async fn query(
        &self,
        ctx: &QueryContext,
        addr: &ServerAddr,
        query: &Message,
    ) -> Result<Message, DnsError> {
        ctx.error()?;
        ctx.guard(async {
            match addr.protocol() {
                Protocol::Udp => self.query_udp(addr, query).await,
                Protocol::Tcp => self.query_tcp(addr, query).await,
                Protocol::Dot => self.query_dot(addr, query).await,
                Protocol::Doh => self.query_doh(addr, query).await,
                Protocol::Doq => self.query_doq(addr, query).await,
            }
        })
        .await
    }

    /// Sends `query` over UDP and yields every response datagram seen on
    /// the socket, duplicates included, in arrival order. On-path
    /// interference commonly injects extra answers; this surfaces all of
    /// them instead of the first.
    ///
    /// The stream ends after the first read or decode error (emitted as the
    /// final item) or when the context ends (nothing emitted). Protocols
    /// other than UDP yield a single
    /// [`DnsError::TransportCannotReceiveDuplicates`] item.
    pub fn query_with_duplicates(
        &self,
        ctx: &QueryContext,
        addr: &ServerAddr,
        query: &Message,
    ) -> mpsc::Receiver<MessageOrError> {
        let (tx, rx) = mpsc::channel(DUPLICATE_STREAM_BUFFER);
        if addr.protocol() != Protocol::Udp {
            let _ = tx.try_send(Err(DnsError::TransportCannotReceiveDuplicates(
                addr.protocol().to_string(),
            )));
            return rx;
        }

        let transport = self.clone();
        let ctx = ctx.clone();
        let addr = addr.clone();
        let query = query.clone();
        tokio::spawn(async move {
            transport.run_udp_duplicates(ctx, addr, query, tx).await;
        });
        rx
    }

    pub(crate) fn observe_query(&self, addr: &ServerAddr, raw_query: &Bytes) -> SystemTime {
        let t0 = self.clock.now();
        if let Some(observer) = &self.observer {
            observer.on_query(&QueryEvent {
                raw_query: raw_query.clone(),
                server: addr.clone(),
                t: t0,
            });
        }
        t0
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn observe_response(
        &self,
        addr: &ServerAddr,
        t0: SystemTime,
        raw_query: &Bytes,
        raw_response: &Bytes,
        local_addr: Option<SocketAddr>,
        remote_addr: Option<SocketAddr>,
    ) {
        if let Some(observer) = &self.observer {
            observer.on_response(&ResponseEvent {
                local_addr: addr_or_unspecified(local_addr),
                remote_addr: addr_or_unspecified(remote_addr),
                raw_query: raw_query.clone(),
                raw_response: raw_response.clone(),
                server: addr.clone(),
                t0,
                t: self.clock.now(),
            });
        }
    }

    /// TLS client configuration for DoT and DoQ, built from the injected
    /// root store.
    pub(crate) fn client_tls_config(&self, alpn: Vec<Vec<u8>>) -> rustls::ClientConfig {
        ensure_crypto_provider();
        let mut config = rustls::ClientConfig::builder()
            .with_root_certificates(self.root_store.clone())
            .with_no_client_auth();
        config.alpn_protocols = alpn;
        config
    }
}
