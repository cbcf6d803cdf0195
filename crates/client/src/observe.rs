//! Measurement events. The observer receives the raw bytes and endpoint
//! identities of every query/response pair; what gets persisted, and any
//! privacy handling, is the caller's concern.

use std::fmt::Write as _;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::time::SystemTime;

use bytes::Bytes;
use dnsprobe_domain::ServerAddr;

/// Wall clock injected into the transport so events can be timestamped
/// deterministically in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Emitted just before the query bytes are handed to the network.
#[derive(Debug, Clone)]
pub struct QueryEvent {
    pub raw_query: Bytes,
    pub server: ServerAddr,
    /// Send timestamp; also the `t0` of the matching [`ResponseEvent`].
    pub t: SystemTime,
}

/// Emitted after a response has been received and decoded.
#[derive(Debug, Clone)]
pub struct ResponseEvent {
    pub local_addr: SocketAddr,
    pub remote_addr: SocketAddr,
    pub raw_query: Bytes,
    pub raw_response: Bytes,
    pub server: ServerAddr,
    pub t0: SystemTime,
    pub t: SystemTime,
}

/// Receives the measurement events for every query and response. Nothing is
/// recorded when the transport has no observer.
pub trait QueryObserver: Send + Sync {
    fn on_query(&self, event: &QueryEvent);
    fn on_response(&self, event: &ResponseEvent);
}

/// Endpoints the transport could not learn are reported as the IPv6
/// unspecified address with port 0.
pub fn addr_or_unspecified(addr: Option<SocketAddr>) -> SocketAddr {
    addr.unwrap_or_else(|| SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0))
}

/// Observer that renders events as structured `tracing` records named
/// `dnsQuery` and `dnsResponse`, payloads hex-encoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl QueryObserver for TracingObserver {
    fn on_query(&self, event: &QueryEvent) {
        tracing::info!(
            target: "dnsprobe::query_log",
            dnsRawQuery = %hex(&event.raw_query),
            serverAddr = %event.server.address(),
            serverProtocol = %event.server.protocol(),
            t = ?event.t,
            "dnsQuery"
        );
    }

    fn on_response(&self, event: &ResponseEvent) {
        tracing::info!(
            target: "dnsprobe::query_log",
            localAddr = %event.local_addr,
            remoteAddr = %event.remote_addr,
            dnsRawQuery = %hex(&event.raw_query),
            dnsRawResponse = %hex(&event.raw_response),
            serverAddr = %event.server.address(),
            serverProtocol = %event.server.protocol(),
            t0 = ?event.t0,
            t = ?event.t,
            "dnsResponse"
        );
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
