use std::fmt;
use std::str::FromStr;

use crate::errors::DnsError;

/// Wire protocol used to reach a DNS server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// DNS over UDP (RFC 1035 §4.2.1).
    Udp,
    /// DNS over TCP with 2-byte length framing (RFC 1035 §4.2.2).
    Tcp,
    /// DNS over TLS (RFC 7858).
    Dot,
    /// DNS over HTTPS (RFC 8484).
    Doh,
    /// DNS over dedicated QUIC streams (RFC 9250).
    Doq,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Udp => "udp",
            Protocol::Tcp => "tcp",
            Protocol::Dot => "dot",
            Protocol::Doh => "doh",
            Protocol::Doq => "doq",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "udp" => Ok(Protocol::Udp),
            "tcp" => Ok(Protocol::Tcp),
            "dot" => Ok(Protocol::Dot),
            "doh" => Ok(Protocol::Doh),
            "doq" => Ok(Protocol::Doq),
            other => Err(DnsError::NoSuchTransportProtocol(other.to_string())),
        }
    }
}

/// Address of a DNS server: a protocol tag plus the protocol-shaped endpoint.
///
/// Endpoints are `host:port` for `udp`, `tcp`, `dot` and `doq`, and an
/// absolute `https://` URL for `doh`. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddr {
    protocol: Protocol,
    address: String,
}

impl ServerAddr {
    pub fn new(protocol: Protocol, address: impl Into<String>) -> Self {
        Self {
            protocol,
            address: address.into(),
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Hostname part of a `host:port` endpoint. `None` when the endpoint is
    /// not of that shape (a `doh` URL, or a malformed string).
    pub fn host(&self) -> Option<&str> {
        match self.protocol {
            Protocol::Doh => None,
            _ => split_host_port(&self.address).map(|(host, _)| host),
        }
    }

    /// Port part of a `host:port` endpoint.
    pub fn port(&self) -> Option<u16> {
        match self.protocol {
            Protocol::Doh => None,
            _ => split_host_port(&self.address).map(|(_, port)| port),
        }
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.protocol {
            Protocol::Doh => write!(f, "{}", self.address),
            _ => write!(f, "{}://{}", self.protocol, self.address),
        }
    }
}

fn split_host_port(s: &str) -> Option<(&str, u16)> {
    if s.starts_with('[') {
        let end = s.find(']')?;
        let host = &s[1..end];
        let rest = &s[end + 1..];
        let port_str = rest.strip_prefix(':')?;
        let port = port_str.parse::<u16>().ok()?;
        Some((host, port))
    } else {
        let (host, port_str) = s.rsplit_once(':')?;
        let port = port_str.parse::<u16>().ok()?;
        Some((host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_round_trip() {
        for tag in ["udp", "tcp", "dot", "doh", "doq"] {
            let protocol: Protocol = tag.parse().unwrap();
            assert_eq!(protocol.to_string(), tag);
        }
    }

    #[test]
    fn test_unknown_protocol_tag() {
        let err = "sctp".parse::<Protocol>().unwrap_err();
        assert!(matches!(err, DnsError::NoSuchTransportProtocol(ref tag) if tag == "sctp"));
        assert_eq!(err.to_string(), "no such transport protocol: sctp");
    }

    #[test]
    fn test_server_addr_host_port() {
        let addr = ServerAddr::new(Protocol::Dot, "dns.google:853");
        assert_eq!(addr.host(), Some("dns.google"));
        assert_eq!(addr.port(), Some(853));
    }

    #[test]
    fn test_server_addr_ipv6_host() {
        let addr = ServerAddr::new(Protocol::Udp, "[2001:4860:4860::8888]:53");
        assert_eq!(addr.host(), Some("2001:4860:4860::8888"));
        assert_eq!(addr.port(), Some(53));
    }

    #[test]
    fn test_doh_addr_has_no_host_port() {
        let addr = ServerAddr::new(Protocol::Doh, "https://dns.google/dns-query");
        assert_eq!(addr.host(), None);
        assert_eq!(addr.port(), None);
        assert_eq!(addr.to_string(), "https://dns.google/dns-query");
    }
}
