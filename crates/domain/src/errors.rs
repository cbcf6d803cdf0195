use thiserror::Error;

/// Errors produced while building queries, dispatching them over a wire
/// transport, and interpreting responses.
///
/// The display strings for RCODE-derived variants deliberately match the
/// host-resolver conventions (`no such host`, `server misbehaving`) so that
/// callers substituting this library for a system resolver observe the same
/// user-visible messages.
#[derive(Error, Debug)]
pub enum DnsError {
    #[error("no such transport protocol: {0}")]
    NoSuchTransportProtocol(String),

    #[error("transport cannot receive duplicates: {0}")]
    TransportCannotReceiveDuplicates(String),

    #[error("query too large for transport")]
    QueryTooLargeForTransport,

    /// Non-200 status, wrong content type, or an RCODE outside {0, 2, 3}.
    #[error("server misbehaving")]
    ServerMisbehaving,

    /// RCODE = SERVFAIL. Same display text as [`DnsError::ServerMisbehaving`]
    /// for host-resolver compatibility; the variants stay distinguishable.
    #[error("server misbehaving")]
    ServerTemporarilyMisbehaving,

    /// RCODE = NXDOMAIN.
    #[error("no such host")]
    NoName,

    /// Successful RCODE but no pertinent answer: a lame referral, or an
    /// answer section with nothing matching the question.
    #[error("no answer from DNS server")]
    NoData,

    /// The response failed validation against the query (not a response,
    /// wrong id, question mismatch).
    #[error("invalid DNS response")]
    InvalidResponse,

    /// The supplied query does not contain exactly one question.
    #[error("invalid query")]
    InvalidQuery,

    #[error("cannot marshal DNS message: {0}")]
    CannotMarshalMessage(String),

    #[error("cannot unmarshal DNS message: {0}")]
    CannotUnmarshalMessage(String),

    /// The name failed IDNA lookup-profile encoding.
    #[error("invalid domain name: {0}")]
    InvalidName(String),

    /// The endpoint string does not have the shape the protocol requires.
    #[error("invalid server address: {0}")]
    InvalidServerAddr(String),

    /// The query context was cancelled.
    #[error("query cancelled")]
    Cancelled,

    /// Underlying I/O failure, surfaced unchanged. Deadline expiry arrives
    /// here with [`std::io::ErrorKind::TimedOut`].
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DnsError {
    /// True for errors derived from the response RCODE rather than from
    /// transport or validation failures.
    pub fn is_rcode_error(&self) -> bool {
        matches!(
            self,
            DnsError::NoName
                | DnsError::NoData
                | DnsError::ServerMisbehaving
                | DnsError::ServerTemporarilyMisbehaving
        )
    }
}
