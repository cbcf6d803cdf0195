//! Measurement-oriented DNS client: query construction with EDNS(0) and
//! padding, dispatch over UDP, TCP, DoT, DoH and DoQ with per-query
//! connection ownership, strict response validation, host-resolver error
//! mapping, CNAME-chain answer extraction, and a duplicates mode that
//! surfaces every UDP response seen on the socket.
//!
//! The transport composes injected capabilities (dialer, HTTP exchange,
//! clock, observer) so every wire interaction can be replaced in tests and
//! every byte exchanged can be recorded by a measurement pipeline.

pub mod context;
pub mod message;
pub mod observe;
pub mod ports;
pub mod transport;

pub use context::QueryContext;
pub use dnsprobe_domain::{DnsError, Protocol, ServerAddr};
pub use message::{
    edns0_max_response_size, new_query, pack_message, rcode_to_error, unpack_message,
    valid_answers, validate_response, Edns0Flags, QueryOption,
    EDNS0_SUGGESTED_MAX_RESPONSE_SIZE_OTHERWISE, EDNS0_SUGGESTED_MAX_RESPONSE_SIZE_UDP,
};
pub use observe::{
    addr_or_unspecified, Clock, QueryEvent, QueryObserver, ResponseEvent, SystemClock,
    TracingObserver,
};
pub use ports::{ByteStream, DatagramSocket, Dialer, HttpExchange, HttpReply, TokioDialer};
pub use transport::https::ReqwestExchange;
pub use transport::{MessageOrError, Transport, DEFAULT_MAX_HTTP_RESPONSE_SIZE};
