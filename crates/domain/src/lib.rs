pub mod errors;
pub mod protocol;

pub use errors::DnsError;
pub use protocol::{Protocol, ServerAddr};
