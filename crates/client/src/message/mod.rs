//! DNS message construction, validation and interpretation on top of the
//! `hickory-proto` wire codec.
//!
//! The transport layer never inspects DNS wire format itself beyond the
//! 2-byte stream length prefix; everything message-shaped goes through
//! this module.

pub mod answers;
pub mod builder;
pub mod validate;
pub mod wire;

pub use answers::valid_answers;
pub use builder::{
    edns0_max_response_size, new_query, Edns0Flags, QueryOption,
    EDNS0_SUGGESTED_MAX_RESPONSE_SIZE_OTHERWISE, EDNS0_SUGGESTED_MAX_RESPONSE_SIZE_UDP,
};
pub use validate::{rcode_to_error, validate_response};
pub use wire::{pack_message, unpack_message};
