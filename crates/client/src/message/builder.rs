use dnsprobe_domain::DnsError;
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::opt::{EdnsCode, EdnsOption};
use hickory_proto::rr::{DNSClass, Name, RecordType};

use crate::message::wire::pack_message;

/// Advertised maximum response size suited for DNS over UDP. This is the
/// DNS-flag-day value that avoids IP fragmentation on common paths.
pub const EDNS0_SUGGESTED_MAX_RESPONSE_SIZE_UDP: u16 = 1232;

/// Advertised maximum response size for stream-based transports, where
/// fragmentation is not a concern.
pub const EDNS0_SUGGESTED_MAX_RESPONSE_SIZE_OTHERWISE: u16 = 4096;

/// Smallest response buffer any DNS client must be able to accept.
const MIN_RESPONSE_SIZE: u16 = 512;

/// Padding block size from RFC 8467 §4.1.
const PADDING_BLOCK_SIZE: u16 = 128;

/// Flag set configuring the EDNS(0) OPT pseudo-RR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edns0Flags(u16);

impl Edns0Flags {
    pub const NONE: Edns0Flags = Edns0Flags(0);

    /// Set the DO bit, asking the server to include DNSSEC records.
    pub const DO: Edns0Flags = Edns0Flags(1 << 0);

    /// Pad the query to a 128-octet boundary (RFC 8467 §4.1).
    pub const BLOCK_LENGTH_PADDING: Edns0Flags = Edns0Flags(1 << 1);

    pub fn contains(self, other: Edns0Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Edns0Flags {
    type Output = Edns0Flags;

    fn bitor(self, rhs: Edns0Flags) -> Edns0Flags {
        Edns0Flags(self.0 | rhs.0)
    }
}

/// Options applied, in order, to a freshly built query.
#[derive(Debug, Clone, Copy)]
pub enum QueryOption {
    /// Attach an EDNS(0) OPT pseudo-RR advertising `max_response_size`
    /// octets, with the behavior selected by `flags`.
    Edns0 {
        max_response_size: u16,
        flags: Edns0Flags,
    },
}

/// Builds a canonical query for `name` and `qtype`.
///
/// The name is IDNA-encoded with the lookup (non-transitional) profile and
/// made fully qualified; the question class is IN, the id is random, and
/// recursion is requested. Options are applied in the order given.
pub fn new_query(
    name: &str,
    qtype: RecordType,
    options: &[QueryOption],
) -> Result<Message, DnsError> {
    let mut ascii = idna::domain_to_ascii_strict(name)
        .map_err(|_| DnsError::InvalidName(name.to_string()))?;
    if !ascii.ends_with('.') {
        ascii.push('.');
    }
    let qname =
        Name::from_ascii(&ascii).map_err(|e| DnsError::InvalidName(format!("{name}: {e}")))?;

    let mut question = Query::new();
    question.set_name(qname);
    question.set_query_type(qtype);
    question.set_query_class(DNSClass::IN);

    let mut message = Message::new();
    message.set_id(fastrand::u16(..));
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(question);

    for option in options {
        apply_option(&mut message, *option)?;
    }
    Ok(message)
}

/// Maximum response size the query advertises through EDNS(0), floored at
/// the pre-EDNS 512-octet minimum. Used both to size UDP receive buffers
/// and to cap DoH response bodies.
pub fn edns0_max_response_size(query: &Message) -> u16 {
    let advertised = query
        .extensions()
        .as_ref()
        .map(|edns| edns.max_payload())
        .unwrap_or(0);
    advertised.max(MIN_RESPONSE_SIZE)
}

fn apply_option(message: &mut Message, option: QueryOption) -> Result<(), DnsError> {
    match option {
        QueryOption::Edns0 {
            max_response_size,
            flags,
        } => {
            let mut edns = Edns::new();
            edns.set_max_payload(max_response_size);
            edns.set_dnssec_ok(flags.contains(Edns0Flags::DO));
            edns.set_version(0);
            message.set_edns(edns);
            if flags.contains(Edns0Flags::BLOCK_LENGTH_PADDING) {
                add_block_length_padding(message)?;
            }
            Ok(())
        }
    }
}

/// Appends an EDNS(0) PADDING option sized so the packed query lands on a
/// 128-octet boundary.
fn add_block_length_padding(message: &mut Message) -> Result<(), DnsError> {
    // Length the message will have once the padding option's own 4-byte TLV
    // header is in place. 16-bit wrapping keeps an oversize message from
    // producing an invalid pad.
    let length = (pack_message(message)?.len() as u16).wrapping_add(4);
    let padding = (PADDING_BLOCK_SIZE - length % PADDING_BLOCK_SIZE) % PADDING_BLOCK_SIZE;

    if let Some(edns) = message.extensions_mut() {
        edns.options_mut().insert(EdnsOption::Unknown(
            u16::from(EdnsCode::Padding),
            vec![0u8; padding as usize],
        ));
    }
    Ok(())
}
