use dnsprobe_domain::DnsError;
use hickory_proto::op::{Message, MessageType, ResponseCode};

/// Checks that `response` is a well-formed answer to `query`.
///
/// A response is accepted when it has the response bit set, echoes the
/// query id, and carries exactly one question matching the query's question
/// (name compared case-insensitively). DoQ messages pass the id check
/// because both sides carry id 0 on the wire.
pub fn validate_response(query: &Message, response: &Message) -> Result<(), DnsError> {
    if response.message_type() != MessageType::Response {
        return Err(DnsError::InvalidResponse);
    }
    if response.id() != query.id() {
        return Err(DnsError::InvalidResponse);
    }
    if response.queries().len() != 1 {
        return Err(DnsError::InvalidResponse);
    }
    if query.queries().len() != 1 {
        return Err(DnsError::InvalidQuery);
    }

    let resp0 = &response.queries()[0];
    let query0 = &query.queries()[0];
    if !equal_ascii_name(&resp0.name().to_ascii(), &query0.name().to_ascii()) {
        return Err(DnsError::InvalidResponse);
    }
    if resp0.query_class() != query0.query_class() {
        return Err(DnsError::InvalidResponse);
    }
    if resp0.query_type() != query0.query_type() {
        return Err(DnsError::InvalidResponse);
    }
    Ok(())
}

/// Maps the RCODE of a validated response to an error whose display string
/// follows host-resolver conventions. RCODE 0 with answers (or with AA/RA
/// set) maps to `Ok(())`.
pub fn rcode_to_error(response: &Message) -> Result<(), DnsError> {
    if response.response_code() == ResponseCode::NXDomain {
        return Err(DnsError::NoName);
    }

    // Lame referral: a successful RCODE from a server that neither is
    // authoritative nor offers recursion, with an empty answer section.
    if response.response_code() == ResponseCode::NoError
        && !response.authoritative()
        && !response.recursion_available()
        && response.answers().is_empty()
    {
        return Err(DnsError::NoData);
    }

    match response.response_code() {
        ResponseCode::NoError => Ok(()),
        ResponseCode::ServFail => Err(DnsError::ServerTemporarilyMisbehaving),
        _ => Err(DnsError::ServerMisbehaving),
    }
}

/// Case-insensitive comparison of wire names, ASCII-only on purpose: the
/// names are punycode and the comparison must stay locale-independent.
pub(crate) fn equal_ascii_name(x: &str, y: &str) -> bool {
    let (x, y) = (x.as_bytes(), y.as_bytes());
    if x.len() != y.len() {
        return false;
    }
    x.iter().zip(y).all(|(&a, &b)| ascii_lower(a) == ascii_lower(b))
}

fn ascii_lower(byte: u8) -> u8 {
    if byte.is_ascii_uppercase() {
        byte + 0x20
    } else {
        byte
    }
}
