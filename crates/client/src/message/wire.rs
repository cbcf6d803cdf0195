use bytes::Bytes;
use dnsprobe_domain::DnsError;
use hickory_proto::op::Message;
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};

/// Serializes a message to wire format.
pub fn pack_message(message: &Message) -> Result<Bytes, DnsError> {
    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    message
        .emit(&mut encoder)
        .map_err(|e| DnsError::CannotMarshalMessage(e.to_string()))?;
    Ok(Bytes::from(buf))
}

/// Parses a wire-format message received from a server.
pub fn unpack_message(raw: &[u8]) -> Result<Message, DnsError> {
    Message::from_vec(raw).map_err(|e| DnsError::CannotUnmarshalMessage(e.to_string()))
}
