//! Stream framing shared by the TCP, DoT and DoQ engines: a 2-byte
//! big-endian length prefix followed by the DNS message (RFC 1035 §4.2.2).

use bytes::Bytes;
use dnsprobe_domain::{DnsError, ServerAddr};
use hickory_proto::op::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::message::{pack_message, unpack_message};
use crate::ports::ByteStream;
use crate::transport::Transport;

/// Longest message the 2-byte length prefix can carry.
pub(crate) const MAX_STREAM_MESSAGE_SIZE: usize = 65535;

impl Transport {
    /// Round trip over a connected byte stream. Takes ownership of the
    /// stream; dropping it on any exit path closes the connection.
    pub(crate) async fn query_stream<S: ByteStream>(
        &self,
        addr: &ServerAddr,
        query: &Message,
        mut stream: S,
    ) -> Result<Message, DnsError> {
        let raw_query = pack_message(query)?;
        if raw_query.len() > MAX_STREAM_MESSAGE_SIZE {
            return Err(DnsError::QueryTooLargeForTransport);
        }

        let t0 = self.observe_query(addr, &raw_query);
        send_frame(&mut stream, &raw_query).await?;
        stream.finish_query()?;

        let raw_response = read_frame(&mut stream).await?;
        let response = unpack_message(&raw_response)?;
        self.observe_response(
            addr,
            t0,
            &raw_query,
            &raw_response,
            stream.local_addr(),
            stream.peer_addr(),
        );
        debug!(server = %addr, response_len = raw_response.len(), "stream response received");
        Ok(response)
    }
}

/// Writes the length prefix and the message as a single buffer, so the
/// whole query leaves in one write.
pub(crate) async fn send_frame<S>(stream: &mut S, payload: &[u8]) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let mut frame = Vec::with_capacity(2 + payload.len());
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(payload);
    stream.write_all(&frame).await?;
    stream.flush().await
}

pub(crate) async fn read_frame<S>(stream: &mut S) -> std::io::Result<Bytes>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).await?;
    let length = u16::from_be_bytes(header) as usize;

    let mut payload = vec![0u8; length];
    stream.read_exact(&mut payload).await?;
    Ok(Bytes::from(payload))
}
