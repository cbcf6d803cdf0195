//! DNS over UDP (RFC 1035 §4.2.1). One request datagram, one response
//! datagram; in duplicates mode, every response datagram the socket sees
//! until an error or cancellation ends the stream.

use std::time::SystemTime;

use bytes::Bytes;
use dnsprobe_domain::{DnsError, ServerAddr};
use hickory_proto::op::Message;
use tokio::sync::mpsc;
use tracing::debug;

use crate::context::QueryContext;
use crate::message::{edns0_max_response_size, pack_message, unpack_message};
use crate::ports::DatagramSocket;
use crate::transport::{MessageOrError, Transport};

impl Transport {
    pub(crate) async fn query_udp(
        &self,
        addr: &ServerAddr,
        query: &Message,
    ) -> Result<Message, DnsError> {
        let (socket, t0, raw_query) = self.send_query_udp(addr, query).await?;
        self.recv_response_udp(addr, &*socket, t0, query, &raw_query)
            .await
    }

    /// Dials, packs, observes and sends the query as a single datagram.
    /// The caller owns the returned socket.
    async fn send_query_udp(
        &self,
        addr: &ServerAddr,
        query: &Message,
    ) -> Result<(Box<dyn DatagramSocket>, SystemTime, Bytes), DnsError> {
        let socket = self.dialer.dial_udp(addr.address()).await?;
        let raw_query = pack_message(query)?;
        let t0 = self.observe_query(addr, &raw_query);
        socket.send(&raw_query).await?;
        debug!(server = %addr, bytes_sent = raw_query.len(), "UDP query sent");
        Ok((socket, t0, raw_query))
    }

    /// Reads one datagram into a buffer sized from the query's advertised
    /// EDNS(0) response size (floor 512) and decodes it.
    async fn recv_response_udp(
        &self,
        addr: &ServerAddr,
        socket: &dyn DatagramSocket,
        t0: SystemTime,
        query: &Message,
        raw_query: &Bytes,
    ) -> Result<Message, DnsError> {
        let mut buffer = vec![0u8; edns0_max_response_size(query) as usize];
        let count = socket.recv(&mut buffer).await?;
        buffer.truncate(count);
        let raw_response = Bytes::from(buffer);

        let response = unpack_message(&raw_response)?;
        self.observe_response(
            addr,
            t0,
            raw_query,
            &raw_response,
            socket.local_addr(),
            socket.peer_addr(),
        );
        debug!(server = %addr, bytes_received = count, "UDP response received");
        Ok(response)
    }

    /// Producer half of [`Transport::query_with_duplicates`]: one send,
    /// then a receive loop emitting datagrams in arrival order.
    pub(crate) async fn run_udp_duplicates(
        self,
        ctx: QueryContext,
        addr: ServerAddr,
        query: Message,
        out: mpsc::Sender<MessageOrError>,
    ) {
        let (socket, t0, raw_query) = match ctx.guard(self.send_query_udp(&addr, &query)).await {
            Ok(sent) => sent,
            Err(DnsError::Cancelled) => return,
            Err(err) => {
                emit(&ctx, &out, Err(err)).await;
                return;
            }
        };

        loop {
            let received = ctx
                .guard(self.recv_response_udp(&addr, &*socket, t0, &query, &raw_query))
                .await;
            match received {
                Ok(response) => {
                    if !emit(&ctx, &out, Ok(response)).await {
                        return;
                    }
                }
                Err(DnsError::Cancelled) => return,
                Err(err) => {
                    emit(&ctx, &out, Err(err)).await;
                    return;
                }
            }
        }
    }
}

/// Delivers one stream item unless the consumer is gone or the context ends
/// first; the item is dropped in either case.
async fn emit(
    ctx: &QueryContext,
    out: &mpsc::Sender<MessageOrError>,
    item: MessageOrError,
) -> bool {
    tokio::select! {
        _ = ctx.cancelled() => false,
        sent = out.send(item) => sent.is_ok(),
    }
}
