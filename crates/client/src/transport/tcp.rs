use dnsprobe_domain::{DnsError, ServerAddr};
use hickory_proto::op::Message;
use tracing::debug;

use crate::transport::Transport;

impl Transport {
    pub(crate) async fn query_tcp(
        &self,
        addr: &ServerAddr,
        query: &Message,
    ) -> Result<Message, DnsError> {
        let stream = self.dialer.dial_tcp(addr.address()).await?;
        debug!(server = %addr, "TCP connection established");
        self.query_stream(addr, query, stream).await
    }
}
