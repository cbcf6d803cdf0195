//! DNS over HTTPS (RFC 8484). The query travels as the body of a POST with
//! `application/dns-message` on both sides; the response body is the raw
//! DNS answer, read up to a configurable cap.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use dnsprobe_domain::{DnsError, ServerAddr};
use hickory_proto::op::Message;
use tracing::debug;

use crate::message::{edns0_max_response_size, pack_message, unpack_message};
use crate::ports::{HttpExchange, HttpReply};
use crate::transport::Transport;

/// Content type required on both sides of a DoH exchange (RFC 8484 §4.1).
pub(crate) const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

impl Transport {
    pub(crate) async fn query_doh(
        &self,
        addr: &ServerAddr,
        query: &Message,
    ) -> Result<Message, DnsError> {
        let raw_query = pack_message(query)?;
        let t0 = self.observe_query(addr, &raw_query);

        let cap = self
            .max_http_response_size
            .max(edns0_max_response_size(query) as usize);
        let reply = self
            .http
            .post_dns(addr.address(), raw_query.clone(), cap)
            .await?;

        // RFC 8484 §4.2.1: a DoH answer is a 200 carrying the DNS media
        // type. Anything else is a misbehaving server.
        if reply.status != 200 {
            return Err(DnsError::ServerMisbehaving);
        }
        if !is_dns_message_content_type(reply.content_type.as_deref()) {
            return Err(DnsError::ServerMisbehaving);
        }

        let response = unpack_message(&reply.body)?;
        self.observe_response(
            addr,
            t0,
            &raw_query,
            &reply.body,
            reply.local_addr,
            reply.remote_addr,
        );
        debug!(server = %addr, response_len = reply.body.len(), "DoH response received");
        Ok(response)
    }
}

fn is_dns_message_content_type(value: Option<&str>) -> bool {
    match value {
        Some(value) => value
            .split(';')
            .next()
            .map(str::trim)
            .is_some_and(|media| media.eq_ignore_ascii_case(DNS_MESSAGE_CONTENT_TYPE)),
        None => false,
    }
}

/// Default DoH exchange backed by a reqwest client over rustls.
pub struct ReqwestExchange {
    client: reqwest::Client,
}

impl ReqwestExchange {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for ReqwestExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpExchange for ReqwestExchange {
    async fn post_dns(
        &self,
        url: &str,
        body: Bytes,
        max_response_size: usize,
    ) -> io::Result<HttpReply> {
        let mut response = self
            .client
            .post(url)
            .header("content-type", DNS_MESSAGE_CONTENT_TYPE)
            .header("accept", DNS_MESSAGE_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(io_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let remote_addr = response.remote_addr();

        // Bounded read of the body, one chunk at a time: anything past the
        // cap is discarded, matching limited-reader semantics.
        let mut collected: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(io_error)? {
            let remaining = max_response_size - collected.len();
            if chunk.len() >= remaining {
                collected.extend_from_slice(&chunk[..remaining]);
                break;
            }
            collected.extend_from_slice(&chunk);
        }

        Ok(HttpReply {
            status,
            content_type,
            body: Bytes::from(collected),
            // reqwest does not expose the local endpoint of the pooled
            // connection; it is reported as unknown.
            local_addr: None,
            remote_addr,
        })
    }
}

fn io_error(err: reqwest::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}
