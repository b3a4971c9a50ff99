//! Streaming segment relay.
//!
//! Forwards one client request to the origin and pipes the origin's answer
//! back. Neither body is buffered: the inbound body is handed to reqwest as a
//! stream and the upstream body is handed to axum as a stream, so memory stays
//! bounded by chunk size. A client disconnect drops the response stream,
//! which drops the upstream response and releases its connection.

use crate::{
    error::{ProxyError, Result},
    headers::HeaderSet,
    metrics,
};
use axum::{
    body::{Body, HttpBody},
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue, header},
    response::{IntoResponse, Response},
};
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Supplied header names that are never forwarded to the origin.
/// The transport derives them from the outbound connection and body.
const OUTBOUND_SKIPPED: &[HeaderName] = &[
    header::HOST,
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::CONTENT_LENGTH,
];

/// Origin response headers dropped before answering the client.
/// The server re-frames the streamed body itself.
const INBOUND_STRIPPED: &[HeaderName] = &[header::CONNECTION, header::TRANSFER_ENCODING];

const ENDPOINT: &str = "ts_proxy";

/// Relays segment requests to their origin.
#[derive(Clone, Debug)]
pub struct SegmentRelay {
    client: Client,
    user_agent: HeaderValue,
}

impl SegmentRelay {
    /// `user_agent` is sent unless the supplied header set overrides it.
    pub fn new(client: Client, user_agent: &str) -> Result<Self> {
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|e| ProxyError::InvalidRequest(format!("invalid default User-Agent: {e}")))?;
        Ok(Self { client, user_agent })
    }

    /// Forward `request` to `target` and stream the origin's response back.
    ///
    /// Always produces a complete response. If the outbound request cannot be
    /// sent, that response is a 500 carrying the failure message. Redirects
    /// are not followed here; the origin's 3xx reaches the client unchanged.
    pub async fn relay(&self, target: Url, headers: &HeaderSet, request: Request) -> Response {
        let start = Instant::now();

        let response = match self.dispatch(target, headers, request).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_origin_error(ENDPOINT);
                e.into_response()
            }
        };

        metrics::record_request(ENDPOINT, response.status().as_u16());
        metrics::record_duration(ENDPOINT, start);
        response
    }

    /// Default `User-Agent` overlaid with every supplied header.
    fn outbound_headers(&self, headers: &HeaderSet) -> Result<HeaderMap> {
        let mut outbound = HeaderMap::new();
        outbound.insert(header::USER_AGENT, self.user_agent.clone());

        let supplied = headers.to_header_map()?;
        for (name, value) in &supplied {
            if OUTBOUND_SKIPPED.contains(name) {
                continue;
            }
            outbound.insert(name.clone(), value.clone());
        }
        Ok(outbound)
    }

    async fn dispatch(&self, target: Url, headers: &HeaderSet, request: Request) -> Result<Response> {
        let mut outbound_headers = self.outbound_headers(headers)?;
        let (parts, body) = request.into_parts();

        info!("Relaying {} {}", parts.method, target);

        let mut outbound = self.client.request(parts.method, target.clone());
        if !body.is_end_stream() {
            if let Some(len) = body.size_hint().exact() {
                outbound_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
            }
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = outbound
            .headers(outbound_headers)
            .send()
            .await
            .map_err(|e| {
                warn!("Segment relay to {} failed: {}", target, e);
                ProxyError::RelayDispatch(e.to_string())
            })?;

        let status = upstream.status();
        debug!("Origin answered {} for {}", status, target);

        let mut response_headers = upstream.headers().clone();
        for name in INBOUND_STRIPPED {
            response_headers.remove(name);
        }

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}
