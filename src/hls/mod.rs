//! HLS manifest rewriting.
//!
//! [`ManifestRewriter`] fetches an origin manifest, classifies it with
//! [`classify::classify`], and rewrites each reference line into a callback
//! through this proxy: `m3u8_proxy` for variants of a master playlist,
//! `ts_proxy` for segments of a media playlist.

pub mod classify;
pub mod fetcher;
pub mod proxy_url;
pub mod rewriter;

use crate::{error::Result, headers::HeaderSet, metrics};
use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use classify::{ManifestKind, classify};
use fetcher::ManifestFetcher;
use proxy_url::ProxyUrlBuilder;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Content type for every rewritten manifest.
pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// A rewritten manifest, ready to send to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenManifest {
    pub body: String,
    pub kind: ManifestKind,
}

impl RewrittenManifest {
    pub fn content_type(&self) -> &'static str {
        HLS_CONTENT_TYPE
    }

    /// Cross-origin headers sent with every manifest, regardless of the request.
    pub fn cors_headers(&self) -> [(header::HeaderName, HeaderValue); 3] {
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*")),
            (header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("*")),
        ]
    }
}

impl IntoResponse for RewrittenManifest {
    fn into_response(self) -> Response {
        let cors = self.cors_headers();
        let mut response = (
            StatusCode::OK,
            [(header::CONTENT_TYPE, self.content_type())],
            self.body,
        )
            .into_response();

        let headers = response.headers_mut();
        for (name, value) in cors {
            headers.insert(name, value);
        }
        response
    }
}

/// Fetch-classify-rewrite pipeline for `.m3u8` requests.
#[derive(Clone)]
pub struct ManifestRewriter {
    fetcher: Arc<dyn ManifestFetcher>,
    proxy_urls: ProxyUrlBuilder,
}

impl ManifestRewriter {
    pub fn new(fetcher: Arc<dyn ManifestFetcher>, proxy_urls: ProxyUrlBuilder) -> Self {
        Self {
            fetcher,
            proxy_urls,
        }
    }

    /// Fetch `url` with `headers`, then rewrite it.
    ///
    /// A failed fetch is returned as-is; nothing is emitted and nothing is retried.
    pub async fn rewrite(&self, url: &Url, headers: &HeaderSet) -> Result<RewrittenManifest> {
        let manifest = self.fetcher.fetch(url, headers).await?;

        let kind = classify(&manifest);
        info!("Rewriting {} manifest from {}", kind.as_str(), url);
        metrics::record_manifest(kind);

        let body = rewriter::rewrite_manifest(&manifest, kind, url, headers, &self.proxy_urls)?;

        Ok(RewrittenManifest { body, kind })
    }
}
