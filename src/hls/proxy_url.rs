use crate::headers::HeaderSet;
use url::Url;

/// Proxy route a rewritten reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyEndpoint {
    /// `/m3u8_proxy`: fetch and rewrite another manifest
    Manifest,
    /// `/ts_proxy`: relay a media segment
    Segment,
}

impl ProxyEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            ProxyEndpoint::Manifest => "/m3u8_proxy",
            ProxyEndpoint::Segment => "/ts_proxy",
        }
    }
}

/// Builds `{base}/{endpoint}?url=..&headers=..` callback URLs.
#[derive(Debug, Clone)]
pub struct ProxyUrlBuilder {
    base_url: String,
}

impl ProxyUrlBuilder {
    /// `base_url` is the proxy's public address; a trailing `/` is dropped.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Percent-encoded JSON of `headers`, for reuse across every line of a manifest.
    pub fn encode_headers(headers: &HeaderSet) -> String {
        urlencoding::encode(&headers.to_json()).into_owned()
    }

    pub fn build(&self, endpoint: ProxyEndpoint, target: &Url, headers: &HeaderSet) -> String {
        self.build_encoded(endpoint, target, &Self::encode_headers(headers))
    }

    /// Like [`build`](Self::build) with headers already run through
    /// [`encode_headers`](Self::encode_headers).
    pub fn build_encoded(&self, endpoint: ProxyEndpoint, target: &Url, encoded_headers: &str) -> String {
        format!(
            "{}{}?url={}&headers={}",
            self.base_url,
            endpoint.path(),
            urlencoding::encode(target.as_str()),
            encoded_headers
        )
    }
}
