//! Master / media playlist classification.
//!
//! A manifest is a master playlist when its raw text contains `RESOLUTION=`
//! anywhere. This is a substring test, not a tag parse: a comment line that
//! mentions `RESOLUTION=` also makes the manifest a master. Swapping in a real
//! tag parser only needs to touch [`classify`].

use crate::hls::proxy_url::ProxyEndpoint;

/// Marker whose presence identifies a master playlist.
const MASTER_MARKER: &str = "RESOLUTION=";

/// The two kinds of HLS manifest the rewriter distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// Lists variant streams; references are further playlists.
    Master,
    /// Lists segments; references are media chunks.
    Media,
}

impl ManifestKind {
    /// Proxy endpoint that references in this kind of manifest route through.
    pub fn endpoint(self) -> ProxyEndpoint {
        match self {
            ManifestKind::Master => ProxyEndpoint::Manifest,
            ManifestKind::Media => ProxyEndpoint::Segment,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ManifestKind::Master => "master",
            ManifestKind::Media => "media",
        }
    }
}

/// Classify raw manifest text.
pub fn classify(manifest: &str) -> ManifestKind {
    if manifest.contains(MASTER_MARKER) {
        ManifestKind::Master
    } else {
        ManifestKind::Media
    }
}
