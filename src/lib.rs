//! HLS manifest rewriting and segment relay proxy.
//!
//! `/m3u8_proxy` fetches a playlist from its origin and rewrites every URI
//! line into a callback through this proxy, carrying the target URL and the
//! caller's headers as query parameters. `/ts_proxy` streams a segment from
//! its origin with those headers attached.

pub mod config;
pub mod error;
pub mod headers;
pub mod hls;
pub mod metrics;
pub mod relay;
pub mod server;
