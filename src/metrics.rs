//! Prometheus metrics for proxied requests.
//!
//! Recording goes through the `metrics` facade; [`install`] wires up the
//! Prometheus recorder once per process and hands out its render handle.

use crate::hls::classify::ManifestKind;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::warn;

static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the global Prometheus recorder.
///
/// Safe to call repeatedly (every router built in tests calls it); only the
/// first call installs. Returns `None` if another recorder was already set.
pub fn install() -> Option<PrometheusHandle> {
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Prometheus recorder not installed: {}", e);
                None
            }
        })
        .clone()
}

/// Count a finished request on `endpoint` with its response status.
pub fn record_request(endpoint: &'static str, status: u16) {
    ::metrics::counter!(
        "proxy_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Time from `start` until now, as a request-duration sample.
pub fn record_duration(endpoint: &'static str, start: Instant) {
    ::metrics::histogram!("proxy_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_origin_error(endpoint: &'static str) {
    ::metrics::counter!("proxy_origin_errors_total", "endpoint" => endpoint).increment(1);
}

pub fn record_manifest(kind: ManifestKind) {
    ::metrics::counter!("proxy_manifests_total", "kind" => kind.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_is_idempotent() {
        let first = install().is_some();
        let second = install().is_some();
        assert_eq!(first, second);
    }

    #[test]
    fn recorded_counters_are_rendered() {
        let Some(handle) = install() else {
            return;
        };
        record_request("m3u8_proxy", 200);
        record_manifest(ManifestKind::Master);

        let rendered = handle.render();
        assert!(rendered.contains("proxy_requests_total"), "got:\n{rendered}");
        assert!(rendered.contains("proxy_manifests_total"), "got:\n{rendered}");
    }
}
