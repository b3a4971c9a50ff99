use crate::{
    config::Config,
    hls::{ManifestRewriter, fetcher::HttpManifestFetcher, proxy_url::ProxyUrlBuilder},
    relay::SegmentRelay,
    server::url_validation::redirect_policy,
};
use metrics_exporter_prometheus::PrometheusHandle;
use reqwest::{ClientBuilder, redirect::Policy};
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Manifest fetch-and-rewrite pipeline
    pub rewriter: ManifestRewriter,
    /// Streaming segment forwarder
    pub relay: SegmentRelay,
    /// Prometheus render handle, if this process owns the recorder
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new AppState with the given configuration
    pub fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        // The manifest fetcher follows redirects, vetting every hop against the
        // origin policy, and adds its own whole-request timeout. The relay
        // never follows them: the client gets the origin's 3xx as-is.
        let fetch_client = pooled_client(&config)
            .redirect(redirect_policy(config.allow_private_origins))
            .build()?;
        let relay_client = pooled_client(&config).redirect(Policy::none()).build()?;

        let fetcher = HttpManifestFetcher::new(fetch_client).with_timeout(config.request_timeout);
        let rewriter = ManifestRewriter::new(
            Arc::new(fetcher),
            ProxyUrlBuilder::new(config.base_url.clone()),
        );
        let relay = SegmentRelay::new(relay_client, &config.user_agent)?;

        Ok(Self {
            config: Arc::new(config),
            rewriter,
            relay,
            metrics: crate::metrics::install(),
        })
    }
}

fn pooled_client(config: &Config) -> ClientBuilder {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .connect_timeout(config.connect_timeout)
}
