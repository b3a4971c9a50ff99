use crate::{
    error::{ProxyError, Result},
    headers::HeaderSet,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Source of origin manifest text.
///
/// The whole body is returned at once: classification needs all of it
/// before any line can be rewritten.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    /// GET `url` with exactly `headers` attached.
    ///
    /// Network errors, DNS failures, timeouts and non-2xx statuses are all
    /// reported as [`ProxyError::OriginFetch`](crate::error::ProxyError::OriginFetch).
    async fn fetch(&self, url: &Url, headers: &HeaderSet) -> Result<String>;
}

/// [`ManifestFetcher`] over a shared reqwest client.
#[derive(Clone)]
pub struct HttpManifestFetcher {
    client: Client,
    /// Whole-request timeout; when `None`, the client's own timeout applies.
    timeout: Option<Duration>,
}

impl HttpManifestFetcher {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl ManifestFetcher for HttpManifestFetcher {
    async fn fetch(&self, url: &Url, headers: &HeaderSet) -> Result<String> {
        info!("Fetching manifest from origin: {}", url);

        let mut request = self.client.get(url.clone()).headers(headers.to_header_map()?);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Manifest fetch failed for {}: {}", url, e);
            refused_redirect(&e).unwrap_or(ProxyError::OriginFetch(e))
        })?;

        let response = response
            .error_for_status()
            .inspect_err(|e| warn!("Origin rejected manifest fetch: {}", e))?;

        Ok(response.text().await?)
    }
}

/// A redirect stopped by the client's redirect policy surfaces as the
/// policy's own refusal rather than a generic fetch failure.
fn refused_redirect(e: &reqwest::Error) -> Option<ProxyError> {
    if !e.is_redirect() {
        return None;
    }
    match std::error::Error::source(e)?.downcast_ref::<ProxyError>()? {
        ProxyError::ForbiddenOrigin(reason) => Some(ProxyError::ForbiddenOrigin(reason.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::url_validation::redirect_policy;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_supplied_headers_and_returns_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/live/index.m3u8"))
            .and(header("referer", "https://site.example/"))
            .and(header("x-token", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\nseg.ts"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpManifestFetcher::new(Client::new());
        let url = Url::parse(&format!("{}/live/index.m3u8", server.uri())).unwrap();
        let headers: HeaderSet = [("Referer", "https://site.example/"), ("X-Token", "abc")]
            .into_iter()
            .collect();

        let body = fetcher.fetch(&url, &headers).await.unwrap();
        assert_eq!(body, "#EXTM3U\nseg.ts");
    }

    #[tokio::test]
    async fn non_success_status_is_origin_fetch_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpManifestFetcher::new(Client::new());
        let url = Url::parse(&server.uri()).unwrap();

        let err = fetcher.fetch(&url, &HeaderSet::new()).await.unwrap_err();
        assert!(matches!(err, ProxyError::OriginFetch(_)));
        assert!(err.to_string().contains("404"), "got: {err}");
    }

    #[tokio::test]
    async fn slow_origin_times_out_as_fetch_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("#EXTM3U")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpManifestFetcher::new(Client::new()).with_timeout(Duration::from_millis(50));
        let url = Url::parse(&server.uri()).unwrap();

        let err = fetcher.fetch(&url, &HeaderSet::new()).await.unwrap_err();
        let ProxyError::OriginFetch(source) = &err else {
            panic!("expected OriginFetch, got {err:?}");
        };
        assert!(source.is_timeout());
    }

    #[tokio::test]
    async fn connection_refused_is_origin_fetch_failure() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpManifestFetcher::new(Client::new());
        let url = Url::parse(&format!("http://{addr}/index.m3u8")).unwrap();

        let err = fetcher.fetch(&url, &HeaderSet::new()).await.unwrap_err();
        let ProxyError::OriginFetch(source) = &err else {
            panic!("expected OriginFetch, got {err:?}");
        };
        assert!(source.is_connect(), "expected a connect error, got {source:?}");
        assert_eq!(err.to_string(), source.to_string());
    }

    fn client_with_policy(allow_private: bool) -> Client {
        Client::builder()
            .redirect(redirect_policy(allow_private))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn redirect_to_internal_host_is_refused() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/index.m3u8"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", "http://169.254.169.254/latest/meta-data/"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpManifestFetcher::new(client_with_policy(false));
        let url = Url::parse(&format!("{}/index.m3u8", server.uri())).unwrap();

        let err = fetcher.fetch(&url, &HeaderSet::new()).await.unwrap_err();
        assert!(
            matches!(err, ProxyError::ForbiddenOrigin(_)),
            "expected ForbiddenOrigin, got {err:?}"
        );
    }

    #[tokio::test]
    async fn allowed_redirect_is_followed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/old.m3u8"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/new.m3u8"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\nseg.ts"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpManifestFetcher::new(client_with_policy(true));
        let url = Url::parse(&format!("{}/old.m3u8", server.uri())).unwrap();

        let body = fetcher.fetch(&url, &HeaderSet::new()).await.unwrap();
        assert_eq!(body, "#EXTM3U\nseg.ts");
    }
}
