use crate::{
    error::{ProxyError, Result},
    metrics,
    server::{handlers::proxy_target, state::AppState},
};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

const ENDPOINT: &str = "m3u8_proxy";

/// Fetch an origin manifest and serve it with every reference routed back
/// through this proxy.
pub async fn proxy_manifest(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Response> {
    let start = Instant::now();
    let (url, headers) = proxy_target(&params, &state.config)?;

    info!("Serving manifest for {} ({} headers)", url, headers.len());

    let result = state.rewriter.rewrite(&url, &headers).await;
    metrics::record_duration(ENDPOINT, start);

    match result {
        Ok(manifest) => {
            metrics::record_request(ENDPOINT, 200);
            Ok(manifest.into_response())
        }
        Err(e) => {
            if matches!(e, ProxyError::OriginFetch(_)) {
                metrics::record_origin_error(ENDPOINT);
            }
            metrics::record_request(ENDPOINT, e.status_code().as_u16());
            Err(e)
        }
    }
}
