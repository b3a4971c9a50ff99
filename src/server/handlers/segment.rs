use crate::{
    error::Result,
    server::{handlers::proxy_target, state::AppState},
};
use axum::{
    extract::{Query, Request, State},
    response::Response,
};
use std::collections::HashMap;
use tracing::info;

/// Relay a segment request to its origin, streaming the answer back.
///
/// Accepts any method; the inbound method and body are forwarded as-is.
pub async fn proxy_segment(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
    request: Request,
) -> Result<Response> {
    let (url, headers) = proxy_target(&params, &state.config)?;

    info!("Serving segment for {}", url);

    Ok(state.relay.relay(url, &headers, request).await)
}
