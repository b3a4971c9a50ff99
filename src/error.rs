use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::warn;

/// Errors produced while proxying a manifest or a segment.
///
/// Every variant is scoped to a single request. Nothing here is fatal to the
/// process.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The origin manifest could not be fetched: network error, DNS failure,
    /// timeout, or a non-2xx status.
    #[error("{0}")]
    OriginFetch(#[from] reqwest::Error),

    /// The outbound segment request could not be built or sent.
    #[error("{0}")]
    RelayDispatch(String),

    /// A manifest reference line could not be resolved against the fetch URL.
    #[error("Invalid manifest reference: {0}")]
    InvalidReference(String),

    /// Malformed `url` / `headers` query parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The target URL is not allowed by the origin policy.
    #[error("Forbidden origin: {0}")]
    ForbiddenOrigin(String),
}

impl ProxyError {
    /// HTTP status the outer server answers with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::OriginFetch(_)
            | ProxyError::RelayDispatch(_)
            | ProxyError::InvalidReference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::ForbiddenOrigin(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!("Request failed with {}: {}", status, self);

        // The message is the whole body, as plain text
        (status, self.to_string()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
