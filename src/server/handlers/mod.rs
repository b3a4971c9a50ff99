pub mod health;
pub mod manifest;
pub mod segment;

use crate::{
    config::Config,
    error::{ProxyError, Result},
    headers::HeaderSet,
    server::url_validation::validate_target_url,
};
use std::collections::HashMap;
use url::Url;

/// Pull the `url` and `headers` query parameters every proxy route takes.
///
/// `headers` is optional and defaults to an empty set.
pub(crate) fn proxy_target(params: &HashMap<String, String>, config: &Config) -> Result<(Url, HeaderSet)> {
    let raw_url = params
        .get("url")
        .ok_or_else(|| ProxyError::InvalidRequest("missing url query parameter".to_string()))?;
    let url = validate_target_url(raw_url, config.allow_private_origins)?;

    let headers = match params.get("headers") {
        Some(raw) => HeaderSet::from_json(raw)?,
        None => HeaderSet::new(),
    };

    Ok((url, headers))
}
