use crate::{
    error::{ProxyError, Result},
    headers::HeaderSet,
    hls::{
        classify::ManifestKind,
        proxy_url::{ProxyUrlBuilder, ProxyEndpoint},
    },
};
use tracing::debug;
use url::Url;

/// Rewrite every reference line of `manifest` into a proxy URL.
///
/// Lines are split on `\n` and joined back with `\n`. Lines starting with `#`
/// are copied through untouched. Every other line, the empty line left by a
/// trailing newline included, is resolved against `fetch_url` and replaced
/// with a callback to the endpoint `kind` routes to. An empty line therefore
/// resolves to `fetch_url` itself. An empty manifest rewrites to nothing.
///
/// Resolution follows WHATWG URL parsing, which strips leading and trailing
/// C0 controls and spaces, so the `\r` of a CRLF reference line does not end
/// up in the target.
pub fn rewrite_manifest(
    manifest: &str,
    kind: ManifestKind,
    fetch_url: &Url,
    headers: &HeaderSet,
    proxy_urls: &ProxyUrlBuilder,
) -> Result<String> {
    if manifest.is_empty() {
        return Ok(String::new());
    }

    let endpoint = kind.endpoint();
    let encoded_headers = ProxyUrlBuilder::encode_headers(headers);

    let mut output = String::with_capacity(manifest.len() * 2);
    for (index, line) in manifest.split('\n').enumerate() {
        if index > 0 {
            output.push('\n');
        }

        if line.starts_with('#') {
            output.push_str(line);
        } else {
            output.push_str(&rewrite_reference(
                line,
                endpoint,
                fetch_url,
                &encoded_headers,
                proxy_urls,
            )?);
        }
    }

    Ok(output)
}

fn rewrite_reference(
    line: &str,
    endpoint: ProxyEndpoint,
    fetch_url: &Url,
    encoded_headers: &str,
    proxy_urls: &ProxyUrlBuilder,
) -> Result<String> {
    let target = fetch_url
        .join(line)
        .map_err(|e| ProxyError::InvalidReference(format!("{line:?}: {e}")))?;

    debug!("Rewriting {} -> {}{}", line, endpoint.path(), target);

    Ok(proxy_urls.build_encoded(endpoint, &target, encoded_headers))
}
