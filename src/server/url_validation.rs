use crate::error::ProxyError;
use reqwest::redirect::Policy;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Redirect hops followed before giving up, matching reqwest's default.
pub const MAX_REDIRECTS: usize = 10;

/// Parse and vet a `url` query parameter before the proxy fetches it.
///
/// Only absolute `http://` and `https://` URLs with a host are accepted. When
/// `allow_private` is false, `localhost` and IP literals in loopback, private,
/// link-local or unspecified ranges are refused too.
///
/// Hostnames are not resolved, so a public name pointing at a private address
/// still passes.
///
/// # Errors
/// - [`ProxyError::InvalidRequest`] if `raw` is not an absolute URL
/// - [`ProxyError::ForbiddenOrigin`] for other schemes or refused hosts
pub fn validate_target_url(raw: &str, allow_private: bool) -> Result<Url, ProxyError> {
    let url = Url::parse(raw).map_err(|e| ProxyError::InvalidRequest(format!("url {raw:?}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProxyError::ForbiddenOrigin(format!(
            "scheme '{}' not allowed, only http/https",
            url.scheme()
        )));
    }

    let host = url
        .host()
        .ok_or_else(|| ProxyError::InvalidRequest(format!("no host in url {raw:?}")))?;

    if allow_private {
        return Ok(url);
    }

    let refused = match &host {
        Host::Domain(name) => name.eq_ignore_ascii_case("localhost") || name.ends_with(".localhost"),
        Host::Ipv4(ip) => is_internal_ipv4(*ip),
        Host::Ipv6(ip) => is_internal_ipv6(*ip),
    };

    if refused {
        return Err(ProxyError::ForbiddenOrigin(format!("internal host not allowed: {host}")));
    }

    Ok(url)
}

/// Decide whether the hop to `next` may be followed after `hops` earlier ones.
///
/// Every hop goes through [`validate_target_url`], so an allowed origin cannot
/// bounce the fetch to a host the policy would have refused up front.
pub fn check_redirect(next: &Url, hops: usize, allow_private: bool) -> Result<(), ProxyError> {
    if hops >= MAX_REDIRECTS {
        return Err(ProxyError::ForbiddenOrigin(format!(
            "too many redirects ({hops}) before {next}"
        )));
    }
    validate_target_url(next.as_str(), allow_private).map(|_| ())
}

/// reqwest redirect policy applying [`check_redirect`] to each hop.
pub fn redirect_policy(allow_private: bool) -> Policy {
    Policy::custom(move |attempt| {
        match check_redirect(attempt.url(), attempt.previous().len(), allow_private) {
            Ok(()) => attempt.follow(),
            Err(refusal) => attempt.error(refusal),
        }
    })
}

/// `0.0.0.0/8`, loopback, RFC 1918 private and `169.254.0.0/16` link-local
/// (where cloud metadata endpoints live).
fn is_internal_ipv4(ip: Ipv4Addr) -> bool {
    ip.octets()[0] == 0 || ip.is_loopback() || ip.is_private() || ip.is_link_local()
}

/// Loopback, unspecified, `fe80::/10`, `fc00::/7`, and IPv4-mapped internal addresses.
fn is_internal_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_internal_ipv4(v4);
    }
    let first = ip.segments()[0];

    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xffc0) == 0xfe80
        || (first & 0xfe00) == 0xfc00
}
