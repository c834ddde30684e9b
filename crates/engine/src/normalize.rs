//! URL normalization for archive lookups.
//!
//! An archive is keyed by the URLs of the original site, but it is usually
//! served from somewhere else. Normalization maps the inbound URL back onto the
//! original domain and derives the alternate spelling that differs only by a
//! trailing `?` run, a trailing `/` run, or a missing trailing slash.

use rehost_core::ArchiveSettings;

use crate::request::ReplayRequest;

/// Lookup keys for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    /// The inbound URL rewritten onto the original domain.
    pub primary: String,
    /// Trailing-punctuation variant of `primary`.
    pub alternate: String,
}

/// Rewrite a request onto the original domain and derive its lookup keys.
///
/// With a custom domain, its first occurrence in the URL is replaced; otherwise
/// a host outside the original domain (and its subdomains) is replaced. The
/// replacement is `www.<domain>` when the archive prefers `www`, else the bare
/// domain. Substitution is literal and happens at most once.
pub fn normalize(
    request: &ReplayRequest, custom_domain: Option<&str>, original_domain: &str, settings: &ArchiveSettings,
) -> NormalizedUrl {
    let url = request.url();

    let primary = match custom_domain {
        Some(custom) => {
            let replacement = if settings.prefers_www() && request.host == custom {
                format!("www.{original_domain}")
            } else {
                original_domain.to_string()
            };
            url.replacen(custom, &replacement, 1)
        }
        None if !is_original_host(&request.host, original_domain) => {
            let replacement =
                if settings.prefers_www() { format!("www.{original_domain}") } else { original_domain.to_string() };
            url.replacen(&request.host, &replacement, 1)
        }
        None => url,
    };

    let alternate = alternate_form(&primary);
    NormalizedUrl { primary, alternate }
}

/// Derive the alternate lookup key, first matching rule wins:
///
/// 1. trailing `?` run: strip it
/// 2. trailing `/` run: strip it
/// 3. no query and no fragment: append `/`
/// 4. otherwise unchanged
pub fn alternate_form(url: &str) -> String {
    if url.ends_with('?') {
        return url.trim_end_matches('?').to_string();
    }
    if url.ends_with('/') {
        return url.trim_end_matches('/').to_string();
    }
    if has_query_or_fragment(url) { url.to_string() } else { format!("{url}/") }
}

fn has_query_or_fragment(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            parsed.query().is_some_and(|q| !q.is_empty()) || parsed.fragment().is_some_and(|f| !f.is_empty())
        }
        Err(_) => url.contains(['?', '#']),
    }
}

/// Whether `host` is the original domain or one of its subdomains.
fn is_original_host(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = domain.to_ascii_lowercase();
    if host == domain {
        return true;
    }
    host.strip_suffix(&domain)
        .and_then(|prefix| prefix.strip_suffix('.'))
        .is_some_and(|label| {
            !label.is_empty() && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
        })
}
