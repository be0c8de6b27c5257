// src/domain/url.rs
use url::Url;

/// Canonical form of a URL used as the dedup key: scheme, host, port and path.
///
/// Query string and fragment are dropped; the path (including any trailing slash) is kept
/// as given. Returns `None` when the input cannot be parsed or has no host.
pub fn canonical_url(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    let host = parsed.host_str()?;

    let authority = match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    Some(format!("{}://{}{}", parsed.scheme(), authority, parsed.path()))
}

/// True when `raw` is an http(s) URL with a canonical form.
pub fn is_web_url(raw: &str) -> bool {
    Url::parse(raw.trim())
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_query_and_fragment_when_canonicalize_then_strips_both() {
        assert_eq!(
            canonical_url("https://example.com/a/b?utm_source=x#top").as_deref(),
            Some("https://example.com/a/b")
        );
    }

    #[test]
    fn given_urls_differing_only_in_query_when_canonicalize_then_equal() {
        let a = canonical_url("https://example.com/page?x=1");
        let b = canonical_url("https://example.com/page#frag");
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn given_trailing_slash_when_canonicalize_then_preserved() {
        assert_eq!(
            canonical_url("https://example.com/docs/").as_deref(),
            Some("https://example.com/docs/")
        );
        assert_ne!(
            canonical_url("https://example.com/docs/"),
            canonical_url("https://example.com/docs")
        );
    }

    #[test]
    fn given_explicit_port_when_canonicalize_then_kept() {
        assert_eq!(
            canonical_url("http://localhost:8080/x?y").as_deref(),
            Some("http://localhost:8080/x")
        );
        // default ports are normalized away by the parser
        assert_eq!(
            canonical_url("https://example.com:443/x").as_deref(),
            Some("https://example.com/x")
        );
    }

    #[test]
    fn given_mixed_case_host_when_canonicalize_then_host_lowercased() {
        assert_eq!(
            canonical_url("HTTPS://Example.COM/Path").as_deref(),
            Some("https://example.com/Path")
        );
    }

    #[test]
    fn given_invalid_input_when_canonicalize_then_none() {
        assert_eq!(canonical_url("not a url"), None);
        assert_eq!(canonical_url(""), None);
        assert_eq!(canonical_url("mailto:someone@example.com"), None);
    }

    #[test]
    fn given_schemes_when_check_web_url_then_only_http_variants_pass() {
        assert!(is_web_url("https://example.com"));
        assert!(is_web_url("http://example.com/x"));
        assert!(!is_web_url("ftp://example.com/file"));
        assert!(!is_web_url("javascript:alert(1)"));
    }
}
