//! Redirect-target sanitization
//!
//! Client-supplied return targets are reduced to their path, query and
//! fragment before being echoed into a Location header, so
//! `javascript:alert(1)`, `mailto:` and scheme-relative `//host` values
//! cannot redirect the browser off-site.

use url::Url;

/// Reduces `target` to a same-origin path.
///
/// Absolute URLs keep only path, query and fragment; scheme-relative and
/// otherwise unusable targets collapse to `fallback`.
pub fn sanitize_redirect_target(target: &str, fallback: &str) -> String {
    if target.is_empty() {
        return fallback.to_string();
    }
    if target.starts_with("//") {
        return fallback.to_string();
    }
    if let Ok(parsed) = Url::parse(target) {
        // Absolute URL: drop scheme and authority.
        if parsed.cannot_be_a_base() {
            return fallback.to_string();
        }
        let mut sanitized = parsed.path().to_string();
        if let Some(query) = parsed.query() {
            sanitized.push('?');
            sanitized.push_str(query);
        }
        if let Some(fragment) = parsed.fragment() {
            sanitized.push('#');
            sanitized.push_str(fragment);
        }
        return sanitized;
    }
    target.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "/console/";

    #[test]
    fn test_relative_paths_pass_through() {
        assert_eq!(
            sanitize_redirect_target("/console/#module=users", FALLBACK),
            "/console/#module=users"
        );
        assert_eq!(sanitize_redirect_target("/a/b?c=d", FALLBACK), "/a/b?c=d");
    }

    #[test]
    fn test_absolute_url_loses_authority() {
        assert_eq!(
            sanitize_redirect_target("https://evil.example/steal?x=1", FALLBACK),
            "/steal?x=1"
        );
    }

    #[test]
    fn test_scheme_relative_collapses_to_fallback() {
        assert_eq!(sanitize_redirect_target("//evil.example/x", FALLBACK), FALLBACK);
    }

    #[test]
    fn test_non_hierarchical_schemes_collapse_to_fallback() {
        assert_eq!(sanitize_redirect_target("javascript:alert(1)", FALLBACK), FALLBACK);
        assert_eq!(sanitize_redirect_target("mailto:foo@example.com", FALLBACK), FALLBACK);
    }

    #[test]
    fn test_empty_target_uses_fallback() {
        assert_eq!(sanitize_redirect_target("", FALLBACK), FALLBACK);
    }
}
