//! Shop domain validation and normalization.

use once_cell::sync::Lazy;
use regex::Regex;

static SHOP_DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]*\.myshopify\.com$").expect("shop domain regex is valid")
});

/// Whether `domain` is a well-formed `*.myshopify.com` domain.
pub fn is_valid_shop_domain(domain: &str) -> bool {
    SHOP_DOMAIN_RE.is_match(domain)
}

/// Normalizes user-supplied shop input into a `*.myshopify.com` domain.
///
/// Accepts a bare store handle (`acme`), a full domain, or a URL with a
/// scheme and path. Returns `None` when nothing usable remains after
/// trimming.
pub fn normalize_shop_domain(input: &str) -> Option<String> {
    let mut value = input.trim().to_lowercase();
    if value.is_empty() {
        return None;
    }

    for prefix in ["https://", "http://"] {
        if let Some(rest) = value.strip_prefix(prefix) {
            value = rest.to_string();
            break;
        }
    }
    if let Some(rest) = value.strip_prefix("www.") {
        value = rest.to_string();
    }

    let first_segment = value.split('/').next().unwrap_or("").trim();
    if first_segment.is_empty() {
        return None;
    }

    if first_segment.ends_with(".myshopify.com") {
        return Some(first_segment.to_string());
    }

    let handle = first_segment.trim_end_matches(".myshopify.com");
    Some(format!("{handle}.myshopify.com"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_domains() {
        assert!(is_valid_shop_domain("foo.myshopify.com"));
        assert!(is_valid_shop_domain("my-store-7.myshopify.com"));
    }

    #[test]
    fn rejects_malformed_domains() {
        assert!(!is_valid_shop_domain("foo.example.com"));
        assert!(!is_valid_shop_domain("-foo.myshopify.com"));
        assert!(!is_valid_shop_domain("foo.myshopify.com/evil"));
        assert!(!is_valid_shop_domain(""));
    }

    #[test]
    fn normalizes_bare_handles() {
        assert_eq!(
            normalize_shop_domain("acme").as_deref(),
            Some("acme.myshopify.com")
        );
    }

    #[test]
    fn normalizes_urls_and_paths() {
        assert_eq!(
            normalize_shop_domain("https://www.acme.myshopify.com/admin").as_deref(),
            Some("acme.myshopify.com")
        );
        assert_eq!(
            normalize_shop_domain("  Acme.MyShopify.com  ").as_deref(),
            Some("acme.myshopify.com")
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(normalize_shop_domain("   "), None);
        assert_eq!(normalize_shop_domain("https:///path"), None);
    }
}
