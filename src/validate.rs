//! Request input checks

use crate::catalog::{DeviceCatalog, DeviceProfile};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

// Permissive on purpose: a domain-ish token and a short TLD anywhere in the
// string, scheme optional. The TLD boundary is ASCII-only, so a non-ASCII
// letter straight after it still ends the TLD.
static URL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(https?://.)?(www\.)?[-a-zA-Z0-9@:%._+~#=]{2,256}\.[a-z]{2,6}(?-u:\b)([-a-zA-Z0-9@:%_+.~#?&/=]*)",
    )
    .expect("url shape pattern is valid")
});

static HAS_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://").expect("scheme pattern is valid"));

/// Check that `url` looks like a URL. A scheme is not required.
pub fn validate_url(url: &str) -> Result<()> {
    if URL_SHAPE.is_match(url) {
        Ok(())
    } else {
        Err(Error::InvalidUrl(url.to_string()))
    }
}

/// Resolve `id` against the catalog.
pub fn validate_device<'a>(id: &str, catalog: &'a DeviceCatalog) -> Result<&'a DeviceProfile> {
    catalog.lookup(id).ok_or_else(|| Error::UnknownDevice {
        id: id.to_string(),
        known: catalog.ids().to_vec(),
    })
}

/// Prefix `http://` unless the url already carries an http(s) scheme.
pub fn normalize_url(url: &str) -> String {
    if HAS_SCHEME.is_match(url) {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plausible_urls() {
        for url in [
            "example.com",
            "www.example.com",
            "http://example.com",
            "https://sub.example.co.uk/path?q=1&x=y#frag",
            "localhost.dev:8080/a",
        ] {
            assert!(validate_url(url).is_ok(), "{} should pass", url);
        }
    }

    #[test]
    fn rejects_non_urls() {
        for url in ["", "not a url", "a.b", "example", "http://"] {
            let err = validate_url(url).unwrap_err();
            assert!(matches!(err, Error::InvalidUrl(ref u) if u == url));
        }
    }

    #[test]
    fn shape_check_stays_permissive() {
        // bare words with a dot pass
        assert!(validate_url("hello.world").is_ok());
        // TLDs must be 2-6 lowercase letters
        assert!(validate_url("example.COM").is_err());
        assert!(validate_url("example.community").is_err());
    }

    #[test]
    fn tld_boundary_is_ascii() {
        assert!(validate_url("example.comé").is_ok());
        assert!(validate_url("shop.comñ/x").is_ok());
        // a seventh ASCII letter still breaks the TLD
        assert!(validate_url("example.comxyzw").is_err());
    }

    #[test]
    fn reserved_test_tld_passes_shape_check() {
        // unresolvable hosts used to exercise navigation failures
        assert!(validate_url("nowhere.test").is_ok());
        assert!(validate_url("deviceshot-unresolved.test").is_ok());
        assert!(validate_url("nowhere.invalid").is_err());
    }

    #[test]
    fn normalize_adds_scheme_only_when_missing() {
        assert_eq!(normalize_url("example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
        assert_eq!(normalize_url("HTTP://EXAMPLE.COM"), "HTTP://EXAMPLE.COM");
        assert_eq!(normalize_url("ftp://example.com"), "http://ftp://example.com");
    }

    #[test]
    fn unknown_device_carries_id_and_known_ids() {
        let catalog = DeviceCatalog::builtin().unwrap();
        match validate_device("nokia-3310", &catalog) {
            Err(Error::UnknownDevice { id, known }) => {
                assert_eq!(id, "nokia-3310");
                assert_eq!(known.len(), catalog.len());
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(validate_device("apple-macbook", &catalog).unwrap().id, "apple-macbook");
    }
}
