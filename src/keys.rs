use http::HeaderMap;
use url::Url;

use crate::error::{CacheError, Result};

/// Resolves a request URI into an absolute `http(s)` URL.
pub fn request_url(uri: &http::Uri) -> Result<Url> {
    let url = Url::parse(&uri.to_string()).map_err(|_| CacheError::BadRequestUri)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(CacheError::BadRequestUri),
    }
}

/// Storage key for a request URL: `{scheme}://{host}:{port}{path-and-query}`.
///
/// The port is always explicit so that `http://example.com/` and
/// `http://example.com:80/` share one entry.
pub fn primary_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    let port = url.port_or_known_default().unwrap_or(0);
    match url.query() {
        Some(query) => format!("{}://{}:{}{}?{}", url.scheme(), host, port, url.path(), query),
        None => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
    }
}

/// Canonical form of the request header values selected by `Vary`.
///
/// `vary_names` must be lowercased and sorted (see
/// [`CacheEntry::vary_names`](crate::CacheEntry::vary_names)); multiple
/// values of one header are joined so that header order on the wire does not
/// split variants.
pub fn variant_key(vary_names: &[String], request_headers: &HeaderMap) -> String {
    let mut parts = Vec::with_capacity(vary_names.len());
    for name in vary_names {
        let value = request_headers
            .get_all(name.as_str())
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("{name}={value}"));
    }
    parts.join("&")
}

/// Storage key of a variant sub-entry: a stable digest of the variant key
/// prefixed to the primary key.
pub fn variant_storage_key(variant_key: &str, primary_key: &str) -> String {
    format!("{}_{}", blake3::hash(variant_key.as_bytes()).to_hex(), primary_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn primary_key_makes_default_ports_explicit() {
        let url = Url::parse("http://Example.com/a/b?q=1").unwrap();
        assert_eq!(primary_key(&url), "http://example.com:80/a/b?q=1");
        let url = Url::parse("https://example.com:8443/").unwrap();
        assert_eq!(primary_key(&url), "https://example.com:8443/");
    }

    #[test]
    fn variant_key_is_insensitive_to_header_order() {
        let names = vec!["accept-encoding".to_string(), "user-agent".to_string()];
        let mut a = HeaderMap::new();
        a.insert("accept-encoding", HeaderValue::from_static("gzip"));
        a.insert("user-agent", HeaderValue::from_static("test"));
        let mut b = HeaderMap::new();
        b.insert("user-agent", HeaderValue::from_static("test"));
        b.insert("accept-encoding", HeaderValue::from_static("gzip"));
        assert_eq!(variant_key(&names, &a), variant_key(&names, &b));
        assert_eq!(variant_key(&names, &a), "accept-encoding=gzip&user-agent=test");
    }

    #[test]
    fn missing_selected_headers_still_form_a_variant() {
        let names = vec!["accept-encoding".to_string()];
        let headers = HeaderMap::new();
        assert_eq!(variant_key(&names, &headers), "accept-encoding=");
    }

    #[test]
    fn variant_storage_keys_are_stable() {
        let primary = "http://example.com:80/";
        let a = variant_storage_key("accept-encoding=gzip", primary);
        let b = variant_storage_key("accept-encoding=gzip", primary);
        let c = variant_storage_key("accept-encoding=br", primary);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.ends_with(primary));
    }
}
