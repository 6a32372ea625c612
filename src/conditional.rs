use bytes::Bytes;
use http::{header, request::Parts, HeaderValue, Request};

use crate::entry::CacheEntry;
use crate::error::Result;

/// Builds conditional revalidation requests from stored entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConditionalRequestBuilder;

impl ConditionalRequestBuilder {
    /// Clones the request and attaches the stored validator:
    /// `If-None-Match` when the entry carries an `ETag`, otherwise
    /// `If-Modified-Since` when it carries `Last-Modified`.
    pub fn conditional_request(&self, parts: &Parts, entry: &CacheEntry) -> Result<Request<Bytes>> {
        let mut request = clone_request(parts)?;
        if let Some(etag) = entry.etag() {
            request
                .headers_mut()
                .insert(header::IF_NONE_MATCH, HeaderValue::from_str(etag)?);
        } else if let Some(last_modified) = entry.first_header("last-modified") {
            request
                .headers_mut()
                .insert(header::IF_MODIFIED_SINCE, HeaderValue::from_str(last_modified)?);
        }
        Ok(request)
    }

    /// A conditional request carrying the entity tags of every known
    /// variant, so the origin can pick with a 304.
    pub fn variant_negotiation_request(
        &self,
        parts: &Parts,
        variants: &[CacheEntry],
    ) -> Result<Request<Bytes>> {
        let mut request = clone_request(parts)?;
        let mut etags: Vec<&str> = variants.iter().filter_map(|e| e.etag()).collect();
        etags.dedup();
        if !etags.is_empty() {
            request
                .headers_mut()
                .insert(header::IF_NONE_MATCH, HeaderValue::from_str(&etags.join(", "))?);
        }
        Ok(request)
    }
}

fn clone_request(parts: &Parts) -> Result<Request<Bytes>> {
    let mut request = Request::builder()
        .method(parts.method.clone())
        .uri(parts.uri.clone())
        .version(parts.version)
        .body(Bytes::new())?;
    *request.headers_mut() = parts.headers.clone();
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use std::time::SystemTime;

    fn parts() -> Parts {
        Request::builder()
            .method(http::Method::GET)
            .uri("http://example.com/a")
            .header("accept", "text/html")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    fn entry(headers: &[(&str, &str)]) -> CacheEntry {
        let now = SystemTime::now();
        let headers = headers.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect();
        CacheEntry::new(now, now, 200, None, headers, Some(Resource::from_bytes("x")), "GET")
    }

    #[test]
    fn etag_wins_over_last_modified() {
        let e = entry(&[("etag", "\"v1\""), ("last-modified", "Tue, 15 Nov 1994 12:45:26 GMT")]);
        let req = ConditionalRequestBuilder.conditional_request(&parts(), &e).unwrap();
        assert_eq!(req.headers().get(header::IF_NONE_MATCH).unwrap(), "\"v1\"");
        assert!(req.headers().get(header::IF_MODIFIED_SINCE).is_none());
        assert_eq!(req.headers().get("accept").unwrap(), "text/html");
    }

    #[test]
    fn last_modified_is_the_fallback_validator() {
        let e = entry(&[("last-modified", "Tue, 15 Nov 1994 12:45:26 GMT")]);
        let req = ConditionalRequestBuilder.conditional_request(&parts(), &e).unwrap();
        assert_eq!(
            req.headers().get(header::IF_MODIFIED_SINCE).unwrap(),
            "Tue, 15 Nov 1994 12:45:26 GMT"
        );
    }

    #[test]
    fn variant_negotiation_joins_all_etags() {
        let variants =
            vec![entry(&[("etag", "\"a\"")]), entry(&[]), entry(&[("etag", "\"b\"")])];
        let req =
            ConditionalRequestBuilder.variant_negotiation_request(&parts(), &variants).unwrap();
        assert_eq!(req.headers().get(header::IF_NONE_MATCH).unwrap(), "\"a\", \"b\"");
    }
}
