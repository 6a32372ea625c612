use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use http::response::Parts;

use crate::entry::{warn_code, CacheEntry};
use crate::error::Result;
use crate::resource::ResourceFactory;

// Since the stored body is reused, properties of the body never change on a
// 304 merge.
const EXCLUDED_FROM_MERGE: &[&str] = &["content-encoding", "content-length"];

/// Produces the replacement entry after a `304 Not Modified` revalidation.
pub struct CacheEntryUpdater {
    resources: Arc<dyn ResourceFactory>,
    seq: AtomicU64,
}

impl std::fmt::Debug for CacheEntryUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntryUpdater").finish_non_exhaustive()
    }
}

impl CacheEntryUpdater {
    /// An updater copying resources through `resources`.
    pub fn new(resources: Arc<dyn ResourceFactory>) -> Self {
        Self { resources, seq: AtomicU64::new(0) }
    }

    /// Merges a 304 response into `entry`, per RFC 7234 §4.3.4.
    ///
    /// The caller guarantees `response.status == 304`. Returns a new entry
    /// with merged headers, the revalidation round-trip timestamps, and the
    /// body copied under a fresh resource identifier; the old entry is left
    /// for the storage to replace and dispose.
    pub async fn updated_entry(
        &self,
        key: &str,
        entry: &CacheEntry,
        response: &Parts,
        request_sent: SystemTime,
        response_received: SystemTime,
    ) -> Result<CacheEntry> {
        debug_assert_eq!(response.status.as_u16(), 304);
        let response_date = response
            .headers
            .get(http::header::DATE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| httpdate::parse_http_date(v).ok());
        let merged = match (entry.date(), response_date) {
            // The origin answered with a 304 older than what we already
            // hold; its headers are not an update.
            (Some(entry_date), Some(resp_date)) if entry_date > resp_date => {
                entry.headers().to_vec()
            }
            _ => merge_headers(entry, response)?,
        };

        let resource = match entry.resource() {
            Some(resource) => {
                let id = format!("{key}#u{}", self.seq.fetch_add(1, Ordering::Relaxed));
                Some(self.resources.copy(&id, resource).await?)
            }
            None => None,
        };

        Ok(CacheEntry::new(
            request_sent,
            response_received,
            entry.status(),
            entry.reason().map(str::to_owned),
            merged,
            resource,
            entry.request_method(),
        )
        .with_variant_map(entry.variant_map().clone()))
    }
}

fn merge_headers(entry: &CacheEntry, response: &Parts) -> Result<Vec<(String, String)>> {
    let replaced: Vec<String> = response
        .headers
        .keys()
        .map(|name| name.as_str().to_ascii_lowercase())
        .filter(|name| !EXCLUDED_FROM_MERGE.contains(&name.as_str()))
        .collect();
    let mut merged: Vec<(String, String)> = entry
        .headers()
        .iter()
        .filter(|(name, _)| !replaced.contains(&name.to_ascii_lowercase()))
        .cloned()
        .collect();
    for (name, value) in response.headers.iter() {
        let lower = name.as_str().to_ascii_lowercase();
        if EXCLUDED_FROM_MERGE.contains(&lower.as_str()) {
            continue;
        }
        merged.push((name.as_str().to_string(), value.to_str()?.to_string()));
    }
    // A stored response selected for update drops its 1xx warnings and
    // keeps the 2xx ones (RFC 7234 §4.3.4).
    merged.retain(|(name, value)| {
        !(name.eq_ignore_ascii_case("warning")
            && warn_code(value).is_some_and(|code| (100..200).contains(&code)))
    });
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{HeapResourceFactory, Resource};
    use std::time::Duration;

    fn t0() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn entry(headers: &[(&str, &str)]) -> CacheEntry {
        let headers = headers.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect();
        CacheEntry::new(
            t0(),
            t0(),
            200,
            Some("OK".to_string()),
            headers,
            Some(Resource::from_bytes("hello")),
            "GET",
        )
    }

    fn not_modified(headers: &[(&str, &str)]) -> Parts {
        let mut builder = http::Response::builder().status(304);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn updater() -> CacheEntryUpdater {
        CacheEntryUpdater::new(Arc::new(HeapResourceFactory))
    }

    fn sorted_headers(entry: &CacheEntry) -> Vec<(String, String)> {
        let mut headers = entry.headers().to_vec();
        headers.sort();
        headers
    }

    #[tokio::test]
    async fn response_headers_replace_same_named_entry_headers() -> Result<()> {
        let stored = entry(&[
            ("etag", "\"v1\""),
            ("cache-control", "max-age=60"),
            ("x-kept", "yes"),
        ]);
        let response = not_modified(&[("etag", "\"v2\""), ("cache-control", "max-age=120")]);
        let sent = t0() + Duration::from_secs(100);
        let received = sent + Duration::from_secs(1);
        let updated = updater().updated_entry("k", &stored, &response, sent, received).await?;
        assert_eq!(updated.etag(), Some("\"v2\""));
        assert_eq!(updated.cache_control().max_age, Some(120));
        assert_eq!(updated.first_header("x-kept"), Some("yes"));
        assert_eq!(updated.request_instant(), sent);
        assert_eq!(updated.response_instant(), received);
        assert_eq!(updated.status(), 200);
        assert_eq!(updated.error_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn body_properties_are_never_replaced() -> Result<()> {
        let stored = entry(&[("content-length", "5"), ("content-encoding", "identity")]);
        let response = not_modified(&[("content-length", "0"), ("content-encoding", "gzip")]);
        let updated = updater().updated_entry("k", &stored, &response, t0(), t0()).await?;
        assert_eq!(updated.first_header("content-length"), Some("5"));
        assert_eq!(updated.first_header("content-encoding"), Some("identity"));
        Ok(())
    }

    #[tokio::test]
    async fn stale_304_keeps_entry_headers_verbatim() -> Result<()> {
        let newer = t0() + Duration::from_secs(100);
        let stored = entry(&[("date", &httpdate::fmt_http_date(newer)), ("etag", "\"v1\"")]);
        let response =
            not_modified(&[("date", &httpdate::fmt_http_date(t0())), ("etag", "\"v2\"")]);
        let updated = updater().updated_entry("k", &stored, &response, newer, newer).await?;
        assert_eq!(updated.etag(), Some("\"v1\""));
        Ok(())
    }

    #[tokio::test]
    async fn merge_strips_1xx_warnings_and_keeps_2xx() -> Result<()> {
        let stored = entry(&[
            ("warning", "110 host \"stale\""),
            ("warning", "299 host \"persistent\""),
        ]);
        let response = not_modified(&[("etag", "\"v2\"")]);
        let updated = updater().updated_entry("k", &stored, &response, t0(), t0()).await?;
        let warnings: Vec<&str> = updated.header_values("warning").collect();
        assert_eq!(warnings, vec!["299 host \"persistent\""]);
        Ok(())
    }

    #[tokio::test]
    async fn merging_the_same_304_twice_is_idempotent() -> Result<()> {
        let stored = entry(&[("etag", "\"v1\""), ("x-kept", "yes")]);
        let response = not_modified(&[("etag", "\"v2\""), ("x-new", "1")]);
        let updater = updater();
        let once = updater.updated_entry("k", &stored, &response, t0(), t0()).await?;
        let twice = updater.updated_entry("k", &once, &response, t0(), t0()).await?;
        assert_eq!(sorted_headers(&once), sorted_headers(&twice));
        Ok(())
    }

    #[tokio::test]
    async fn body_is_copied_under_a_new_identifier() -> Result<()> {
        let stored = entry(&[("etag", "\"v1\"")]);
        let response = not_modified(&[]);
        let updated = updater().updated_entry("k", &stored, &response, t0(), t0()).await?;
        let old = stored.resource().unwrap();
        let new = updated.resource().unwrap();
        assert!(!old.same_as(new));
        assert_eq!(new.read().await?, bytes::Bytes::from_static(b"hello"));
        Ok(())
    }
}
