use std::collections::HashMap;
use std::time::SystemTime;

use crate::cache_control::CacheControl;
use crate::resource::Resource;

// Hop-by-hop headers never make it into a stored entry; `Date` stays because
// age arithmetic needs it.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// A stored pairing of request metadata, response headers, and a resource.
///
/// Entries are immutable once built; every change goes through a
/// copy-on-write rebuild and an atomic storage replacement.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    request_instant: SystemTime,
    response_instant: SystemTime,
    status: u16,
    reason: Option<String>,
    headers: Vec<(String, String)>,
    resource: Option<Resource>,
    variant_map: HashMap<String, String>,
    request_method: String,
    error_count: u32,
}

impl CacheEntry {
    /// Builds an entry from a request/response exchange.
    ///
    /// `request_instant`/`response_instant` are the wall-clock instants the
    /// originating request was sent and its response received; the response
    /// instant is clamped to never precede the request instant. Hop-by-hop
    /// headers are dropped from `headers`.
    pub fn new(
        request_instant: SystemTime,
        response_instant: SystemTime,
        status: u16,
        reason: Option<String>,
        headers: Vec<(String, String)>,
        resource: Option<Resource>,
        request_method: impl Into<String>,
    ) -> Self {
        let connection_named: Vec<String> = headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("connection"))
            .flat_map(|(_, value)| value.split(','))
            .map(|name| name.trim().to_ascii_lowercase())
            .collect();
        let headers = headers
            .into_iter()
            .filter(|(name, _)| {
                let lower = name.to_ascii_lowercase();
                !HOP_BY_HOP_HEADERS.contains(&lower.as_str()) && !connection_named.contains(&lower)
            })
            .collect();
        Self {
            request_instant,
            response_instant: response_instant.max(request_instant),
            status,
            reason,
            headers,
            resource,
            variant_map: HashMap::new(),
            request_method: request_method.into(),
            error_count: 0,
        }
    }

    /// Replaces the variant map, turning the entry into a variant root.
    #[must_use]
    pub fn with_variant_map(mut self, variant_map: HashMap<String, String>) -> Self {
        self.variant_map = variant_map;
        self
    }

    /// Replaces the consecutive-failure counter.
    #[must_use]
    pub fn with_error_count(mut self, error_count: u32) -> Self {
        self.error_count = error_count;
        self
    }

    /// Instant the originating request was sent.
    pub fn request_instant(&self) -> SystemTime {
        self.request_instant
    }

    /// Instant the originating response was received.
    pub fn response_instant(&self) -> SystemTime {
        self.response_instant
    }

    /// Stored response status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Stored reason phrase, if any.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// The stored response headers, in receipt order, duplicates preserved.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The body content; `None` for variant-root stubs.
    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    /// Variant key to storage key mapping; empty unless the stored response
    /// carried `Vary`.
    pub fn variant_map(&self) -> &HashMap<String, String> {
        &self.variant_map
    }

    /// `true` when this entry is a variant root.
    pub fn has_variants(&self) -> bool {
        !self.variant_map.is_empty()
    }

    /// Method of the originating request.
    pub fn request_method(&self) -> &str {
        &self.request_method
    }

    /// Consecutive background revalidation failures.
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// All values of a header, case-insensitive on the name.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First value of a header, case-insensitive on the name.
    pub fn first_header<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        self.header_values(name).next()
    }

    /// Stored entity tag.
    pub fn etag(&self) -> Option<&str> {
        self.first_header("etag")
    }

    /// Parsed `Date` header.
    pub fn date(&self) -> Option<SystemTime> {
        self.first_header("date").and_then(|v| httpdate::parse_http_date(v).ok())
    }

    /// Parsed `Expires` header; unparseable dates yield `None`.
    pub fn expires(&self) -> Option<SystemTime> {
        self.first_header("expires").and_then(|v| httpdate::parse_http_date(v).ok())
    }

    /// Parsed `Last-Modified` header.
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.first_header("last-modified").and_then(|v| httpdate::parse_http_date(v).ok())
    }

    /// Parsed `Age` header in seconds.
    pub fn age_header(&self) -> Option<u64> {
        self.first_header("age").and_then(|v| v.trim().parse().ok())
    }

    /// Parsed `Content-Length` header.
    pub fn content_length(&self) -> Option<u64> {
        self.first_header("content-length").and_then(|v| v.trim().parse().ok())
    }

    /// Lowercased header names selected by `Vary`, sorted and deduplicated.
    pub fn vary_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .header_values("vary")
            .flat_map(|v| v.split(','))
            .map(|name| name.trim().to_ascii_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Parsed `Cache-Control` directives of the stored response.
    pub fn cache_control(&self) -> CacheControl {
        CacheControl::from_header_list(&self.headers)
    }

    /// Whether the stored response carries a validator usable for
    /// conditional revalidation.
    pub fn has_validator(&self) -> bool {
        self.etag().is_some() || self.first_header("last-modified").is_some()
    }
}

/// Extracts the warn-code of a `Warning` header value, per RFC 7234 §5.5:
/// the first token, exactly three ASCII digits.
pub(crate) fn warn_code(value: &str) -> Option<u16> {
    let token = value.trim_start().split_whitespace().next()?;
    if token.len() == 3 && token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}
