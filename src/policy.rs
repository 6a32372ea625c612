use http::{header, request::Parts, HeaderMap, Method, Version};

use crate::cache_control::CacheControl;
use crate::config::CacheConfig;

// rfc7231 6.1
const STATUS_CACHEABLE_BY_DEFAULT: &[u16] = &[200, 203, 300, 301, 410];
const STATUS_CACHEABLE_WITH_EXPLICIT_FRESHNESS: &[u16] = &[302, 404, 405, 414, 501];

/// Gate deciding whether a request may be served from cache at all.
///
/// Requests that fail the gate bypass the cache entirely and flow straight
/// to the backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestPolicy;

impl RequestPolicy {
    /// `true` when the request is eligible for cache lookup: an HTTP/1.1
    /// `GET` carrying neither `Pragma` nor a `no-store`/`no-cache`
    /// cache directive.
    pub fn is_servable_from_cache(parts: &Parts) -> bool {
        if parts.method != Method::GET || parts.version != Version::HTTP_11 {
            return false;
        }
        if parts.headers.contains_key(header::PRAGMA) {
            return false;
        }
        let cc = CacheControl::from_header_map(&parts.headers);
        !cc.no_store && !cc.no_cache
    }
}

/// Decides whether a fresh backend response may be stored.
#[derive(Debug, Clone, Copy)]
pub struct ResponseCachingPolicy {
    shared: bool,
    max_object_size_bytes: u64,
    allow_206_caching: bool,
    allow_303_caching: bool,
    allow_307_caching: bool,
    cache_head_responses: bool,
}

impl ResponseCachingPolicy {
    /// A policy honoring the cache-wide configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            shared: config.shared,
            max_object_size_bytes: config.max_object_size_bytes,
            allow_206_caching: config.allow_206_caching,
            allow_303_caching: config.allow_303_caching,
            allow_307_caching: config.allow_307_caching,
            cache_head_responses: config.cache_head_responses,
        }
    }

    /// `true` when the response to `method` may be stored.
    pub fn is_response_cacheable(
        &self,
        method: &Method,
        request_headers: &HeaderMap,
        status: u16,
        response_headers: &HeaderMap,
    ) -> bool {
        let method_ok = *method == Method::GET
            || (*method == Method::HEAD && self.cache_head_responses);
        if !method_ok {
            return false;
        }

        let req_cc = CacheControl::from_header_map(request_headers);
        let res_cc = CacheControl::from_header_map(response_headers);
        // The "no-store" directive on either side forbids storing any part
        // of the exchange.
        if req_cc.no_store || res_cc.no_store {
            return false;
        }
        if self.shared && res_cc.private {
            return false;
        }
        // A shared cache may only store an authenticated exchange when the
        // response explicitly allows it.
        if self.shared
            && request_headers.contains_key(header::AUTHORIZATION)
            && !(res_cc.s_maxage.is_some() || res_cc.must_revalidate || res_cc.public)
        {
            return false;
        }
        // "Vary: *" always fails to match.
        let vary_star = response_headers
            .get_all(header::VARY)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|name| name.trim() == "*");
        if vary_star {
            return false;
        }
        if let Some(len) = response_headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            if len > self.max_object_size_bytes {
                return false;
            }
        }

        let explicit_freshness = response_headers.contains_key(header::EXPIRES)
            || res_cc.max_age.is_some()
            || (self.shared && res_cc.s_maxage.is_some());
        match status {
            _ if STATUS_CACHEABLE_BY_DEFAULT.contains(&status) => true,
            206 => self.allow_206_caching && explicit_freshness,
            303 => self.allow_303_caching && explicit_freshness,
            307 => self.allow_307_caching && explicit_freshness,
            _ if STATUS_CACHEABLE_WITH_EXPLICIT_FRESHNESS.contains(&status) => explicit_freshness,
            _ => false,
        }
    }
}
