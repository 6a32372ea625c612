use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::request::Parts;
use http::{header, HeaderName, HeaderValue, Request, Response, StatusCode, Version};
use tracing::{debug, warn};
use url::Url;

use crate::cache_control::CacheControl;
use crate::conditional::ConditionalRequestBuilder;
use crate::config::CacheConfig;
use crate::entry::{warn_code, CacheEntry};
use crate::error::{CacheError, Result};
use crate::failure::FailureCache;
use crate::freshness::FreshnessCalculator;
use crate::invalidate::CacheInvalidator;
use crate::keys::{primary_key, request_url, variant_key, variant_storage_key};
use crate::policy::{RequestPolicy, ResponseCachingPolicy};
use crate::resource::{ByteStream, ResourceFactory};
use crate::storage::Storage;
use crate::suitability::{Suitability, SuitabilityChecker};
use crate::update::CacheEntryUpdater;
use crate::validator::{AsyncValidator, BackoffScheduler};
use crate::{HitOrMiss, XCACHE, XCACHELOOKUP};

/// The origin-facing transport the cache sits in front of.
///
/// The backend is expected to honor conditional headers and answer with
/// `304 Not Modified` where appropriate.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Performs the request against the origin.
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>>;
}

#[async_trait]
impl<T: Backend + ?Sized> Backend for Arc<T> {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        T::execute(self, request).await
    }
}

// How a response reconstructed from a stored entry is being served.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ServeMode {
    Fresh,
    StaleWhileRevalidate,
    StaleAfterError,
}

/// The caching layer itself: looks up, serves, revalidates, stores, and
/// invalidates entries around a [`Backend`].
///
/// Cloning is cheap and clones share all cache state.
pub struct HttpCache<B> {
    shared: Arc<CacheShared<B>>,
}

impl<B> Clone for HttpCache<B> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<B> std::fmt::Debug for HttpCache<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCache").field("options", &self.shared.options).finish_non_exhaustive()
    }
}

struct CacheShared<B> {
    backend: B,
    storage: Arc<dyn Storage>,
    resources: Arc<dyn ResourceFactory>,
    options: CacheConfig,
    freshness: FreshnessCalculator,
    response_policy: ResponseCachingPolicy,
    suitability: SuitabilityChecker,
    conditional: ConditionalRequestBuilder,
    updater: CacheEntryUpdater,
    invalidator: CacheInvalidator,
    validator: Option<AsyncValidator>,
    failures: FailureCache,
    resource_seq: AtomicU64,
}

impl<B: Backend> HttpCache<B> {
    /// Wires a cache around `backend` with the given storage, resource
    /// factory, and options.
    pub fn new(
        backend: B,
        storage: Arc<dyn Storage>,
        resources: Arc<dyn ResourceFactory>,
        options: CacheConfig,
    ) -> Self {
        let validator = (options.async_workers_max > 0).then(|| {
            AsyncValidator::new(BackoffScheduler::new(
                options.async_workers_max,
                options.revalidation_queue_size,
                options.initial_expiry,
                options.back_off_rate,
                options.max_expiry,
            ))
        });
        let shared = CacheShared {
            freshness: FreshnessCalculator::new(&options),
            response_policy: ResponseCachingPolicy::new(&options),
            suitability: SuitabilityChecker::new(&options),
            conditional: ConditionalRequestBuilder,
            updater: CacheEntryUpdater::new(Arc::clone(&resources)),
            invalidator: CacheInvalidator::new(Arc::clone(&storage)),
            validator,
            failures: FailureCache::new(options.max_failure_entries),
            resource_seq: AtomicU64::new(0),
            backend,
            storage,
            resources,
            options,
        };
        Self { shared: Arc::new(shared) }
    }

    /// Stops background revalidation: queued-but-delayed tasks are
    /// cancelled, running ones complete.
    pub fn shutdown(&self) {
        if let Some(validator) = &self.shared.validator {
            validator.shutdown();
        }
    }

    /// Serves the request from cache when HTTP semantics allow it, falling
    /// back to the backend otherwise.
    ///
    /// Responses served from the store carry the origin's headers plus
    /// `Age`, diagnostic `x-cache`/`x-cache-lookup` headers, and `Warning`
    /// headers where RFC 7234 asks for them.
    pub async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let (parts, body) = request.into_parts();
        let url = match request_url(&parts.uri) {
            Ok(url) => url,
            Err(_) => return self.forward(&parts, body, None).await,
        };
        if !RequestPolicy::is_servable_from_cache(&parts) {
            debug!(uri = %parts.uri, "request bypasses the cache");
            return self.forward(&parts, body, Some(&url)).await;
        }

        let key = primary_key(&url);
        let root = match self.shared.storage.get(&key).await {
            Ok(root) => root,
            Err(e) => {
                warn!(key = %key, error = %e, "cache lookup failed, treating as miss");
                None
            }
        };
        let Some(root) = root else {
            return self.fetch_and_store(&parts, body, &url, &key, HitOrMiss::MISS).await;
        };

        let (entry, entry_key) = if root.has_variants() {
            let request_variant = variant_key(&root.vary_names(), &parts.headers);
            let selected = match root.variant_map().get(&request_variant) {
                Some(variant_storage) => {
                    self.shared.storage.get(variant_storage).await.ok().flatten().map(|entry| {
                        (entry, variant_storage.clone())
                    })
                }
                None => None,
            };
            match selected {
                Some(selected) => selected,
                None => return self.negotiate_variants(&parts, body, &url, &key, &root).await,
            }
        } else {
            (root, key.clone())
        };

        match self.shared.suitability.check(&parts, &entry, SystemTime::now()) {
            Suitability::FreshEnough => {
                debug!(key = %entry_key, "cache hit");
                let response = self.reconstruct(&entry, &url, ServeMode::Fresh).await?;
                Ok(stamp(response, HitOrMiss::HIT, HitOrMiss::HIT))
            }
            Suitability::CannotUse => {
                debug!(key = %entry_key, "stored entry cannot satisfy the request");
                self.fetch_and_store(&parts, body, &url, &key, HitOrMiss::HIT).await
            }
            Suitability::Revalidate => {
                if let Some(response) = self.try_stale_while_revalidate(&parts, &entry, &entry_key, &key, &url).await? {
                    return Ok(response);
                }
                self.revalidate_sync(&parts, &entry, &entry_key, &key, &url).await
            }
        }
    }

    // Serves the stale entry immediately and schedules a deduplicated
    // background revalidation, when the entry's stale-while-revalidate
    // window still covers its staleness.
    async fn try_stale_while_revalidate(
        &self,
        parts: &Parts,
        entry: &CacheEntry,
        entry_key: &str,
        primary: &str,
        url: &Url,
    ) -> Result<Option<Response<Bytes>>> {
        let Some(validator) = &self.shared.validator else {
            return Ok(None);
        };
        let Some(window) = entry.cache_control().stale_while_revalidate else {
            return Ok(None);
        };
        let staleness = self.shared.freshness.staleness(entry, SystemTime::now());
        if staleness > Duration::from_secs(window) {
            return Ok(None);
        }
        let response = self.reconstruct(entry, url, ServeMode::StaleWhileRevalidate).await?;
        let Ok(bg_parts) = clone_parts(parts) else {
            return Ok(Some(stamp(response, HitOrMiss::HIT, HitOrMiss::HIT)));
        };
        // The failure cache remembers consecutive failures even when the
        // entry itself was replaced in the meantime.
        let error_count =
            entry.error_count().max(self.shared.failures.error_count(entry_key));
        let cache = self.clone();
        let bg_entry = entry.clone();
        let bg_entry_key = entry_key.to_string();
        let bg_primary = primary.to_string();
        validator.revalidate(entry_key, error_count, async move {
            cache.background_revalidate(bg_parts, bg_entry, bg_entry_key, bg_primary).await;
        });
        Ok(Some(stamp(response, HitOrMiss::HIT, HitOrMiss::HIT)))
    }

    // Pure pass-through for requests the cache must not serve. Unsafe
    // methods still invalidate affected entries on the way back.
    async fn forward(
        &self,
        parts: &Parts,
        body: Bytes,
        url: Option<&Url>,
    ) -> Result<Response<Bytes>> {
        let request = rebuild_request(parts, body)?;
        let response = self.shared.backend.execute(request).await?;
        if let Some(url) = url {
            if !parts.method.is_safe() {
                self.shared.invalidator.invalidate(url, Some(response.headers())).await;
            }
        }
        Ok(stamp(response, HitOrMiss::MISS, HitOrMiss::MISS))
    }

    // Full fetch; stores the response when the caching policy accepts it.
    async fn fetch_and_store(
        &self,
        parts: &Parts,
        body: Bytes,
        url: &Url,
        key: &str,
        lookup: HitOrMiss,
    ) -> Result<Response<Bytes>> {
        let request = rebuild_request(parts, body)?;
        let request_sent = SystemTime::now();
        let response = self.shared.backend.execute(request).await?;
        let response_received = SystemTime::now();
        if !parts.method.is_safe() {
            self.shared.invalidator.invalidate(url, Some(response.headers())).await;
            return Ok(stamp(response, HitOrMiss::MISS, lookup));
        }
        let response =
            self.maybe_store(parts, key, response, request_sent, response_received).await;
        Ok(stamp(response, HitOrMiss::MISS, lookup))
    }

    // Stores a cacheable response and hands the original back. Failures
    // here never reach the caller; the cache degrades to pass-through.
    async fn maybe_store(
        &self,
        parts: &Parts,
        key: &str,
        response: Response<Bytes>,
        request_sent: SystemTime,
        response_received: SystemTime,
    ) -> Response<Bytes> {
        let (resp_parts, body) = response.into_parts();
        let status = resp_parts.status.as_u16();
        if !self.shared.response_policy.is_response_cacheable(
            &parts.method,
            &parts.headers,
            status,
            &resp_parts.headers,
        ) {
            debug!(key, status, "response not cacheable");
            return Response::from_parts(resp_parts, body);
        }
        match self
            .build_entry(parts, key, &resp_parts, body.clone(), request_sent, response_received)
            .await
        {
            Ok(entry) => self.store_entry(parts, key, entry).await,
            Err(CacheError::ResourceSizeExceeded { size, limit }) => {
                debug!(key, size, limit, "response body too large to store");
            }
            Err(e) => warn!(key, error = %e, "failed to build cache entry"),
        }
        Response::from_parts(resp_parts, body)
    }

    async fn build_entry(
        &self,
        parts: &Parts,
        key: &str,
        resp_parts: &http::response::Parts,
        body: Bytes,
        request_sent: SystemTime,
        response_received: SystemTime,
    ) -> Result<CacheEntry> {
        let id = format!("{key}#{}", self.shared.resource_seq.fetch_add(1, Ordering::Relaxed));
        let stream: ByteStream = futures::stream::iter([Ok(body)]).boxed();
        let resource = self
            .shared
            .resources
            .generate(&id, stream, self.shared.options.max_object_size_bytes)
            .await?;
        let mut headers = Vec::with_capacity(resp_parts.headers.len());
        for (name, value) in resp_parts.headers.iter() {
            headers.push((name.as_str().to_string(), value.to_str()?.to_string()));
        }
        Ok(CacheEntry::new(
            request_sent,
            response_received,
            resp_parts.status.as_u16(),
            resp_parts.status.canonical_reason().map(str::to_owned),
            headers,
            Some(resource),
            parts.method.as_str(),
        ))
    }

    // Writes an entry, splitting Vary responses into a root entry plus a
    // variant sub-entry.
    async fn store_entry(&self, parts: &Parts, key: &str, entry: CacheEntry) {
        let vary_names = entry.vary_names();
        if vary_names.is_empty() {
            if let Err(e) = self.shared.storage.put(key, entry).await {
                warn!(key, error = %e, "cache write failed");
            }
            return;
        }
        let request_variant = variant_key(&vary_names, &parts.headers);
        let variant_storage = variant_storage_key(&request_variant, key);
        let root_template = CacheEntry::new(
            entry.request_instant(),
            entry.response_instant(),
            entry.status(),
            entry.reason().map(str::to_owned),
            entry.headers().to_vec(),
            None,
            entry.request_method(),
        );
        if let Err(e) = self.shared.storage.put(&variant_storage, entry).await {
            warn!(key = %variant_storage, error = %e, "variant write failed");
            return;
        }
        let result = self
            .shared
            .storage
            .update(key, &|old| {
                // Merge into whatever variant map a racing writer left.
                let mut map =
                    old.map(|root| root.variant_map().clone()).unwrap_or_default();
                map.insert(request_variant.clone(), variant_storage.clone());
                Some(root_template.clone().with_variant_map(map))
            })
            .await;
        if let Err(e) = result {
            warn!(key, error = %e, "variant root update failed");
        }
    }

    // Synchronous conditional revalidation on the caller's request.
    async fn revalidate_sync(
        &self,
        parts: &Parts,
        entry: &CacheEntry,
        entry_key: &str,
        primary: &str,
        url: &Url,
    ) -> Result<Response<Bytes>> {
        let request = self.shared.conditional.conditional_request(parts, entry)?;
        let request_sent = SystemTime::now();
        match self.shared.backend.execute(request).await {
            Ok(response) => {
                let response_received = SystemTime::now();
                let status = response.status();
                if status == StatusCode::NOT_MODIFIED {
                    let (resp_parts, _) = response.into_parts();
                    let updated = self
                        .shared
                        .updater
                        .updated_entry(entry_key, entry, &resp_parts, request_sent, response_received)
                        .await?;
                    self.replace_entry(entry_key, &updated).await;
                    self.shared.failures.reset(entry_key);
                    let reconstructed =
                        self.reconstruct(&updated, url, ServeMode::Fresh).await?;
                    Ok(stamp(reconstructed, HitOrMiss::HIT, HitOrMiss::HIT))
                } else if status.is_success() {
                    debug!(key = entry_key, "revalidation returned a full response");
                    self.shared.failures.reset(entry_key);
                    let response = self
                        .maybe_store(parts, primary, response, request_sent, response_received)
                        .await;
                    Ok(stamp(response, HitOrMiss::MISS, HitOrMiss::HIT))
                } else if status.is_server_error()
                    && self.stale_if_error_permits(parts, entry, SystemTime::now())
                {
                    debug!(key = entry_key, "serving stale after origin error");
                    let stale = self.reconstruct(entry, url, ServeMode::StaleAfterError).await?;
                    Ok(stamp(stale, HitOrMiss::HIT, HitOrMiss::HIT))
                } else {
                    Ok(stamp(response, HitOrMiss::MISS, HitOrMiss::HIT))
                }
            }
            Err(e) => {
                if self.stale_if_error_permits(parts, entry, SystemTime::now()) {
                    warn!(key = entry_key, error = %e, "origin unreachable, serving stale");
                    let stale = self.reconstruct(entry, url, ServeMode::StaleAfterError).await?;
                    Ok(stamp(stale, HitOrMiss::HIT, HitOrMiss::HIT))
                } else {
                    Err(e)
                }
            }
        }
    }

    // The background half of stale-while-revalidate. Outcomes only touch
    // the store and the failure counters; nobody is waiting on a response.
    async fn background_revalidate(
        &self,
        parts: Parts,
        entry: CacheEntry,
        entry_key: String,
        primary: String,
    ) {
        let request = match self.shared.conditional.conditional_request(&parts, &entry) {
            Ok(request) => request,
            Err(e) => {
                warn!(key = %entry_key, error = %e, "could not build revalidation request");
                self.record_revalidation_failure(&entry_key).await;
                return;
            }
        };
        let request_sent = SystemTime::now();
        match self.shared.backend.execute(request).await {
            Ok(response) if response.status() == StatusCode::NOT_MODIFIED => {
                let response_received = SystemTime::now();
                let (resp_parts, _) = response.into_parts();
                match self
                    .shared
                    .updater
                    .updated_entry(&entry_key, &entry, &resp_parts, request_sent, response_received)
                    .await
                {
                    Ok(updated) => {
                        self.replace_entry(&entry_key, &updated).await;
                        self.shared.failures.reset(&entry_key);
                        debug!(key = %entry_key, "background revalidation refreshed the entry");
                    }
                    Err(e) => {
                        warn!(key = %entry_key, error = %e, "304 merge failed");
                        self.record_revalidation_failure(&entry_key).await;
                    }
                }
            }
            Ok(response) if response.status().is_success() => {
                let response_received = SystemTime::now();
                self.maybe_store(&parts, &primary, response, request_sent, response_received)
                    .await;
                self.shared.failures.reset(&entry_key);
                debug!(key = %entry_key, "background revalidation stored a new response");
            }
            Ok(response) => {
                warn!(
                    key = %entry_key,
                    status = response.status().as_u16(),
                    "background revalidation got an unexpected status"
                );
                self.record_revalidation_failure(&entry_key).await;
            }
            Err(e) => {
                warn!(key = %entry_key, error = %e, "background revalidation failed");
                self.record_revalidation_failure(&entry_key).await;
            }
        }
    }

    async fn replace_entry(&self, key: &str, updated: &CacheEntry) {
        let result = self.shared.storage.update(key, &|_| Some(updated.clone())).await;
        if let Err(e) = result {
            warn!(key, error = %e, "cache update failed");
        }
    }

    async fn record_revalidation_failure(&self, key: &str) {
        self.shared.failures.increment(key);
        let result = self
            .shared
            .storage
            .update(key, &|old| {
                old.map(|e| e.clone().with_error_count(e.error_count().saturating_add(1)))
            })
            .await;
        if let Err(e) = result {
            warn!(key, error = %e, "failed to record revalidation failure");
        }
    }

    // A request whose variant is not stored yet: offer the origin every
    // known variant's validator and let a 304 pick the winner.
    async fn negotiate_variants(
        &self,
        parts: &Parts,
        body: Bytes,
        url: &Url,
        primary: &str,
        root: &CacheEntry,
    ) -> Result<Response<Bytes>> {
        let mut variants: Vec<(String, CacheEntry)> = Vec::new();
        for variant_storage in root.variant_map().values() {
            if let Ok(Some(entry)) = self.shared.storage.get(variant_storage).await {
                if entry.etag().is_some() {
                    variants.push((variant_storage.clone(), entry));
                }
            }
        }
        if variants.is_empty() {
            return self.fetch_and_store(parts, body, url, primary, HitOrMiss::HIT).await;
        }
        let entries: Vec<CacheEntry> = variants.iter().map(|(_, e)| e.clone()).collect();
        let request = self.shared.conditional.variant_negotiation_request(parts, &entries)?;
        let request_sent = SystemTime::now();
        let response = self.shared.backend.execute(request).await?;
        let response_received = SystemTime::now();
        if response.status() == StatusCode::NOT_MODIFIED {
            let (resp_parts, _) = response.into_parts();
            let winner = resp_parts
                .headers
                .get(header::ETAG)
                .and_then(|v| v.to_str().ok())
                .and_then(|etag| {
                    variants.iter().find(|(_, entry)| entry.etag() == Some(etag))
                });
            let Some((variant_storage, variant)) = winner else {
                // The origin picked a variant we do not hold; fetch it.
                return self.fetch_and_store(parts, body, url, primary, HitOrMiss::HIT).await;
            };
            let updated = self
                .shared
                .updater
                .updated_entry(variant_storage, variant, &resp_parts, request_sent, response_received)
                .await?;
            self.replace_entry(variant_storage, &updated).await;
            // Remember this request's selecting headers as a path to the
            // winning variant.
            let request_variant = variant_key(&root.vary_names(), &parts.headers);
            let variant_storage = variant_storage.clone();
            let map_update = self
                .shared
                .storage
                .update(primary, &|old| {
                    old.map(|root| {
                        let mut map = root.variant_map().clone();
                        map.insert(request_variant.clone(), variant_storage.clone());
                        root.clone().with_variant_map(map)
                    })
                })
                .await;
            if let Err(e) = map_update {
                warn!(key = primary, error = %e, "variant map update failed");
            }
            let reconstructed = self.reconstruct(&updated, url, ServeMode::Fresh).await?;
            Ok(stamp(reconstructed, HitOrMiss::HIT, HitOrMiss::HIT))
        } else if response.status().is_success() {
            let response =
                self.maybe_store(parts, primary, response, request_sent, response_received).await;
            Ok(stamp(response, HitOrMiss::MISS, HitOrMiss::HIT))
        } else {
            Ok(stamp(response, HitOrMiss::MISS, HitOrMiss::HIT))
        }
    }

    fn stale_if_error_permits(&self, parts: &Parts, entry: &CacheEntry, now: SystemTime) -> bool {
        let request_window = CacheControl::from_header_map(&parts.headers).stale_if_error;
        let window = match entry.cache_control().stale_if_error.or(request_window) {
            Some(window) => window,
            None => return false,
        };
        self.shared.freshness.staleness(entry, now) <= Duration::from_secs(window)
    }

    // Builds the outgoing response from a stored entry, per RFC 7234
    // §4.2.4/§5.5.
    async fn reconstruct(
        &self,
        entry: &CacheEntry,
        url: &Url,
        mode: ServeMode,
    ) -> Result<Response<Bytes>> {
        let body = match entry.resource() {
            Some(resource) => resource.read().await?,
            None => Bytes::new(),
        };
        let mut response = Response::builder()
            .status(StatusCode::from_u16(entry.status())?)
            .version(Version::HTTP_11)
            .body(body)?;
        let now = SystemTime::now();
        let headers = response.headers_mut();
        for (name, value) in entry.headers() {
            // 1xx warnings belong to a previous transaction; drop them when
            // the stored response is selected for reuse.
            if name.eq_ignore_ascii_case("warning")
                && warn_code(value).is_some_and(|code| (100..200).contains(&code))
            {
                continue;
            }
            headers.append(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }
        let age_secs = self.shared.freshness.current_age(entry, now).as_secs().min(i32::MAX as u64);
        headers.insert(header::AGE, HeaderValue::from_str(&age_secs.to_string())?);
        if !headers.contains_key(header::CONTENT_LENGTH)
            && !headers.contains_key(header::TRANSFER_ENCODING)
        {
            let len = entry.resource().map_or(0, |resource| resource.len());
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from_str(&len.to_string())?);
        }
        // A cache SHOULD warn when it heuristically chose a lifetime over a
        // day and the response is already older than that.
        let day = Duration::from_secs(24 * 3600);
        if self.shared.freshness.uses_heuristic(entry)
            && self.shared.freshness.freshness_lifetime(entry) > day
            && self.shared.freshness.current_age(entry, now) > day
        {
            headers.append("warning", warning_value(url, 113, "Heuristic expiration")?);
        }
        match mode {
            ServeMode::Fresh => {}
            ServeMode::StaleWhileRevalidate => {
                headers.append("warning", warning_value(url, 110, "Response is stale")?);
            }
            ServeMode::StaleAfterError => {
                headers.append("warning", warning_value(url, 111, "Revalidation failed")?);
            }
        }
        Ok(response)
    }
}

// warning-value = warn-code SP warn-agent SP warn-text [SP warn-date]
fn warning_value(url: &Url, code: u16, message: &str) -> Result<HeaderValue> {
    let host = url.host_str().unwrap_or("-");
    let value = format!(
        "{} {} {:?} \"{}\"",
        code,
        host,
        message,
        httpdate::fmt_http_date(SystemTime::now())
    );
    Ok(HeaderValue::from_str(&value)?)
}

fn rebuild_request(parts: &Parts, body: Bytes) -> Result<Request<Bytes>> {
    let mut request = Request::builder()
        .method(parts.method.clone())
        .uri(parts.uri.clone())
        .version(parts.version)
        .body(body)?;
    *request.headers_mut() = parts.headers.clone();
    Ok(request)
}

fn clone_parts(parts: &Parts) -> Result<Parts> {
    let request = Request::builder()
        .method(parts.method.clone())
        .uri(parts.uri.clone())
        .version(parts.version)
        .body(())?;
    let mut cloned = request.into_parts().0;
    cloned.headers = parts.headers.clone();
    Ok(cloned)
}

fn stamp(mut response: Response<Bytes>, cache: HitOrMiss, lookup: HitOrMiss) -> Response<Bytes> {
    let value = |hit: HitOrMiss| match hit {
        HitOrMiss::HIT => HeaderValue::from_static("HIT"),
        HitOrMiss::MISS => HeaderValue::from_static("MISS"),
    };
    response.headers_mut().insert(XCACHE, value(cache));
    response.headers_mut().insert(XCACHELOOKUP, value(lookup));
    response
}
