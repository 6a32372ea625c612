use std::time::Duration;

/// Tunable knobs for the caching layer.
///
/// All fields are public; start from [`CacheConfig::default`] and override
/// what you need:
///
/// ```
/// use http_client_cache::CacheConfig;
///
/// let config = CacheConfig {
///     shared: false,
///     max_object_size_bytes: 1024 * 1024,
///     ..Default::default()
/// };
/// assert!(!config.shared);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Bodies larger than this are never stored. The response is still
    /// returned to the caller untouched.
    pub max_object_size_bytes: u64,
    /// Evaluate responses from the perspective of a shared (multi-user)
    /// cache: `private` is not storable, `s-maxage` and `proxy-revalidate`
    /// are honored, and `Authorization` requests need explicit permission.
    pub shared: bool,
    /// Bound on the in-memory storage backend.
    pub max_cache_entries: usize,
    /// Worker pool size for background revalidation. `0` disables
    /// stale-while-revalidate entirely; stale entries are then always
    /// revalidated on the caller's request.
    pub async_workers_max: usize,
    /// Permit heuristic freshness lifetimes for responses without explicit
    /// expiration information.
    pub heuristic_caching_enabled: bool,
    /// Fraction of `Date - Last-Modified` used as the heuristic lifetime.
    pub heuristic_coefficient: f32,
    /// Heuristic lifetime when `Last-Modified` is absent.
    pub heuristic_default_lifetime: Duration,
    /// Status codes heuristic freshness may be applied to.
    pub heuristic_status_codes: Vec<u16>,
    /// Permit caching of 303 responses carrying explicit freshness.
    pub allow_303_caching: bool,
    /// Permit caching of 307 responses carrying explicit freshness.
    pub allow_307_caching: bool,
    /// Permit caching of 206 responses carrying explicit freshness.
    pub allow_206_caching: bool,
    /// Store responses to HEAD requests as well as GET.
    pub cache_head_responses: bool,
    /// Bound on queued background revalidations; excess revalidations are
    /// skipped and picked up synchronously by the next request.
    pub revalidation_queue_size: usize,
    /// Back-off delay after the first consecutive revalidation failure.
    pub initial_expiry: Duration,
    /// Multiplier applied per additional consecutive failure.
    pub back_off_rate: u32,
    /// Ceiling on the computed back-off delay.
    pub max_expiry: Duration,
    /// Bound on the per-identifier failure counter map.
    pub max_failure_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_object_size_bytes: 8192,
            shared: true,
            max_cache_entries: 1000,
            async_workers_max: 1,
            heuristic_caching_enabled: false,
            heuristic_coefficient: 0.1,
            heuristic_default_lifetime: Duration::ZERO,
            heuristic_status_codes: vec![200, 203, 300, 301, 410],
            allow_303_caching: false,
            allow_307_caching: false,
            allow_206_caching: false,
            cache_head_responses: false,
            revalidation_queue_size: 100,
            initial_expiry: Duration::from_millis(6000),
            back_off_rate: 10,
            max_expiry: Duration::from_millis(86_400_000),
            max_failure_entries: 1000,
        }
    }
}
