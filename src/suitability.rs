use std::time::{Duration, SystemTime};

use http::{header, request::Parts};

use crate::cache_control::{CacheControl, MaxStale};
use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::freshness::FreshnessCalculator;

/// Verdict on whether a stored entry satisfies a request right now.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Suitability {
    /// Serve the entry as-is.
    FreshEnough,
    /// The entry exists but must be conditionally checked with the origin.
    Revalidate,
    /// The entry cannot satisfy this request; treat as a miss.
    CannotUse,
}

/// Decides whether a candidate entry can be used for a request, per
/// RFC 7234 §4.
#[derive(Debug, Clone)]
pub struct SuitabilityChecker {
    freshness: FreshnessCalculator,
    shared: bool,
}

impl SuitabilityChecker {
    /// A checker honoring the cache-wide configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self { freshness: FreshnessCalculator::new(config), shared: config.shared }
    }

    /// Classifies `entry` against the request.
    pub fn check(&self, parts: &Parts, entry: &CacheEntry, now: SystemTime) -> Suitability {
        if !entry.request_method().eq_ignore_ascii_case(parts.method.as_str()) {
            return Suitability::CannotUse;
        }
        let req_cc = CacheControl::from_header_map(&parts.headers);
        let pragma_no_cache = parts
            .headers
            .get(header::PRAGMA)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |v| v.to_ascii_lowercase().contains("no-cache"));
        if req_cc.no_cache || pragma_no_cache {
            return Suitability::CannotUse;
        }

        let current_age = self.freshness.current_age(entry, now);
        let lifetime = self.freshness.freshness_lifetime(entry);
        let fresh = lifetime > current_age;
        let remaining = lifetime.saturating_sub(current_age);
        let staleness = current_age.saturating_sub(lifetime);

        if let Some(min_fresh) = req_cc.min_fresh {
            if Duration::from_secs(min_fresh) > remaining {
                return Suitability::CannotUse;
            }
        }
        if let Some(max_age) = req_cc.max_age {
            if Duration::from_secs(max_age) < current_age {
                return Suitability::CannotUse;
            }
        }

        let res_cc = entry.cache_control();
        if !fresh {
            if res_cc.no_cache
                || res_cc.must_revalidate
                || (self.shared && res_cc.proxy_revalidate)
            {
                return Suitability::CannotUse;
            }
            let stale_permitted = match req_cc.max_stale {
                Some(MaxStale::Any) => true,
                Some(MaxStale::Limit(limit)) => staleness <= Duration::from_secs(limit),
                None => false,
            };
            if !entry.has_validator() && !stale_permitted {
                return Suitability::CannotUse;
            }
            if stale_permitted {
                return Suitability::FreshEnough;
            }
            return Suitability::Revalidate;
        }
        Suitability::FreshEnough
    }
}
