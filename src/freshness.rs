use std::time::{Duration, SystemTime};

use crate::config::CacheConfig;
use crate::entry::CacheEntry;

/// Current age, freshness lifetime, and staleness arithmetic per
/// RFC 7234 §4.2.
#[derive(Debug, Clone)]
pub struct FreshnessCalculator {
    shared: bool,
    heuristic_enabled: bool,
    heuristic_coefficient: f32,
    heuristic_default_lifetime: Duration,
    heuristic_status_codes: Vec<u16>,
}

impl FreshnessCalculator {
    /// A calculator honoring the cache-wide configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            shared: config.shared,
            heuristic_enabled: config.heuristic_caching_enabled,
            heuristic_coefficient: config.heuristic_coefficient,
            heuristic_default_lifetime: config.heuristic_default_lifetime,
            heuristic_status_codes: config.heuristic_status_codes.clone(),
        }
    }

    /// Current age of the stored response, per §4.2.3.
    pub fn current_age(&self, entry: &CacheEntry, now: SystemTime) -> Duration {
        let date = entry.date().unwrap_or_else(|| entry.response_instant());
        let apparent_age =
            entry.response_instant().duration_since(date).unwrap_or(Duration::ZERO);
        let age_header = Duration::from_secs(entry.age_header().unwrap_or(0));
        let corrected_received_age = apparent_age.max(age_header);
        let response_delay = entry
            .response_instant()
            .duration_since(entry.request_instant())
            .unwrap_or(Duration::ZERO);
        let corrected_initial_age = corrected_received_age + response_delay;
        let resident_time =
            now.duration_since(entry.response_instant()).unwrap_or(Duration::ZERO);
        corrected_initial_age + resident_time
    }

    /// Freshness lifetime of the stored response, per §4.2.1/§4.2.2.
    pub fn freshness_lifetime(&self, entry: &CacheEntry) -> Duration {
        let cc = entry.cache_control();
        // A shared cache prefers s-maxage and then ignores Expires entirely.
        if self.shared {
            if let Some(secs) = cc.s_maxage {
                return Duration::from_secs(secs);
            }
        }
        if let Some(secs) = cc.max_age {
            return Duration::from_secs(secs);
        }
        if entry.first_header("expires").is_some() {
            if let Some(date) = entry.date() {
                // Invalid Expires dates mean "already expired".
                return match entry.expires() {
                    Some(expires) => expires.duration_since(date).unwrap_or(Duration::ZERO),
                    None => Duration::ZERO,
                };
            }
        }
        self.heuristic_lifetime(entry)
    }

    /// `true` when no explicit expiration applies and the lifetime came from
    /// the heuristic path.
    pub fn uses_heuristic(&self, entry: &CacheEntry) -> bool {
        let cc = entry.cache_control();
        let explicit = (self.shared && cc.s_maxage.is_some())
            || cc.max_age.is_some()
            || (entry.first_header("expires").is_some() && entry.date().is_some());
        !explicit
    }

    fn heuristic_lifetime(&self, entry: &CacheEntry) -> Duration {
        if !self.heuristic_enabled || !self.heuristic_status_codes.contains(&entry.status()) {
            return Duration::ZERO;
        }
        if let (Some(date), Some(last_modified)) = (entry.date(), entry.last_modified()) {
            if let Ok(span) = date.duration_since(last_modified) {
                let secs = span.as_secs() as f64 * f64::from(self.heuristic_coefficient);
                return Duration::from_secs(secs as u64);
            }
        }
        self.heuristic_default_lifetime
    }

    /// `true` while `freshness_lifetime > current_age`.
    pub fn is_fresh(&self, entry: &CacheEntry, now: SystemTime) -> bool {
        self.freshness_lifetime(entry) > self.current_age(entry, now)
    }

    /// How far past its lifetime the entry is; zero while fresh.
    pub fn staleness(&self, entry: &CacheEntry, now: SystemTime) -> Duration {
        self.current_age(entry, now).saturating_sub(self.freshness_lifetime(entry))
    }

    /// Freshness left before the entry goes stale; zero once stale.
    pub fn remaining_freshness(&self, entry: &CacheEntry, now: SystemTime) -> Duration {
        self.freshness_lifetime(entry).saturating_sub(self.current_age(entry, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;

    fn calculator(shared: bool, heuristics: bool) -> FreshnessCalculator {
        FreshnessCalculator::new(&CacheConfig {
            shared,
            heuristic_caching_enabled: heuristics,
            ..Default::default()
        })
    }

    fn entry_at(instant: SystemTime, headers: &[(&str, &str)]) -> CacheEntry {
        let headers = headers.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect();
        CacheEntry::new(instant, instant, 200, None, headers, Some(Resource::from_bytes("x")), "GET")
    }

    fn t0() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn current_age_tracks_resident_time() {
        let entry = entry_at(t0(), &[("date", &httpdate::fmt_http_date(t0())), ("cache-control", "max-age=3600")]);
        let calc = calculator(true, false);
        assert_eq!(calc.current_age(&entry, t0() + Duration::from_secs(60)), Duration::from_secs(60));
        assert!(calc.is_fresh(&entry, t0() + Duration::from_secs(60)));
        assert!(!calc.is_fresh(&entry, t0() + Duration::from_secs(7200)));
        assert_eq!(
            calc.staleness(&entry, t0() + Duration::from_secs(7200)),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn current_age_is_monotonic() {
        let entry = entry_at(t0(), &[("date", &httpdate::fmt_http_date(t0()))]);
        let calc = calculator(true, false);
        let mut last = Duration::ZERO;
        for offset in [0u64, 1, 10, 100, 10_000] {
            let age = calc.current_age(&entry, t0() + Duration::from_secs(offset));
            assert!(age >= last);
            last = age;
        }
    }

    #[test]
    fn age_header_raises_the_corrected_received_age() {
        let entry = entry_at(t0(), &[("date", &httpdate::fmt_http_date(t0())), ("age", "120")]);
        let calc = calculator(true, false);
        assert_eq!(calc.current_age(&entry, t0()), Duration::from_secs(120));
    }

    #[test]
    fn response_delay_is_added_to_the_initial_age() {
        let headers =
            vec![("date".to_string(), httpdate::fmt_http_date(t0()))];
        let entry = CacheEntry::new(
            t0(),
            t0() + Duration::from_secs(4),
            200,
            None,
            headers,
            Some(Resource::from_bytes("x")),
            "GET",
        );
        let calc = calculator(true, false);
        assert_eq!(calc.current_age(&entry, t0() + Duration::from_secs(4)), Duration::from_secs(4));
    }

    #[test]
    fn shared_cache_prefers_s_maxage() {
        let entry = entry_at(
            t0(),
            &[("date", &httpdate::fmt_http_date(t0())), ("cache-control", "max-age=100, s-maxage=10")],
        );
        assert_eq!(calculator(true, false).freshness_lifetime(&entry), Duration::from_secs(10));
        assert_eq!(calculator(false, false).freshness_lifetime(&entry), Duration::from_secs(100));
    }

    #[test]
    fn expires_minus_date_is_the_fallback_lifetime() {
        let expires = t0() + Duration::from_secs(300);
        let entry = entry_at(
            t0(),
            &[
                ("date", &httpdate::fmt_http_date(t0())),
                ("expires", &httpdate::fmt_http_date(expires)),
            ],
        );
        assert_eq!(calculator(true, false).freshness_lifetime(&entry), Duration::from_secs(300));
    }

    #[test]
    fn invalid_expires_means_already_expired() {
        let entry = entry_at(t0(), &[("date", &httpdate::fmt_http_date(t0())), ("expires", "0")]);
        let calc = calculator(true, true);
        assert_eq!(calc.freshness_lifetime(&entry), Duration::ZERO);
    }

    #[test]
    fn heuristic_lifetime_is_a_fraction_of_last_modified_age() {
        let last_modified = t0() - Duration::from_secs(1000);
        let entry = entry_at(
            t0(),
            &[
                ("date", &httpdate::fmt_http_date(t0())),
                ("last-modified", &httpdate::fmt_http_date(last_modified)),
            ],
        );
        let calc = calculator(true, true);
        assert!(calc.uses_heuristic(&entry));
        assert_eq!(calc.freshness_lifetime(&entry), Duration::from_secs(100));
        // Disabled heuristics treat the same entry as immediately stale.
        assert_eq!(calculator(true, false).freshness_lifetime(&entry), Duration::ZERO);
    }

    #[test]
    fn heuristics_do_not_apply_to_unlisted_statuses() {
        let last_modified = t0() - Duration::from_secs(1000);
        let headers = vec![
            ("date".to_string(), httpdate::fmt_http_date(t0())),
            ("last-modified".to_string(), httpdate::fmt_http_date(last_modified)),
        ];
        let entry =
            CacheEntry::new(t0(), t0(), 404, None, headers, Some(Resource::from_bytes("x")), "GET");
        assert_eq!(calculator(true, true).freshness_lifetime(&entry), Duration::ZERO);
    }
}
