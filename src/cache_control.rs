use http::HeaderMap;

/// Tolerance for stale responses requested via `max-stale`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MaxStale {
    /// `max-stale` with no argument: any amount of staleness is acceptable.
    Any,
    /// `max-stale=N`: staleness up to N seconds is acceptable.
    Limit(u64),
}

/// Parsed `Cache-Control` directives, request- and response-side alike.
///
/// Unknown directives are ignored. When the same directive appears more than
/// once with conflicting values the freshness information is considered
/// invalid and the response is forced to revalidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheControl {
    pub(crate) no_store: bool,
    pub(crate) no_cache: bool,
    pub(crate) private: bool,
    pub(crate) public: bool,
    pub(crate) must_revalidate: bool,
    pub(crate) proxy_revalidate: bool,
    pub(crate) max_age: Option<u64>,
    pub(crate) s_maxage: Option<u64>,
    pub(crate) min_fresh: Option<u64>,
    pub(crate) max_stale: Option<MaxStale>,
    pub(crate) stale_while_revalidate: Option<u64>,
    pub(crate) stale_if_error: Option<u64>,
}

impl CacheControl {
    /// Parses directives out of any number of `Cache-Control` header values.
    pub fn parse<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut cc = Self::default();
        let mut seen: Vec<(String, Option<String>)> = Vec::new();
        let mut conflicting = false;

        for value in values {
            for part in value.split(',') {
                if part.trim().is_empty() {
                    continue;
                }
                let mut kv = part.splitn(2, '=');
                let key = kv.next().unwrap_or_default().trim().to_ascii_lowercase();
                if key.is_empty() {
                    continue;
                }
                let arg = kv.next().map(|v| v.trim().trim_matches('"').to_string());
                // When there is more than one value present for a given
                // directive the directive's value is considered invalid;
                // caches are encouraged to consider such responses stale.
                if let Some((_, prior)) = seen.iter().find(|(k, _)| *k == key) {
                    if *prior != arg {
                        conflicting = true;
                    }
                    continue;
                }
                seen.push((key.clone(), arg.clone()));
                let secs = arg.as_deref().and_then(|v| v.parse::<u64>().ok());
                match key.as_str() {
                    "no-store" => cc.no_store = true,
                    "no-cache" => cc.no_cache = true,
                    "private" => cc.private = true,
                    "public" => cc.public = true,
                    "must-revalidate" => cc.must_revalidate = true,
                    "proxy-revalidate" => cc.proxy_revalidate = true,
                    "max-age" => cc.max_age = Some(secs.unwrap_or(0)),
                    "s-maxage" => cc.s_maxage = Some(secs.unwrap_or(0)),
                    "min-fresh" => cc.min_fresh = secs,
                    "max-stale" => {
                        cc.max_stale = Some(match secs {
                            Some(limit) => MaxStale::Limit(limit),
                            None => MaxStale::Any,
                        });
                    }
                    "stale-while-revalidate" => cc.stale_while_revalidate = secs,
                    "stale-if-error" => cc.stale_if_error = secs,
                    _ => {}
                }
            }
        }
        if conflicting {
            cc.must_revalidate = true;
        }
        cc
    }

    /// Parses the `Cache-Control` headers of an `http` header map.
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        Self::parse(
            headers
                .get_all(http::header::CACHE_CONTROL)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        )
    }

    /// Parses the `Cache-Control` headers of a stored header list.
    pub fn from_header_list(headers: &[(String, String)]) -> Self {
        Self::parse(
            headers
                .iter()
                .filter(|(name, _)| name.eq_ignore_ascii_case("cache-control"))
                .map(|(_, value)| value.as_str()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_response_directives() {
        let cc = CacheControl::parse(["max-age=3600, public, stale-while-revalidate=600"]);
        assert_eq!(cc.max_age, Some(3600));
        assert!(cc.public);
        assert_eq!(cc.stale_while_revalidate, Some(600));
        assert!(!cc.no_store);
    }

    #[test]
    fn parses_across_multiple_header_values() {
        let cc = CacheControl::parse(["no-cache", "s-maxage=10, proxy-revalidate"]);
        assert!(cc.no_cache);
        assert_eq!(cc.s_maxage, Some(10));
        assert!(cc.proxy_revalidate);
    }

    #[test]
    fn bare_max_stale_accepts_any_staleness() {
        let cc = CacheControl::parse(["max-stale"]);
        assert_eq!(cc.max_stale, Some(MaxStale::Any));
        let cc = CacheControl::parse(["max-stale=120"]);
        assert_eq!(cc.max_stale, Some(MaxStale::Limit(120)));
    }

    #[test]
    fn conflicting_duplicates_force_revalidation() {
        let cc = CacheControl::parse(["max-age=60", "max-age=120"]);
        assert!(cc.must_revalidate);
    }

    #[test]
    fn quoted_arguments_are_unquoted() {
        let cc = CacheControl::parse([r#"max-age="60""#]);
        assert_eq!(cc.max_age, Some(60));
    }

    #[test]
    fn invalid_seconds_collapse_to_zero() {
        let cc = CacheControl::parse(["max-age=banana"]);
        assert_eq!(cc.max_age, Some(0));
    }
}
