use std::sync::Arc;

use http::{header, HeaderMap};
use tracing::{debug, warn};
use url::Url;

use crate::keys::primary_key;
use crate::storage::Storage;

/// Drops entries made stale by unsafe request methods and by the
/// `Location`/`Content-Location` of their responses.
///
/// Invalidation is best-effort: storage failures are logged and swallowed,
/// and nothing is re-fetched.
pub struct CacheInvalidator {
    storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for CacheInvalidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheInvalidator").finish_non_exhaustive()
    }
}

impl CacheInvalidator {
    /// An invalidator flushing through `storage`.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Flushes the entry for `request_url` and, when the response names
    /// same-host `Location`/`Content-Location` targets, those as well.
    pub async fn invalidate(&self, request_url: &Url, response_headers: Option<&HeaderMap>) {
        self.flush(&primary_key(request_url)).await;
        let Some(headers) = response_headers else {
            return;
        };
        for name in [header::LOCATION, header::CONTENT_LOCATION] {
            let Some(value) = headers.get(&name).and_then(|v| v.to_str().ok()) else {
                continue;
            };
            let Ok(target) = request_url.join(value) else {
                continue;
            };
            // Only same-host targets: a response must not evict entries for
            // other origins.
            if target.host_str() == request_url.host_str() {
                self.flush(&primary_key(&target)).await;
            }
        }
    }

    async fn flush(&self, key: &str) {
        let root = match self.storage.get(key).await {
            Ok(root) => root,
            Err(e) => {
                warn!(key, error = %e, "invalidation lookup failed");
                None
            }
        };
        if let Some(root) = root {
            for variant_key in root.variant_map().values() {
                if let Err(e) = self.storage.remove(variant_key).await {
                    warn!(key = variant_key.as_str(), error = %e, "variant invalidation failed");
                }
            }
        }
        match self.storage.remove(key).await {
            Ok(()) => debug!(key, "invalidated"),
            Err(e) => warn!(key, error = %e, "invalidation failed"),
        }
    }
}
