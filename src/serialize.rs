use async_trait::async_trait;

use crate::entry::CacheEntry;
use crate::error::Result;

/// Converts entries to and from persisted bytes.
///
/// The persisted form is fully typed: decoding can only ever produce the
/// HTTP domain types below, so hostile payloads fail with a serialization
/// error instead of materializing foreign structures.
#[async_trait]
pub trait EntrySerializer: Send + Sync {
    /// Encodes an entry, body included.
    async fn write(&self, entry: &CacheEntry) -> Result<Vec<u8>>;
    /// Decodes an entry. The body comes back heap-backed.
    fn read(&self, bytes: &[u8]) -> Result<CacheEntry>;
}

#[cfg(feature = "storage-cacache")]
pub use bincode_impl::BincodeEntrySerializer;

#[cfg(feature = "storage-cacache")]
mod bincode_impl {
    use std::collections::HashMap;
    use std::time::SystemTime;

    use async_trait::async_trait;
    use bincode::Options;
    use serde::{Deserialize, Serialize};

    use super::EntrySerializer;
    use crate::entry::CacheEntry;
    use crate::error::Result;
    use crate::resource::Resource;

    #[derive(Debug, Serialize, Deserialize)]
    struct StoredEntry {
        request_instant: SystemTime,
        response_instant: SystemTime,
        status: u16,
        reason: Option<String>,
        headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
        variant_map: HashMap<String, String>,
        request_method: String,
        error_count: u32,
    }

    /// [`EntrySerializer`] backed by bincode, with a decode size limit
    /// guarding against corrupt or hostile persisted data.
    #[derive(Debug, Clone, Copy)]
    pub struct BincodeEntrySerializer {
        limit: u64,
    }

    impl BincodeEntrySerializer {
        /// A serializer refusing payloads larger than `limit` bytes.
        pub fn with_limit(limit: u64) -> Self {
            Self { limit }
        }

        fn options(&self) -> impl Options {
            bincode::DefaultOptions::new().with_limit(self.limit)
        }
    }

    impl Default for BincodeEntrySerializer {
        fn default() -> Self {
            Self::with_limit(64 * 1024 * 1024)
        }
    }

    #[async_trait]
    impl EntrySerializer for BincodeEntrySerializer {
        async fn write(&self, entry: &CacheEntry) -> Result<Vec<u8>> {
            let body = match entry.resource() {
                Some(resource) => Some(resource.read().await?.to_vec()),
                None => None,
            };
            let stored = StoredEntry {
                request_instant: entry.request_instant(),
                response_instant: entry.response_instant(),
                status: entry.status(),
                reason: entry.reason().map(str::to_owned),
                headers: entry.headers().to_vec(),
                body,
                variant_map: entry.variant_map().clone(),
                request_method: entry.request_method().to_string(),
                error_count: entry.error_count(),
            };
            Ok(self.options().serialize(&stored)?)
        }

        fn read(&self, bytes: &[u8]) -> Result<CacheEntry> {
            let stored: StoredEntry = self.options().deserialize(bytes)?;
            Ok(CacheEntry::new(
                stored.request_instant,
                stored.response_instant,
                stored.status,
                stored.reason,
                stored.headers,
                stored.body.map(Resource::from_bytes),
                stored.request_method,
            )
            .with_variant_map(stored.variant_map)
            .with_error_count(stored.error_count))
        }
    }
}

#[cfg(all(test, feature = "storage-cacache"))]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use std::collections::HashMap;
    use std::time::{Duration, SystemTime};

    fn sample_entry() -> CacheEntry {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let headers = vec![
            ("Cache-Control".to_string(), "max-age=60".to_string()),
            ("Warning".to_string(), "299 host \"a\"".to_string()),
            ("Warning".to_string(), "299 host \"b\"".to_string()),
        ];
        let mut variants = HashMap::new();
        variants.insert("accept-encoding=gzip".to_string(), "abc_http://e:80/".to_string());
        CacheEntry::new(
            t0,
            t0 + Duration::from_secs(1),
            200,
            Some("OK".to_string()),
            headers,
            Some(Resource::from_bytes("hello")),
            "GET",
        )
        .with_variant_map(variants)
        .with_error_count(3)
    }

    #[tokio::test]
    async fn entries_round_trip() -> Result<()> {
        let serializer = BincodeEntrySerializer::default();
        let entry = sample_entry();
        let bytes = serializer.write(&entry).await?;
        let decoded = serializer.read(&bytes)?;
        assert_eq!(decoded.status(), entry.status());
        assert_eq!(decoded.reason(), entry.reason());
        assert_eq!(decoded.headers(), entry.headers());
        assert_eq!(decoded.variant_map(), entry.variant_map());
        assert_eq!(decoded.error_count(), 3);
        assert_eq!(decoded.request_instant(), entry.request_instant());
        assert_eq!(decoded.response_instant(), entry.response_instant());
        assert_eq!(
            decoded.resource().unwrap().read().await?,
            bytes::Bytes::from_static(b"hello")
        );
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_bytes_are_rejected() {
        let serializer = BincodeEntrySerializer::default();
        assert!(serializer.read(b"\xff\xff\xff\xff not an entry").is_err());
    }

    #[tokio::test]
    async fn decode_limit_rejects_oversized_payloads() -> Result<()> {
        let entry = sample_entry();
        let bytes = BincodeEntrySerializer::default().write(&entry).await?;
        let tight = BincodeEntrySerializer::with_limit(8);
        assert!(tight.read(&bytes).is_err());
        Ok(())
    }
}
