use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::error::{CacheError, Result};

/// A bounded producer of body bytes handed to a [`ResourceFactory`].
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Owned byte content backing a cache entry's body.
///
/// Handles are cheap to clone and share the underlying content. Disposal is
/// idempotent; for file-backed content the file is unlinked once the last
/// live handle drops, so a reader that is still streaming the old body keeps
/// it alive until it finishes.
#[derive(Clone)]
pub struct Resource {
    inner: Arc<Inner>,
}

enum Inner {
    Heap {
        bytes: Bytes,
        disposed: AtomicBool,
    },
    File {
        path: PathBuf,
        len: u64,
        disposed: AtomicBool,
    },
}

impl Resource {
    /// Wraps an in-memory byte buffer.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: Arc::new(Inner::Heap { bytes: bytes.into(), disposed: AtomicBool::new(false) }),
        }
    }

    fn from_file(path: PathBuf, len: u64) -> Self {
        Self { inner: Arc::new(Inner::File { path, len, disposed: AtomicBool::new(false) }) }
    }

    /// Reads the full content.
    pub async fn read(&self) -> Result<Bytes> {
        match &*self.inner {
            Inner::Heap { bytes, .. } => Ok(bytes.clone()),
            Inner::File { path, .. } => Ok(Bytes::from(tokio::fs::read(path).await?)),
        }
    }

    /// Content length in bytes.
    pub fn len(&self) -> u64 {
        match &*self.inner {
            Inner::Heap { bytes, .. } => bytes.len() as u64,
            Inner::File { len, .. } => *len,
        }
    }

    /// `true` when the content is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases the content. Safe to call more than once; only the first
    /// call takes effect. File-backed content is unlinked when the last
    /// outstanding handle drops.
    pub fn dispose(&self) {
        match &*self.inner {
            Inner::Heap { disposed, .. } | Inner::File { disposed, .. } => {
                disposed.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Whether [`Resource::dispose`] has been called on any handle.
    pub fn is_disposed(&self) -> bool {
        match &*self.inner {
            Inner::Heap { disposed, .. } | Inner::File { disposed, .. } => {
                disposed.load(Ordering::SeqCst)
            }
        }
    }

    pub(crate) fn same_as(&self, other: &Resource) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Inner::File { path, disposed, .. } = self {
            if *disposed.get_mut() {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.inner {
            Inner::Heap { bytes, .. } => {
                f.debug_struct("Resource").field("kind", &"heap").field("len", &bytes.len()).finish()
            }
            Inner::File { path, len, .. } => f
                .debug_struct("Resource")
                .field("kind", &"file")
                .field("path", path)
                .field("len", len)
                .finish(),
        }
    }
}

/// Creates and copies [`Resource`]s from bounded byte producers.
#[async_trait]
pub trait ResourceFactory: Send + Sync {
    /// Drains `stream` into a new resource, failing with
    /// [`CacheError::ResourceSizeExceeded`] (and discarding any partial
    /// output) once more than `max_bytes` have been produced.
    async fn generate(&self, id: &str, stream: ByteStream, max_bytes: u64) -> Result<Resource>;

    /// Copies an existing resource under a new identifier.
    async fn copy(&self, new_id: &str, source: &Resource) -> Result<Resource>;
}

/// Keeps resources on the heap.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapResourceFactory;

#[async_trait]
impl ResourceFactory for HeapResourceFactory {
    async fn generate(&self, _id: &str, mut stream: ByteStream, max_bytes: u64) -> Result<Resource> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if buf.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(CacheError::ResourceSizeExceeded {
                    size: buf.len() as u64 + chunk.len() as u64,
                    limit: max_bytes,
                });
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(Resource::from_bytes(buf.freeze()))
    }

    async fn copy(&self, _new_id: &str, source: &Resource) -> Result<Resource> {
        Ok(Resource::from_bytes(source.read().await?))
    }
}

/// Keeps resources as individual files in a cache-owned directory.
#[derive(Debug)]
pub struct FileResourceFactory {
    dir: PathBuf,
    seq: AtomicU64,
}

impl FileResourceFactory {
    /// A factory writing under `dir`. The directory is created on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), seq: AtomicU64::new(0) }
    }

    fn next_path(&self, id: &str) -> PathBuf {
        // Identifiers contain URLs; a digest keeps the name filesystem-safe.
        let digest = blake3::hash(id.as_bytes()).to_hex();
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!("{digest}-{n:08x}.bin"))
    }
}

#[async_trait]
impl ResourceFactory for FileResourceFactory {
    async fn generate(&self, id: &str, mut stream: ByteStream, max_bytes: u64) -> Result<Resource> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.next_path(id);
        let mut file = tokio::fs::File::create(&path).await?;
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&path).await;
                    return Err(e.into());
                }
            };
            written += chunk.len() as u64;
            if written > max_bytes {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(CacheError::ResourceSizeExceeded { size: written, limit: max_bytes });
            }
            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e.into());
            }
        }
        file.flush().await?;
        Ok(Resource::from_file(path, written))
    }

    async fn copy(&self, new_id: &str, source: &Resource) -> Result<Resource> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.next_path(new_id);
        let content = source.read().await?;
        tokio::fs::write(&path, &content).await?;
        Ok(Resource::from_file(path, content.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn one_chunk(body: &'static [u8]) -> ByteStream {
        stream::iter([Ok(Bytes::from_static(body))]).boxed()
    }

    #[tokio::test]
    async fn heap_resource_round_trips() -> Result<()> {
        let factory = HeapResourceFactory;
        let resource = factory.generate("a", one_chunk(b"hello"), 64).await?;
        assert_eq!(resource.len(), 5);
        assert_eq!(resource.read().await?, Bytes::from_static(b"hello"));
        Ok(())
    }

    #[tokio::test]
    async fn heap_resource_rejects_oversized_stream() {
        let factory = HeapResourceFactory;
        let err = factory.generate("a", one_chunk(b"too big"), 3).await.unwrap_err();
        assert!(matches!(err, CacheError::ResourceSizeExceeded { limit: 3, .. }));
    }

    #[tokio::test]
    async fn file_resource_unlinks_after_dispose_and_last_drop() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let factory = FileResourceFactory::new(dir.path());
        let resource = factory.generate("a", one_chunk(b"hello"), 64).await?;
        let reader = resource.clone();
        resource.dispose();
        resource.dispose();
        drop(resource);
        // A live handle keeps the file readable.
        assert_eq!(reader.read().await?, Bytes::from_static(b"hello"));
        drop(reader);
        let remaining = std::fs::read_dir(dir.path())?.count();
        assert_eq!(remaining, 0);
        Ok(())
    }

    #[tokio::test]
    async fn file_resource_discards_partial_output_on_overflow() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let factory = FileResourceFactory::new(dir.path());
        let chunks: ByteStream = stream::iter([
            Ok(Bytes::from_static(b"0123")),
            Ok(Bytes::from_static(b"4567")),
        ])
        .boxed();
        let err = factory.generate("a", chunks, 6).await.unwrap_err();
        assert!(matches!(err, CacheError::ResourceSizeExceeded { size: 8, limit: 6 }));
        let remaining = std::fs::read_dir(dir.path())?.count();
        assert_eq!(remaining, 0);
        Ok(())
    }

    #[tokio::test]
    async fn copy_produces_an_independent_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let factory = FileResourceFactory::new(dir.path());
        let original = factory.generate("a", one_chunk(b"hello"), 64).await?;
        let copied = factory.copy("b", &original).await?;
        original.dispose();
        drop(original);
        assert_eq!(copied.read().await?, Bytes::from_static(b"hello"));
        Ok(())
    }
}
