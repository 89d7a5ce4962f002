//! Object Storage Abstraction
//!
//! Abstract interface for storing proof-document binaries.
//! Implementations can target local filesystem (POC) or S3-compatible
//! storage (production). The upload pipeline only retries errors the
//! implementation reports as transient.

use async_trait::async_trait;
use std::path::PathBuf;

/// Error type for object storage operations
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid object reference: {0}")]
    InvalidRef(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("transient storage error: {0}")]
    Transient(String),

    #[error("payload rejected by store: {0}")]
    Rejected(String),
}

impl ObjectStoreError {
    /// Transient errors are worth a bounded retry; everything else
    /// propagates immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Io(_))
    }
}

/// Stable handle to a stored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub url: String,
    pub storage_id: String,
}

/// Abstract durable storage for document binaries
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store binary content under a key, returning a stable handle
    async fn put(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<StoredDocument, ObjectStoreError>;

    /// Fetch binary content by storage id
    async fn fetch(&self, storage_id: &str) -> Result<Vec<u8>, ObjectStoreError>;

    /// Delete binary content
    async fn delete(&self, storage_id: &str) -> Result<(), ObjectStoreError>;

    /// Check if an object exists
    async fn exists(&self, storage_id: &str) -> Result<bool, ObjectStoreError>;
}

/// Local filesystem implementation (for POC)
pub struct LocalObjectStore {
    base_path: PathBuf,
}

impl LocalObjectStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn path_for(&self, storage_id: &str) -> Result<PathBuf, ObjectStoreError> {
        if storage_id.split('/').any(|part| part == "..") {
            return Err(ObjectStoreError::InvalidRef(storage_id.to_string()));
        }
        Ok(self.base_path.join(storage_id))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        key: &str,
        content: &[u8],
        _content_type: &str,
    ) -> Result<StoredDocument, ObjectStoreError> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, content).await?;
        Ok(StoredDocument {
            url: format!("file://{}", path.display()),
            storage_id: key.to_string(),
        })
    }

    async fn fetch(&self, storage_id: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let path = self.path_for(storage_id)?;

        if !path.exists() {
            return Err(ObjectStoreError::NotFound(storage_id.to_string()));
        }

        Ok(tokio::fs::read(path).await?)
    }

    async fn delete(&self, storage_id: &str) -> Result<(), ObjectStoreError> {
        let path = self.path_for(storage_id)?;

        if path.exists() {
            tokio::fs::remove_file(path).await?;
        }

        Ok(())
    }

    async fn exists(&self, storage_id: &str) -> Result<bool, ObjectStoreError> {
        let path = self.path_for(storage_id)?;
        Ok(path.exists())
    }
}

/// In-memory object store (for tests and local wiring)
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: std::sync::Arc<tokio::sync::RwLock<std::collections::HashMap<String, Vec<u8>>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        content: &[u8],
        _content_type: &str,
    ) -> Result<StoredDocument, ObjectStoreError> {
        let mut objects = self.objects.write().await;
        objects.insert(key.to_string(), content.to_vec());
        Ok(StoredDocument {
            url: format!("memory://{}", key),
            storage_id: key.to_string(),
        })
    }

    async fn fetch(&self, storage_id: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let objects = self.objects.read().await;
        objects
            .get(storage_id)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(storage_id.to_string()))
    }

    async fn delete(&self, storage_id: &str) -> Result<(), ObjectStoreError> {
        let mut objects = self.objects.write().await;
        objects.remove(storage_id);
        Ok(())
    }

    async fn exists(&self, storage_id: &str) -> Result<bool, ObjectStoreError> {
        let objects = self.objects.read().await;
        Ok(objects.contains_key(storage_id))
    }
}

/// Wrapper that fails the first N `put` calls, for retry tests
#[cfg(test)]
pub(crate) struct FlakyObjectStore {
    inner: InMemoryObjectStore,
    failures_left: std::sync::atomic::AtomicU32,
    pub attempts: std::sync::atomic::AtomicU32,
    transient: bool,
}

#[cfg(test)]
impl FlakyObjectStore {
    pub fn transient_failures(count: u32) -> Self {
        Self {
            inner: InMemoryObjectStore::new(),
            failures_left: std::sync::atomic::AtomicU32::new(count),
            attempts: std::sync::atomic::AtomicU32::new(0),
            transient: true,
        }
    }

    pub fn permanent_failure() -> Self {
        Self {
            inner: InMemoryObjectStore::new(),
            failures_left: std::sync::atomic::AtomicU32::new(u32::MAX),
            attempts: std::sync::atomic::AtomicU32::new(0),
            transient: false,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ObjectStore for FlakyObjectStore {
    async fn put(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<StoredDocument, ObjectStoreError> {
        use std::sync::atomic::Ordering;
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            if left != u32::MAX {
                self.failures_left.store(left - 1, Ordering::SeqCst);
            }
            return if self.transient {
                Err(ObjectStoreError::Transient("storage unavailable".into()))
            } else {
                Err(ObjectStoreError::Rejected("payload too large".into()))
            };
        }
        self.inner.put(key, content, content_type).await
    }

    async fn fetch(&self, storage_id: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.inner.fetch(storage_id).await
    }

    async fn delete(&self, storage_id: &str) -> Result<(), ObjectStoreError> {
        self.inner.delete(storage_id).await
    }

    async fn exists(&self, storage_id: &str) -> Result<bool, ObjectStoreError> {
        self.inner.exists(storage_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_object_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp_dir.path());

        let content = b"Hello, World!";
        let key = "verification/doctor/abc/proof.pdf";

        let stored = store.put(key, content, "application/pdf").await.unwrap();
        assert!(stored.url.starts_with("file://"));
        assert_eq!(stored.storage_id, key);

        assert!(store.exists(&stored.storage_id).await.unwrap());

        let fetched = store.fetch(&stored.storage_id).await.unwrap();
        assert_eq!(fetched, content);

        store.delete(&stored.storage_id).await.unwrap();
        assert!(!store.exists(&stored.storage_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_local_object_store_rejects_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp_dir.path());

        let result = store.put("../outside.bin", b"x", "application/octet-stream").await;
        assert!(matches!(result, Err(ObjectStoreError::InvalidRef(_))));
    }

    #[tokio::test]
    async fn test_in_memory_object_store() {
        let store = InMemoryObjectStore::new();

        let stored = store
            .put("test-key", b"Test data", "application/octet-stream")
            .await
            .unwrap();
        assert_eq!(stored.url, "memory://test-key");
        assert!(store.exists(&stored.storage_id).await.unwrap());

        let fetched = store.fetch(&stored.storage_id).await.unwrap();
        assert_eq!(fetched, b"Test data");

        store.delete(&stored.storage_id).await.unwrap();
        assert!(!store.exists(&stored.storage_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_not_found_error() {
        let store = InMemoryObjectStore::new();
        let result = store.fetch("nonexistent").await;
        assert!(matches!(result, Err(ObjectStoreError::NotFound(_))));
    }

    #[test]
    fn test_transient_classification() {
        assert!(ObjectStoreError::Transient("x".into()).is_transient());
        assert!(!ObjectStoreError::Rejected("x".into()).is_transient());
        assert!(!ObjectStoreError::NotFound("x".into()).is_transient());
    }
}
