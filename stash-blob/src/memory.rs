//! In-memory blob store for tests and development.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::{BlobError, BlobResult, BlobStore, ObjectHead, PutResult, StoreCapabilities};

struct StoredObject {
    body: Bytes,
    content_type: Option<String>,
    last_modified: DateTime<Utc>,
}

/// Blob store backed by a process-local map.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when a blob exists under the key.
    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        content_type: Option<&str>,
        body: Bytes,
    ) -> BlobResult<PutResult> {
        let size_bytes = body.len() as u64;
        self.objects.write().insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.map(|ct| ct.to_string()),
                last_modified: Utc::now(),
            },
        );

        Ok(PutResult {
            etag: None,
            size_bytes,
        })
    }

    async fn get(&self, key: &str) -> BlobResult<Bytes> {
        self.objects
            .read()
            .get(key)
            .map(|obj| obj.body.clone())
            .ok_or_else(|| BlobError::not_found(key))
    }

    async fn head(&self, key: &str) -> BlobResult<ObjectHead> {
        self.objects
            .read()
            .get(key)
            .map(|obj| ObjectHead {
                size_bytes: obj.body.len() as u64,
                content_type: obj.content_type.clone(),
                last_modified: Some(obj.last_modified),
            })
            .ok_or_else(|| BlobError::not_found(key))
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        self.objects.write().remove(key);
        Ok(())
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::basic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_head_delete_roundtrip() {
        let store = MemoryBlobStore::new();

        let put = store
            .put("u1/k1", Some("image/png"), Bytes::from_static(b"12345"))
            .await
            .unwrap();
        assert_eq!(put.size_bytes, 5);

        assert_eq!(store.get("u1/k1").await.unwrap(), Bytes::from_static(b"12345"));

        let head = store.head("u1/k1").await.unwrap();
        assert_eq!(head.size_bytes, 5);
        assert_eq!(head.content_type.as_deref(), Some("image/png"));

        store.delete("u1/k1").await.unwrap();
        assert!(matches!(
            store.get("u1/k1").await,
            Err(BlobError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryBlobStore::new();
        store.delete("never-existed").await.unwrap();
    }

    #[test]
    fn reports_basic_capabilities() {
        let store = MemoryBlobStore::new();
        assert!(!store.capabilities().supports_signed_urls);
    }
}
