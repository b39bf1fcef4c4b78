use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::BlobResult;

/// Core blob storage operations - must be implemented by all storage
/// backends. Vendor SDK calls live behind this seam; the rest of the
/// library only ever sees "put object", "get object", "delete object".
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob
    async fn put(
        &self,
        key: &str,
        content_type: Option<&str>,
        body: Bytes,
    ) -> BlobResult<PutResult>;

    /// Get a blob's content
    async fn get(&self, key: &str) -> BlobResult<Bytes>;

    /// Get blob metadata without content
    async fn head(&self, key: &str) -> BlobResult<ObjectHead>;

    /// Delete a blob. Idempotent: deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> BlobResult<()>;

    /// Get store capabilities
    fn capabilities(&self) -> StoreCapabilities;
}

/// Result of a successful put operation
#[derive(Debug, Clone)]
pub struct PutResult {
    pub etag: Option<String>,
    pub size_bytes: u64,
}

/// Metadata about a blob
#[derive(Debug, Clone)]
pub struct ObjectHead {
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Store capabilities, as reported by [`BlobStore::capabilities`].
///
/// Vendor stores flip the flags they actually support; callers that
/// need a capability check here instead of probing with a failing
/// call.
#[derive(Debug, Clone, Default)]
pub struct StoreCapabilities {
    pub supports_signed_urls: bool,
}

impl StoreCapabilities {
    pub fn basic() -> Self {
        Self::default()
    }
}
