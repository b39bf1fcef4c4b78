//! File service: wires a blob store to a metadata repository.
//!
//! The service is infrastructure you embed, not a transport: HTTP
//! handlers (or CLI commands, or jobs) call it and serialize whatever
//! it returns. All failures surface through the uniform
//! [`StashError`] taxonomy; blob-store error types never escape.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use tracing::warn;

use stash_core::{
    bail_stash, FileId, FileInsert, FileRecord, FileRepository, FileStats, StashError, StashResult,
};

use crate::{BlobError, BlobStore, DefaultKeyStrategy, KeyStrategy};

/// Construction-time configuration for [`FileService`].
#[derive(Debug, Clone)]
pub struct FileServiceConfig {
    /// Base under which stored objects are publicly reachable.
    pub public_base_url: String,
    /// Reject uploads larger than this many bytes. `None` = unlimited.
    pub max_file_size: Option<u64>,
}

impl Default for FileServiceConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:3000/files".to_string(),
            max_file_size: Some(50 * 1024 * 1024),
        }
    }
}

impl FileServiceConfig {
    pub fn with_public_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.public_base_url = url.into();
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    pub fn unlimited(mut self) -> Self {
        self.max_file_size = None;
        self
    }
}

/// One upload, as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub uploaded_by: String,
}

/// Accepts uploads, persists blob references, and serves/deletes files
/// without binding the caller to one storage vendor or one repository
/// backend.
pub struct FileService {
    repo: Arc<dyn FileRepository>,
    store: Arc<dyn BlobStore>,
    keys: Arc<dyn KeyStrategy>,
    config: FileServiceConfig,
}

impl FileService {
    pub fn new(
        repo: Arc<dyn FileRepository>,
        store: Arc<dyn BlobStore>,
        config: FileServiceConfig,
    ) -> Self {
        Self {
            repo,
            store,
            keys: Arc::new(DefaultKeyStrategy),
            config,
        }
    }

    pub fn with_key_strategy(mut self, keys: Arc<dyn KeyStrategy>) -> Self {
        self.keys = keys;
        self
    }

    /// Store the blob, then persist its metadata record.
    ///
    /// If the metadata insert fails the just-written blob is removed
    /// again, so a failed upload leaves nothing behind.
    pub async fn upload(&self, request: UploadRequest) -> StashResult<FileRecord> {
        if request.filename.is_empty() {
            bail_stash!(bad_request, "filename must not be empty");
        }
        if request.uploaded_by.is_empty() {
            bail_stash!(bad_request, "uploaded_by must not be empty");
        }
        if let Some(max) = self.config.max_file_size {
            let size = request.body.len() as u64;
            if size > max {
                return Err(StashError::payload_too_large("file exceeds the size limit")
                    .with_data(json!({ "size": size, "max": max }))
                    .into_anyhow());
            }
        }

        let key = self.keys.object_key(&request.uploaded_by, &request.filename);
        let put = self
            .store
            .put(&key, request.content_type.as_deref(), request.body)
            .await
            .map_err(blob_to_stash)?;

        let insert = FileInsert::new(key.as_str(), request.filename.as_str())
            .with_file_size(put.size_bytes)
            .with_public_url(self.public_url(&key))
            .with_uploaded_by(request.uploaded_by);

        match self.repo.create_file(insert).await {
            Ok(record) => Ok(record),
            Err(err) => {
                // Don't leave an orphaned blob behind.
                if let Err(cleanup) = self.store.delete(&key).await {
                    warn!(key = %key, error = %cleanup, "failed to clean up blob after metadata insert failure");
                }
                Err(err)
            }
        }
    }

    /// Fetch a record; `NotFound` when the id does not exist.
    pub async fn get(&self, id: &FileId) -> StashResult<FileRecord> {
        self.repo.get_file_by_id(id).await?.ok_or_else(|| {
            StashError::not_found("file not found")
                .with_data(json!({ "id": id.as_str() }))
                .into_anyhow()
        })
    }

    /// Fetch a record together with its blob content.
    pub async fn open(&self, id: &FileId) -> StashResult<(FileRecord, Bytes)> {
        let record = self.get(id).await?;
        let body = self
            .store
            .get(&record.storage_key)
            .await
            .map_err(blob_to_stash)?;
        Ok((record, body))
    }

    /// Delete the record and its blob. Only the owner may delete.
    pub async fn delete(&self, id: &FileId, principal: &str) -> StashResult<()> {
        let record = self.get(id).await?;
        if record.uploaded_by != principal {
            return Err(StashError::forbidden("only the owner can delete this file")
                .with_data(json!({ "id": id.as_str() }))
                .into_anyhow());
        }

        self.repo.delete_file(id).await?;

        // The record is gone; an orphaned blob is only a warning.
        if let Err(err) = self.store.delete(&record.storage_key).await {
            warn!(key = %record.storage_key, error = %err, "failed to delete blob for removed file");
        }

        Ok(())
    }

    /// All files owned by the user, newest-first.
    pub async fn list_for_user(&self, user_id: &str) -> StashResult<Vec<FileRecord>> {
        self.repo.get_files_by_user(user_id).await
    }

    pub async fn stats(&self) -> StashResult<FileStats> {
        self.repo.get_file_stats().await
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            key
        )
    }
}

/// Blob-store failures cross the service boundary as uniform Internal
/// errors with the cause preserved for diagnostics.
fn blob_to_stash(err: BlobError) -> anyhow::Error {
    StashError::internal("blob storage failure")
        .with_source(anyhow::Error::new(err))
        .into_anyhow()
}
