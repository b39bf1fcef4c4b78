//! Canonical metadata entities shared by every repository backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::StashResult;

/// Unique identifier for a file metadata record.
///
/// Opaque and backend-assigned; immutable once a record exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub String);

impl FileId {
    /// Generate a new random file ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from existing string.
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FileId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The canonical file metadata record.
///
/// `storage_key` is the blob's unique locator in the storage backend,
/// distinct from the record's own `id`. `id` and `created_at` are
/// assigned by the backend at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub storage_key: String,
    pub original_filename: String,
    pub file_size: u64,
    pub public_url: String,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

/// The fields required to create a new record.
///
/// Everything in [`FileRecord`] except the backend-generated
/// `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInsert {
    pub storage_key: String,
    pub original_filename: String,
    pub file_size: u64,
    pub public_url: String,
    pub uploaded_by: String,
}

impl FileInsert {
    pub fn new<S: Into<String>>(storage_key: S, original_filename: S) -> Self {
        Self {
            storage_key: storage_key.into(),
            original_filename: original_filename.into(),
            file_size: 0,
            public_url: String::new(),
            uploaded_by: String::new(),
        }
    }

    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = size;
        self
    }

    pub fn with_public_url<S: Into<String>>(mut self, url: S) -> Self {
        self.public_url = url.into();
        self
    }

    pub fn with_uploaded_by<S: Into<String>>(mut self, user: S) -> Self {
        self.uploaded_by = user.into();
        self
    }
}

/// A partial update: only the set fields are applied.
///
/// `storage_key` and `uploaded_by` are deliberately absent - the blob
/// location and the owning principal do not change after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileUpdate {
    pub original_filename: Option<String>,
    pub file_size: Option<u64>,
    pub public_url: Option<String>,
}

impl FileUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_original_filename<S: Into<String>>(mut self, name: S) -> Self {
        self.original_filename = Some(name.into());
        self
    }

    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }

    pub fn with_public_url<S: Into<String>>(mut self, url: S) -> Self {
        self.public_url = Some(url.into());
        self
    }

    /// True when no field is set; such an update is a bad request.
    pub fn is_empty(&self) -> bool {
        self.original_filename.is_none() && self.file_size.is_none() && self.public_url.is_none()
    }

    /// Apply the set fields onto an existing record.
    pub fn apply_to(&self, record: &mut FileRecord) {
        if let Some(name) = &self.original_filename {
            record.original_filename = name.clone();
        }
        if let Some(size) = self.file_size {
            record.file_size = size;
        }
        if let Some(url) = &self.public_url {
            record.public_url = url.clone();
        }
    }
}

/// Owner identity fields joined into listings when a users source
/// is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uploader {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// A listed file, optionally joined with its uploader's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub record: FileRecord,
    pub uploader: Option<Uploader>,
}

/// One page of a filtered listing.
///
/// `total` counts every record matching the filter, independent of
/// the requested page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePage {
    pub files: Vec<FileEntry>,
    pub total: u64,
}

/// Aggregate statistics over the whole store.
///
/// An empty store yields all-zero values, never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStats {
    pub total_files: u64,
    pub total_bytes: u64,
    /// Files created within the trailing 7 days.
    pub recent_files: u64,
    pub average_size: f64,
}

/// Optional lookup source for uploader identity.
///
/// Adapters that are handed one of these join name/email into
/// listings; without one, `FileEntry::uploader` stays `None`.
#[async_trait]
pub trait UserSource: Send + Sync {
    async fn uploader(&self, user_id: &str) -> StashResult<Option<Uploader>>;
}
