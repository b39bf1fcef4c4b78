//! The ORM-agnostic repository contract.

use async_trait::async_trait;

use crate::hooks::SharedHooks;
use crate::query::{FileFilter, ListOptions};
use crate::types::{FileId, FileInsert, FilePage, FileRecord, FileStats, FileUpdate};
use crate::StashResult;

/// The canonical metadata operation set every persistence backend
/// must expose.
///
/// The contract owns nothing - it is a capability description only.
/// Each implementation owns its backend client exclusively, routes
/// every operation through the hook execution engine, and translates
/// backend-native failures into the uniform taxonomy before they cross
/// this boundary:
///
/// - a zero-row update/delete becomes `NotFound` carrying the
///   requested id in `data`
/// - any other backend failure becomes `Internal` preserving the
///   original cause
/// - an error that is already a `StashError` is re-raised unchanged
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// The instance-scoped hook table, mutable at runtime.
    fn hooks(&self) -> &SharedHooks;

    /// Insert one record; returns it with backend-assigned
    /// id/created_at.
    async fn create_file(&self, data: FileInsert) -> StashResult<FileRecord>;

    /// Point lookup by id. Absence is `Ok(None)`, not an error.
    async fn get_file_by_id(&self, id: &FileId) -> StashResult<Option<FileRecord>>;

    /// Point lookup by storage key. Absence is `Ok(None)`, not an
    /// error.
    async fn get_file_by_key(&self, storage_key: &str) -> StashResult<Option<FileRecord>>;

    /// Apply a partial update; `NotFound` if the id does not exist.
    /// An update with no set fields is `BadRequest`, but a missing id
    /// takes precedence over the empty-update check.
    async fn update_file(&self, id: &FileId, update: FileUpdate) -> StashResult<FileRecord>;

    /// Remove the record; `NotFound` if the id does not exist.
    async fn delete_file(&self, id: &FileId) -> StashResult<()>;

    /// All records owned by the user, newest-first.
    async fn get_files_by_user(&self, user_id: &str) -> StashResult<Vec<FileRecord>>;

    /// Paginated, filterable, sortable listing, optionally joined with
    /// uploader identity. `total` counts every match, independent of
    /// the requested page.
    async fn get_all_files(&self, options: ListOptions) -> StashResult<FilePage>;

    /// Delete all matching ids in one backend round trip; returns the
    /// count actually deleted. An empty id list is a no-op returning
    /// zero without touching the backend.
    async fn bulk_delete_files(&self, ids: &[FileId]) -> StashResult<u64>;

    /// Insert all records, atomically where the backend supports it;
    /// returns the created records in input order. Empty input is a
    /// no-op returning an empty vec.
    async fn bulk_create_files(&self, records: Vec<FileInsert>) -> StashResult<Vec<FileRecord>>;

    /// Aggregate counts; all-zero on an empty store, never an error.
    async fn get_file_stats(&self) -> StashResult<FileStats>;

    /// Existence check, cheaper than a full fetch.
    async fn exists(&self, id: &FileId) -> StashResult<bool>;

    /// Count of records matching the same filter predicate as
    /// `get_all_files`, without fetching rows.
    async fn count(&self, filter: FileFilter) -> StashResult<u64>;
}
