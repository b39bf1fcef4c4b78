//! In-memory implementation of the file repository contract.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use serde_json::json;
use uuid::Uuid;

use stash_core::{
    bail_stash, compare_records, run_hooked, FileEntry, FileFilter, FileId, FileInsert, FilePage,
    FileRecord, FileRepository, FileStats, FileUpdate, ListOptions, Operation, OperationCategory,
    RepositoryHooks, SharedHooks, SortField, SortOrder, StashError, StashResult, UserSource,
};

const CREATE_FILE: Operation = Operation::new("create_file", OperationCategory::Create);
const GET_FILE_BY_ID: Operation = Operation::new("get_file_by_id", OperationCategory::Read);
const GET_FILE_BY_KEY: Operation = Operation::new("get_file_by_key", OperationCategory::Read);
const UPDATE_FILE: Operation = Operation::new("update_file", OperationCategory::Update);
const DELETE_FILE: Operation = Operation::new("delete_file", OperationCategory::Delete);
const GET_FILES_BY_USER: Operation = Operation::new("get_files_by_user", OperationCategory::Query);
const GET_ALL_FILES: Operation = Operation::new("get_all_files", OperationCategory::Query);
const BULK_DELETE_FILES: Operation = Operation::new("bulk_delete_files", OperationCategory::Delete);
const BULK_CREATE_FILES: Operation = Operation::new("bulk_create_files", OperationCategory::Create);
const GET_FILE_STATS: Operation = Operation::new("get_file_stats", OperationCategory::Query);
const EXISTS: Operation = Operation::new("exists", OperationCategory::Read);
const COUNT: Operation = Operation::new("count", OperationCategory::Query);

/// Reference adapter: the full contract over process memory.
///
/// Useful for tests and development, and as the conformance model for
/// relational adapters. Storage-key uniqueness is enforced with a
/// secondary index, standing in for the unique constraint a relational
/// backend would carry.
pub struct MemoryFileRepository {
    /// Records indexed by id.
    files: Arc<RwLock<HashMap<String, FileRecord>>>,
    /// Unique index: storage_key -> id.
    key_index: Arc<RwLock<HashMap<String, String>>>,
    hooks: SharedHooks,
    users: Option<Arc<dyn UserSource>>,
}

impl MemoryFileRepository {
    pub fn new() -> Self {
        Self::with_hooks(RepositoryHooks::new())
    }

    /// Construct with an initial hook table.
    pub fn with_hooks(hooks: RepositoryHooks) -> Self {
        Self {
            files: Arc::new(RwLock::new(HashMap::new())),
            key_index: Arc::new(RwLock::new(HashMap::new())),
            hooks: SharedHooks::new(hooks),
            users: None,
        }
    }

    /// Configure a users source so listings can join uploader identity.
    pub fn with_user_source(mut self, users: Arc<dyn UserSource>) -> Self {
        self.users = Some(users);
        self
    }

    fn validate_insert(data: &FileInsert) -> StashResult<()> {
        if data.storage_key.is_empty() {
            bail_stash!(bad_request, "storage_key must not be empty");
        }
        if data.original_filename.is_empty() {
            bail_stash!(bad_request, "original_filename must not be empty");
        }
        Ok(())
    }

    fn build_record(data: FileInsert) -> FileRecord {
        FileRecord {
            id: FileId(Uuid::new_v4().to_string()),
            storage_key: data.storage_key,
            original_filename: data.original_filename,
            file_size: data.file_size,
            public_url: data.public_url,
            uploaded_by: data.uploaded_by,
            created_at: Utc::now(),
        }
    }

    fn insert_one(&self, data: FileInsert) -> StashResult<FileRecord> {
        Self::validate_insert(&data)?;

        // Lock order: key_index before files, everywhere.
        let mut key_index = self.key_index.write();
        if key_index.contains_key(&data.storage_key) {
            return Err(StashError::conflict("storage key already exists")
                .with_data(json!({ "storage_key": data.storage_key }))
                .into_anyhow());
        }

        let record = Self::build_record(data);
        key_index.insert(record.storage_key.clone(), record.id.0.clone());
        self.files.write().insert(record.id.0.clone(), record.clone());

        Ok(record)
    }

    fn matching_records(&self, filter: &FileFilter) -> Vec<FileRecord> {
        self.files
            .read()
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect()
    }

    async fn join_uploader(
        &self,
        record: FileRecord,
        include: bool,
    ) -> StashResult<FileEntry> {
        let uploader = match (&self.users, include) {
            (Some(users), true) => users
                .uploader(&record.uploaded_by)
                .await
                .map_err(|err| StashError::normalize(err).into_anyhow())?,
            _ => None,
        };
        Ok(FileEntry { record, uploader })
    }
}

impl Default for MemoryFileRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileRepository for MemoryFileRepository {
    fn hooks(&self) -> &SharedHooks {
        &self.hooks
    }

    async fn create_file(&self, data: FileInsert) -> StashResult<FileRecord> {
        let hooks = self.hooks.snapshot();
        let payload = serde_json::to_value(&data).ok();

        run_hooked(&hooks, CREATE_FILE, payload, || async move {
            self.insert_one(data)
        })
        .await
    }

    async fn get_file_by_id(&self, id: &FileId) -> StashResult<Option<FileRecord>> {
        let hooks = self.hooks.snapshot();

        run_hooked(&hooks, GET_FILE_BY_ID, Some(json!({ "id": id.as_str() })), || async move {
            Ok(self.files.read().get(&id.0).cloned())
        })
        .await
    }

    async fn get_file_by_key(&self, storage_key: &str) -> StashResult<Option<FileRecord>> {
        let hooks = self.hooks.snapshot();

        run_hooked(
            &hooks,
            GET_FILE_BY_KEY,
            Some(json!({ "storage_key": storage_key })),
            || async move {
                let key_index = self.key_index.read();
                match key_index.get(storage_key) {
                    Some(id) => Ok(self.files.read().get(id).cloned()),
                    None => Ok(None),
                }
            },
        )
        .await
    }

    async fn update_file(&self, id: &FileId, update: FileUpdate) -> StashResult<FileRecord> {
        let hooks = self.hooks.snapshot();
        let payload = Some(json!({ "id": id.as_str(), "update": &update }));

        run_hooked(&hooks, UPDATE_FILE, payload, || async move {
            let mut files = self.files.write();
            // Missing id wins over an empty update.
            let record = files.get_mut(&id.0).ok_or_else(|| {
                StashError::not_found("file not found")
                    .with_data(json!({ "id": id.as_str() }))
                    .into_anyhow()
            })?;

            if update.is_empty() {
                bail_stash!(bad_request, "update contains no fields");
            }

            update.apply_to(record);
            Ok(record.clone())
        })
        .await
    }

    async fn delete_file(&self, id: &FileId) -> StashResult<()> {
        let hooks = self.hooks.snapshot();

        run_hooked(&hooks, DELETE_FILE, Some(json!({ "id": id.as_str() })), || async move {
            let mut key_index = self.key_index.write();
            let mut files = self.files.write();

            let record = files.remove(&id.0).ok_or_else(|| {
                StashError::not_found("file not found")
                    .with_data(json!({ "id": id.as_str() }))
                    .into_anyhow()
            })?;

            key_index.remove(&record.storage_key);
            Ok(())
        })
        .await
    }

    async fn get_files_by_user(&self, user_id: &str) -> StashResult<Vec<FileRecord>> {
        let hooks = self.hooks.snapshot();

        run_hooked(
            &hooks,
            GET_FILES_BY_USER,
            Some(json!({ "uploaded_by": user_id })),
            || async move {
                let filter = FileFilter::new().with_uploaded_by(user_id);
                let mut records = self.matching_records(&filter);
                records.sort_by(|a, b| compare_records(a, b, SortField::CreatedAt, SortOrder::Desc));
                Ok(records)
            },
        )
        .await
    }

    async fn get_all_files(&self, options: ListOptions) -> StashResult<FilePage> {
        let hooks = self.hooks.snapshot();
        let payload = serde_json::to_value(&options).ok();

        run_hooked(&hooks, GET_ALL_FILES, payload, || async move {
            let mut records = self.matching_records(&options.filter);
            let total = records.len() as u64;

            records.sort_by(|a, b| compare_records(a, b, options.sort_by, options.order));

            let offset = options.offset as usize;
            let limit = options.limit.map(|l| l as usize).unwrap_or(usize::MAX);

            let mut files = Vec::new();
            for record in records.into_iter().skip(offset).take(limit) {
                files.push(self.join_uploader(record, options.include_uploader).await?);
            }

            Ok(FilePage { files, total })
        })
        .await
    }

    async fn bulk_delete_files(&self, ids: &[FileId]) -> StashResult<u64> {
        let hooks = self.hooks.snapshot();
        let payload = serde_json::to_value(ids).ok();

        run_hooked(&hooks, BULK_DELETE_FILES, payload, || async move {
            // Empty input never touches storage.
            if ids.is_empty() {
                return Ok(0);
            }

            let mut key_index = self.key_index.write();
            let mut files = self.files.write();

            let mut deleted = 0u64;
            for id in ids {
                if let Some(record) = files.remove(&id.0) {
                    key_index.remove(&record.storage_key);
                    deleted += 1;
                }
            }

            Ok(deleted)
        })
        .await
    }

    async fn bulk_create_files(&self, records: Vec<FileInsert>) -> StashResult<Vec<FileRecord>> {
        let hooks = self.hooks.snapshot();
        let payload = serde_json::to_value(&records).ok();

        run_hooked(&hooks, BULK_CREATE_FILES, payload, || async move {
            if records.is_empty() {
                return Ok(Vec::new());
            }

            let mut key_index = self.key_index.write();
            let mut files = self.files.write();

            // Validate every row before inserting any, so the batch is
            // all-or-nothing.
            let mut batch_keys = HashSet::new();
            for data in &records {
                Self::validate_insert(data)?;
                if key_index.contains_key(&data.storage_key)
                    || !batch_keys.insert(data.storage_key.clone())
                {
                    return Err(StashError::conflict("storage key already exists")
                        .with_data(json!({ "storage_key": data.storage_key }))
                        .into_anyhow());
                }
            }

            let mut created = Vec::with_capacity(records.len());
            for data in records {
                let record = Self::build_record(data);
                key_index.insert(record.storage_key.clone(), record.id.0.clone());
                files.insert(record.id.0.clone(), record.clone());
                created.push(record);
            }

            Ok(created)
        })
        .await
    }

    async fn get_file_stats(&self) -> StashResult<FileStats> {
        let hooks = self.hooks.snapshot();

        run_hooked(&hooks, GET_FILE_STATS, None, || async move {
            let files = self.files.read();
            let total_files = files.len() as u64;
            let total_bytes: u64 = files.values().map(|r| r.file_size).sum();
            let cutoff = Utc::now() - Duration::days(7);
            let recent_files = files.values().filter(|r| r.created_at >= cutoff).count() as u64;
            let average_size = if total_files == 0 {
                0.0
            } else {
                total_bytes as f64 / total_files as f64
            };

            Ok(FileStats {
                total_files,
                total_bytes,
                recent_files,
                average_size,
            })
        })
        .await
    }

    async fn exists(&self, id: &FileId) -> StashResult<bool> {
        let hooks = self.hooks.snapshot();

        run_hooked(&hooks, EXISTS, Some(json!({ "id": id.as_str() })), || async move {
            Ok(self.files.read().contains_key(&id.0))
        })
        .await
    }

    async fn count(&self, filter: FileFilter) -> StashResult<u64> {
        let hooks = self.hooks.snapshot();
        let payload = serde_json::to_value(&filter).ok();

        run_hooked(&hooks, COUNT, payload, || async move {
            let files = self.files.read();
            Ok(files.values().filter(|record| filter.matches(record)).count() as u64)
        })
        .await
    }
}
