//! stash-core: backend-agnostic core for Stash file-upload
//! integrations.
//!
//! Defines the hook execution pipeline, the repository contract that
//! concrete persistence backends implement, the canonical metadata
//! types, and the uniform error taxonomy.

pub mod errors;
pub mod hooks;
pub mod query;
pub mod repository;
pub mod types;

pub use errors::{ErrorKind, StashError, StashResult};
pub use hooks::{
    hook_fn, intercept_fn, run_hooked, ErrorSnapshot, HookContext, HookFn, HookFuture, HookStage,
    InterceptFn, InterceptStage, Operation, OperationCategory, RepositoryHooks, SharedHooks,
};
pub use query::{compare_records, FileFilter, ListOptions, SortField, SortOrder};
pub use repository::FileRepository;
pub use types::{
    FileEntry, FileId, FileInsert, FilePage, FileRecord, FileStats, FileUpdate, Uploader,
    UserSource,
};
