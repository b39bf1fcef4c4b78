//! stash-blob: blob storage seam and file service wiring for Stash.
//!
//! A [`BlobStore`] hides the storage vendor behind "put object", "get
//! object", "delete object"; [`FileService`] composes a store with a
//! [`stash_core::FileRepository`] so applications can accept uploads,
//! persist blob references, and serve/delete files without caring
//! which backend is active on either side.

mod error;
mod keys;
mod memory;
mod service;
mod store;

pub use error::{BlobError, BlobResult};
pub use keys::{DefaultKeyStrategy, KeyStrategy};
pub use memory::MemoryBlobStore;
pub use service::{FileService, FileServiceConfig, UploadRequest};
pub use store::{BlobStore, ObjectHead, PutResult, StoreCapabilities};
