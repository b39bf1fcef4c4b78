//! A map-backed users source for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use stash_core::{StashResult, Uploader, UserSource};

/// In-memory uploader directory.
#[derive(Default)]
pub struct MemoryUserSource {
    users: RwLock<HashMap<String, Uploader>>,
}

impl MemoryUserSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&self, user_id: S, uploader: Uploader) {
        self.users.write().insert(user_id.into(), uploader);
    }
}

#[async_trait]
impl UserSource for MemoryUserSource {
    async fn uploader(&self, user_id: &str) -> StashResult<Option<Uploader>> {
        Ok(self.users.read().get(user_id).cloned())
    }
}
