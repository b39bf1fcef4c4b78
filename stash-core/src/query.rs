//! Filter, sort, and pagination options for listing operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::FileRecord;

/// Filter predicate shared by `get_all_files` and `count`.
///
/// All fields are conjunctive; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileFilter {
    /// Substring match on the original filename.
    pub filename_contains: Option<String>,
    /// Exact match on the owning principal.
    pub uploaded_by: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl FileFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filename_contains<S: Into<String>>(mut self, needle: S) -> Self {
        self.filename_contains = Some(needle.into());
        self
    }

    pub fn with_uploaded_by<S: Into<String>>(mut self, user: S) -> Self {
        self.uploaded_by = Some(user.into());
        self
    }

    pub fn with_created_after(mut self, at: DateTime<Utc>) -> Self {
        self.created_after = Some(at);
        self
    }

    pub fn with_created_before(mut self, at: DateTime<Utc>) -> Self {
        self.created_before = Some(at);
        self
    }

    /// Evaluate the predicate against one record.
    ///
    /// Relational adapters translate the filter into their query
    /// language instead; both must agree with this definition.
    pub fn matches(&self, record: &FileRecord) -> bool {
        if let Some(needle) = &self.filename_contains {
            if !record.original_filename.contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(user) = &self.uploaded_by {
            if record.uploaded_by != *user {
                return false;
            }
        }
        if let Some(after) = &self.created_after {
            if record.created_at < *after {
                return false;
            }
        }
        if let Some(before) = &self.created_before {
            if record.created_at > *before {
                return false;
            }
        }
        true
    }
}

/// Sortable columns for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    CreatedAt,
    FileSize,
    Filename,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Options for `get_all_files`.
///
/// Defaults to newest-first with no limit and no uploader join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListOptions {
    pub filter: FileFilter,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub limit: Option<u32>,
    pub offset: u32,
    /// Join owner name/email when the adapter has a users source.
    pub include_uploader: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            filter: FileFilter::default(),
            sort_by: SortField::CreatedAt,
            order: SortOrder::Desc,
            limit: None,
            offset: 0,
            include_uploader: false,
        }
    }
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: FileFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn sort_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = field;
        self.order = order;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_uploader(mut self) -> Self {
        self.include_uploader = true;
        self
    }
}

/// Total ordering for in-process adapters.
///
/// Ties break on id so pagination is stable across calls.
pub fn compare_records(
    a: &FileRecord,
    b: &FileRecord,
    field: SortField,
    order: SortOrder,
) -> std::cmp::Ordering {
    let ordering = match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::FileSize => a.file_size.cmp(&b.file_size),
        SortField::Filename => a.original_filename.cmp(&b.original_filename),
    };
    let ordering = ordering.then_with(|| a.id.as_str().cmp(b.id.as_str()));
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}
