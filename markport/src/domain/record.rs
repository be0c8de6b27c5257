// src/domain/record.rs
//! Records held by the owner's remote repository and the write operations sent to it.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a bookmark record as stored remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    /// The bookmarked URL
    pub subject: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A bookmark record together with its record key.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBookmark {
    pub rkey: String,
    pub record: BookmarkRecord,
}

/// A tag record. Tags are separate records so that casing can be tracked per owner.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTag {
    pub rkey: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOperation {
    CreateBookmark(BookmarkRecord),
    UpdateBookmark { rkey: String, record: BookmarkRecord },
    DeleteTag { rkey: String },
}

/// Result of one operation inside an accepted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Rejected(String),
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written)
    }
}
