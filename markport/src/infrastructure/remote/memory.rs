// src/infrastructure/remote/memory.rs
//! Process-local record repository. Backs tests and `--dry-run` imports.
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::owner::Owner;
use crate::domain::record::{
    BookmarkRecord, StoredBookmark, StoredTag, WriteOperation, WriteOutcome,
};
use crate::domain::repositories::remote_repository::{RepositoryReader, RepositoryWriter};

#[derive(Debug, Default)]
struct OwnerRecords {
    bookmarks: Vec<StoredBookmark>,
    tags: Vec<StoredTag>,
}

#[derive(Debug, Default)]
struct State {
    owners: HashMap<Owner, OwnerRecords>,
    next_key: u64,
    batch_calls: usize,
    /// Batches containing one of these subjects fail as a whole
    failing_subjects: HashSet<String>,
    /// Operations on these subjects are rejected individually
    rejected_subjects: HashSet<String>,
    fail_tag_creation: bool,
    fail_tag_listing: bool,
}

impl State {
    fn next_rkey(&mut self) -> String {
        self.next_key += 1;
        format!("3m{:011}", self.next_key)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> DomainResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| DomainError::RemoteError(format!("in-memory repository poisoned: {}", e)))
    }

    /// Seed a bookmark record, returning its rkey.
    pub fn insert_bookmark(&self, owner: &Owner, record: BookmarkRecord) -> DomainResult<String> {
        let mut state = self.lock()?;
        let rkey = state.next_rkey();
        state
            .owners
            .entry(owner.clone())
            .or_default()
            .bookmarks
            .push(StoredBookmark {
                rkey: rkey.clone(),
                record,
            });
        Ok(rkey)
    }

    /// Seed a tag record with an explicit creation time.
    pub fn insert_tag(
        &self,
        owner: &Owner,
        value: &str,
        created_at: chrono::DateTime<Utc>,
    ) -> DomainResult<StoredTag> {
        let mut state = self.lock()?;
        let tag = StoredTag {
            rkey: state.next_rkey(),
            value: value.to_string(),
            created_at,
        };
        state
            .owners
            .entry(owner.clone())
            .or_default()
            .tags
            .push(tag.clone());
        Ok(tag)
    }

    /// Make every batch that contains `subject` fail as a whole.
    pub fn fail_batches_containing(&self, subject: &str) -> DomainResult<()> {
        self.lock()?.failing_subjects.insert(subject.to_string());
        Ok(())
    }

    /// Reject the single operation writing `subject`.
    pub fn reject_subject(&self, subject: &str) -> DomainResult<()> {
        self.lock()?.rejected_subjects.insert(subject.to_string());
        Ok(())
    }

    pub fn set_fail_tag_creation(&self, fail: bool) -> DomainResult<()> {
        self.lock()?.fail_tag_creation = fail;
        Ok(())
    }

    pub fn set_fail_tag_listing(&self, fail: bool) -> DomainResult<()> {
        self.lock()?.fail_tag_listing = fail;
        Ok(())
    }

    /// Number of `write_batch` calls seen so far
    pub fn batch_calls(&self) -> DomainResult<usize> {
        Ok(self.lock()?.batch_calls)
    }
}

fn subject_of(op: &WriteOperation) -> Option<&str> {
    match op {
        WriteOperation::CreateBookmark(record) => Some(&record.subject),
        WriteOperation::UpdateBookmark { record, .. } => Some(&record.subject),
        WriteOperation::DeleteTag { .. } => None,
    }
}

impl RepositoryReader for InMemoryRepository {
    fn list_bookmarks(&self, owner: &Owner) -> DomainResult<Vec<StoredBookmark>> {
        let state = self.lock()?;
        Ok(state
            .owners
            .get(owner)
            .map(|r| r.bookmarks.clone())
            .unwrap_or_default())
    }

    fn list_tags(&self, owner: &Owner) -> DomainResult<Vec<StoredTag>> {
        let state = self.lock()?;
        if state.fail_tag_listing {
            return Err(DomainError::RemoteError("listRecords unavailable".to_string()));
        }
        Ok(state
            .owners
            .get(owner)
            .map(|r| r.tags.clone())
            .unwrap_or_default())
    }
}

impl RepositoryWriter for InMemoryRepository {
    #[instrument(skip_all, level = "trace", fields(owner = %owner, ops = operations.len()))]
    fn write_batch(
        &self,
        owner: &Owner,
        operations: &[WriteOperation],
    ) -> DomainResult<Vec<WriteOutcome>> {
        let mut state = self.lock()?;
        state.batch_calls += 1;

        if let Some(subject) = operations
            .iter()
            .filter_map(subject_of)
            .find(|s| state.failing_subjects.contains(*s))
        {
            return Err(DomainError::RemoteError(format!(
                "batch rejected by server (contains {})",
                subject
            )));
        }

        let mut outcomes = Vec::with_capacity(operations.len());
        for op in operations {
            if let Some(subject) = subject_of(op) {
                if state.rejected_subjects.contains(subject) {
                    outcomes.push(WriteOutcome::Rejected(format!("invalid record: {}", subject)));
                    continue;
                }
            }

            let outcome = match op {
                WriteOperation::CreateBookmark(record) => {
                    let rkey = state.next_rkey();
                    state
                        .owners
                        .entry(owner.clone())
                        .or_default()
                        .bookmarks
                        .push(StoredBookmark {
                            rkey,
                            record: record.clone(),
                        });
                    WriteOutcome::Written
                }
                WriteOperation::UpdateBookmark { rkey, record } => {
                    let records = state.owners.entry(owner.clone()).or_default();
                    match records.bookmarks.iter_mut().find(|b| &b.rkey == rkey) {
                        Some(stored) => {
                            stored.record = record.clone();
                            WriteOutcome::Written
                        }
                        None => WriteOutcome::Rejected(format!("no bookmark {}", rkey)),
                    }
                }
                WriteOperation::DeleteTag { rkey } => {
                    let records = state.owners.entry(owner.clone()).or_default();
                    let before = records.tags.len();
                    records.tags.retain(|t| &t.rkey != rkey);
                    if records.tags.len() < before {
                        WriteOutcome::Written
                    } else {
                        WriteOutcome::Rejected(format!("no tag {}", rkey))
                    }
                }
            };
            outcomes.push(outcome);
        }

        debug!("Applied batch of {} operation(s)", operations.len());
        Ok(outcomes)
    }

    fn create_tag(&self, owner: &Owner, value: &str) -> DomainResult<StoredTag> {
        if self.lock()?.fail_tag_creation {
            return Err(DomainError::RemoteError(format!(
                "could not create tag '{}'",
                value
            )));
        }
        self.insert_tag(owner, value, Utc::now())
    }
}
