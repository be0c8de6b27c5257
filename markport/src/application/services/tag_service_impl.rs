// src/application/services/tag_service_impl.rs
use std::sync::Arc;

use crate::application::error::ApplicationResult;
use crate::application::services::tag_service::{MergeDetail, MergeReport, TagService};
use crate::domain::import_job::WRITE_BATCH_SIZE;
use crate::domain::owner::Owner;
use crate::domain::record::{BookmarkRecord, WriteOperation};
use crate::domain::repositories::remote_repository::RemoteRepository;
use crate::domain::tag::merge_duplicates;
use tracing::{debug, info, instrument, warn};

pub struct TagServiceImpl<R: RemoteRepository + ?Sized> {
    repository: Arc<R>,
}

impl<R: RemoteRepository + ?Sized> TagServiceImpl<R> {
    pub fn new(repository: Arc<R>) -> Self {
        debug!("Creating new TagServiceImpl");
        Self { repository }
    }

    /// Submit operations in write batches; one flag per operation, true when written.
    fn write_all(&self, owner: &Owner, operations: &[WriteOperation]) -> Vec<bool> {
        let mut written = Vec::with_capacity(operations.len());
        for batch in operations.chunks(WRITE_BATCH_SIZE) {
            match self.repository.write_batch(owner, batch) {
                Ok(results) => written.extend(
                    (0..batch.len()).map(|i| results.get(i).is_some_and(|r| r.is_written())),
                ),
                Err(e) => {
                    warn!("Tag merge batch of {} failed: {}", batch.len(), e);
                    written.extend(std::iter::repeat(false).take(batch.len()));
                }
            }
        }
        written
    }
}

impl<R: RemoteRepository + ?Sized> TagService for TagServiceImpl<R> {
    #[instrument(skip(self), level = "debug", fields(owner = %owner))]
    fn merge_duplicate_tags(&self, owner: &Owner) -> ApplicationResult<MergeReport> {
        let tags = self
            .repository
            .list_tags(owner)
            .map_err(|e| e.context("loading tags"))?;
        let bookmarks = self
            .repository
            .list_bookmarks(owner)
            .map_err(|e| e.context("loading bookmarks"))?;

        let plan = merge_duplicates(&tags, &bookmarks);
        if plan.is_empty() {
            debug!("No case-variant tags for {}", owner);
            return Ok(MergeReport::default());
        }

        let updates: Vec<WriteOperation> = plan
            .rewrites
            .iter()
            .map(|rewrite| WriteOperation::UpdateBookmark {
                rkey: rewrite.bookmark.rkey.clone(),
                record: BookmarkRecord {
                    tags: rewrite.tags.clone(),
                    ..rewrite.bookmark.record.clone()
                },
            })
            .collect();
        let updated = self.write_all(owner, &updates);

        let mut rewritten = vec![0usize; plan.groups.len()];
        let mut unfinished = vec![false; plan.groups.len()];
        for (rewrite, ok) in plan.rewrites.iter().zip(&updated) {
            for &g in &rewrite.groups {
                if *ok {
                    rewritten[g] += 1;
                } else {
                    unfinished[g] = true;
                }
            }
        }

        // tag records of a class go only once no bookmark references them
        let (delete_groups, deletes): (Vec<usize>, Vec<WriteOperation>) = plan
            .groups
            .iter()
            .enumerate()
            .filter(|(g, _)| !unfinished[*g])
            .flat_map(|(g, group)| {
                group.duplicates.iter().map(move |tag| {
                    (
                        g,
                        WriteOperation::DeleteTag {
                            rkey: tag.rkey.clone(),
                        },
                    )
                })
            })
            .unzip();
        let deleted = self.write_all(owner, &deletes);
        for (&g, ok) in delete_groups.iter().zip(&deleted) {
            if !ok {
                unfinished[g] = true;
            }
        }

        let details: Vec<MergeDetail> = plan
            .groups
            .iter()
            .enumerate()
            .filter_map(|(g, group)| {
                if unfinished[g] {
                    warn!(
                        "Tag class '{}' only partly merged: {} of {} bookmark(s) rewritten",
                        group.canonical.value, rewritten[g], group.bookmarks_affected
                    );
                    return None;
                }
                Some(MergeDetail {
                    canonical: group.canonical.value.clone(),
                    merged: group.duplicates.iter().map(|t| t.value.clone()).collect(),
                    bookmarks_updated: rewritten[g],
                })
            })
            .collect();

        let bookmarks_updated = updated.iter().filter(|ok| **ok).count();
        let tags_deleted = deleted.iter().filter(|ok| **ok).count();
        info!(
            "Merged {} of {} tag class(es) of {}: {} tag(s) deleted, {} bookmark(s) updated",
            details.len(),
            plan.groups.len(),
            owner,
            tags_deleted,
            bookmarks_updated
        );
        Ok(MergeReport {
            merged: details.len(),
            tags_deleted,
            bookmarks_updated,
            details,
        })
    }
}
