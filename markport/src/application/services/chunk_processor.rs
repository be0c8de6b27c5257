// src/application/services/chunk_processor.rs
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, instrument, warn};

use crate::application::error::ApplicationResult;
use crate::domain::candidate::CandidateBookmark;
use crate::domain::import_job::{ImportChunk, ImportJob, WRITE_BATCH_SIZE};
use crate::domain::owner::Owner;
use crate::domain::progress::ChunkOutcome;
use crate::domain::record::{BookmarkRecord, WriteOperation, WriteOutcome};
use crate::domain::repositories::remote_repository::RemoteRepository;
use crate::domain::tag::{clean_tag, tag_key, TagResolver};

/// Writes one claimed chunk to the owner's remote repository.
///
/// Individual write failures are counted, never returned: once the owner's tags are loaded
/// the call always yields an outcome covering every bookmark of the chunk.
#[derive(Debug, Clone)]
pub struct ChunkProcessor {
    remote: Arc<dyn RemoteRepository>,
}

impl ChunkProcessor {
    pub fn new(remote: Arc<dyn RemoteRepository>) -> Self {
        Self { remote }
    }

    #[instrument(skip_all, level = "debug", fields(job_id = %job.id, chunk = chunk.chunk_index))]
    pub fn process(&self, job: &ImportJob, chunk: &ImportChunk) -> ApplicationResult<ChunkOutcome> {
        let existing_tags = self
            .remote
            .list_tags(&job.owner)
            .map_err(|e| e.context("loading tags"))?;
        let mut resolver = TagResolver::new(&existing_tags);

        let operations: Vec<WriteOperation> = chunk
            .bookmarks
            .iter()
            .map(|candidate| {
                let tags = self.resolve_tags(&mut resolver, &job.owner, &job.tags, candidate);
                WriteOperation::CreateBookmark(BookmarkRecord {
                    subject: candidate.url.clone(),
                    title: candidate.title.clone(),
                    description: candidate.description.clone(),
                    tags,
                    created_at: candidate.created_at,
                })
            })
            .collect();

        let mut outcome = ChunkOutcome::default();
        for (batch_no, batch) in operations.chunks(WRITE_BATCH_SIZE).enumerate() {
            match self.remote.write_batch(&job.owner, batch) {
                Ok(results) => {
                    let written = results
                        .iter()
                        .take(batch.len())
                        .filter(|r| r.is_written())
                        .count();
                    for reason in results.iter().filter_map(|r| match r {
                        WriteOutcome::Rejected(reason) => Some(reason),
                        WriteOutcome::Written => None,
                    }) {
                        debug!("Write rejected in batch {}: {}", batch_no, reason);
                    }
                    outcome.record_batch(written, batch.len() - written);
                }
                Err(e) => {
                    warn!(
                        "Batch {} of chunk {} failed, {} bookmark(s) marked failed: {}",
                        batch_no,
                        chunk.chunk_index,
                        batch.len(),
                        e
                    );
                    outcome.record_batch(0, batch.len());
                }
            }
        }

        debug!(
            "Chunk {} written: {} imported, {} failed",
            chunk.chunk_index, outcome.imported, outcome.failed
        );
        Ok(outcome)
    }

    /// Uniform job tags followed by the bookmark's own tags, in canonical casing.
    /// Tag records are created for casings the owner has never used.
    fn resolve_tags(
        &self,
        resolver: &mut TagResolver,
        owner: &Owner,
        job_tags: &[String],
        candidate: &CandidateBookmark,
    ) -> Vec<String> {
        let raw: Vec<String> = job_tags
            .iter()
            .chain(candidate.source_tags.iter())
            .filter_map(clean_tag)
            .unique_by(|tag| tag_key(tag))
            .collect();

        raw.iter()
            .map(|tag| {
                let resolved = resolver.resolve(tag);
                if resolved.is_new {
                    if let Err(e) = self.remote.create_tag(owner, &resolved.value) {
                        warn!("Could not create tag '{}': {}", resolved.value, e);
                    }
                    resolver.register(&resolved.value);
                }
                resolved.value
            })
            .collect()
    }
}
