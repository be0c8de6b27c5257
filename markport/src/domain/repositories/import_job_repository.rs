// src/domain/repositories/import_job_repository.rs
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use crate::domain::error::DomainResult;
use crate::domain::import_job::{ImportChunk, ImportJob};
use crate::domain::owner::Owner;
use crate::domain::progress::ChunkOutcome;

/// Result of trying to claim the next chunk of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkClaim {
    /// The lowest-index pending chunk, now marked as processing
    Claimed(ImportChunk),
    /// Another caller holds a live claim on a chunk of this job
    Busy,
    /// Every chunk is done
    Exhausted,
}

/// Durable store for import jobs and their chunks.
///
/// Jobs are looked up by id; callers check ownership. Chunks are only ever addressed
/// through their job.
pub trait ImportJobRepository: Send + Sync + Debug {
    /// Persist a job and all of its chunks atomically.
    fn create(&self, job: &ImportJob, chunks: &[ImportChunk]) -> DomainResult<()>;

    fn get(&self, job_id: &str) -> DomainResult<Option<ImportJob>>;

    /// Jobs of one owner, newest first
    fn list_by_owner(&self, owner: &Owner) -> DomainResult<Vec<ImportJob>>;

    /// Delete the owner's pending and processing jobs with their chunks. Returns the number
    /// of jobs deleted.
    fn delete_active_for_owner(&self, owner: &Owner) -> DomainResult<usize>;

    /// Claim the lowest-index pending chunk of a job.
    ///
    /// A processing chunk claimed before `stale_before` counts as abandoned and can be
    /// claimed again.
    fn claim_next_chunk(
        &self,
        job_id: &str,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> DomainResult<ChunkClaim>;

    /// Return a claimed chunk to pending without touching the job.
    ///
    /// Only the claim stamped `claimed_at` is released; returns false when the chunk has
    /// since been reclaimed or finished.
    fn release_chunk(&self, chunk_id: &str, claimed_at: DateTime<Utc>) -> DomainResult<bool>;

    /// Mark a chunk done and fold its outcome into the job, in one transaction.
    ///
    /// Completing a chunk that is already done leaves the counters untouched.
    fn complete_chunk(
        &self,
        job_id: &str,
        chunk_id: &str,
        outcome: ChunkOutcome,
        now: DateTime<Utc>,
    ) -> DomainResult<ImportJob>;

    /// Delete jobs created before `cutoff`, whatever their status, with their chunks.
    fn delete_created_before(&self, cutoff: DateTime<Utc>) -> DomainResult<usize>;
}
