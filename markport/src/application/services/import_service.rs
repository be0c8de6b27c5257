// src/application/services/import_service.rs
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::error::ApplicationResult;
use crate::domain::candidate::CandidateBookmark;
use crate::domain::import_job::{ImportJob, JobStatus};
use crate::domain::owner::Owner;
use crate::domain::progress::{ChunkOutcome, ImportProgress, ImportResult};

/// Answer to `prepare_import`.
///
/// Exactly one of `job_id` and `result` is set: `result` when nothing was left to import.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareImportResponse {
    pub total: usize,
    pub skipped: usize,
    pub to_import: usize,
    pub total_chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ImportResult>,
}

/// Answer to `process_chunk` and `job_status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessChunkResponse {
    /// Whether this call wrote a chunk
    pub chunk_processed: bool,
    pub done: bool,
    /// Contribution of this call
    pub imported: usize,
    pub failed: usize,
    pub total_imported: usize,
    pub total_failed: usize,
    pub remaining: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ImportResult>,
}

impl ProcessChunkResponse {
    pub fn of(job: &ImportJob, outcome: Option<ChunkOutcome>) -> Self {
        let progress = ImportProgress::of(job);
        let this_call = outcome.unwrap_or_default();
        Self {
            chunk_processed: outcome.is_some(),
            done: progress.done,
            imported: this_call.imported,
            failed: this_call.failed,
            total_imported: progress.total_imported,
            total_failed: progress.total_failed,
            remaining: progress.remaining,
            result: ImportProgress::result(job),
        }
    }
}

/// One line of `list_jobs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: String,
    pub format: String,
    pub status: JobStatus,
    pub total: usize,
    pub skipped: usize,
    pub imported: usize,
    pub failed: usize,
    pub total_chunks: usize,
    pub processed_chunks: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ImportJob> for JobSummary {
    fn from(job: &ImportJob) -> Self {
        Self {
            job_id: job.id.clone(),
            format: job.format.clone(),
            status: job.status,
            total: job.total,
            skipped: job.skipped,
            imported: job.imported,
            failed: job.failed,
            total_chunks: job.total_chunks,
            processed_chunks: job.processed_chunks,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// Chunked import of normalized candidate bookmarks into an owner's remote repository.
pub trait ImportService: Send + Sync {
    /// Deduplicate `candidates` against the owner's bookmarks and create a chunked job for
    /// the rest. Duplicates and candidates without a web URL count as skipped.
    fn prepare_import(
        &self,
        owner: &Owner,
        format: &str,
        candidates: Vec<CandidateBookmark>,
        uniform_tags: &[String],
    ) -> ApplicationResult<PrepareImportResponse>;

    /// Write the next pending chunk of the job. Each call advances the job by at most one
    /// chunk.
    fn process_chunk(&self, owner: &Owner, job_id: &str) -> ApplicationResult<ProcessChunkResponse>;

    /// Progress of a job without advancing it.
    fn job_status(&self, owner: &Owner, job_id: &str) -> ApplicationResult<ProcessChunkResponse>;

    /// The owner's jobs, newest first.
    fn list_jobs(&self, owner: &Owner) -> ApplicationResult<Vec<JobSummary>>;

    /// Delete jobs older than the configured age. Returns how many were deleted.
    fn sweep_stale_jobs(&self, now: DateTime<Utc>) -> ApplicationResult<usize>;
}
