// src/domain/import_job.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::candidate::CandidateBookmark;
use crate::domain::error::DomainError;
use crate::domain::owner::Owner;

/// Number of candidate bookmarks per chunk; one `process_chunk` call handles one chunk.
pub const CHUNK_SIZE: usize = 200;

/// Number of write operations per remote batch request.
pub const WRITE_BATCH_SIZE: usize = 10;

/// `ceil(to_import / CHUNK_SIZE)`
pub fn chunk_count(to_import: usize) -> usize {
    to_import.div_ceil(CHUNK_SIZE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, JobStatus::Completed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            other => Err(DomainError::ImportJobOperationFailed(format!(
                "Unknown job status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    Pending,
    /// Claimed by a caller that is writing it
    Processing,
    Done,
}

impl ChunkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStatus::Pending => "pending",
            ChunkStatus::Processing => "processing",
            ChunkStatus::Done => "done",
        }
    }
}

impl fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ChunkStatus::Pending),
            "processing" => Ok(ChunkStatus::Processing),
            "done" => Ok(ChunkStatus::Done),
            other => Err(DomainError::ImportJobOperationFailed(format!(
                "Unknown chunk status '{}'",
                other
            ))),
        }
    }
}

/// Durable state of one import.
///
/// Invariants: `imported + failed <= total - skipped`, with equality exactly when the job is
/// completed; `total_chunks == chunk_count(total - skipped)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportJob {
    pub id: String,
    pub owner: Owner,
    pub format: String,
    pub total: usize,
    pub skipped: usize,
    pub imported: usize,
    pub failed: usize,
    pub total_chunks: usize,
    pub processed_chunks: usize,
    /// Uniform tags, canonicalized when the job was created
    pub tags: Vec<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportJob {
    pub fn new(
        owner: Owner,
        format: impl Into<String>,
        total: usize,
        skipped: usize,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let to_import = total.saturating_sub(skipped);
        Self {
            id: Uuid::new_v4().to_string(),
            owner,
            format: format.into(),
            total,
            skipped,
            imported: 0,
            failed: 0,
            total_chunks: chunk_count(to_import),
            processed_chunks: 0,
            tags,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn to_import(&self) -> usize {
        self.total.saturating_sub(self.skipped)
    }

    pub fn remaining_chunks(&self) -> usize {
        self.total_chunks.saturating_sub(self.processed_chunks)
    }

    pub fn is_owned_by(&self, owner: &Owner) -> bool {
        self.owner == *owner
    }

    /// Fold one chunk's outcome into the counters and move the status forward.
    pub fn apply_chunk_outcome(&mut self, imported: usize, failed: usize, now: DateTime<Utc>) {
        self.imported += imported;
        self.failed += failed;
        self.processed_chunks = (self.processed_chunks + 1).min(self.total_chunks);
        self.status = if self.processed_chunks >= self.total_chunks {
            JobStatus::Completed
        } else {
            JobStatus::Processing
        };
        self.updated_at = now;
    }
}

/// A slice of a job's candidates, processed by exactly one `process_chunk` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportChunk {
    pub id: String,
    pub job_id: String,
    pub chunk_index: usize,
    pub bookmarks: Vec<CandidateBookmark>,
    pub status: ChunkStatus,
}

/// Split the candidates of `job_id` into dense, 0-indexed pending chunks of `CHUNK_SIZE`.
pub fn split_into_chunks(job_id: &str, candidates: Vec<CandidateBookmark>) -> Vec<ImportChunk> {
    let mut chunks = Vec::with_capacity(chunk_count(candidates.len()));
    let mut iter = candidates.into_iter().peekable();
    let mut index = 0;
    while iter.peek().is_some() {
        let bookmarks: Vec<CandidateBookmark> = iter.by_ref().take(CHUNK_SIZE).collect();
        chunks.push(ImportChunk {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            chunk_index: index,
            bookmarks,
            status: ChunkStatus::Pending,
        });
        index += 1;
    }
    chunks
}
