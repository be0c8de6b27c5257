// src/domain/progress.rs
use serde::Serialize;

use crate::domain::import_job::ImportJob;

/// What one chunk contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub imported: usize,
    pub failed: usize,
}

impl ChunkOutcome {
    pub fn record_batch(&mut self, imported: usize, failed: usize) {
        self.imported += imported;
        self.failed += failed;
    }

    pub fn attempted(&self) -> usize {
        self.imported + self.failed
    }
}

/// Final summary of an import. Same shape whether the import finished synchronously at
/// prepare time or after many chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub total: usize,
    pub skipped: usize,
    pub imported: usize,
    pub failed: usize,
    pub format: String,
}

impl ImportResult {
    /// Nothing left to import after dedup.
    pub fn nothing_to_import(total: usize, skipped: usize, format: impl Into<String>) -> Self {
        Self {
            total,
            skipped,
            imported: 0,
            failed: 0,
            format: format.into(),
        }
    }
}

/// Cumulative progress of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    pub total_imported: usize,
    pub total_failed: usize,
    pub remaining: usize,
    pub done: bool,
}

impl ImportProgress {
    pub fn of(job: &ImportJob) -> Self {
        let remaining = job.remaining_chunks();
        Self {
            total_imported: job.imported,
            total_failed: job.failed,
            remaining,
            done: remaining == 0,
        }
    }

    /// Summary, available once no chunks remain.
    pub fn result(job: &ImportJob) -> Option<ImportResult> {
        if job.remaining_chunks() > 0 {
            return None;
        }
        Some(ImportResult {
            total: job.total,
            skipped: job.skipped,
            imported: job.imported,
            failed: job.failed,
            format: job.format.clone(),
        })
    }
}
