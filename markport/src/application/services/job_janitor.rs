// src/application/services/job_janitor.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument};

use crate::application::error::ApplicationResult;
use crate::domain::owner::Owner;
use crate::domain::repositories::import_job_repository::ImportJobRepository;

/// Keeps the job store bounded: one active job per owner, nothing older than `max_age`.
#[derive(Debug, Clone)]
pub struct JobJanitor {
    jobs: Arc<dyn ImportJobRepository>,
    max_age: Duration,
}

impl JobJanitor {
    pub fn new(jobs: Arc<dyn ImportJobRepository>, max_age: Duration) -> Self {
        Self { jobs, max_age }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Delete every job created more than `max_age` before `now`, with its chunks.
    #[instrument(skip(self), level = "debug")]
    pub fn sweep(&self, now: DateTime<Utc>) -> ApplicationResult<usize> {
        let deleted = self.jobs.delete_created_before(now - self.max_age)?;
        if deleted > 0 {
            info!("Swept {} stale import job(s)", deleted);
        }
        Ok(deleted)
    }

    /// Delete the owner's pending and processing jobs before a new one is created.
    #[instrument(skip(self), level = "debug", fields(owner = %owner))]
    pub fn retire_active_jobs(&self, owner: &Owner) -> ApplicationResult<usize> {
        Ok(self.jobs.delete_active_for_owner(owner)?)
    }
}
