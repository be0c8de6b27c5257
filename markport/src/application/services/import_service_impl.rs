// src/application/services/import_service_impl.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, warn};

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::chunk_processor::ChunkProcessor;
use crate::application::services::import_service::{
    ImportService, JobSummary, PrepareImportResponse, ProcessChunkResponse,
};
use crate::application::services::job_janitor::JobJanitor;
use crate::config::ImportSettings;
use crate::domain::candidate::CandidateBookmark;
use crate::domain::dedup::partition_candidates;
use crate::domain::import_job::{split_into_chunks, ImportJob};
use crate::domain::owner::Owner;
use crate::domain::progress::ImportResult;
use crate::domain::repositories::import_job_repository::{ChunkClaim, ImportJobRepository};
use crate::domain::repositories::remote_repository::RemoteRepository;
use crate::domain::tag::TagResolver;

#[derive(Debug)]
pub struct ImportServiceImpl {
    jobs: Arc<dyn ImportJobRepository>,
    remote: Arc<dyn RemoteRepository>,
    processor: ChunkProcessor,
    janitor: JobJanitor,
    claim_lease: Duration,
}

impl ImportServiceImpl {
    pub fn new(
        jobs: Arc<dyn ImportJobRepository>,
        remote: Arc<dyn RemoteRepository>,
        settings: &ImportSettings,
    ) -> Self {
        Self {
            processor: ChunkProcessor::new(remote.clone()),
            janitor: JobJanitor::new(
                jobs.clone(),
                Duration::hours(i64::from(settings.job_max_age_hours)),
            ),
            claim_lease: Duration::seconds(i64::from(settings.claim_lease_secs)),
            jobs,
            remote,
        }
    }

    /// Load a job, distinguishing a missing id from a job of another owner.
    fn load_owned(&self, owner: &Owner, job_id: &str) -> ApplicationResult<ImportJob> {
        let job = self
            .jobs
            .get(job_id)?
            .ok_or_else(|| ApplicationError::JobNotFound(job_id.to_string()))?;
        if !job.is_owned_by(owner) {
            warn!("Owner {} requested job {} of another owner", owner, job_id);
            return Err(ApplicationError::JobForbidden(job_id.to_string()));
        }
        Ok(job)
    }
}

impl ImportService for ImportServiceImpl {
    #[instrument(skip(self, candidates, uniform_tags), level = "debug",
        fields(owner = %owner, candidates = candidates.len()))]
    fn prepare_import(
        &self,
        owner: &Owner,
        format: &str,
        candidates: Vec<CandidateBookmark>,
        uniform_tags: &[String],
    ) -> ApplicationResult<PrepareImportResponse> {
        let format = format.trim();
        if format.is_empty() {
            return Err(ApplicationError::Validation(
                "Import format must be named".to_string(),
            ));
        }
        if candidates.is_empty() {
            return Err(ApplicationError::Validation(
                "No bookmarks to import".to_string(),
            ));
        }

        let existing = self
            .remote
            .list_bookmarks(owner)
            .map_err(|e| e.context("loading existing bookmarks"))?;
        let outcome = partition_candidates(candidates, &existing);
        let total = outcome.total();
        let skipped = outcome.skipped();
        let to_import = outcome.to_import.len();
        debug!(
            "{} candidate(s): {} to import, {} duplicate(s), {} invalid",
            total,
            to_import,
            outcome.duplicates.len(),
            outcome.invalid.len()
        );

        if to_import == 0 {
            return Ok(PrepareImportResponse {
                total,
                skipped,
                to_import,
                total_chunks: 0,
                job_id: None,
                result: Some(ImportResult::nothing_to_import(total, skipped, format)),
            });
        }

        let existing_tags = self
            .remote
            .list_tags(owner)
            .map_err(|e| e.context("loading tags"))?;
        let tags = TagResolver::new(&existing_tags).canonicalize_all(uniform_tags);

        let now = Utc::now();
        if let Err(e) = self.janitor.sweep(now) {
            warn!("Stale job sweep failed: {}", e);
        }
        let retired = self.janitor.retire_active_jobs(owner)?;
        if retired > 0 {
            info!("Replaced {} unfinished import job(s) of {}", retired, owner);
        }

        let job = ImportJob::new(owner.clone(), format, total, skipped, tags, now);
        let chunks = split_into_chunks(&job.id, outcome.to_import);
        self.jobs.create(&job, &chunks)?;
        info!(
            "Created import job {} with {} chunk(s) for {}",
            job.id, job.total_chunks, owner
        );

        Ok(PrepareImportResponse {
            total,
            skipped,
            to_import,
            total_chunks: job.total_chunks,
            job_id: Some(job.id),
            result: None,
        })
    }

    #[instrument(skip(self), level = "debug", fields(owner = %owner))]
    fn process_chunk(&self, owner: &Owner, job_id: &str) -> ApplicationResult<ProcessChunkResponse> {
        let job = self.load_owned(owner, job_id)?;
        if job.remaining_chunks() == 0 {
            debug!("Job {} already complete", job_id);
            return Ok(ProcessChunkResponse::of(&job, None));
        }

        let now = Utc::now();
        let chunk = match self
            .jobs
            .claim_next_chunk(job_id, now, now - self.claim_lease)?
        {
            ChunkClaim::Claimed(chunk) => chunk,
            ChunkClaim::Busy => {
                debug!("Job {} has a chunk in flight", job_id);
                return Ok(ProcessChunkResponse::of(&job, None));
            }
            ChunkClaim::Exhausted => {
                let latest = self.jobs.get(job_id)?.unwrap_or(job);
                return Ok(ProcessChunkResponse::of(&latest, None));
            }
        };

        let outcome = match self.processor.process(&job, &chunk) {
            Ok(outcome) => outcome,
            Err(e) => {
                match self.jobs.release_chunk(&chunk.id, now) {
                    Ok(true) => debug!("Released chunk {} for retry", chunk.id),
                    Ok(false) => warn!("Chunk {} was reclaimed before release", chunk.id),
                    Err(release_err) => {
                        warn!("Could not release chunk {}: {}", chunk.id, release_err)
                    }
                }
                return Err(e.context(format!(
                    "processing chunk {} of job {}",
                    chunk.chunk_index, job_id
                )));
            }
        };

        let updated = self
            .jobs
            .complete_chunk(job_id, &chunk.id, outcome, Utc::now())?;
        if updated.remaining_chunks() == 0 {
            info!(
                "Import job {} completed: {} imported, {} failed, {} skipped",
                job_id, updated.imported, updated.failed, updated.skipped
            );
        }

        Ok(ProcessChunkResponse::of(&updated, Some(outcome)))
    }

    #[instrument(skip(self), level = "debug", fields(owner = %owner))]
    fn job_status(&self, owner: &Owner, job_id: &str) -> ApplicationResult<ProcessChunkResponse> {
        let job = self.load_owned(owner, job_id)?;
        Ok(ProcessChunkResponse::of(&job, None))
    }

    #[instrument(skip(self), level = "debug", fields(owner = %owner))]
    fn list_jobs(&self, owner: &Owner) -> ApplicationResult<Vec<JobSummary>> {
        let jobs = self.jobs.list_by_owner(owner)?;
        Ok(jobs.iter().map(JobSummary::from).collect())
    }

    fn sweep_stale_jobs(&self, now: DateTime<Utc>) -> ApplicationResult<usize> {
        self.janitor.sweep(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::BookmarkRecord;
    use crate::domain::repositories::remote_repository::RepositoryReader;
    use crate::infrastructure::remote::InMemoryRepository;
    use crate::infrastructure::repositories::sqlite::repository::SqliteImportJobRepository;
    use crate::util::testing::{candidates, init_test_env, setup_test_job_store, TestDb};

    struct Fixture {
        _db: TestDb,
        store: Arc<SqliteImportJobRepository>,
        remote: Arc<InMemoryRepository>,
        service: ImportServiceImpl,
    }

    fn fixture() -> Fixture {
        init_test_env();
        let db = TestDb::new();
        let store = Arc::new(setup_test_job_store(&db));
        let remote = Arc::new(InMemoryRepository::new());
        let service =
            ImportServiceImpl::new(store.clone(), remote.clone(), &ImportSettings::default());
        Fixture {
            _db: db,
            store,
            remote,
            service,
        }
    }

    fn alice() -> Owner {
        Owner::new("did:plc:alice").unwrap()
    }

    fn bob() -> Owner {
        Owner::new("did:plc:bob").unwrap()
    }

    fn prepare(f: &Fixture, owner: &Owner, n: usize) -> PrepareImportResponse {
        f.service
            .prepare_import(owner, "json", candidates(n), &[])
            .unwrap()
    }

    #[test]
    fn given_201_unique_candidates_when_driven_then_two_chunks_200_then_1() {
        let f = fixture();

        let prepared = prepare(&f, &alice(), 201);
        assert_eq!(prepared.total, 201);
        assert_eq!(prepared.skipped, 0);
        assert_eq!(prepared.to_import, 201);
        assert_eq!(prepared.total_chunks, 2);
        assert!(prepared.result.is_none());
        let job_id = prepared.job_id.expect("job should be created");

        let first = f.service.process_chunk(&alice(), &job_id).unwrap();
        assert!(first.chunk_processed);
        assert_eq!(first.imported, 200);
        assert_eq!(first.remaining, 1);
        assert!(!first.done);
        assert!(first.result.is_none());

        let second = f.service.process_chunk(&alice(), &job_id).unwrap();
        assert_eq!(second.imported, 1);
        assert_eq!(second.total_imported, 201);
        assert_eq!(second.remaining, 0);
        assert!(second.done);
        assert_eq!(
            second.result,
            Some(ImportResult {
                total: 201,
                skipped: 0,
                imported: 201,
                failed: 0,
                format: "json".to_string(),
            })
        );

        let third = f.service.process_chunk(&alice(), &job_id).unwrap();
        assert!(!third.chunk_processed);
        assert!(third.done);
        assert_eq!(third.total_imported, 201);
        assert_eq!(f.remote.list_bookmarks(&alice()).unwrap().len(), 201);
    }

    #[test]
    fn given_everything_already_imported_when_prepare_again_then_synchronous_result() {
        let f = fixture();
        let job_id = prepare(&f, &alice(), 3).job_id.unwrap();
        f.service.process_chunk(&alice(), &job_id).unwrap();

        let again = prepare(&f, &alice(), 3);

        assert_eq!(again.to_import, 0);
        assert_eq!(again.total_chunks, 0);
        assert!(again.job_id.is_none());
        let result = again.result.unwrap();
        assert_eq!(result.imported, 0);
        assert_eq!(result.skipped, result.total);
        assert_eq!(result.total, 3);
        // the finished job is the only one
        assert_eq!(f.service.list_jobs(&alice()).unwrap().len(), 1);
    }

    #[test]
    fn given_one_existing_and_one_new_when_imported_then_partial_dedup() {
        let f = fixture();
        f.remote
            .insert_bookmark(
                &alice(),
                BookmarkRecord {
                    subject: "https://example.com/0".to_string(),
                    title: "existing".to_string(),
                    description: None,
                    tags: vec![],
                    created_at: Utc::now(),
                },
            )
            .unwrap();
        let mut input = candidates(2);
        input[0].url = "https://example.com/0?ref=feed#top".to_string();

        let prepared = f
            .service
            .prepare_import(&alice(), "netscape", input, &[])
            .unwrap();
        assert_eq!(prepared.skipped, 1);
        assert_eq!(prepared.to_import, 1);

        let done = f
            .service
            .process_chunk(&alice(), &prepared.job_id.unwrap())
            .unwrap();
        let result = done.result.unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.total, 2);
        assert_eq!(result.format, "netscape");
    }

    #[test]
    fn given_non_web_urls_when_prepare_then_counted_as_skipped() {
        let f = fixture();
        let mut input = candidates(3);
        input[1].url = "mailto:someone@example.com".to_string();
        input[2].url = "not a url".to_string();

        let prepared = f.service.prepare_import(&alice(), "json", input, &[]).unwrap();

        assert_eq!(prepared.total, 3);
        assert_eq!(prepared.skipped, 2);
        assert_eq!(prepared.to_import, 1);
    }

    #[test]
    fn given_empty_candidates_when_prepare_then_validation_error_and_no_job() {
        let f = fixture();

        let err = f
            .service
            .prepare_import(&alice(), "json", vec![], &[])
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Validation(_)));

        let err = f
            .service
            .prepare_import(&alice(), "  ", candidates(1), &[])
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Validation(_)));

        assert!(f.service.list_jobs(&alice()).unwrap().is_empty());
    }

    #[test]
    fn given_failing_batch_when_processed_then_failures_isolated_to_batch() {
        let f = fixture();
        let input = candidates(25);
        f.remote.fail_batches_containing(&input[12].url).unwrap();
        let job_id = f
            .service
            .prepare_import(&alice(), "json", input, &[])
            .unwrap()
            .job_id
            .unwrap();

        let done = f.service.process_chunk(&alice(), &job_id).unwrap();

        assert!(done.done);
        assert_eq!(done.imported, 15);
        assert_eq!(done.failed, 10);
        let result = done.result.unwrap();
        assert_eq!(result.imported + result.failed, result.total - result.skipped);
    }

    #[test]
    fn given_other_owner_when_process_then_forbidden_not_not_found() {
        let f = fixture();
        let job_id = prepare(&f, &alice(), 5).job_id.unwrap();

        let forbidden = f.service.process_chunk(&bob(), &job_id).unwrap_err();
        assert!(matches!(forbidden, ApplicationError::JobForbidden(id) if id == job_id));

        let missing = f.service.process_chunk(&bob(), "no-such-job").unwrap_err();
        assert!(matches!(missing, ApplicationError::JobNotFound(_)));

        // nothing was written on bob's behalf
        let status = f.service.job_status(&alice(), &job_id).unwrap();
        assert_eq!(status.total_imported, 0);
        assert_eq!(status.remaining, 1);
    }

    #[test]
    fn given_jobs_of_alice_when_bob_looks_then_nothing_visible() {
        let f = fixture();
        let job_id = prepare(&f, &alice(), 5).job_id.unwrap();

        assert!(f.service.list_jobs(&bob()).unwrap().is_empty());
        assert!(matches!(
            f.service.job_status(&bob(), &job_id),
            Err(ApplicationError::JobForbidden(_))
        ));
        assert_eq!(f.service.list_jobs(&alice()).unwrap().len(), 1);
    }

    #[test]
    fn given_unfinished_job_when_prepare_again_then_previous_job_replaced() {
        let f = fixture();
        let first = prepare(&f, &alice(), 5).job_id.unwrap();
        let other_owner = prepare(&f, &bob(), 5).job_id.unwrap();

        let mut fresh = candidates(10);
        for c in fresh.iter_mut() {
            c.url = c.url.replace("example.com", "example.org");
        }
        let second = f
            .service
            .prepare_import(&alice(), "json", fresh, &[])
            .unwrap()
            .job_id
            .unwrap();

        assert!(matches!(
            f.service.job_status(&alice(), &first),
            Err(ApplicationError::JobNotFound(_))
        ));
        assert!(f.service.job_status(&alice(), &second).is_ok());
        assert!(f.service.job_status(&bob(), &other_owner).is_ok());
    }

    #[test]
    fn given_internal_failure_when_processing_then_chunk_released_for_retry() {
        let f = fixture();
        let job_id = prepare(&f, &alice(), 3).job_id.unwrap();
        f.remote.set_fail_tag_listing(true).unwrap();

        assert!(f.service.process_chunk(&alice(), &job_id).is_err());
        let status = f.service.job_status(&alice(), &job_id).unwrap();
        assert_eq!(status.remaining, 1);
        assert_eq!(status.total_imported, 0);

        f.remote.set_fail_tag_listing(false).unwrap();
        let retried = f.service.process_chunk(&alice(), &job_id).unwrap();
        assert!(retried.chunk_processed);
        assert!(retried.done);
        assert_eq!(retried.total_imported, 3);
    }

    #[test]
    fn given_chunk_in_flight_when_process_then_busy_no_op() {
        let f = fixture();
        let job_id = prepare(&f, &alice(), 300).job_id.unwrap();
        let now = Utc::now();
        let claim = f
            .store
            .claim_next_chunk(&job_id, now, now - Duration::minutes(5))
            .unwrap();
        assert!(matches!(claim, ChunkClaim::Claimed(_)));

        let response = f.service.process_chunk(&alice(), &job_id).unwrap();

        assert!(!response.chunk_processed);
        assert!(!response.done);
        assert_eq!(response.remaining, 2);
        assert_eq!(f.remote.batch_calls().unwrap(), 0);
    }

    #[test]
    fn given_uniform_tags_when_prepare_then_canonicalized_against_existing() {
        let f = fixture();
        f.remote
            .insert_tag(&alice(), "Swift", Utc::now() - Duration::days(3))
            .unwrap();

        let job_id = f
            .service
            .prepare_import(
                &alice(),
                "json",
                candidates(2),
                &["swift".to_string(), " ".to_string(), "Imported".to_string()],
            )
            .unwrap()
            .job_id
            .unwrap();

        let job = f.store.get(&job_id).unwrap().unwrap();
        assert_eq!(job.tags, vec!["Swift", "Imported"]);

        f.service.process_chunk(&alice(), &job_id).unwrap();
        let tag_values: Vec<String> = f
            .remote
            .list_tags(&alice())
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect();
        assert_eq!(tag_values, vec!["Swift", "Imported"]);
    }

    #[test]
    fn given_old_job_when_sweep_then_removed() {
        let f = fixture();
        let job_id = prepare(&f, &alice(), 1).job_id.unwrap();

        assert_eq!(f.service.sweep_stale_jobs(Utc::now()).unwrap(), 0);
        assert_eq!(
            f.service
                .sweep_stale_jobs(Utc::now() + Duration::hours(25))
                .unwrap(),
            1
        );
        assert!(matches!(
            f.service.job_status(&alice(), &job_id),
            Err(ApplicationError::JobNotFound(_))
        ));
    }
}
