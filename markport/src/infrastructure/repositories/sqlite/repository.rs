// src/infrastructure/repositories/sqlite/repository.rs

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::connection::{ConnectionPool, PooledConnection};
use super::error::{SqliteRepositoryError, SqliteResult};
use crate::domain::candidate::CandidateBookmark;
use crate::domain::error::DomainError;
use crate::domain::import_job::{ChunkStatus, ImportChunk, ImportJob, JobStatus};
use crate::domain::owner::Owner;
use crate::domain::progress::ChunkOutcome;
use crate::domain::repositories::import_job_repository::{ChunkClaim, ImportJobRepository};
use crate::infrastructure::repositories::sqlite::model::{
    DbImportChunk, DbImportJob, DbImportJobProgress,
};
use crate::infrastructure::repositories::sqlite::schema::import_chunks::dsl as chunks_dsl;
use crate::infrastructure::repositories::sqlite::schema::import_jobs::dsl as jobs_dsl;

fn to_db_count(value: usize, field: &str) -> SqliteResult<i32> {
    i32::try_from(value).map_err(|_| {
        SqliteRepositoryError::ConversionError(format!("{} out of range: {}", field, value))
    })
}

fn to_count(value: i32, field: &str) -> SqliteResult<usize> {
    usize::try_from(value).map_err(|_| {
        SqliteRepositoryError::ConversionError(format!("{} is negative: {}", field, value))
    })
}

fn to_utc(ts: NaiveDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc)
}

#[derive(Clone, Debug)]
pub struct SqliteImportJobRepository {
    pool: ConnectionPool,
}

impl SqliteImportJobRepository {
    /// Create a new SQLite repository with the provided connection pool
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Open (and migrate) the database at `database_url`
    #[instrument(skip_all, level = "debug")]
    pub fn from_url(database_url: &str) -> SqliteResult<Self> {
        let pool = super::connection::init_pool(database_url)?;
        Ok(Self { pool })
    }

    /// Get a connection from the pool
    #[instrument(skip_all, level = "trace")]
    pub fn get_connection(&self) -> SqliteResult<PooledConnection> {
        self.pool
            .get()
            .map_err(|e| SqliteRepositoryError::ConnectionPoolError(e.to_string()))
    }

    /// Convert a database row to a domain entity
    fn to_domain_job(db_job: DbImportJob) -> SqliteResult<ImportJob> {
        let owner = Owner::new(&db_job.owner).map_err(|e| {
            SqliteRepositoryError::ConversionError(format!("job {}: {}", db_job.id, e))
        })?;
        let status = db_job.status.parse::<JobStatus>().map_err(|e| {
            SqliteRepositoryError::ConversionError(format!("job {}: {}", db_job.id, e))
        })?;
        let tags: Vec<String> = serde_json::from_str(&db_job.tags_json)?;

        Ok(ImportJob {
            total: to_count(db_job.total, "total")?,
            skipped: to_count(db_job.skipped, "skipped")?,
            imported: to_count(db_job.imported, "imported")?,
            failed: to_count(db_job.failed, "failed")?,
            total_chunks: to_count(db_job.total_chunks, "total_chunks")?,
            processed_chunks: to_count(db_job.processed_chunks, "processed_chunks")?,
            id: db_job.id,
            owner,
            format: db_job.format,
            tags,
            status,
            created_at: to_utc(db_job.created_at),
            updated_at: to_utc(db_job.updated_at),
        })
    }

    fn to_db_job(job: &ImportJob) -> SqliteResult<DbImportJob> {
        Ok(DbImportJob {
            id: job.id.clone(),
            owner: job.owner.to_string(),
            format: job.format.clone(),
            total: to_db_count(job.total, "total")?,
            skipped: to_db_count(job.skipped, "skipped")?,
            imported: to_db_count(job.imported, "imported")?,
            failed: to_db_count(job.failed, "failed")?,
            total_chunks: to_db_count(job.total_chunks, "total_chunks")?,
            processed_chunks: to_db_count(job.processed_chunks, "processed_chunks")?,
            tags_json: serde_json::to_string(&job.tags)?,
            status: job.status.as_str().to_string(),
            created_at: job.created_at.naive_utc(),
            updated_at: job.updated_at.naive_utc(),
        })
    }

    fn to_domain_chunk(db_chunk: DbImportChunk) -> SqliteResult<ImportChunk> {
        let status = db_chunk.status.parse::<ChunkStatus>().map_err(|e| {
            SqliteRepositoryError::ConversionError(format!("chunk {}: {}", db_chunk.id, e))
        })?;
        let bookmarks: Vec<CandidateBookmark> = serde_json::from_str(&db_chunk.bookmarks_json)?;

        Ok(ImportChunk {
            chunk_index: to_count(db_chunk.chunk_index, "chunk_index")?,
            id: db_chunk.id,
            job_id: db_chunk.job_id,
            bookmarks,
            status,
        })
    }

    fn to_db_chunk(chunk: &ImportChunk) -> SqliteResult<DbImportChunk> {
        Ok(DbImportChunk {
            id: chunk.id.clone(),
            job_id: chunk.job_id.clone(),
            chunk_index: to_db_count(chunk.chunk_index, "chunk_index")?,
            bookmarks_json: serde_json::to_string(&chunk.bookmarks)?,
            status: chunk.status.as_str().to_string(),
            claimed_at: None,
        })
    }

    /// Delete the given jobs and their chunks inside an open transaction.
    fn delete_jobs(conn: &mut SqliteConnection, ids: &[String]) -> SqliteResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        diesel::delete(chunks_dsl::import_chunks.filter(chunks_dsl::job_id.eq_any(ids)))
            .execute(conn)?;
        let deleted =
            diesel::delete(jobs_dsl::import_jobs.filter(jobs_dsl::id.eq_any(ids))).execute(conn)?;
        Ok(deleted)
    }

    /// All chunks of a job in index order
    #[instrument(skip(self), level = "debug")]
    pub fn get_chunks(&self, job_id: &str) -> SqliteResult<Vec<ImportChunk>> {
        let mut conn = self.get_connection()?;
        chunks_dsl::import_chunks
            .filter(chunks_dsl::job_id.eq(job_id))
            .order(chunks_dsl::chunk_index.asc())
            .select(DbImportChunk::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(Self::to_domain_chunk)
            .collect()
    }
}

impl ImportJobRepository for SqliteImportJobRepository {
    #[instrument(skip_all, level = "debug", fields(job_id = %job.id, chunks = chunks.len()))]
    fn create(&self, job: &ImportJob, chunks: &[ImportChunk]) -> Result<(), DomainError> {
        let db_job = Self::to_db_job(job)?;
        let db_chunks = chunks
            .iter()
            .map(Self::to_db_chunk)
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut conn = self.get_connection()?;
        conn.transaction::<_, SqliteRepositoryError, _>(|conn| {
            debug!("Inserting job: {}", db_job);
            diesel::insert_into(jobs_dsl::import_jobs)
                .values(&db_job)
                .execute(conn)?;
            for db_chunk in &db_chunks {
                diesel::insert_into(chunks_dsl::import_chunks)
                    .values(db_chunk)
                    .execute(conn)?;
            }
            Ok(())
        })?;

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn get(&self, job_id: &str) -> Result<Option<ImportJob>, DomainError> {
        let mut conn = self.get_connection()?;

        let result = jobs_dsl::import_jobs
            .filter(jobs_dsl::id.eq(job_id))
            .select(DbImportJob::as_select())
            .first(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;

        match result {
            Some(db_job) => Ok(Some(Self::to_domain_job(db_job)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), level = "debug", fields(owner = %owner))]
    fn list_by_owner(&self, owner: &Owner) -> Result<Vec<ImportJob>, DomainError> {
        let mut conn = self.get_connection()?;

        let db_jobs = jobs_dsl::import_jobs
            .filter(jobs_dsl::owner.eq(owner.as_str()))
            .order(jobs_dsl::created_at.desc())
            .select(DbImportJob::as_select())
            .load(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;

        let jobs = db_jobs
            .into_iter()
            .map(Self::to_domain_job)
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(jobs)
    }

    #[instrument(skip(self), level = "debug", fields(owner = %owner))]
    fn delete_active_for_owner(&self, owner: &Owner) -> Result<usize, DomainError> {
        let mut conn = self.get_connection()?;

        let deleted = conn.transaction::<_, SqliteRepositoryError, _>(|conn| {
            let ids: Vec<String> = jobs_dsl::import_jobs
                .filter(jobs_dsl::owner.eq(owner.as_str()))
                .filter(jobs_dsl::status.eq_any([
                    JobStatus::Pending.as_str(),
                    JobStatus::Processing.as_str(),
                ]))
                .select(jobs_dsl::id)
                .load(conn)?;
            Self::delete_jobs(conn, &ids)
        })?;

        if deleted > 0 {
            info!("Deleted {} active import job(s) of {}", deleted, owner);
        }
        Ok(deleted)
    }

    #[instrument(skip(self), level = "debug")]
    fn claim_next_chunk(
        &self,
        job_id: &str,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<ChunkClaim, DomainError> {
        let mut conn = self.get_connection()?;

        // immediate: takes the write lock up front so select + flip is one step
        let claim = conn.immediate_transaction::<_, SqliteRepositoryError, _>(|conn| {
            let live_claim = chunks_dsl::import_chunks
                .filter(chunks_dsl::job_id.eq(job_id))
                .filter(chunks_dsl::status.eq(ChunkStatus::Processing.as_str()))
                .filter(chunks_dsl::claimed_at.ge(stale_before.naive_utc()))
                .select(chunks_dsl::id)
                .first::<String>(conn)
                .optional()?;
            if let Some(chunk_id) = live_claim {
                debug!("Chunk {} of job {} is claimed by another caller", chunk_id, job_id);
                return Ok(ChunkClaim::Busy);
            }

            let next = chunks_dsl::import_chunks
                .filter(chunks_dsl::job_id.eq(job_id))
                .filter(chunks_dsl::status.ne(ChunkStatus::Done.as_str()))
                .order(chunks_dsl::chunk_index.asc())
                .select(DbImportChunk::as_select())
                .first(conn)
                .optional()?;

            let Some(db_chunk) = next else {
                return Ok(ChunkClaim::Exhausted);
            };

            if db_chunk.status == ChunkStatus::Processing.as_str() {
                warn!(
                    "Reclaiming stale chunk {} (index {}) of job {}",
                    db_chunk.id, db_chunk.chunk_index, job_id
                );
            }

            diesel::update(chunks_dsl::import_chunks.filter(chunks_dsl::id.eq(&db_chunk.id)))
                .set((
                    chunks_dsl::status.eq(ChunkStatus::Processing.as_str()),
                    chunks_dsl::claimed_at.eq(Some(now.naive_utc())),
                ))
                .execute(conn)?;

            let mut chunk = Self::to_domain_chunk(db_chunk)?;
            chunk.status = ChunkStatus::Processing;
            Ok(ChunkClaim::Claimed(chunk))
        })?;

        Ok(claim)
    }

    #[instrument(skip(self), level = "debug")]
    fn release_chunk(&self, chunk_id: &str, claimed_at: DateTime<Utc>) -> Result<bool, DomainError> {
        let mut conn = self.get_connection()?;

        // a reclaimed chunk carries a newer stamp and stays with its new holder
        let released = diesel::update(
            chunks_dsl::import_chunks
                .filter(chunks_dsl::id.eq(chunk_id))
                .filter(chunks_dsl::status.eq(ChunkStatus::Processing.as_str()))
                .filter(chunks_dsl::claimed_at.eq(claimed_at.naive_utc())),
        )
        .set((
            chunks_dsl::status.eq(ChunkStatus::Pending.as_str()),
            chunks_dsl::claimed_at.eq(None::<NaiveDateTime>),
        ))
        .execute(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;

        if released == 0 {
            debug!("Chunk {} no longer held by this claim, left as is", chunk_id);
        }
        Ok(released > 0)
    }

    #[instrument(skip(self), level = "debug")]
    fn complete_chunk(
        &self,
        job_id: &str,
        chunk_id: &str,
        outcome: ChunkOutcome,
        now: DateTime<Utc>,
    ) -> Result<ImportJob, DomainError> {
        let mut conn = self.get_connection()?;

        let job = conn.immediate_transaction::<_, SqliteRepositoryError, _>(|conn| {
            let db_job = jobs_dsl::import_jobs
                .filter(jobs_dsl::id.eq(job_id))
                .select(DbImportJob::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| SqliteRepositoryError::JobNotFound(job_id.to_string()))?;
            let mut job = Self::to_domain_job(db_job)?;

            let flipped = diesel::update(
                chunks_dsl::import_chunks
                    .filter(chunks_dsl::id.eq(chunk_id))
                    .filter(chunks_dsl::job_id.eq(job_id))
                    .filter(chunks_dsl::status.ne(ChunkStatus::Done.as_str())),
            )
            .set((
                chunks_dsl::status.eq(ChunkStatus::Done.as_str()),
                chunks_dsl::claimed_at.eq(None::<NaiveDateTime>),
            ))
            .execute(conn)?;

            if flipped == 0 {
                warn!(
                    "Chunk {} of job {} was already done; counters left unchanged",
                    chunk_id, job_id
                );
                return Ok(job);
            }

            job.apply_chunk_outcome(outcome.imported, outcome.failed, now);
            let progress = DbImportJobProgress {
                imported: to_db_count(job.imported, "imported")?,
                failed: to_db_count(job.failed, "failed")?,
                processed_chunks: to_db_count(job.processed_chunks, "processed_chunks")?,
                status: job.status.as_str().to_string(),
                updated_at: job.updated_at.naive_utc(),
            };
            diesel::update(jobs_dsl::import_jobs.filter(jobs_dsl::id.eq(job_id)))
                .set(&progress)
                .execute(conn)?;

            Ok(job)
        })?;

        Ok(job)
    }

    #[instrument(skip(self), level = "debug")]
    fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut conn = self.get_connection()?;

        let deleted = conn.transaction::<_, SqliteRepositoryError, _>(|conn| {
            let ids: Vec<String> = jobs_dsl::import_jobs
                .filter(jobs_dsl::created_at.lt(cutoff.naive_utc()))
                .select(jobs_dsl::id)
                .load(conn)?;
            Self::delete_jobs(conn, &ids)
        })?;

        Ok(deleted)
    }
}
