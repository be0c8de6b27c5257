// src/infrastructure/di/service_container.rs
use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::import_service::ImportService;
use crate::application::services::tag_service::TagService;
use crate::application::{ImportServiceImpl, TagServiceImpl};
use crate::config::Settings;
use crate::domain::repositories::remote_repository::RemoteRepository;
use crate::infrastructure::remote::{InMemoryRepository, XrpcRepository};
use crate::infrastructure::repositories::sqlite::repository::SqliteImportJobRepository;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, instrument};

/// Production service container - single source of truth for service creation
pub struct ServiceContainer {
    pub job_repository: Arc<SqliteImportJobRepository>,
    pub remote: Arc<dyn RemoteRepository>,
    pub import_service: Arc<dyn ImportService>,
    pub tag_service: Arc<dyn TagService>,
    /// Holds the throwaway job database of a dry run
    scratch: Option<TempDir>,
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("job_repository", &self.job_repository)
            .field("remote", &self.remote)
            .field("scratch", &self.scratch)
            .finish_non_exhaustive()
    }
}

impl ServiceContainer {
    /// Create all services against the configured XRPC service
    pub fn new(config: &Settings) -> ApplicationResult<Self> {
        let remote: Arc<dyn RemoteRepository> =
            Arc::new(XrpcRepository::new(config.remote.clone()));
        Self::with_remote(config, remote)
    }

    /// Create all services against an explicit remote repository
    #[instrument(skip_all, level = "debug")]
    pub fn with_remote(
        config: &Settings,
        remote: Arc<dyn RemoteRepository>,
    ) -> ApplicationResult<Self> {
        let job_repository = Self::create_repository(&config.db_url)?;
        Ok(Self::assemble(config, job_repository, remote, None))
    }

    /// Services for a dry run: in-memory remote and a throwaway job database.
    ///
    /// The configured job database is never opened.
    #[instrument(skip_all, level = "debug")]
    pub fn for_dry_run(config: &Settings) -> ApplicationResult<Self> {
        let scratch = tempfile::Builder::new().prefix("markport-dry-run").tempdir()?;
        let db_path = scratch.path().join("jobs.db");
        let job_repository = SqliteImportJobRepository::from_url(&db_path.to_string_lossy())
            .map_err(|e| {
                ApplicationError::Other(format!("Failed to create dry-run job database: {}", e))
            })?;

        Ok(Self::assemble(
            config,
            Arc::new(job_repository),
            Arc::new(InMemoryRepository::new()),
            Some(scratch),
        ))
    }

    fn assemble(
        config: &Settings,
        job_repository: Arc<SqliteImportJobRepository>,
        remote: Arc<dyn RemoteRepository>,
        scratch: Option<TempDir>,
    ) -> Self {
        let import_service = Arc::new(ImportServiceImpl::new(
            job_repository.clone(),
            remote.clone(),
            &config.import,
        ));
        let tag_service = Arc::new(TagServiceImpl::new(remote.clone()));

        debug!("Service container ready, dry run: {}", scratch.is_some());
        Self {
            job_repository,
            remote,
            import_service,
            tag_service,
            scratch,
        }
    }

    fn create_repository(db_url: &str) -> ApplicationResult<Arc<SqliteImportJobRepository>> {
        if !Path::new(db_url).exists() {
            return Err(ApplicationError::Other(format!(
                "Job database not found at '{}'. Set MARKPORT_DB_URL or create one with 'markport create-db'",
                db_url
            )));
        }

        // runs all migrations
        let repository = SqliteImportJobRepository::from_url(db_url).map_err(|e| {
            ApplicationError::Other(format!("Failed to open job database: {}", e))
        })?;

        Ok(Arc::new(repository))
    }
}
