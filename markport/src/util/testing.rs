// src/util/testing.rs

use chrono::{Duration, TimeZone, Utc};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;
use tracing::{debug, info, instrument};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::candidate::CandidateBookmark;
use crate::infrastructure::repositories::sqlite::repository::SqliteImportJobRepository;

const ENV_VARS: [&str; 5] = [
    "MARKPORT_DB_URL",
    "MARKPORT_OWNER",
    "MARKPORT_JOB_MAX_AGE_HOURS",
    "MARKPORT_SERVICE_URL",
    "MARKPORT_ACCESS_TOKEN",
];

static TEST_LOGGING: OnceLock<()> = OnceLock::new();

/// Initializes test logging exactly once.
pub fn init_test_env() {
    TEST_LOGGING.get_or_init(|| {
        setup_test_logging();
        info!("Test environment initialized");
    });
}

/// Logging setup only runs once; subsequent calls do nothing if `tracing` is already set.
fn setup_test_logging() {
    debug!("Attempting logger init from testing.rs");
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
        return;
    }

    let noisy_modules = ["reqwest", "mio", "want", "hyper", "hyper_util", "httpmock"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    subscriber.try_init().unwrap_or_else(|e| {
        eprintln!("Error: Failed to set up logging: {}", e);
    });
}

/// Restores the `MARKPORT_*` environment on drop.
#[derive(Debug, Clone)]
pub struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
}

impl Default for EnvGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvGuard {
    pub fn new() -> Self {
        Self {
            saved: ENV_VARS
                .iter()
                .map(|name| (*name, env::var(name).ok()))
                .collect(),
        }
    }
}

impl Drop for EnvGuard {
    #[instrument(level = "trace")]
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            match value {
                Some(val) => env::set_var(name, val),
                None => env::remove_var(name),
            }
        }
    }
}

/// Throwaway SQLite file, removed with its directory on drop unless NO_CLEANUP is set.
#[derive(Debug)]
pub struct TestDb {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Default for TestDb {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("markport.db");
        Self {
            dir: Some(dir),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn url(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        if env::var("NO_CLEANUP").is_ok() {
            if let Some(dir) = self.dir.take() {
                info!("Test artifacts left at: {}", dir.keep().display());
            }
        }
    }
}

/// Creates a migrated job store backed by `db`.
pub fn setup_test_job_store(db: &TestDb) -> SqliteImportJobRepository {
    init_test_env();
    SqliteImportJobRepository::from_url(&db.url())
        .expect("Failed to create SqliteImportJobRepository")
}

/// `n` candidates with distinct URLs `https://example.com/<i>`, one minute apart.
pub fn candidates(n: usize) -> Vec<CandidateBookmark> {
    let base = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    (0..n)
        .map(|i| {
            CandidateBookmark::new(
                format!("https://example.com/{}", i),
                format!("Example {}", i),
                base + Duration::minutes(i as i64),
            )
        })
        .collect()
}
