use crate::domain::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, trace, warn};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ImportSettings {
    /// Jobs older than this are deleted by the janitor, whatever their status (default: 24)
    #[serde(default = "default_job_max_age_hours")]
    pub job_max_age_hours: u32,

    /// A chunk claimed longer ago than this is treated as abandoned (default: 300)
    #[serde(default = "default_claim_lease_secs")]
    pub claim_lease_secs: u32,
}

fn default_job_max_age_hours() -> u32 {
    24
}

fn default_claim_lease_secs() -> u32 {
    300
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            job_max_age_hours: default_job_max_age_hours(),
            claim_lease_secs: default_claim_lease_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RemoteSettings {
    /// Base URL of the service hosting the owner's repository
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default = "default_bookmark_collection")]
    pub bookmark_collection: String,

    #[serde(default = "default_tag_collection")]
    pub tag_collection: String,
}

fn default_service_url() -> String {
    "http://localhost:2583".to_string()
}

fn default_bookmark_collection() -> String {
    "app.markport.bookmark".to_string()
}

fn default_tag_collection() -> String {
    "app.markport.tag".to_string()
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            access_token: None,
            bookmark_collection: default_bookmark_collection(),
            tag_collection: default_tag_collection(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    /// Path to the SQLite database holding import jobs
    #[serde(default = "default_db_path")]
    pub db_url: String,

    /// Owner identifier used when a command does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default)]
    pub import: ImportSettings,

    #[serde(default)]
    pub remote: RemoteSettings,
}

fn default_db_path() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config/markport/markport.db")
        .to_string_lossy()
        .to_string()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".config/markport/config.toml"))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_url: default_db_path(),
            owner: None,
            import: ImportSettings::default(),
            remote: RemoteSettings::default(),
        }
    }
}

fn read_config_file(path: &Path) -> DomainResult<Settings> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| DomainError::Other(format!("Cannot read config {}: {}", path.display(), e)))?;
    toml::from_str::<Settings>(&text)
        .map_err(|e| DomainError::Other(format!("Invalid config {}: {}", path.display(), e)))
}

fn env_number(name: &str) -> DomainResult<Option<u32>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|e| DomainError::Other(format!("{}='{}': {}", name, value, e))),
        Err(_) => Ok(None),
    }
}

/// Load settings: defaults, then the config file, then environment variables.
///
/// An explicit `config_path` must exist and parse. The default location is optional and
/// ignored with a warning when unreadable.
#[instrument(level = "debug")]
pub fn load_settings(config_path: Option<&Path>) -> DomainResult<Settings> {
    trace!("Loading settings");

    let mut settings = match config_path {
        Some(path) => read_config_file(path)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                trace!("Loading config from: {:?}", path);
                read_config_file(&path).unwrap_or_else(|e| {
                    warn!("Ignoring config file: {}", e);
                    Settings::default()
                })
            }
            None => Settings::default(),
        },
    };

    if let Ok(db_url) = std::env::var("MARKPORT_DB_URL") {
        trace!("Using MARKPORT_DB_URL from environment: {}", db_url);
        settings.db_url = db_url;
    }
    if let Ok(owner) = std::env::var("MARKPORT_OWNER") {
        settings.owner = Some(owner);
    }
    if let Some(hours) = env_number("MARKPORT_JOB_MAX_AGE_HOURS")? {
        settings.import.job_max_age_hours = hours;
    }
    if let Ok(url) = std::env::var("MARKPORT_SERVICE_URL") {
        settings.remote.service_url = url;
    }
    if let Ok(token) = std::env::var("MARKPORT_ACCESS_TOKEN") {
        settings.remote.access_token = Some(token);
    }

    debug!("Settings loaded: db_url={}", settings.db_url);
    Ok(settings)
}

pub fn generate_default_config() -> String {
    let default_settings = Settings::default();
    toml::to_string_pretty(&default_settings)
        .unwrap_or_else(|_| "# Error generating default configuration".to_string())
}
