// src/cli/import_commands.rs
use std::fs;
use std::io;
use std::path::Path;

use chrono::Utc;
use crossterm::style::Stylize;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::services::import_service::{ImportService, ProcessChunkResponse};
use crate::cli::args::{Cli, Commands};
use crate::cli::error::{CliError, CliResult};
use crate::config::Settings;
use crate::domain::candidate::CandidateBookmark;
use crate::domain::owner::Owner;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::repositories::sqlite::repository::SqliteImportJobRepository;

/// Machine-readable answer on stdout
pub(crate) fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Read a JSON array of normalized candidates.
pub fn read_candidates(path: &Path) -> CliResult<Vec<CandidateBookmark>> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::Io(io::Error::new(e.kind(), format!("{}: {}", path.display(), e))))?;
    let candidates: Vec<CandidateBookmark> = serde_json::from_str(&content)
        .map_err(|e| CliError::InvalidInput(format!("{}: {}", path.display(), e)))?;
    debug!("Read {} candidate(s) from {}", candidates.len(), path.display());
    Ok(candidates)
}

pub fn create_db(path: Option<String>, settings: &Settings) -> CliResult<()> {
    let path = path.unwrap_or_else(|| settings.db_url.clone());
    if Path::new(&path).exists() {
        return Err(CliError::InvalidInput(format!(
            "Database already exists at: {}. Please choose a different path or delete the existing file.",
            path
        )));
    }

    eprintln!("Creating new job database at: {}", path);
    // creates parent directories and runs all migrations
    SqliteImportJobRepository::from_url(&path)?;
    eprintln!("{}", format!("Database created successfully at: {}", path).green());
    Ok(())
}

/// Prepare an import and, unless told otherwise, drive it chunk by chunk to completion.
#[instrument(skip_all, level = "debug")]
pub fn import(cli: &Cli, owner: &Owner, services: &ServiceContainer) -> CliResult<()> {
    if let Some(Commands::Import {
        path,
        format,
        tags,
        no_drive,
        dry_run,
    }) = &cli.command
    {
        let candidates = read_candidates(path)?;
        let uniform_tags = parse_tags(tags.as_deref());
        if *dry_run {
            eprintln!("{}", "Dry run: writing into an in-memory repository and a throwaway job database".yellow());
        }

        let prepared = services
            .import_service
            .prepare_import(owner, format, candidates, &uniform_tags)?;
        eprintln!(
            "{} candidate(s): {} skipped, {} to import in {} chunk(s)",
            prepared.total,
            prepared.skipped,
            prepared.to_import.to_string().green(),
            prepared.total_chunks
        );

        let job_id = match (&prepared.job_id, *no_drive) {
            (Some(job_id), false) => job_id.clone(),
            _ => return print_json(&prepared),
        };

        let finished = drive(services.import_service.as_ref(), owner, &job_id)?;
        return print_json(&finished);
    }
    Ok(())
}

/// Call `process_chunk` until the job completes or another caller holds it.
fn drive(service: &dyn ImportService, owner: &Owner, job_id: &str) -> CliResult<ProcessChunkResponse> {
    loop {
        let response = service.process_chunk(owner, job_id)?;
        if response.done {
            eprintln!(
                "Import finished: {} imported, {} failed",
                response.total_imported.to_string().green(),
                response.total_failed.to_string().red()
            );
            return Ok(response);
        }
        if !response.chunk_processed {
            eprintln!(
                "{}",
                format!("Job {} is being processed elsewhere, stopping", job_id).yellow()
            );
            return Ok(response);
        }
        eprintln!(
            "Chunk done: {} imported, {} failed, {} remaining",
            response.imported, response.failed, response.remaining
        );
    }
}

pub fn process(job_id: &str, owner: &Owner, services: &ServiceContainer) -> CliResult<()> {
    let response = services.import_service.process_chunk(owner, job_id)?;
    if !response.chunk_processed && !response.done {
        eprintln!("{}", "No chunk available right now, try again later".yellow());
    }
    print_json(&response)
}

pub fn status(job_id: &str, owner: &Owner, services: &ServiceContainer) -> CliResult<()> {
    let response = services.import_service.job_status(owner, job_id)?;
    print_json(&response)
}

pub fn jobs(owner: &Owner, services: &ServiceContainer) -> CliResult<()> {
    let jobs = services.import_service.list_jobs(owner)?;
    if jobs.is_empty() {
        eprintln!("No import jobs for {}", owner.as_str().blue());
    }
    print_json(&jobs)
}

pub fn sweep(services: &ServiceContainer) -> CliResult<()> {
    let deleted = services.import_service.sweep_stale_jobs(Utc::now())?;
    eprintln!("Deleted {} stale import job(s)", deleted);
    print_json(&serde_json::json!({ "deleted": deleted }))
}
