// src/infrastructure/repositories/sqlite/migration.rs
use crate::infrastructure::repositories::sqlite::error::SqliteRepositoryError;
use diesel::sqlite::Sqlite;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{debug, info, instrument};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Run all pending migrations, returning the names of those applied.
#[instrument(skip(connection), level = "debug")]
pub fn run_migrations(
    connection: &mut impl MigrationHarness<Sqlite>,
) -> Result<Vec<String>, SqliteRepositoryError> {
    let pending = connection.pending_migrations(MIGRATIONS).map_err(|e| {
        SqliteRepositoryError::MigrationError(format!("Failed to check pending migrations: {}", e))
    })?;

    if pending.is_empty() {
        debug!("No pending migrations to run");
        return Ok(Vec::new());
    }

    let names: Vec<String> = pending.iter().map(|m| m.name().to_string()).collect();
    for name in &names {
        debug!("Pending Migration: {}", name);
    }

    connection.run_pending_migrations(MIGRATIONS).map_err(|e| {
        SqliteRepositoryError::MigrationError(format!("Failed to run migrations: {}", e))
    })?;

    info!("Applied {} migration(s)", names.len());
    Ok(names)
}
