// src/domain/mod.rs
pub mod candidate;
pub mod dedup;
pub mod error;
pub mod import_job;
pub mod owner;
pub mod progress;
pub mod record;
pub mod repositories;
pub mod tag;
pub mod url;
