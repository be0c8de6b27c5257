// src/domain/repositories/mod.rs
pub mod import_job_repository;
pub mod remote_repository;
