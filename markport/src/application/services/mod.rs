// src/application/services/mod.rs
pub mod chunk_processor;
pub mod import_service;
pub mod import_service_impl;
pub mod job_janitor;
pub mod tag_service;
pub mod tag_service_impl;
