// markport/src/application/mod.rs
pub mod error;
pub mod services;

// Re-export key services for easier imports
pub use services::import_service_impl::ImportServiceImpl;
pub use services::tag_service_impl::TagServiceImpl;
