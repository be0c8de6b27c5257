pub mod di;
pub mod remote;
pub mod repositories;
