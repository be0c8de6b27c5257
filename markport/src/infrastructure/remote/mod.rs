pub mod memory;
pub mod xrpc;

pub use memory::InMemoryRepository;
pub use xrpc::XrpcRepository;
