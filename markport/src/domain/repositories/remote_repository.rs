// src/domain/repositories/remote_repository.rs
use std::fmt::Debug;

use crate::domain::error::DomainResult;
use crate::domain::owner::Owner;
use crate::domain::record::{StoredBookmark, StoredTag, WriteOperation, WriteOutcome};

/// Read side of the owner's remote record repository.
pub trait RepositoryReader: Send + Sync + Debug {
    /// All bookmark records of the owner
    fn list_bookmarks(&self, owner: &Owner) -> DomainResult<Vec<StoredBookmark>>;

    /// All tag records of the owner
    fn list_tags(&self, owner: &Owner) -> DomainResult<Vec<StoredTag>>;
}

/// Write side of the owner's remote record repository.
pub trait RepositoryWriter: Send + Sync + Debug {
    /// Submit one batch of operations.
    ///
    /// `Err` means the batch as a whole failed and none of the operations can be assumed
    /// written. `Ok` carries one outcome per operation, in order.
    fn write_batch(
        &self,
        owner: &Owner,
        operations: &[WriteOperation],
    ) -> DomainResult<Vec<WriteOutcome>>;

    /// Create a tag record with the given casing.
    fn create_tag(&self, owner: &Owner, value: &str) -> DomainResult<StoredTag>;
}

pub trait RemoteRepository: RepositoryReader + RepositoryWriter {}

impl<T: RepositoryReader + RepositoryWriter> RemoteRepository for T {}
