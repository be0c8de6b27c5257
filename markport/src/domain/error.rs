// src/domain/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("Invalid owner: {0}")]
    InvalidOwner(String),

    #[error("Import job operation failed: {0}")]
    ImportJobOperationFailed(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),

    #[error("Remote repository error: {0}")]
    RemoteError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl DomainError {
    /// Prefix the message with `context`, keeping the variant where it carries a message.
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        let context = context.into();
        match self {
            DomainError::InvalidUrl(msg) => DomainError::InvalidUrl(format!("{}: {}", context, msg)),
            DomainError::InvalidTag(msg) => DomainError::InvalidTag(format!("{}: {}", context, msg)),
            DomainError::InvalidOwner(msg) => {
                DomainError::InvalidOwner(format!("{}: {}", context, msg))
            }
            DomainError::ImportJobOperationFailed(msg) => {
                DomainError::ImportJobOperationFailed(format!("{}: {}", context, msg))
            }
            DomainError::RepositoryError(msg) => {
                DomainError::RepositoryError(format!("{}: {}", context, msg))
            }
            DomainError::RemoteError(msg) => {
                DomainError::RemoteError(format!("{}: {}", context, msg))
            }
            DomainError::SerializationError(msg) => {
                DomainError::SerializationError(format!("{}: {}", context, msg))
            }
            DomainError::Other(msg) => DomainError::Other(format!("{}: {}", context, msg)),
            err @ DomainError::Io(_) => DomainError::Other(format!("{}: {}", context, err)),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
