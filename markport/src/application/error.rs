// src/application/error.rs
use crate::domain::error::DomainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Import job not found: {0}")]
    JobNotFound(String),

    #[error("Import job {0} belongs to another owner")]
    JobForbidden(String),

    #[error("{0}")]
    Other(String),
}

impl ApplicationError {
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        match self {
            ApplicationError::Other(msg) => {
                ApplicationError::Other(format!("{}: {}", context.into(), msg))
            }
            ApplicationError::Domain(err) => ApplicationError::Domain(err.context(context)),
            ApplicationError::Validation(msg) => {
                ApplicationError::Validation(format!("{}: {}", context.into(), msg))
            }
            // identity-carrying variants stay matchable
            err @ (ApplicationError::Unauthorized(_)
            | ApplicationError::JobNotFound(_)
            | ApplicationError::JobForbidden(_)) => err,
        }
    }
}

impl From<std::io::Error> for ApplicationError {
    fn from(err: std::io::Error) -> Self {
        ApplicationError::Domain(DomainError::Io(err))
    }
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_validation_error_when_add_context_then_prefixed() {
        let err = ApplicationError::Validation("no candidates".into()).context("prepare");
        assert_eq!(err.to_string(), "Validation failed: prepare: no candidates");
    }

    #[test]
    fn given_forbidden_error_when_add_context_then_variant_kept() {
        let err = ApplicationError::JobForbidden("j1".into()).context("process");
        assert!(matches!(err, ApplicationError::JobForbidden(id) if id == "j1"));
    }
}
