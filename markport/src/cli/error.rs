// src/cli/error.rs
use crate::application::error::ApplicationError;
use crate::domain::error::DomainError;
use crate::exitcode;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Application error: {0}")]
    Application(#[from] ApplicationError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl CliError {
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        match self {
            CliError::CommandFailed(msg) => {
                CliError::CommandFailed(format!("{}: {}", context.into(), msg))
            }
            CliError::InvalidInput(msg) => {
                CliError::InvalidInput(format!("{}: {}", context.into(), msg))
            }
            CliError::Application(err) => CliError::Application(err.context(context)),
            CliError::Other(msg) => CliError::Other(format!("{}: {}", context.into(), msg)),
            err => CliError::Other(format!("{}: {}", context.into(), err)),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidInput(_) => exitcode::DATAERR,
            CliError::Io(_) => exitcode::USAGE,
            CliError::Application(app) => match app {
                ApplicationError::Validation(_) => exitcode::DATAERR,
                ApplicationError::Unauthorized(_) => exitcode::USAGE,
                ApplicationError::JobNotFound(_) => exitcode::NOT_FOUND,
                ApplicationError::JobForbidden(_) => exitcode::FORBIDDEN,
                ApplicationError::Domain(DomainError::RemoteError(_)) => exitcode::UNAVAILABLE,
                ApplicationError::Domain(DomainError::InvalidOwner(_)) => exitcode::USAGE,
                _ => exitcode::SOFTWARE,
            },
            CliError::CommandFailed(_) | CliError::Other(_) => exitcode::SOFTWARE,
        }
    }
}

// Direct conversion from DomainError to CliError (via ApplicationError)
impl From<DomainError> for CliError {
    fn from(err: DomainError) -> Self {
        CliError::Application(ApplicationError::Domain(err))
    }
}

impl From<crate::infrastructure::repositories::sqlite::error::SqliteRepositoryError> for CliError {
    fn from(
        err: crate::infrastructure::repositories::sqlite::error::SqliteRepositoryError,
    ) -> Self {
        CliError::Application(ApplicationError::Domain(err.into()))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::InvalidInput(err.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ApplicationError::Validation("empty".into()), exitcode::DATAERR)]
    #[case(ApplicationError::Unauthorized("no owner".into()), exitcode::USAGE)]
    #[case(ApplicationError::JobNotFound("j1".into()), exitcode::NOT_FOUND)]
    #[case(ApplicationError::JobForbidden("j1".into()), exitcode::FORBIDDEN)]
    #[case(
        ApplicationError::Domain(DomainError::RemoteError("down".into())),
        exitcode::UNAVAILABLE
    )]
    #[case(ApplicationError::Other("boom".into()), exitcode::SOFTWARE)]
    fn given_application_error_when_exit_code_then_mapped(
        #[case] err: ApplicationError,
        #[case] expected: i32,
    ) {
        assert_eq!(CliError::from(err).exit_code(), expected);
    }

    #[test]
    fn given_forbidden_when_add_context_then_exit_code_kept() {
        let err = CliError::from(ApplicationError::JobForbidden("j1".into())).context("status");
        assert_eq!(err.exit_code(), exitcode::FORBIDDEN);
    }
}
