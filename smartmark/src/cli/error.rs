// src/cli/error.rs
use crate::application::error::ApplicationError;
use crate::domain::error::DomainError;
use crate::exitcode;
use crate::infrastructure::sqlite::error::SqliteRepositoryError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not signed in. Run 'smartmark login' first")]
    NotSignedIn,

    #[error("Operation aborted by user")]
    OperationAborted,

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

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotSignedIn => exitcode::NOPERM,
            CliError::OperationAborted => exitcode::CANCEL,
            _ => exitcode::USAGE,
        }
    }
}

impl From<DomainError> for CliError {
    fn from(err: DomainError) -> Self {
        CliError::InvalidInput(err.to_string())
    }
}

impl From<SqliteRepositoryError> for CliError {
    fn from(err: SqliteRepositoryError) -> Self {
        CliError::CommandFailed(err.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_error_kinds_when_exit_code_then_mapped() {
        assert_eq!(CliError::NotSignedIn.exit_code(), exitcode::NOPERM);
        assert_eq!(CliError::OperationAborted.exit_code(), exitcode::CANCEL);
        assert_eq!(CliError::Other("x".into()).exit_code(), exitcode::USAGE);
    }

    #[test]
    fn given_error_when_context_added_then_prefixed() {
        let err = CliError::InvalidInput("bad".into()).context("delete");
        assert_eq!(err.to_string(), "Invalid input: delete: bad");
    }
}
