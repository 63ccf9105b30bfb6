// smartmark/src/application/error.rs
use crate::domain::bookmark::BookmarkId;
use crate::domain::error::{DomainError, ProviderError};
use thiserror::Error;

/// Validation, missing session, or a failed remote call; nothing else.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("Validation failed: {0}")]
    Validation(#[from] DomainError),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Delete failed for bookmark {id}: {source}")]
    DeleteFailed {
        id: BookmarkId,
        #[source]
        source: ProviderError,
    },

    #[error("Session provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    Other(String),
}

impl ApplicationError {
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        match self {
            ApplicationError::Other(msg) => {
                ApplicationError::Other(format!("{}: {}", context.into(), msg))
            }
            err => ApplicationError::Other(format!("{}: {}", context.into(), err)),
        }
    }

    /// True for errors raised before any remote call was attempted
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ApplicationError::Validation(_) | ApplicationError::Unauthenticated
        )
    }
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_validation_error_when_is_local_then_true() {
        let err = ApplicationError::from(DomainError::InvalidUrl("x".to_string()));
        assert!(err.is_local());
        assert!(ApplicationError::Unauthenticated.is_local());
        assert!(!ApplicationError::Provider(ProviderError::NotSignedIn).is_local());
    }

    #[test]
    fn given_error_when_adding_context_then_prefixed() {
        let err = ApplicationError::Unauthenticated.context("add");
        assert_eq!(err.to_string(), "add: Not signed in");
    }
}
