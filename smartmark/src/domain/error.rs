// smartmark/src/domain/error.rs
use crate::domain::bookmark::BookmarkBuilderError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid bookmark ID: {0}")]
    InvalidBookmarkId(String),

    #[error("Bookmark operation failed: {0}")]
    BookmarkOperationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<BookmarkBuilderError> for DomainError {
    fn from(e: BookmarkBuilderError) -> Self {
        DomainError::BookmarkOperationFailed(e.to_string())
    }
}

/// Failures reported by a session provider.
///
/// Callers above the application layer never branch on these; they are
/// logged and turned into a one-line notice.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unknown identity provider: {0}")]
    UnknownIdentityProvider(String),

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<DomainError> for ProviderError {
    fn from(e: DomainError) -> Self {
        ProviderError::ConstraintViolation(e.to_string())
    }
}
