// smartmark/src/infrastructure/sqlite/error.rs

use crate::domain::error::ProviderError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqliteRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DieselError),

    #[error("Connection pool error: {0}")]
    ConnectionPoolError(String),

    #[error("Failed to convert entity: {0}")]
    ConversionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("No signed-in user")]
    NotSignedIn,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Repository operation failed: {0}")]
    OperationFailed(String),
}

pub type SqliteResult<T> = Result<T, SqliteRepositoryError>;

impl From<crate::domain::error::DomainError> for SqliteRepositoryError {
    fn from(err: crate::domain::error::DomainError) -> Self {
        SqliteRepositoryError::ConversionError(err.to_string())
    }
}

impl From<SqliteRepositoryError> for ProviderError {
    fn from(err: SqliteRepositoryError) -> Self {
        match err {
            SqliteRepositoryError::NotSignedIn => ProviderError::NotSignedIn,
            SqliteRepositoryError::PermissionDenied(msg) => ProviderError::PermissionDenied(msg),
            SqliteRepositoryError::DatabaseError(DieselError::DatabaseError(kind, info)) => {
                match kind {
                    DatabaseErrorKind::UniqueViolation
                    | DatabaseErrorKind::CheckViolation
                    | DatabaseErrorKind::NotNullViolation
                    | DatabaseErrorKind::ForeignKeyViolation => {
                        ProviderError::ConstraintViolation(info.message().to_string())
                    }
                    _ => ProviderError::Storage(info.message().to_string()),
                }
            }
            SqliteRepositoryError::ConnectionPoolError(msg) => ProviderError::Unavailable(msg),
            other => ProviderError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_session_errors_when_converted_then_keep_meaning() {
        assert_eq!(
            ProviderError::from(SqliteRepositoryError::NotSignedIn),
            ProviderError::NotSignedIn
        );
        assert!(matches!(
            ProviderError::from(SqliteRepositoryError::ConnectionPoolError("x".into())),
            ProviderError::Unavailable(_)
        ));
        assert!(matches!(
            ProviderError::from(SqliteRepositoryError::DatabaseError(DieselError::NotFound)),
            ProviderError::Storage(_)
        ));
    }
}
