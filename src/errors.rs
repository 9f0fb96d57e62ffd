use sea_orm::error::{DbErr, SqlErr};
use serde::Serialize;

/// Result alias used by every service in the crate
pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Wraps a failure to begin or commit a transaction. Nothing done inside
    /// the transaction is visible afterwards.
    pub fn transaction_failed(err: DbErr) -> Self {
        ServiceError::TransactionFailed(err.to_string())
    }

    /// Maps an error raised while deleting a row. Foreign key violations mean
    /// something still references the row, which callers see as a conflict.
    pub fn from_delete(err: DbErr, entity: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => ServiceError::Conflict(format!(
                "The {} is referenced by other records and cannot be deleted",
                entity
            )),
            _ => ServiceError::DatabaseError(err),
        }
    }

    /// True for errors caused by the caller rather than by storage.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::ValidationError(_) | Self::Conflict(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_constraint_delete_errors_stay_database_errors() {
        let err = ServiceError::from_delete(DbErr::Custom("disk full".into()), "address");
        assert!(matches!(err, ServiceError::DatabaseError(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn validation_errors_convert() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("street", validator::ValidationError::new("length"));
        let err: ServiceError = errors.into();
        assert!(matches!(err, ServiceError::ValidationError(ref msg) if msg.contains("street")));
        assert!(err.is_client_error());
    }

    #[test]
    fn transaction_failures_keep_the_cause() {
        let err = ServiceError::transaction_failed(DbErr::Custom("deadlock detected".into()));
        let msg = err.to_string();
        assert!(msg.starts_with("Transaction failed: "));
        assert!(msg.contains("deadlock detected"));
    }
}
