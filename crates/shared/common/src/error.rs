//! Unified error handling for the ledger services.
//!
//! Argument-shape errors (unknown fields, malformed calls) are raised by
//! the repository layer before any statement is issued; store-level
//! failures pass through unchanged as `Database` errors.

use domain::DomainError;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Validation
    #[error("{0}")]
    Validation(String),

    /// Caller referenced a field outside the declared column set
    /// (filters, increment/decrement targets)
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Caller referenced a sort column outside the declared column set
    #[error("Column not found: {0}")]
    UnknownColumn(String),

    /// Malformed call: empty conflict-field list, unrecognized dependency
    /// kind, out-of-set mutation field
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Record key was absent or empty
    #[error("Invalid or missing record key")]
    InvalidKey,

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("{0} already exists")]
    Conflict(String),

    // External service errors
    #[cfg(feature = "database")]
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Get error code for clients and logs
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UnknownField(_) => "UNKNOWN_FIELD",
            AppError::UnknownColumn(_) => "COLUMN_NOT_FOUND",
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::InvalidKey => "INVALID_KEY",
            AppError::NotFound => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        }
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::InvalidArgument(msg) => AppError::InvalidArgument(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn unknown_field(field: impl Into<String>) -> Self {
        AppError::UnknownField(field.into())
    }

    pub fn unknown_column(column: impl Into<String>) -> Self {
        AppError::UnknownColumn(column.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        AppError::InvalidArgument(msg.into())
    }

    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct_per_argument_class() {
        let errors = [
            AppError::validation("missing address"),
            AppError::unknown_field("sats"),
            AppError::unknown_column("sats"),
            AppError::invalid_argument("empty conflict fields"),
            AppError::InvalidKey,
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_domain_error_maps_to_invalid_argument() {
        let err: AppError = DomainError::invalid_argument("unknown dependency kind: x").into();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }
}
