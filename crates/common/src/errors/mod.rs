//! Error types for the paperdex engine
//!
//! Provides distinct error types for the different failure modes of the
//! indexing and retrieval pipeline, with `#[from]` conversions for the
//! underlying database, HTTP, and serialization errors.

use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Paper not found: {id}")]
    PaperNotFound { id: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Generation service error: {message}")]
    GenerationError { message: String },

    #[error("Cache error: {message}")]
    CacheError { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Errors that should abort a whole indexing run rather than be
    /// skipped per-item
    pub fn is_fatal_for_indexing(&self) -> bool {
        matches!(
            self,
            AppError::EmbeddingError { .. }
                | AppError::DimensionMismatch { .. }
                | AppError::Database(_)
                | AppError::DatabaseConnection { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = AppError::DimensionMismatch {
            expected: 768,
            actual: 1536,
        };
        assert_eq!(
            err.to_string(),
            "Embedding dimension mismatch: expected 768, got 1536"
        );
        assert!(err.is_fatal_for_indexing());
    }

    #[test]
    fn test_validation_is_not_fatal() {
        let err = AppError::Validation {
            message: "empty query".to_string(),
        };
        assert!(!err.is_fatal_for_indexing());
    }
}
