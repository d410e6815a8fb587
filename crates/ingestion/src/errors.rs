//! Ingestion error types

use paperdex_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Extraction error for {path}: {message}")]
    ExtractionError { path: String, message: String },

    #[error("Chunking error: {0}")]
    ChunkingError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unsupported file: {0}")]
    UnsupportedFile(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<AppError> for IngestionError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::EmbeddingError { .. } | AppError::DimensionMismatch { .. } => {
                IngestionError::EmbeddingError(e.to_string())
            }
            AppError::Database(_) | AppError::DatabaseConnection { .. } => {
                IngestionError::DatabaseError(e.to_string())
            }
            other => IngestionError::Other(other.to_string()),
        }
    }
}
