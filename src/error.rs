//! Error types for the rating collector
//!
//! This module defines all error types using anyhow for consistent error
//! handling throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific collector scenarios
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("match source request failed: {message}")]
    SourceRequestFailed { message: String },

    #[error("match source returned status {status}: {body}")]
    SourceUnexpectedStatus { status: u16, body: String },

    #[error("rating calculation failed: {reason}")]
    RatingCalculationFailed { reason: String },

    #[error("ledger operation failed: {operation}: {message}")]
    LedgerOperationFailed { operation: String, message: String },

    #[error("configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("internal error: {message}")]
    InternalError { message: String },
}
