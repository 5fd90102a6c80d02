// proposal-pdf: error types for every layer

use thiserror::Error;

// ============================================================================
// Application Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to create PDF: {0}")]
    PdfError(String),
    #[error("Failed to load logo: {0}")]
    LogoError(String),
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
    #[error("Failed to read proposal: {0}")]
    InputError(String),
    #[error("Failed to initialize logging: {0}")]
    LoggingError(String),
    #[error(transparent)]
    StoreError(#[from] StoreError),
    #[error(transparent)]
    SaveError(#[from] SaveError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// ============================================================================
// Store Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Proposal not found: {0}")]
    NotFound(String),
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store data is invalid: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// Save Errors
// ============================================================================

/// Outcome of a rejected save action. None of these roll back the
/// in-memory record.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("The workshop name is required before saving")]
    MissingRequiredField,
    #[error("A save is already in progress")]
    SaveInProgress,
    #[error("Failed to save proposal: {0}")]
    StoreWriteFailed(#[source] StoreError),
}

// ============================================================================
// Cache Errors
// ============================================================================

/// Local cache failure. Callers swallow these.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Local cache unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}
