//! Error types for mailsift

use thiserror::Error;

/// Result type alias using MailsiftError
pub type Result<T> = std::result::Result<T, MailsiftError>;

/// Error type alias for convenience
pub type Error = MailsiftError;

/// Main error type for mailsift. Extraction and provider failures are
/// absorbed into `ExtractionOutcome` rather than surfacing here, so only
/// construction-time failures remain.
#[derive(Debug, Error)]
pub enum MailsiftError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
