use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failures reported by the browser engine.
#[derive(Debug, Error)]
pub enum SessionError {
    /// An operation did not finish inside its budget.
    #[error("{action} timed out after {after:?}")]
    Timeout { action: &'static str, after: Duration },

    /// Anything else the engine reported.
    #[error(transparent)]
    Browser(#[from] anyhow::Error),
}

/// Failures surfaced to callers of the extractor.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid or missing credential")]
    AuthenticationFailed,

    #[error("agent identifier is required")]
    MissingIdentifier,

    #[error("timed out loading {url} after {after:?}")]
    NavigationTimeout { url: String, after: Duration },

    #[error("no listings section found on the profile for '{slug}'")]
    ListingsSectionNotFound { slug: String },

    #[error("could not open the first listing: {source}")]
    ListingClickFailed {
        #[source]
        source: SessionError,
    },

    #[error("extraction failed: {0:#}")]
    ExtractionFailed(#[from] anyhow::Error),
}

/// Stable, serializable name for each failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AuthenticationFailed,
    MissingIdentifier,
    NavigationTimeout,
    ListingsSectionNotFound,
    ListingClickFailed,
    ExtractionFailed,
}

impl ExtractionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractionError::AuthenticationFailed => ErrorKind::AuthenticationFailed,
            ExtractionError::MissingIdentifier => ErrorKind::MissingIdentifier,
            ExtractionError::NavigationTimeout { .. } => ErrorKind::NavigationTimeout,
            ExtractionError::ListingsSectionNotFound { .. } => ErrorKind::ListingsSectionNotFound,
            ExtractionError::ListingClickFailed { .. } => ErrorKind::ListingClickFailed,
            ExtractionError::ExtractionFailed(_) => ErrorKind::ExtractionFailed,
        }
    }

    /// HTTP status for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::MissingIdentifier => StatusCode::BAD_REQUEST,
            ErrorKind::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
