//! Failure taxonomy for the extraction pipeline.
//!
//! Stage-level failures are absorbed where they happen and degrade the item's
//! artifact set; only `Resource` failures cross a chunk boundary and fail the
//! whole chunk.

use thiserror::Error;

/// Classified failure raised by discovery and extraction stages.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Element not found or not clickable. Retried locally within a stage.
    #[error("element unavailable: {0}")]
    TransientUi(String),

    /// A bounded wait was exceeded. Treated as stage failure, never item failure.
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// The page failed to load or redirected away from the expected item.
    /// Aborts only the affected item.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The URL does not match any known content shape. Skipped before any
    /// session cost is spent.
    #[error("no recognized content id in url: {0}")]
    Identity(String),

    /// Session or downloader unavailable. Propagated to the dispatcher, which
    /// marks the entire chunk failed.
    #[error("resource unavailable: {0}")]
    Resource(String),
}

impl ScrapeError {
    /// Build a timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// Whether this failure must propagate past the owning chunk.
    #[must_use]
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Resource(_))
    }

    /// Whether the retry harness should bother re-attempting.
    ///
    /// Identity failures are permanent for a given URL; everything else may
    /// clear up on a later attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Identity(_))
    }
}

/// Convenience alias used by stage and discovery code.
pub type ScrapeResult<T> = Result<T, ScrapeError>;
