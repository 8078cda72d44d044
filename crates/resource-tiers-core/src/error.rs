//! Error taxonomy for the tier engine.
//!
//! The normalizer and classifier are total functions and never produce
//! these errors. Store-layer failures surface as
//! [`TierError::StoreUnavailable`] and are passed through to the caller
//! unchanged; the core never retries.

use thiserror::Error;

/// Boxed source error carried by [`TierError::StoreUnavailable`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type used throughout the core crate.
pub type Result<T> = std::result::Result<T, TierError>;

#[derive(Error, Debug)]
pub enum TierError {
    /// Raised only by strict validation; plain normalization substitutes
    /// defaults instead.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The backing store could not be reached, or it rejected a batch.
    #[error("store unavailable: {reason}")]
    StoreUnavailable {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The requested plan is not configured. Non-fatal for queries, which
    /// fall back to the most restrictive plan.
    #[error("unknown plan: {0}")]
    UnknownPlan(String),
}

impl TierError {
    /// Wrap a backend error as [`TierError::StoreUnavailable`].
    pub fn store<E>(reason: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TierError::StoreUnavailable {
            reason: reason.into(),
            source: Some(Box::new(err)),
        }
    }

    /// A store failure with no underlying error value (e.g. a size limit).
    pub fn rejected(reason: impl Into<String>) -> Self {
        TierError::StoreUnavailable {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, TierError::StoreUnavailable { .. })
    }
}
