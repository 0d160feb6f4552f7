//! Shared error types for the services crate.

use chrono::{DateTime, Utc};
use thiserror::Error;

use storage::StoreError;

/// Errors surfaced by an attempt.
///
/// Load and submit failures are returned as values so the caller can render a
/// retry affordance. Operations attempted in the wrong phase are not errors;
/// they are absorbed by the controller.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum AttemptError {
    /// The test definition could not be fetched. No attempt state was created.
    #[error("could not load test: {0}")]
    LoadFailed(#[source] StoreError),

    #[error("test is only available between {starts_at} and {ends_at}")]
    NotAvailable {
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    },

    /// Transient delivery failure; answers are kept for a manual retry.
    #[error("submission failed: {0}")]
    SubmitFailed(#[source] StoreError),

    /// The session credential expired mid-attempt; re-authenticate, then retry.
    #[error("session expired; sign in again to submit")]
    AuthExpired,
}

impl AttemptError {
    /// True when the caller should route the student to re-authentication.
    #[must_use]
    pub fn requires_reauth(&self) -> bool {
        match self {
            AttemptError::AuthExpired => true,
            AttemptError::LoadFailed(err) => err.is_unauthorized(),
            _ => false,
        }
    }
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}
