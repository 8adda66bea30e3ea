//! Run controller errors.
//!
//! Only precondition failures surface as `Err` from
//! [`crate::RunController::start`] — a run that begins executing always
//! resolves to a terminal [`crate::Run`] record instead, carrying its failure
//! description in the `error` field.

use helm_sessions::StoreError;

/// Errors returned by run controller entry points.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Malformed caller input (empty message, duplicate run id).
    #[error("{0}")]
    InvalidArgument(String),

    /// The session already has an active run and the reject policy is in
    /// force.
    #[error("session '{0}' already has an active run")]
    SessionBusy(String),

    /// Session storage failed before the run could begin.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RunError {
    /// Machine-readable wire code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::SessionBusy(_) => "SESSION_BUSY",
            Self::Store(_) => "INTERNAL_ERROR",
        }
    }
}
