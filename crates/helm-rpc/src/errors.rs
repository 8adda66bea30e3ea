//! RPC error codes and error type.

use crate::types::RpcErrorBody;

// ── Error code constants ────────────────────────────────────────────

/// Malformed caller input (bad frame, missing parameter, empty message).
pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
/// Unexpected internal error.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
/// Method not found in the registry.
pub const METHOD_NOT_FOUND: &str = "METHOD_NOT_FOUND";
/// Generic not-found.
pub const NOT_FOUND: &str = "NOT_FOUND";
/// Concurrent run conflict under the reject policy.
pub const SESSION_BUSY: &str = "SESSION_BUSY";
/// Model backend failure surfaced from a run.
pub const MODEL_BACKEND_ERROR: &str = "MODEL_BACKEND_ERROR";
/// Run aborted at the iteration cap.
pub const ITERATION_LIMIT: &str = "ITERATION_LIMIT";

/// RPC error type returned by handlers.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Required parameter missing or wrong type.
    #[error("{message}")]
    InvalidArgument {
        /// Description of what is wrong.
        message: String,
    },

    /// Requested resource not found.
    #[error("{message}")]
    NotFound {
        /// Human-readable message.
        message: String,
    },

    /// Internal server error.
    #[error("{message}")]
    Internal {
        /// Description.
        message: String,
    },

    /// Domain-specific error with an explicit code.
    #[error("{message}")]
    Custom {
        /// Machine-readable code.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

impl RpcError {
    /// Machine-readable error code for this variant.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidArgument { .. } => INVALID_ARGUMENT,
            Self::NotFound { .. } => NOT_FOUND,
            Self::Internal { .. } => INTERNAL_ERROR,
            Self::Custom { code, .. } => code,
        }
    }

    /// Convert to the wire-format error body.
    #[must_use]
    pub fn to_error_body(&self) -> RpcErrorBody {
        RpcErrorBody {
            code: self.code().to_owned(),
            message: self.to_string(),
        }
    }
}
