//! Session store errors.

/// Errors raised by the session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Session ID is empty, too long, or contains path separators.
    #[error("invalid session id: {0}")]
    InvalidId(String),

    /// Underlying filesystem failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted transcript failed to parse.
    #[error("corrupt session file for '{id}': {source}")]
    Corrupt {
        /// Session whose file failed to parse.
        id: String,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// Transcript serialization failed.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
