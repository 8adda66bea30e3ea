//! Settings errors.

/// Result alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Errors raised while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Settings file could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid JSON, or the merged value does not
    /// deserialize into [`crate::HelmSettings`].
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}
