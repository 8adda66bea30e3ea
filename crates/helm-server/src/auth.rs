//! Connection authentication, applied at WebSocket upgrade time.
//!
//! Mode `none` accepts every connection. Mode `token` requires a bearer
//! credential — `Authorization: Bearer <secret>` or a `token` query
//! parameter — compared for exact equality against the configured secret.
//! A mismatch or absence refuses the upgrade before any frame is processed.

use axum::http::HeaderMap;
use std::collections::HashMap;

use helm_settings::AuthMode;

use crate::config::ServerConfig;

/// Why an upgrade was refused.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// No credential was presented.
    MissingCredential,
    /// The presented credential does not match the configured secret.
    InvalidCredential,
    /// Token mode is configured without a secret; nothing can match.
    NoSecretConfigured,
}

impl AuthRejection {
    /// Log-friendly reason string.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing credential",
            Self::InvalidCredential => "invalid credential",
            Self::NoSecretConfigured => "no secret configured",
        }
    }
}

/// Extract the presented credential from headers or query parameters.
fn presented_credential(headers: &HeaderMap, query: &HashMap<String, String>) -> Option<String> {
    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(text) = value.to_str() {
            if let Some(token) = text.strip_prefix("Bearer ") {
                return Some(token.to_owned());
            }
        }
    }
    query.get("token").cloned()
}

/// Apply the configured authentication policy to an upgrade request.
pub fn authorize(
    config: &ServerConfig,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
) -> Result<(), AuthRejection> {
    match config.auth_mode {
        AuthMode::None => Ok(()),
        AuthMode::Token => {
            let Some(expected) = config.auth_token.as_deref() else {
                return Err(AuthRejection::NoSecretConfigured);
            };
            match presented_credential(headers, query) {
                None => Err(AuthRejection::MissingCredential),
                Some(presented) if presented == expected => Ok(()),
                Some(_) => Err(AuthRejection::InvalidCredential),
            }
        }
    }
}
