//! # helm-logging
//!
//! Structured logging with `tracing`.
//!
//! One call to [`init`] from the binary installs the global subscriber.
//! The filter comes from `RUST_LOG` when set, otherwise from the configured
//! default level; output is human-readable or JSON per settings.

#![deny(unsafe_code)]

use helm_settings::LoggingSettings;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Safe to call once per process; later calls are no-ops (the first
/// subscriber wins), which keeps tests that initialize logging independent.
pub fn init(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.clone()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let settings = LoggingSettings::default();
        init(&settings);
        // A second call must not panic even though a subscriber is installed.
        init(&settings);
    }

    #[test]
    fn init_json_after_plain_is_a_noop() {
        let mut settings = LoggingSettings::default();
        init(&settings);
        settings.json = true;
        init(&settings);
    }
}
