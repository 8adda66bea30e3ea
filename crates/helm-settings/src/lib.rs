//! # helm-settings
//!
//! Configuration management with layered sources for the Helm control plane.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`HelmSettings::default()`]
//! 2. **Settings file** — `~/.helm/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `HELM_*` overrides (highest priority)
//!
//! Command-line flags are applied on top by the binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
