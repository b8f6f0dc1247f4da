//! Configuration file parser for ~/.config/feedwatch/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`,
//! and a malformed file falls back to defaults with a warning rather than
//! aborting startup. Credential entries use a TOML array-of-tables
//! (`[[credential]]`) so their order in the file is preserved: resolution is
//! last-match-wins.

use crate::auth::{CredentialEntry, CredentialSet};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Polling interval in seconds. 0 = polling suspended.
    pub interval_secs: u64,

    /// Ordered credential patterns; later entries override earlier ones.
    pub credential: Vec<CredentialEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_secs: 20,
            credential: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            interval_secs = config.interval_secs,
            credentials = config.credential.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Load configuration, falling back to defaults on any error.
    ///
    /// A broken credential file must not prevent startup; polling simply
    /// runs with anonymous fetches until the file is fixed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// The ordered credential set resolved against feed URLs at watch time.
    pub fn credential_set(&self) -> CredentialSet {
        CredentialSet::new(self.credential.clone())
    }
}
