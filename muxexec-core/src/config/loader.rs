//! Configuration loader

use std::path::Path;

use muxexec_utils::{config_file, MuxexecError, Result};

use super::AppConfig;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    pub fn load() -> Result<AppConfig> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(AppConfig::default())
        }
    }

    /// Load configuration from a specific path
    ///
    /// Unlike [`ConfigLoader::load`], a missing file is an error here since
    /// the caller named it explicitly.
    pub fn load_from_path(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            return Err(MuxexecError::ConfigNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| MuxexecError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<AppConfig> {
        toml::from_str(content).map_err(|e| MuxexecError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        if config.general.poll_interval_ms == 0 {
            return Err(MuxexecError::config("poll_interval_ms must be at least 1"));
        }

        if config.general.flush_grace_ms > config.general.timeout_secs.saturating_mul(1000) {
            return Err(MuxexecError::config(
                "flush_grace_ms must not exceed the timeout",
            ));
        }

        if config.resume.context_lines == 0 {
            return Err(MuxexecError::config("context_lines must be at least 1"));
        }

        if config.transport.buffer_prefix.is_empty() {
            return Err(MuxexecError::config("buffer_prefix must not be empty"));
        }

        Ok(())
    }

    /// Load and validate, from `path` when given
    pub fn load_and_validate(path: Option<&Path>) -> Result<AppConfig> {
        let config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::load()?,
        };
        Self::validate(&config)?;
        Ok(config)
    }
}
