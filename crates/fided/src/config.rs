//! Configuration loading for fided.
//!
//! Resolution order for the file: `--config`, then `$FIDE_CONFIG`, then
//! `<config dir>/fide/config.toml` if it exists, else built-in defaults.
//! `FIDE_ENV_PREFIX` and `FIDE_COMPANION_PACKAGE` override the file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use fide_core::environment::is_valid_variable_name;
use fide_core::{
    DomainError, EnvironmentComposer, DEFAULT_COMPANION_PACKAGE, DEFAULT_ENV_PREFIX_ROOT,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::inspector::DEFAULT_INSPECTOR_COMMAND;
use crate::registry::MAX_SESSIONS;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "FIDE_CONFIG";

/// Environment variable overriding `env_prefix`.
pub const ENV_PREFIX_ENV: &str = "FIDE_ENV_PREFIX";

/// Environment variable overriding `companion_package`.
pub const COMPANION_PACKAGE_ENV: &str = "FIDE_COMPANION_PACKAGE";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Package inspector settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    /// Program and leading arguments; the package id is appended
    pub command: Vec<String>,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_INSPECTOR_COMMAND
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Effective fided configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FideConfig {
    /// Root prefix of exported variables
    pub env_prefix: String,

    /// Package id of the companion application
    pub companion_package: String,

    /// Registry capacity
    pub max_sessions: usize,

    pub inspector: InspectorConfig,
}

impl Default for FideConfig {
    fn default() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX_ROOT.to_string(),
            companion_package: DEFAULT_COMPANION_PACKAGE.to_string(),
            max_sessions: MAX_SESSIONS,
            inspector: InspectorConfig::default(),
        }
    }
}

impl FideConfig {
    /// Loads configuration, applying file and environment layers.
    ///
    /// # Errors
    ///
    /// Fails if an explicitly named file cannot be read, any file cannot be
    /// parsed, or the result does not validate.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Applies environment overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(prefix) = lookup(ENV_PREFIX_ENV).filter(|v| !v.is_empty()) {
            self.env_prefix = prefix;
        }
        if let Some(package) = lookup(COMPANION_PACKAGE_ENV).filter(|v| !v.is_empty()) {
            self.companion_package = package;
        }
    }

    /// Checks the configuration for values the core would reject.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_variable_name(&self.env_prefix) {
            return Err(ConfigError::Invalid(format!(
                "env_prefix {:?} is not a valid variable name",
                self.env_prefix
            )));
        }
        if self.companion_package.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "companion_package must not be empty".to_string(),
            ));
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::Invalid(
                "max_sessions must be greater than zero".to_string(),
            ));
        }
        if self.inspector.command.is_empty() {
            return Err(ConfigError::Invalid(
                "inspector.command must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the environment composer described by this configuration.
    pub fn composer(&self) -> Result<EnvironmentComposer, DomainError> {
        EnvironmentComposer::new(self.env_prefix.clone(), self.companion_package.clone())
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Default config file location, if a config dir exists on this platform.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fide").join("config.toml"))
}
