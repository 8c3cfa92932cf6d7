//! Kernel configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! [solver]
//! max_iterations = 100
//! resolution = "greatest"
//!
//! [director]
//! default_capacity = "overwrite"   # "unbounded" | "rendezvous" | { bounded = 4 }
//! time_scale = 1.0
//! stop_time = 10.0
//! supervisor_poll_ms = 10
//! thread_name_prefix = "actor"
//! detect_deadlock = true
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::process::receiver::CapacityPolicy;

/// Environment variable naming a configuration file
pub const CONFIG_ENV_VAR: &str = "ACTORFLOW_CONFIG";

/// How the solver picks a type from a variable's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPolicy {
    /// Prefer the upper bound
    #[default]
    Greatest,
    /// Prefer the lower bound
    Least,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Maximum number of propagation passes before giving up on a fixed point
    pub max_iterations: usize,
    pub resolution: ResolutionPolicy,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            resolution: ResolutionPolicy::Greatest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectorConfig {
    /// Policy for mailboxes created by `Model::connect`
    pub default_capacity: CapacityPolicy,
    /// Model seconds per wall-clock second
    pub time_scale: f64,
    /// Model time at which a run stops; unbounded when absent
    pub stop_time: Option<f64>,
    /// Upper bound on how long the supervisor sleeps between checks
    pub supervisor_poll_ms: u64,
    pub thread_name_prefix: String,
    pub detect_deadlock: bool,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            default_capacity: CapacityPolicy::Overwrite,
            time_scale: 1.0,
            stop_time: None,
            supervisor_poll_ms: 10,
            thread_name_prefix: "actor".to_string(),
            detect_deadlock: true,
        }
    }
}

impl DirectorConfig {
    pub fn supervisor_poll(&self) -> Duration {
        Duration::from_millis(self.supervisor_poll_ms)
    }
}

/// Complete kernel configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfig {
    pub solver: SolverConfig,
    pub director: DirectorConfig,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl KernelConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: KernelConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Load the file named by `ACTORFLOW_CONFIG`, or the defaults when the
    /// variable is unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_path(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.solver.max_iterations == 0 {
            return Err(ConfigError::invalid("solver.max_iterations", "must be at least 1"));
        }
        let director = &self.director;
        if let CapacityPolicy::Bounded(0) = director.default_capacity {
            return Err(ConfigError::invalid(
                "director.default_capacity",
                "bounded capacity must be at least 1",
            ));
        }
        if !(director.time_scale.is_finite() && director.time_scale > 0.0) {
            return Err(ConfigError::invalid(
                "director.time_scale",
                format!("must be a positive number, got {}", director.time_scale),
            ));
        }
        if let Some(stop) = director.stop_time {
            if !(stop.is_finite() && stop >= 0.0) {
                return Err(ConfigError::invalid(
                    "director.stop_time",
                    format!("must be a non-negative number, got {}", stop),
                ));
            }
        }
        if director.supervisor_poll_ms == 0 {
            return Err(ConfigError::invalid("director.supervisor_poll_ms", "must be at least 1"));
        }
        Ok(())
    }
}
