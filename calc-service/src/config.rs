// Executor Configuration
// Strategy selection, worker ceiling and timeouts, loadable from YAML

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default time the driver waits for the next result of a level
pub const DEFAULT_LEVEL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time workers get to exit after a level before they are aborted
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How a batch is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    /// Input order on a single live state
    Sequential,
    /// Dependency levels on a bounded worker pool
    #[default]
    Leveled,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStrategy::Sequential => write!(f, "sequential"),
            ExecutionStrategy::Leveled => write!(f, "leveled"),
        }
    }
}

impl FromStr for ExecutionStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionStrategy::Sequential),
            "leveled" | "queue" => Ok(ExecutionStrategy::Leveled),
            other => Err(ConfigError::Invalid(format!(
                "unknown strategy '{}' (expected 'sequential' or 'leveled')",
                other
            ))),
        }
    }
}

/// Configuration for batch execution
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Engine used by the executor factory
    pub strategy: ExecutionStrategy,
    /// Maximum workers per level (0 = host parallelism)
    pub max_workers: usize,
    /// Timeout while waiting for the next result of a level
    pub level_timeout: Duration,
    /// Time workers get to exit before being aborted
    pub grace_period: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            strategy: ExecutionStrategy::default(),
            max_workers: 0,
            level_timeout: DEFAULT_LEVEL_TIMEOUT,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

/// On-disk shape of the configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    strategy: Option<ExecutionStrategy>,
    max_workers: Option<usize>,
    level_timeout_secs: Option<f64>,
    grace_period_secs: Option<f64>,
}

impl ExecutorConfig {
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_level_timeout(mut self, timeout: Duration) -> Self {
        self.level_timeout = timeout;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Resolved worker ceiling
    pub fn worker_limit(&self) -> usize {
        if self.max_workers > 0 {
            return self.max_workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Default config file location (~/.calc/config.yaml)
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".calc")
            .join("config.yaml")
    }

    /// Load configuration from `path`, or from the default location when it
    /// exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Self::default_path();
                if default.is_file() {
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loading executor config");
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text; missing fields keep their defaults
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a map
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let file: ConfigFile = serde_yaml::from_str(content)?;
        let mut config = Self::default();

        if let Some(strategy) = file.strategy {
            config.strategy = strategy;
        }
        if let Some(max_workers) = file.max_workers {
            config.max_workers = max_workers;
        }
        if let Some(secs) = file.level_timeout_secs {
            config.level_timeout = seconds("level_timeout_secs", secs)?;
        }
        if let Some(secs) = file.grace_period_secs {
            config.grace_period = seconds("grace_period_secs", secs)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive an execution
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.level_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "level timeout must be positive".to_string(),
            ));
        }
        if self.grace_period.is_zero() {
            return Err(ConfigError::Invalid(
                "grace period must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn seconds(field: &str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| {
            ConfigError::Invalid(format!("{} must be a positive number, got {}", field, secs))
        })
}
