//! Engine configuration
//!
//! Loading order: defaults, then an optional JSON file named by
//! `TANGENT_CONFIG`, then environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tangent_solver::{ProcessWorker, Unavailable, WorkerFactory};
use thiserror::Error;

pub const CONFIG_ENV: &str = "TANGENT_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// How to reach the symbolic engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Program to start, one process per capability. `None` disables the engine.
    pub command: Option<String>,
    /// Leading arguments; the capability name is appended last
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TangentConfig {
    #[serde(default = "default_derivative_timeout_ms")]
    pub derivative_timeout_ms: u64,
    #[serde(default = "default_remote_timeout_ms")]
    pub integral_timeout_ms: u64,
    #[serde(default = "default_remote_timeout_ms")]
    pub limit_timeout_ms: u64,
    /// Try local symbolic differentiation before the engine
    #[serde(default = "default_local_symbolic")]
    pub local_symbolic: bool,
    #[serde(default)]
    pub solver: SolverConfig,
    /// Resample debounce tick
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
}

fn default_derivative_timeout_ms() -> u64 {
    8_000
}

fn default_remote_timeout_ms() -> u64 {
    45_000
}

fn default_local_symbolic() -> bool {
    true
}

fn default_frame_ms() -> u64 {
    16
}

impl Default for TangentConfig {
    fn default() -> Self {
        Self {
            derivative_timeout_ms: default_derivative_timeout_ms(),
            integral_timeout_ms: default_remote_timeout_ms(),
            limit_timeout_ms: default_remote_timeout_ms(),
            local_symbolic: default_local_symbolic(),
            solver: SolverConfig::default(),
            frame_ms: default_frame_ms(),
        }
    }
}

impl TangentConfig {
    /// Defaults, `TANGENT_CONFIG` file, then environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_json_file(path.trim())?,
            _ => Self::default(),
        };
        config.with_overrides(|var| std::env::var(var).ok())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Apply `TANGENT_*` overrides looked up through `lookup`
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(cmd) = lookup("TANGENT_SOLVER_CMD") {
            let cmd = cmd.trim();
            self.solver.command = if cmd.is_empty() { None } else { Some(cmd.to_string()) };
        }
        if let Some(args) = lookup("TANGENT_SOLVER_ARGS") {
            self.solver.args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(v) = lookup("TANGENT_DERIVATIVE_TIMEOUT_MS") {
            self.derivative_timeout_ms = parse_millis("TANGENT_DERIVATIVE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("TANGENT_INTEGRAL_TIMEOUT_MS") {
            self.integral_timeout_ms = parse_millis("TANGENT_INTEGRAL_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("TANGENT_LIMIT_TIMEOUT_MS") {
            self.limit_timeout_ms = parse_millis("TANGENT_LIMIT_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("TANGENT_LOCAL_SYMBOLIC") {
            self.local_symbolic = parse_flag("TANGENT_LOCAL_SYMBOLIC", &v)?;
        }
        Ok(self)
    }

    pub fn derivative_timeout(&self) -> Duration {
        Duration::from_millis(self.derivative_timeout_ms)
    }

    pub fn integral_timeout(&self) -> Duration {
        Duration::from_millis(self.integral_timeout_ms)
    }

    pub fn limit_timeout(&self) -> Duration {
        Duration::from_millis(self.limit_timeout_ms)
    }

    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }

    /// Worker factory for the configured engine
    pub fn factory(&self) -> Arc<dyn WorkerFactory> {
        match &self.solver.command {
            Some(command) => Arc::new(ProcessWorker::new(command.clone(), self.solver.args.clone())),
            None => Arc::new(Unavailable),
        }
    }
}

fn parse_millis(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value: value.to_string() })
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv { var, value: value.to_string() }),
    }
}
