//! Configuration loading, validation, and management for Rookery.
//!
//! Loads configuration from `~/.rookery/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.rookery/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote decision gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Puzzle evaluation harness
    #[serde(default)]
    pub puzzles: PuzzleConfig,

    /// Tool-calling agent loop
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_url")]
    pub url: String,

    /// Per-request timeout; a timed-out call is a transport error
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gateway_url() -> String {
    "http://localhost:3000".into()
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// What the runner does when a decision request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Play a uniformly random legal move instead
    RandomLegal,
    /// Count the attempt as failed
    Forfeit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleConfig {
    #[serde(default = "default_puzzle_function")]
    pub function_name: String,

    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Boolean metric reported once per finished episode
    #[serde(default = "default_metric_name")]
    pub metric_name: String,

    /// Admission gate size: simultaneous in-flight remote calls
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_fallback")]
    pub fallback: FallbackMode,

    /// Seed for fallback moves; unset means OS entropy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_puzzle_function() -> String {
    "play_chess_board".into()
}
fn default_strategy() -> String {
    "baseline".into()
}
fn default_metric_name() -> String {
    "solved".into()
}
fn default_max_concurrency() -> usize {
    100
}
fn default_fallback() -> FallbackMode {
    FallbackMode::RandomLegal
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            function_name: default_puzzle_function(),
            strategy: default_strategy(),
            metric_name: default_metric_name(),
            max_concurrency: default_max_concurrency(),
            fallback: default_fallback(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_function")]
    pub function_name: String,

    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Request ceiling per question
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_wikipedia_url")]
    pub wikipedia_url: String,
}

fn default_agent_function() -> String {
    "multi_hop_rag_agent".into()
}
fn default_max_iterations() -> u32 {
    20
}
fn default_wikipedia_url() -> String {
    "https://en.wikipedia.org/w/api.php".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            function_name: default_agent_function(),
            strategy: default_strategy(),
            max_iterations: default_max_iterations(),
            wikipedia_url: default_wikipedia_url(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.rookery/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `ROOKERY_GATEWAY_URL`
    /// - `ROOKERY_PUZZLE_STRATEGY`
    /// - `ROOKERY_AGENT_STRATEGY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(url) = std::env::var("ROOKERY_GATEWAY_URL") {
            config.gateway.url = url;
        }
        if let Ok(strategy) = std::env::var("ROOKERY_PUZZLE_STRATEGY") {
            config.puzzles.strategy = strategy;
        }
        if let Ok(strategy) = std::env::var("ROOKERY_AGENT_STRATEGY") {
            config.agent.strategy = strategy;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".rookery")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.url.trim().is_empty() {
            return Err(ConfigError::ValidationError("gateway.url must not be empty".into()));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.timeout_secs must be at least 1".into(),
            ));
        }
        if self.puzzles.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "puzzles.max_concurrency must be at least 1".into(),
            ));
        }
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
