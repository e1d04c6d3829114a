//! Configuration loading, validation, and management for toolweave.
//!
//! Loads configuration from `~/.toolweave/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.toolweave/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model name from the catalogue (e.g. `qwen3-8b`, `gpt-4o`)
    #[serde(default = "default_model")]
    pub model: String,

    /// API key for hosted models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Device index for locally executed models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<u32>,

    /// Overrides the model's default system message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,

    #[serde(default)]
    pub enable_reasoning: bool,

    #[serde(default)]
    pub ignore_reasoning_messages: bool,

    /// Directory holding `<preset>.json` files
    #[serde(default = "default_preset_dir")]
    pub preset_dir: PathBuf,

    /// Presets registered on every new agent
    #[serde(default)]
    pub presets: Vec<String>,

    /// Bearer credentials per preset
    #[serde(default)]
    pub auth: HashMap<String, AuthConfig>,

    /// MCP servers whose tools are registered on every new agent
    #[serde(default)]
    pub mcp_servers: Vec<McpServerConfig>,
}

fn default_model() -> String {
    "qwen3-8b".into()
}
fn default_preset_dir() -> PathBuf {
    AppConfig::config_dir().join("presets")
}
fn default_auth_format() -> String {
    "Bearer".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("device", &self.device)
            .field("system_message", &self.system_message)
            .field("enable_reasoning", &self.enable_reasoning)
            .field("ignore_reasoning_messages", &self.ignore_reasoning_messages)
            .field("preset_dir", &self.preset_dir)
            .field("presets", &self.presets)
            .field("auth", &self.auth)
            .field("mcp_servers", &self.mcp_servers)
            .finish()
    }
}

/// `Authorization: <format> <token>` credentials for a preset's REST tools.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token: String,

    #[serde(default = "default_auth_format")]
    pub format: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &"[REDACTED]")
            .field("format", &self.format)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Unique label used in logs and CLI output
    pub name: String,

    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Only register these tools (all when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.toolweave/config.toml).
    ///
    /// Environment variables override the file:
    /// - `TOOLWEAVE_MODEL`
    /// - `TOOLWEAVE_API_KEY`, then `OPENAI_API_KEY` (only when the file has no key)
    /// - `TOOLWEAVE_PRESET_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
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

    /// Apply overrides from an environment lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("TOOLWEAVE_MODEL") {
            self.model = model;
        }
        if self.api_key.is_none() {
            self.api_key = lookup("TOOLWEAVE_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(dir) = lookup("TOOLWEAVE_PRESET_DIR") {
            self.preset_dir = PathBuf::from(dir);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".toolweave")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }

        let mut names = HashSet::new();
        for server in &self.mcp_servers {
            if server.command.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "mcp server '{}' has an empty command",
                    server.name
                )));
            }
            if !names.insert(server.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate mcp server name '{}'",
                    server.name
                )));
            }
        }

        for (preset, auth) in &self.auth {
            if auth.token.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "auth token for preset '{preset}' is empty"
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            device: None,
            system_message: None,
            enable_reasoning: false,
            ignore_reasoning_messages: false,
            preset_dir: default_preset_dir(),
            presets: vec![],
            auth: HashMap::new(),
            mcp_servers: vec![],
        }
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
