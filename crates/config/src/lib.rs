//! Configuration loading, validation, and management for MissionClaw.
//!
//! Loads configuration from `~/.missionclaw/config.toml` with environment
//! variable overrides. Validates all settings at startup.

pub mod prompts;

pub use prompts::{AgentPrompts, PromptLibrary, Workflow, DEFAULT_WORKFLOW};

use missionclaw_core::AgentConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.missionclaw/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Completion endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Client identifier sent with every request
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Model
    #[serde(default = "default_model")]
    pub model: String,

    /// Default temperature, `[0, 1]`
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per request, `(0, 8000]`
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Facts file prepended to every conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_file: Option<PathBuf>,

    /// Directory overriding the built-in prompt files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,

    /// Mission loop settings
    #[serde(default)]
    pub mission: MissionConfig,

    /// Retry circuit breaker settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Web search tool settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Translation workflow settings
    #[serde(default)]
    pub translate: TranslateConfig,
}

fn default_api_url() -> String {
    missionclaw_core::agent::DEFAULT_API_URL.into()
}
fn default_client_id() -> String {
    concat!("missionclaw/", env!("CARGO_PKG_VERSION")).into()
}
fn default_model() -> String {
    missionclaw_core::agent::DEFAULT_MODEL.into()
}
fn default_temperature() -> f32 {
    missionclaw_core::agent::DEFAULT_TEMPERATURE
}
fn default_max_tokens() -> u32 {
    missionclaw_core::agent::DEFAULT_MAX_TOKENS
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
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("client_id", &self.client_id)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("knowledge_file", &self.knowledge_file)
            .field("prompts_dir", &self.prompts_dir)
            .field("mission", &self.mission)
            .field("retry", &self.retry)
            .field("search", &self.search)
            .field("translate", &self.translate)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionConfig {
    /// Completion request budget; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_loops: Option<u32>,

    /// Consecutive turns without tool replies before giving up
    #[serde(default = "default_inactivity_threshold")]
    pub inactivity_threshold: u32,

    /// Pause between two mission turns
    #[serde(default)]
    pub turn_delay_ms: u64,
}

fn default_inactivity_threshold() -> u32 {
    5
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            max_loops: None,
            inactivity_threshold: default_inactivity_threshold(),
            turn_delay_ms: 0,
        }
    }
}

/// Who shares a retry budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryScope {
    /// One counter for every mission in the process
    #[default]
    Process,
    /// A fresh counter per mission
    Mission,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,

    #[serde(default)]
    pub scope: RetryScope,
}

fn default_max_retries() -> u32 {
    100
}
fn default_backoff_secs() -> u64 {
    10
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_secs: default_backoff_secs(),
            scope: RetryScope::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum results per query; unlimited when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_limit: Option<usize>,

    /// HTTP proxy for search requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Target language when none is given on the command line
    #[serde(default = "default_language")]
    pub language: String,

    /// Pause between sections and between continue requests
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,

    /// Runaway guard: stop once the answer is this many times the source
    #[serde(default = "default_growth_limit")]
    pub growth_limit: usize,

    /// Output file; `out/translate.md` under the working directory when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

fn default_language() -> String {
    "Chinese".into()
}
fn default_pause_secs() -> u64 {
    10
}
fn default_growth_limit() -> usize {
    5
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            pause_secs: default_pause_secs(),
            growth_limit: default_growth_limit(),
            output: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.missionclaw/config.toml).
    ///
    /// Also checks environment variables:
    /// - `MISSIONCLAW_API_KEY` (highest priority), then `ANTHROPIC_API_KEY`
    /// - `MISSIONCLAW_MODEL`
    /// - `MISSIONCLAW_API_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
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

    /// Environment variable overrides (highest priority).
    pub fn apply_env(&mut self) {
        if let Some(key) = std::env::var("MISSIONCLAW_API_KEY")
            .ok()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|k| !k.is_empty())
        {
            self.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("MISSIONCLAW_MODEL") {
            self.model = model;
        }

        if let Ok(url) = std::env::var("MISSIONCLAW_API_URL") {
            self.api_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".missionclaw")
    }

    /// Validate the configuration.
    ///
    /// Out-of-range temperature and max tokens are not errors: the agent
    /// configuration ignores them and keeps its defaults.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("api_url must not be empty".into()));
        }

        if self.mission.inactivity_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "mission.inactivity_threshold must be > 0".into(),
            ));
        }

        if self.mission.max_loops == Some(0) {
            return Err(ConfigError::ValidationError("mission.max_loops must be > 0".into()));
        }

        if self.retry.max_retries == 0 {
            return Err(ConfigError::ValidationError("retry.max_retries must be > 0".into()));
        }

        if self.translate.growth_limit == 0 {
            return Err(ConfigError::ValidationError(
                "translate.growth_limit must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the immutable agent configuration.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig::new(
            self.api_key.clone().unwrap_or_default(),
            Some(self.model.clone()),
            Some(self.temperature),
            Some(self.max_tokens),
        )
        .with_api_url(self.api_url.clone())
        .with_client_id(self.client_id.clone())
    }

    /// Load the prompt library: `prompts_dir` if configured, else built-in.
    pub fn prompt_library(&self) -> Result<PromptLibrary, ConfigError> {
        match &self.prompts_dir {
            Some(dir) => PromptLibrary::load_dir(dir),
            None => PromptLibrary::builtin(),
        }
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            client_id: default_client_id(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            knowledge_file: None,
            prompts_dir: None,
            mission: MissionConfig::default(),
            retry: RetryConfig::default(),
            search: SearchConfig::default(),
            translate: TranslateConfig::default(),
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

    #[error("Invalid prompt file {file}: {reason}")]
    PromptError { file: String, reason: String },
}

impl From<ConfigError> for missionclaw_core::Error {
    fn from(err: ConfigError) -> Self {
        missionclaw_core::Error::Config {
            message: err.to_string(),
        }
    }
}
