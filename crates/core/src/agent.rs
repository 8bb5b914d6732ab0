//! Agent configuration and identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default completion endpoint.
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/complete";

/// Default model.
pub const DEFAULT_MODEL: &str = "claude-v1";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Default per-request token budget.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Upper bound accepted for `max_tokens`.
pub const MAX_TOKENS_LIMIT: u32 = 8000;

/// Configuration of one completion agent. Immutable after construction.
#[derive(Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Completion endpoint
    pub api_url: String,

    /// Client identifier sent with each request
    pub client_id: String,

    /// API key
    #[serde(default)]
    pub api_key: String,

    /// Model to use
    pub model: String,

    /// Default temperature, in `[0, 1]`
    pub temperature: f32,

    /// Default max tokens per request, in `(0, 8000]`
    pub max_tokens: u32,
}

impl AgentConfig {
    /// Build a configuration, keeping defaults for out-of-range values.
    pub fn new(
        api_key: impl Into<String>,
        model: Option<String>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Self {
        let mut config = Self {
            api_key: api_key.into(),
            ..Self::default()
        };
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        if let Some(t) = temperature {
            if (0.0..=1.0).contains(&t) {
                config.temperature = t;
            } else {
                tracing::warn!(temperature = t, "Temperature out of range [0, 1], keeping default");
            }
        }
        if let Some(m) = max_tokens {
            if m > 0 && m <= MAX_TOKENS_LIMIT {
                config.max_tokens = m;
            } else {
                tracing::warn!(max_tokens = m, "max_tokens out of range (0, {MAX_TOKENS_LIMIT}], keeping default");
            }
        }
        config
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            client_id: concat!("missionclaw/", env!("CARGO_PKG_VERSION")).into(),
            api_key: String::new(),
            model: DEFAULT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("api_url", &self.api_url)
            .field("client_id", &self.client_id)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Unique identifier of a mission run, used to correlate log lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MissionId(pub uuid::Uuid);

impl MissionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for MissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_legacy_api() {
        let config = AgentConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.model, "claude-v1");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.max_tokens, 1024);
    }

    #[test]
    fn out_of_range_values_are_ignored() {
        let config = AgentConfig::new("key", None, Some(1.5), Some(9000));
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);

        let config = AgentConfig::new("key", Some("claude-instant-v1".into()), Some(0.7), Some(8000));
        assert_eq!(config.model, "claude-instant-v1");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 8000);
    }

    #[test]
    fn zero_max_tokens_rejected() {
        let config = AgentConfig::new("key", None, None, Some(0));
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn debug_redacts_key() {
        let config = AgentConfig::new("sk-secret", None, None, None);
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn mission_ids_are_unique() {
        assert_ne!(MissionId::new(), MissionId::new());
    }
}
