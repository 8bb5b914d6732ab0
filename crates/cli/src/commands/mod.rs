//! Subcommand implementations and the wiring they share.

pub mod mission;
pub mod translate;

use missionclaw_agent::Agent;
use missionclaw_config::{AppConfig, PromptLibrary};
use missionclaw_providers::AnthropicCompletionClient;
use std::path::Path;
use std::sync::Arc;

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env();
            config
        }
        None => AppConfig::load()?,
    };
    Ok(config)
}

/// Fail early, with setup instructions, when no API key is configured.
pub fn require_api_key(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.has_api_key() {
        return Ok(());
    }

    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    MISSIONCLAW_API_KEY = '...'");
    eprintln!("    ANTHROPIC_API_KEY   = '...'");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    Err("No API key found. See above for setup instructions.".into())
}

/// An agent talking to the configured completion endpoint.
pub fn build_agent(config: &AppConfig, prompts: &PromptLibrary) -> Agent {
    let agent_config = config.agent_config();
    let client = Arc::new(AnthropicCompletionClient::new(&agent_config));
    Agent::new(agent_config, client, Arc::new(prompts.agent().clone()))
}
