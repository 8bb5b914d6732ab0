//! Completion client implementations for MissionClaw.
//!
//! All clients implement the `missionclaw_core::CompletionClient` trait.

pub mod anthropic;

pub use anthropic::AnthropicCompletionClient;
