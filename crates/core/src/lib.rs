//! # MissionClaw Core
//!
//! Domain types, traits, and error definitions for the MissionClaw mission
//! engine. This crate has **no I/O framework dependencies** beyond reading
//! knowledge files: it defines the domain model that the other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator of the engine is a trait here:
//! - [`CompletionClient`]: one request to a text-completion API
//! - [`Tool`]: one command the model may invoke
//!
//! Implementations live in their respective crates (`missionclaw-providers`,
//! `missionclaw-tools`), which keeps the engine testable with scripted stubs.

pub mod agent;
pub mod completion;
pub mod error;
pub mod knowledge;
pub mod memory;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentConfig, MissionId};
pub use completion::{CompletionClient, CompletionRequest, CompletionResponse, StopReason, Usage};
pub use error::{CompletionError, Error, KnowledgeError, Result, RetryExhausted, ToolError};
pub use knowledge::KnowledgeBase;
pub use memory::{ConversationMemory, Exchange};
pub use tool::{Arguments, Invocation, Tool, ToolOutcome, ToolRegistry};
