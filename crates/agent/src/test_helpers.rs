//! Shared test helpers for engine tests.

use async_trait::async_trait;
use missionclaw_config::PromptLibrary;
use missionclaw_core::completion::{CompletionClient, CompletionRequest, CompletionResponse};
use missionclaw_core::error::CompletionError;
use missionclaw_core::AgentConfig;
use std::sync::{Arc, Mutex};

use crate::conversation::Agent;

/// A completion client that replays a script of responses.
///
/// Each call to `complete` returns the next scripted step and records the
/// request. Once the script is exhausted the last step repeats, so loops
/// that never terminate on their own can be tested against their budget.
pub struct ScriptedClient {
    steps: Vec<Result<CompletionResponse, CompletionError>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(steps: Vec<Result<CompletionResponse, CompletionError>>) -> Self {
        assert!(!steps.is_empty(), "ScriptedClient needs at least one step");
        Self {
            steps,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call answers with these texts in turn, none truncated.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(CompletionResponse::finished(*t))).collect())
    }

    /// Every call fails with the same error.
    pub fn failing(error: CompletionError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn temperatures(&self) -> Vec<f32> {
        self.requests().iter().map(|r| r.temperature).collect()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, CompletionError> {
        let mut requests = self.requests.lock().unwrap();
        let step = self.steps[requests.len().min(self.steps.len() - 1)].clone();
        requests.push(request);
        step
    }
}

/// An agent with default config and built-in prompts.
pub fn make_agent(client: Arc<ScriptedClient>) -> Agent {
    let prompts = PromptLibrary::builtin().unwrap();
    Agent::new(AgentConfig::default(), client, Arc::new(prompts.agent().clone()))
}
