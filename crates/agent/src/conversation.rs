//! Continuation engine: one logical turn over a token-limited API.
//!
//! The completion API stops after `max_tokens`. A turn keeps asking the
//! model to continue, replaying its partial answer, until a chunk ends for
//! any other reason. The chunks are concatenated into one answer.
//!
//! Every request carries the whole conversation as one flat prompt:
//!
//! ```text
//! Human: <knowledge header>
//! <fact>...
//!
//! Human: <earlier prompt>
//!
//! Assistant: <earlier answer>
//!
//! Human: <this turn>
//!
//! Assistant:
//! ```

use missionclaw_config::AgentPrompts;
use missionclaw_core::completion::{CompletionClient, CompletionRequest, PREFIX_AI, PREFIX_HUMAN};
use missionclaw_core::error::{CompletionError, KnowledgeError};
use missionclaw_core::{AgentConfig, ConversationMemory, KnowledgeBase};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Echo some models put in front of a continued answer.
const CONTINUATION_ECHO: &str = "with:";

/// A finished logical turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// Concatenated answer
    pub text: String,
    /// Underlying completion requests issued
    pub requests: u32,
    /// Wall-clock time spent
    pub elapsed: Duration,
}

/// A conversation with one completion backend.
///
/// Owns its memory exclusively. Use [`Agent::fork`] for independent
/// sub-conversations.
pub struct Agent {
    config: AgentConfig,
    client: Arc<dyn CompletionClient>,
    prompts: Arc<AgentPrompts>,
    knowledge: KnowledgeBase,
    memory: ConversationMemory,
}

impl Agent {
    pub fn new(config: AgentConfig, client: Arc<dyn CompletionClient>, prompts: Arc<AgentPrompts>) -> Self {
        Self {
            config,
            client,
            prompts,
            knowledge: KnowledgeBase::default(),
            memory: ConversationMemory::default(),
        }
    }

    pub fn with_knowledge(mut self, knowledge: KnowledgeBase) -> Self {
        self.knowledge = knowledge;
        self
    }

    /// Replace the knowledge base with the facts in `path`.
    pub async fn load_knowledge(&mut self, path: &Path) -> Result<usize, KnowledgeError> {
        self.knowledge = KnowledgeBase::load(path).await?;
        info!(path = %path.display(), facts = self.knowledge.len(), "Knowledge loaded");
        Ok(self.knowledge.len())
    }

    /// Load the facts in `path` if it can be read. On failure the error is
    /// logged and the current knowledge base is kept.
    pub async fn load_knowledge_or_warn(&mut self, path: &Path) -> usize {
        match self.load_knowledge(path).await {
            Ok(facts) => facts,
            Err(e) => {
                warn!(error = %e, "Continuing without knowledge");
                self.knowledge.len()
            }
        }
    }

    /// Same configuration, client, prompts and knowledge; empty memory.
    pub fn fork(&self) -> Self {
        Self {
            config: self.config.clone(),
            client: Arc::clone(&self.client),
            prompts: Arc::clone(&self.prompts),
            knowledge: self.knowledge.clone(),
            memory: ConversationMemory::default(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn prompts(&self) -> &AgentPrompts {
        &self.prompts
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Record a logical exchange.
    pub fn remember(&mut self, prompt: impl Into<String>, answer: impl Into<String>) {
        self.memory.push(prompt, answer);
    }

    /// One turn with the system preamble, remembered.
    pub async fn ask(&mut self, prompt: &str, temperature: Option<f32>) -> Result<String, CompletionError> {
        let turn = self.converse(prompt, temperature, true).await?;
        self.memory.push(prompt, turn.text.clone());
        info!(
            "Reply spent {} loops and {} ms.",
            turn.requests,
            turn.elapsed.as_millis()
        );
        Ok(turn.text)
    }

    /// Run one logical turn. Memory is read, never written.
    ///
    /// `temperature` falls back to the configured default. With `preamble`
    /// the prompt is wrapped in the system info (with the current time) and
    /// the reply format instruction.
    pub async fn converse(
        &self,
        prompt: &str,
        temperature: Option<f32>,
        preamble: bool,
    ) -> Result<Turn, CompletionError> {
        let started = Instant::now();
        let temperature = temperature.unwrap_or(self.config.temperature);
        let context = self.context();

        let human = if preamble {
            let now = chrono::Local::now().format("%Y/%m/%d %H:%M:%S");
            format!(
                "{PREFIX_HUMAN}{}current time is {now}\n{prompt}\n{}",
                self.prompts.system_info, self.prompts.reply_format
            )
        } else {
            format!("{PREFIX_HUMAN}{prompt}")
        };
        let continue_chat = format!("{PREFIX_HUMAN}{}", self.prompts.continue_chat);

        let mut answer = String::new();
        let mut requests = 0u32;
        loop {
            requests += 1;

            let partial;
            let mut parts: Vec<&str> = Vec::with_capacity(5);
            if let Some(context) = &context {
                parts.push(context);
            }
            parts.push(&human);
            if requests > 1 {
                partial = format!("{PREFIX_AI}{answer}");
                parts.push(&partial);
                parts.push(&continue_chat);
            }
            parts.push(PREFIX_AI);
            let full_prompt = format!("\n\n{}", parts.join("\n\n"));

            let request = CompletionRequest::new(&self.config.model, full_prompt, temperature, self.config.max_tokens);
            debug!(request = requests, temperature, "Sending turn request");
            let chunk = self.client.complete(request).await?;

            let mut piece = chunk.text.trim();
            if requests > 1 {
                piece = strip_continuation_echo(piece);
            }
            answer.push_str(piece);

            if !chunk.stop_reason.is_truncated() {
                break;
            }
            debug!(request = requests, answer_len = answer.len(), "Answer truncated, continuing");
        }

        Ok(Turn {
            text: answer,
            requests,
            elapsed: started.elapsed(),
        })
    }

    /// Knowledge block followed by the remembered exchanges.
    fn context(&self) -> Option<String> {
        let mut blocks = Vec::with_capacity(2);
        if !self.knowledge.is_empty() {
            blocks.push(format!(
                "{PREFIX_HUMAN}{}\n{}",
                self.prompts.knowledge,
                self.knowledge.facts().join("\n")
            ));
        }
        if let Some(memory) = self.memory.render() {
            blocks.push(memory);
        }
        (!blocks.is_empty()).then(|| blocks.join("\n\n"))
    }
}

/// Drop a leading `with:` (any case) and the whitespace around it.
fn strip_continuation_echo(chunk: &str) -> &str {
    let trimmed = chunk.trim_start();
    match trimmed.get(..CONTINUATION_ECHO.len()) {
        Some(head) if head.eq_ignore_ascii_case(CONTINUATION_ECHO) => {
            trimmed[CONTINUATION_ECHO.len()..].trim_start()
        }
        _ => chunk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_agent, ScriptedClient};
    use missionclaw_core::CompletionResponse;

    #[tokio::test]
    async fn single_request_when_not_truncated() {
        let client = Arc::new(ScriptedClient::texts(&["  Hello there.  \n"]));
        let agent = make_agent(client.clone());

        let turn = agent.converse("hi", None, false).await.unwrap();
        assert_eq!(turn.text, "Hello there.");
        assert_eq!(turn.requests, 1);
        assert_eq!(client.call_count(), 1);

        let request = &client.requests()[0];
        assert_eq!(request.prompt, "\n\nHuman: hi\n\nAssistant: ");
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.max_tokens, 1024);
        assert_eq!(request.stop_sequences, vec!["Human: ", "Assistant: "]);
    }

    #[tokio::test]
    async fn truncated_chunks_are_concatenated() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(CompletionResponse::truncated("The quick ")),
            Ok(CompletionResponse::truncated(" With: brown fox")),
            Ok(CompletionResponse::finished("with:\n jumps.")),
        ]));
        let agent = make_agent(client.clone());

        let turn = agent.converse("tell me", Some(0.7), false).await.unwrap();
        assert_eq!(turn.requests, 3);
        assert_eq!(turn.text, "The quickbrown foxjumps.");

        let requests = client.requests();
        assert_eq!(requests.len(), 3);
        let continue_chat = &agent.prompts().continue_chat;
        assert_eq!(
            requests[1].prompt,
            format!("\n\nHuman: tell me\n\nAssistant: The quick\n\nHuman: {continue_chat}\n\nAssistant: ")
        );
        assert!(requests[2].prompt.contains("Assistant: The quickbrown fox\n\n"));
        assert!(requests.iter().all(|r| r.temperature == 0.7));
    }

    #[tokio::test]
    async fn first_chunk_keeps_with_prefix() {
        let client = Arc::new(ScriptedClient::texts(&["with: care"]));
        let agent = make_agent(client);
        let turn = agent.converse("x", None, false).await.unwrap();
        assert_eq!(turn.text, "with: care");
    }

    #[tokio::test]
    async fn preamble_wraps_prompt() {
        let client = Arc::new(ScriptedClient::texts(&["ok"]));
        let agent = make_agent(client.clone());
        agent.converse("Do the thing", None, true).await.unwrap();

        let prompt = &client.requests()[0].prompt;
        let prompts = agent.prompts();
        assert!(prompt.starts_with(&format!("\n\nHuman: {}current time is ", prompts.system_info)));
        assert!(prompt.contains(&format!("\nDo the thing\n{}", prompts.reply_format)));
        assert!(prompt.ends_with("\n\nAssistant: "));
    }

    #[tokio::test]
    async fn context_includes_knowledge_and_memory() {
        let client = Arc::new(ScriptedClient::texts(&["fine"]));
        let mut agent = make_agent(client.clone())
            .with_knowledge(KnowledgeBase::from_facts(["Rust is fast", "Tokio is async"]));
        agent.remember("earlier question", "earlier answer");

        agent.converse("now", None, false).await.unwrap();
        let prompt = &client.requests()[0].prompt;
        let header = &agent.prompts().knowledge;
        assert_eq!(
            *prompt,
            format!(
                "\n\nHuman: {header}\nRust is fast\nTokio is async\n\nHuman: earlier question\n\nAssistant: earlier answer\n\nHuman: now\n\nAssistant: "
            )
        );
        // converse never writes memory
        assert_eq!(agent.memory().len(), 1);
    }

    #[tokio::test]
    async fn ask_remembers_the_exchange() {
        let client = Arc::new(ScriptedClient::texts(&["answer one"]));
        let mut agent = make_agent(client);
        let answer = agent.ask("question one", None).await.unwrap();
        assert_eq!(answer, "answer one");
        assert_eq!(agent.memory().exchanges()[0].prompt, "question one");
        assert_eq!(agent.memory().exchanges()[0].answer, "answer one");
    }

    #[tokio::test]
    async fn failure_propagates_without_partial_answer() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(CompletionResponse::truncated("partial")),
            Err(CompletionError::Network("reset".into())),
        ]));
        let agent = make_agent(client);
        let err = agent.converse("x", None, false).await.unwrap_err();
        assert!(matches!(err, CompletionError::Network(_)));
    }

    #[test]
    fn fork_starts_with_empty_memory() {
        let client = Arc::new(ScriptedClient::texts(&["x"]));
        let mut agent = make_agent(client).with_knowledge(KnowledgeBase::from_facts(["fact"]));
        agent.remember("q", "a");

        let fork = agent.fork();
        assert!(fork.memory().is_empty());
        assert_eq!(fork.knowledge().len(), 1);
        assert_eq!(fork.config().model, agent.config().model);
        assert_eq!(agent.memory().len(), 1);
    }

    #[tokio::test]
    async fn unreadable_knowledge_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(ScriptedClient::texts(&["still here"]));
        let mut agent = make_agent(client.clone());

        let facts = agent.load_knowledge_or_warn(&dir.path().join("missing.txt")).await;
        assert_eq!(facts, 0);
        assert!(agent.knowledge().is_empty());

        let turn = agent.converse("hi", None, false).await.unwrap();
        assert_eq!(turn.text, "still here");
        assert_eq!(client.requests()[0].prompt, "\n\nHuman: hi\n\nAssistant: ");
    }

    #[tokio::test]
    async fn knowledge_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.txt");
        std::fs::write(&path, "Rust is fast\n\nTokio is async\n").unwrap();
        let mut agent = make_agent(Arc::new(ScriptedClient::texts(&["x"])));

        assert_eq!(agent.load_knowledge_or_warn(&path).await, 2);
        assert_eq!(agent.knowledge().facts().to_vec(), vec!["Rust is fast", "Tokio is async"]);
    }

    #[test]
    fn continuation_echo_stripping() {
        assert_eq!(strip_continuation_echo("WITH:  rest"), "rest");
        assert_eq!(strip_continuation_echo("without"), "without");
        assert_eq!(strip_continuation_echo("wi"), "wi");
        assert_eq!(strip_continuation_echo("é"), "é");
    }
}
