//! Conversation memory: the logical turns of one agent.
//!
//! One entry per logical turn, never per continuation fragment. Memory is
//! append-only and owned by exactly one agent; forking an agent starts a
//! fresh, empty memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::completion::{PREFIX_AI, PREFIX_HUMAN};

/// A single (prompt, answer) exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub prompt: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

impl Exchange {
    pub fn new(prompt: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            answer: answer.into(),
            timestamp: Utc::now(),
        }
    }

    /// Render as a `Human:` / `Assistant:` pair. Empty sides are left out.
    pub fn render(&self) -> Option<String> {
        let mut turns = Vec::with_capacity(2);
        if !self.prompt.is_empty() {
            turns.push(format!("{PREFIX_HUMAN}{}", self.prompt));
        }
        if !self.answer.is_empty() {
            turns.push(format!("{PREFIX_AI}{}", self.answer));
        }
        (!turns.is_empty()).then(|| turns.join("\n\n"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    exchanges: Vec<Exchange>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, prompt: impl Into<String>, answer: impl Into<String>) {
        self.exchanges.push(Exchange::new(prompt, answer));
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Serialized transcript, exchanges separated by a blank line.
    /// `None` when nothing was said yet.
    pub fn render(&self) -> Option<String> {
        let rendered = self
            .exchanges
            .iter()
            .filter_map(Exchange::render)
            .collect::<Vec<_>>();
        (!rendered.is_empty()).then(|| rendered.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_memory_renders_nothing() {
        assert!(ConversationMemory::new().render().is_none());
    }

    #[test]
    fn render_alternates_turns() {
        let mut memory = ConversationMemory::new();
        memory.push("hi", "hello");
        memory.push("bye", "see you");
        assert_eq!(memory.len(), 2);
        assert_eq!(
            memory.render().unwrap(),
            "Human: hi\n\nAssistant: hello\n\nHuman: bye\n\nAssistant: see you"
        );
    }

    #[test]
    fn empty_sides_are_skipped() {
        let mut memory = ConversationMemory::new();
        memory.push("", "");
        assert!(memory.render().is_none());
        memory.push("only a question", "");
        assert_eq!(memory.render().unwrap(), "Human: only a question");
    }
}
