//! Knowledge base: facts prepended to every conversation.

use std::path::Path;
use crate::error::KnowledgeError;

/// Ordered list of fact strings. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    facts: Vec<String>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from in-memory facts; blank entries are dropped.
    pub fn from_facts<I, S>(facts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            facts: facts
                .into_iter()
                .map(Into::into)
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }

    /// Parse a knowledge file: one fact per non-empty line.
    pub fn parse(content: &str) -> Self {
        Self::from_facts(content.lines())
    }

    /// Load facts from a file.
    pub async fn load(path: &Path) -> std::result::Result<Self, KnowledgeError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| KnowledgeError::ReadError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let kb = Self::parse(&content);
        tracing::debug!(path = %path.display(), facts = kb.len(), "Knowledge loaded");
        Ok(kb)
    }

    pub fn facts(&self) -> &[String] {
        &self.facts
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}
