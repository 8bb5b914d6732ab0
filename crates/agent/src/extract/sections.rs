//! Heading-delimited sections of a normalized answer.

use std::fmt;

/// The plan fields the mission prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlanField {
    Thoughts,
    Reasoning,
    Plan,
    Criticism,
    Speak,
    Command,
    /// A heading the engine does not know, kept verbatim
    Unrecognized(String),
}

impl PlanField {
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        match name.to_lowercase().as_str() {
            "thoughts" | "thought" => Self::Thoughts,
            "reasoning" => Self::Reasoning,
            "plan" => Self::Plan,
            "criticism" => Self::Criticism,
            "speak" => Self::Speak,
            "command" | "commands" => Self::Command,
            _ => Self::Unrecognized(name.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Thoughts => "thoughts",
            Self::Reasoning => "reasoning",
            Self::Plan => "plan",
            Self::Criticism => "criticism",
            Self::Speak => "speak",
            Self::Command => "command",
            Self::Unrecognized(name) => name,
        }
    }
}

impl fmt::Display for PlanField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split text at `#`-headings. Text before the first heading is dropped;
/// bodies are trimmed. Sections come back in document order, duplicates
/// included.
pub fn split_sections(text: &str) -> Vec<(PlanField, String)> {
    let mut sections: Vec<(PlanField, Vec<&str>)> = Vec::new();
    for line in text.lines() {
        if let Some(name) = heading(line) {
            sections.push((PlanField::parse(name), Vec::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push(line);
        }
    }
    sections
        .into_iter()
        .map(|(field, body)| (field, body.join("\n").trim().to_string()))
        .collect()
}

fn heading(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('#')?.trim_start_matches('#');
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let name = rest.trim();
    (!name.is_empty()).then_some(name)
}
