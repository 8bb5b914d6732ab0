//! Tool trait: the abstraction over mission capabilities.
//!
//! Tools are the commands the model may ask for in its plan: search the web,
//! browse a page, declare the mission complete, etc. The model only ever
//! sees a tool's command id, its aliases and argument names; arguments come
//! back as a flat string map recovered from free text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use crate::error::ToolError;

/// Arguments of one invocation. Keys are unique; ordering is irrelevant,
/// a sorted map just keeps logs stable.
pub type Arguments = BTreeMap<String, String>;

/// One command requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// The name as the model wrote it (command id or alias)
    pub name: String,

    /// Argument map
    #[serde(default)]
    pub args: Arguments,
}

impl Invocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Arguments::new(),
        }
    }

    /// Add an argument (builder style).
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Render the arguments as `key="value", ...` for log lines.
    pub fn describe_args(&self) -> String {
        self.args
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// What a tool hands back after running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Message for the human operator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speak: Option<String>,

    /// Payload fed back to the model on the next turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,

    /// The mission is over
    #[serde(default)]
    pub exit: bool,
}

impl ToolOutcome {
    /// An outcome that only feeds text back to the model.
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: Some(text.into()),
            ..Self::default()
        }
    }

    /// An outcome that ends the mission.
    pub fn exit() -> Self {
        Self {
            exit: true,
            ..Self::default()
        }
    }

    pub fn with_speak(mut self, speak: impl Into<String>) -> Self {
        self.speak = Some(speak.into());
        self
    }
}

/// The core Tool trait.
///
/// Each built-in command (task_complete, browse_website, google_search)
/// implements this trait and is registered in the [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Human-readable name (e.g., "Google Search").
    fn name(&self) -> &str;

    /// The unique command id the model calls (e.g., "google_search").
    fn command(&self) -> &str;

    /// Other names the model tends to use for this command.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Argument names advertised to the model.
    fn arg_names(&self) -> &[&str] {
        &[]
    }

    /// A short description of what this tool does.
    fn description(&self) -> &str;

    /// Run the tool.
    async fn execute(&self, args: &Arguments) -> std::result::Result<ToolOutcome, ToolError>;
}

/// A registry of available tools.
///
/// Lookup goes by exact command id first, then through the alias table.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    aliases: HashMap<String, String>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            aliases: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same command id.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let command = tool.command().to_string();
        for alias in tool.aliases() {
            self.aliases.insert((*alias).to_string(), command.clone());
        }
        if !self.order.contains(&command) {
            self.order.push(command.clone());
        }
        self.tools.insert(command, tool);
    }

    /// Builder-style registration.
    pub fn with_tool(mut self, tool: Box<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Resolve a name the model used: exact command id, then alias.
    pub fn resolve(&self, name: &str) -> Option<&dyn Tool> {
        if let Some(tool) = self.tools.get(name) {
            return Some(tool.as_ref());
        }
        self.aliases
            .get(name)
            .and_then(|command| self.tools.get(command))
            .map(|t| t.as_ref())
    }

    /// One numbered line per tool, in registration order, for the
    /// `<commands>` placeholder of the mission prompt.
    pub fn describe(&self) -> String {
        self.order
            .iter()
            .filter_map(|command| self.tools.get(command))
            .enumerate()
            .map(|(i, tool)| {
                let args = tool
                    .arg_names()
                    .iter()
                    .map(|a| format!("\"{a}\": \"<{a}>\""))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "{}. {}: \"{}\", args: {{{}}} ({})",
                    i + 1,
                    tool.name(),
                    tool.command(),
                    args,
                    tool.description()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// List all registered command ids, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
