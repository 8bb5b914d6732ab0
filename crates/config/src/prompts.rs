//! Prompt library: base prompts and named mission workflows.
//!
//! Prompts live in TOML files:
//! - `agent.toml` holds the base prompts every conversation uses
//! - `workflow-<name>.toml` holds one workflow; `workflow-default.toml` is
//!   mandatory and fills every key a named workflow leaves out
//!
//! The built-in files are compiled into the binary, a prompts directory
//! overrides them file by file.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use crate::ConfigError;

const BUILTIN_AGENT: &str = include_str!("../prompts/agent.toml");
const BUILTIN_WORKFLOWS: &[(&str, &str)] = &[
    ("default", include_str!("../prompts/workflow-default.toml")),
    ("researcher", include_str!("../prompts/workflow-researcher.toml")),
    ("writer", include_str!("../prompts/workflow-writer.toml")),
];

/// Name of the workflow that must always exist.
pub const DEFAULT_WORKFLOW: &str = "default";

const AGENT_FILE: &str = "agent.toml";
const WORKFLOW_PREFIX: &str = "workflow-";

/// Base prompts shared by every conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentPrompts {
    /// Header of the knowledge block
    #[serde(default)]
    pub knowledge: String,

    /// System preamble, followed by the current time
    pub system_info: String,

    /// Reply format instruction appended after the prompt
    pub reply_format: String,

    /// Human turn sent after a truncated answer
    pub continue_chat: String,

    /// Role analysis prompt (`<jobs>`, `<task>`)
    pub analyze_role: String,
}

/// A fully merged workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    pub name: String,

    /// First mission turn (`<time>`, `<role>`, `<commands>`, `<task>`)
    pub mission_start: String,

    /// Prompt used when the previous turn produced no tool replies
    pub mission_continue_empty: String,

    pub heat_max: f32,
    pub heat_min: f32,
    pub heat_decay_rate: f32,
}

impl Workflow {
    /// Fill the start prompt. The task becomes one `- ` bullet per line.
    pub fn render_start(&self, time: &str, role: &str, commands: &str, task: &str) -> String {
        let bullets = task
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| format!("- {l}"))
            .collect::<Vec<_>>()
            .join("\n");
        self.mission_start
            .replace("<time>", time)
            .replace("<role>", role)
            .replace("<commands>", commands)
            .replace("<task>", &bullets)
    }
}

/// Raw key/value pairs of one workflow file.
type RawWorkflow = BTreeMap<String, String>;

/// The prompt store.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    agent: AgentPrompts,
    workflows: BTreeMap<String, RawWorkflow>,
}

impl PromptLibrary {
    /// The compiled-in prompts.
    pub fn builtin() -> Result<Self, ConfigError> {
        let agent = parse_agent(AGENT_FILE, BUILTIN_AGENT)?;
        let mut workflows = BTreeMap::new();
        for (name, content) in BUILTIN_WORKFLOWS {
            let file = format!("{WORKFLOW_PREFIX}{name}.toml");
            workflows.insert((*name).to_string(), parse_workflow(&file, content)?);
        }
        Self::from_parts(agent, workflows)
    }

    /// Built-in prompts overridden by the files found in `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, ConfigError> {
        let mut library = Self::builtin()?;

        let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::ReadError {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(file) = path.file_name().and_then(|f| f.to_str()).map(str::to_string) else {
                continue;
            };
            let Some(stem) = file.strip_suffix(".toml") else {
                continue;
            };

            let read = |path: &Path| {
                std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            };

            if file == AGENT_FILE {
                library.agent = parse_agent(&file, &read(&path)?)?;
            } else if let Some(name) = stem.strip_prefix(WORKFLOW_PREFIX).filter(|n| !n.is_empty()) {
                let raw = parse_workflow(&file, &read(&path)?)?;
                library.workflows.insert(name.to_string(), raw);
            }
        }

        tracing::debug!(dir = %dir.display(), workflows = library.workflows.len(), "Prompts loaded");
        Self::from_parts(library.agent, library.workflows)
    }

    fn from_parts(agent: AgentPrompts, workflows: BTreeMap<String, RawWorkflow>) -> Result<Self, ConfigError> {
        let file = format!("{WORKFLOW_PREFIX}{DEFAULT_WORKFLOW}.toml");
        let default = workflows.get(DEFAULT_WORKFLOW).ok_or_else(|| ConfigError::PromptError {
            file: file.clone(),
            reason: "the default workflow is missing".into(),
        })?;
        for key in ["mission_start", "mission_continue_empty"] {
            if default.get(key).is_none_or(|v| v.trim().is_empty()) {
                return Err(ConfigError::PromptError {
                    file,
                    reason: format!("missing key `{key}`"),
                });
            }
        }
        Ok(Self { agent, workflows })
    }

    pub fn agent(&self) -> &AgentPrompts {
        &self.agent
    }

    /// Workflow names offered to the model during role analysis.
    pub fn jobs(&self) -> Vec<&str> {
        self.workflows.keys().map(String::as_str).collect()
    }

    pub fn has_workflow(&self, name: &str) -> bool {
        self.workflows.contains_key(name)
    }

    /// The named workflow merged over the default one (named keys win).
    /// Unknown names give the default workflow.
    pub fn workflow(&self, name: &str) -> Workflow {
        let mut merged = self.workflows.get(DEFAULT_WORKFLOW).cloned().unwrap_or_default();
        let resolved = match self.workflows.get(name) {
            Some(named) => {
                merged.extend(named.iter().map(|(k, v)| (k.clone(), v.clone())));
                name
            }
            None => DEFAULT_WORKFLOW,
        };

        let text = |key: &str| merged.get(key).cloned().unwrap_or_default();
        let number = |key: &str, fallback: f32| {
            merged
                .get(key)
                .and_then(|v| v.trim().parse::<f32>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(fallback)
        };

        Workflow {
            name: resolved.to_string(),
            mission_start: text("mission_start"),
            mission_continue_empty: text("mission_continue_empty"),
            heat_max: number("mission_heat_max", 1.0),
            heat_min: number("mission_heat_min", 0.0),
            heat_decay_rate: number("mission_heat_decay_rate", 1.0),
        }
    }
}

fn parse_agent(file: &str, content: &str) -> Result<AgentPrompts, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::PromptError {
        file: file.to_string(),
        reason: e.to_string(),
    })
}

/// Workflow values may be strings or numbers; everything is kept as text.
fn parse_workflow(file: &str, content: &str) -> Result<RawWorkflow, ConfigError> {
    let table: toml::Table = toml::from_str(content).map_err(|e| ConfigError::PromptError {
        file: file.to_string(),
        reason: e.to_string(),
    })?;

    table
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(ConfigError::PromptError {
                        file: file.to_string(),
                        reason: format!("`{key}` must be a string or a number, got {}", other.type_str()),
                    });
                }
            };
            Ok((key, text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_library_loads() {
        let library = PromptLibrary::builtin().unwrap();
        assert!(library.agent().analyze_role.contains("<jobs>"));
        assert_eq!(library.jobs(), vec!["default", "researcher", "writer"]);
    }

    #[test]
    fn named_workflow_overrides_default() {
        let library = PromptLibrary::builtin().unwrap();
        let default = library.workflow("default");
        let researcher = library.workflow("researcher");

        assert_eq!(researcher.name, "researcher");
        assert_ne!(researcher.mission_start, default.mission_start);
        // not set in the researcher file, inherited
        assert_eq!(researcher.mission_continue_empty, default.mission_continue_empty);
        assert_eq!(researcher.heat_max, default.heat_max);
        assert_eq!(researcher.heat_min, 0.0);
    }

    #[test]
    fn unknown_workflow_is_default() {
        let library = PromptLibrary::builtin().unwrap();
        let wf = library.workflow("astronaut");
        assert_eq!(wf.name, "default");
        assert_eq!(wf, library.workflow("default"));
    }

    #[test]
    fn render_start_fills_placeholders() {
        let wf = Workflow {
            name: "t".into(),
            mission_start: "<time>|<role>|<commands>\n<task>".into(),
            mission_continue_empty: String::new(),
            heat_max: 1.0,
            heat_min: 0.0,
            heat_decay_rate: 0.5,
        };
        let prompt = wf.render_start("2026/01/01 00:00:00", "Analyst", "1. x", "first\n  second \n");
        assert_eq!(prompt, "2026/01/01 00:00:00|Analyst|1. x\n- first\n- second");
    }

    #[test]
    fn directory_overrides_and_adds_workflows() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("workflow-translator.toml"),
            "mission_start = \"translate <task>\"\nmission_heat_decay_rate = \"0.5\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("workflow-default.toml"), "mission_heat_max = 2\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let err = PromptLibrary::load_dir(dir.path()).unwrap_err();
        // the default file was replaced by one without mission_start
        assert!(matches!(err, ConfigError::PromptError { .. }));

        std::fs::remove_file(dir.path().join("workflow-default.toml")).unwrap();
        let library = PromptLibrary::load_dir(dir.path()).unwrap();
        assert!(library.has_workflow("translator"));
        let wf = library.workflow("translator");
        assert_eq!(wf.mission_start, "translate <task>");
        assert_eq!(wf.heat_decay_rate, 0.5);
    }

    #[test]
    fn non_scalar_workflow_value_rejected() {
        let err = parse_workflow("workflow-x.toml", "mission_start = [1, 2]").unwrap_err();
        assert!(err.to_string().contains("workflow-x.toml"));
    }
}
