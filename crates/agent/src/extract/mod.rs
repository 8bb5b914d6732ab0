//! Command extractor: recover a structured plan from a free-text answer.
//!
//! Three stages:
//!
//! 1. [`normalize`] rewrites loosely formatted fields as `# field` headings.
//! 2. [`split_sections`] cuts the normalized text at its headings.
//! 3. [`parse_commands`] turns the `command` section into invocations.
//!
//! Extraction never fails. An answer without any recognizable field
//! becomes a fallback plan that gives up the mission.

mod commands;
mod normalize;
mod sections;

pub use commands::{parse_block_args, parse_commands};
pub use normalize::normalize;
pub use sections::{split_sections, PlanField};

use missionclaw_core::tool::Invocation;

/// Command issued by the fallback plan.
pub const GIVE_UP_COMMAND: &str = "task_complete";

/// Reason given by the fallback plan.
pub const GIVE_UP_REASON: &str = "Mission Failed.";

/// The plan the model laid out in one answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredPlan {
    pub thoughts: Option<String>,
    pub reasoning: Option<String>,
    pub plan: Option<String>,
    pub criticism: Option<String>,
    pub speak: Option<String>,
    /// Invocations in the order written
    pub commands: Vec<Invocation>,
    /// Sections under headings the engine does not know
    pub extras: Vec<(String, String)>,
    /// No recognizable field was found
    pub fallback: bool,
}

impl StructuredPlan {
    /// Normalize a raw answer and parse it.
    pub fn extract(answer: &str) -> Self {
        Self::parse(&normalize(answer))
    }

    /// Parse already normalized text.
    ///
    /// Repeated sections are concatenated. A `command` section that yields
    /// no invocation leaves the command list empty.
    pub fn parse(normalized: &str) -> Self {
        let mut plan = Self::default();
        let mut recognized = false;
        let mut command_text = String::new();

        for (field, body) in split_sections(normalized) {
            let slot = match field {
                PlanField::Thoughts => &mut plan.thoughts,
                PlanField::Reasoning => &mut plan.reasoning,
                PlanField::Plan => &mut plan.plan,
                PlanField::Criticism => &mut plan.criticism,
                PlanField::Speak => &mut plan.speak,
                PlanField::Command => {
                    recognized = true;
                    if !body.is_empty() {
                        if !command_text.is_empty() {
                            command_text.push('\n');
                        }
                        command_text.push_str(&body);
                    }
                    continue;
                }
                PlanField::Unrecognized(name) => {
                    plan.extras.push((name, body));
                    continue;
                }
            };
            recognized = true;
            append(slot, body);
        }

        if !recognized {
            return Self::fallback(normalized);
        }
        plan.commands = parse_commands(&command_text);
        plan
    }

    /// The plan used when nothing could be recovered: echo the answer and
    /// give up.
    pub fn fallback(answer: &str) -> Self {
        Self {
            thoughts: Some(answer.to_string()),
            speak: Some(answer.to_string()),
            commands: vec![Invocation::new(GIVE_UP_COMMAND).with_arg("reason", GIVE_UP_REASON)],
            fallback: true,
            ..Self::default()
        }
    }

    /// Non-empty text fields with their names, in display order.
    pub fn fields(&self) -> impl Iterator<Item = (PlanField, &str)> {
        [
            (PlanField::Thoughts, &self.thoughts),
            (PlanField::Reasoning, &self.reasoning),
            (PlanField::Plan, &self.plan),
            (PlanField::Criticism, &self.criticism),
            (PlanField::Speak, &self.speak),
        ]
        .into_iter()
        .filter_map(|(field, text)| text.as_deref().map(|text| (field, text)))
    }
}

fn append(slot: &mut Option<String>, body: String) {
    if body.is_empty() {
        return;
    }
    match slot {
        Some(existing) => {
            existing.push('\n');
            existing.push_str(&body);
        }
        None => *slot = Some(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_answer() {
        let answer = r#"Thoughts: The page should answer this.
Reasoning: Browsing is cheaper than searching.
Plan:
- open the page
- summarize
Criticism: None.
Speak: "Opening the page."
Command:
- "browse_website": {"url": "https://example.com"}"#;

        let plan = StructuredPlan::extract(answer);
        assert!(!plan.fallback);
        assert_eq!(plan.thoughts.as_deref(), Some("The page should answer this."));
        assert_eq!(plan.reasoning.as_deref(), Some("Browsing is cheaper than searching."));
        assert_eq!(plan.plan.as_deref(), Some("- open the page\n- summarize"));
        assert_eq!(plan.criticism.as_deref(), Some("None."));
        assert_eq!(plan.speak.as_deref(), Some("Opening the page."));
        assert_eq!(
            plan.commands,
            vec![Invocation::new("browse_website").with_arg("url", "https://example.com")]
        );
        assert_eq!(plan.fields().count(), 5);
    }

    #[test]
    fn json_shaped_answer() {
        let answer = r#"{
  "thoughts": "search first",
  "speak": "Searching.",
  "command": {"name": "google", "args": {"query": "missionclaw"}}
}"#;
        let plan = StructuredPlan::extract(answer);
        assert_eq!(plan.thoughts.as_deref(), Some("search first"));
        assert_eq!(plan.speak.as_deref(), Some("Searching."));
        assert_eq!(
            plan.commands,
            vec![Invocation::new("google").with_arg("query", "missionclaw")]
        );
    }

    #[test]
    fn unstructured_answer_falls_back_to_giving_up() {
        let plan = StructuredPlan::extract("Sorry, I cannot help with that.");
        assert!(plan.fallback);
        assert_eq!(plan.thoughts.as_deref(), Some("Sorry, I cannot help with that."));
        assert_eq!(plan.speak, plan.thoughts);
        assert_eq!(
            plan.commands,
            vec![Invocation::new("task_complete").with_arg("reason", "Mission Failed.")]
        );
    }

    #[test]
    fn only_unknown_headings_is_still_a_fallback() {
        let plan = StructuredPlan::extract("# summary\nall good");
        assert!(plan.fallback);
        assert_eq!(plan.thoughts.as_deref(), Some("# summary\nall good"));
    }

    #[test]
    fn empty_command_field_gives_no_invocations() {
        let plan = StructuredPlan::extract("Thoughts: waiting\nCommand:");
        assert!(!plan.fallback);
        assert!(plan.commands.is_empty());

        let plan = StructuredPlan::extract("Speak: hello");
        assert!(!plan.fallback);
        assert!(plan.commands.is_empty());
    }

    #[test]
    fn bare_task_complete_command() {
        let plan = StructuredPlan::extract("Thoughts: done\nCommand: \"task_complete\"");
        assert_eq!(plan.commands, vec![Invocation::new("task_complete")]);
    }

    #[test]
    fn repeated_sections_are_joined_and_extras_kept() {
        let plan = StructuredPlan::parse("# thoughts\none\n# notes\nside remark\n# thoughts\ntwo");
        assert_eq!(plan.thoughts.as_deref(), Some("one\ntwo"));
        assert_eq!(plan.extras, vec![("notes".to_string(), "side remark".to_string())]);
    }
}
