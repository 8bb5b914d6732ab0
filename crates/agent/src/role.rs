//! Role analysis: the first turn of every mission.
//!
//! The model is asked for three lines: the role it should play, the
//! workflow best suited to the task, and the language to answer in.

use missionclaw_config::DEFAULT_WORKFLOW;
use std::sync::LazyLock;

/// Characters removed from every answer line.
const NOISE: &[char] = &['*', '_', '`', '\'', '"', '!', '?', '\\', '/'];

static ENUMERATOR: LazyLock<regex_lite::Regex> =
    LazyLock::new(|| regex_lite::Regex::new(r"^\d+\.\s*").expect("static regex"));

/// The outcome of role analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleAnalysis {
    pub role: String,
    /// Always the name of a known workflow
    pub template: String,
    pub language: String,
}

impl RoleAnalysis {
    /// Parse the model's answer. `jobs` are the known workflow names;
    /// a template outside them becomes the default workflow.
    pub fn parse(answer: &str, jobs: &[&str]) -> Self {
        let mut lines = answer
            .split(['\r', '\n'])
            .filter(|line| !line.is_empty())
            .map(clean_line);

        let role = lines.next().unwrap_or_default();
        let template = lines.next().unwrap_or_default();
        let language = lines.next().unwrap_or_default();

        let template = jobs
            .iter()
            .find(|job| job.eq_ignore_ascii_case(&template))
            .map_or(DEFAULT_WORKFLOW, |job| *job)
            .to_string();

        Self {
            role,
            template,
            language,
        }
    }
}

/// `2. **Workflow**: writer` → `writer`
fn clean_line(line: &str) -> String {
    let line = ENUMERATOR.replace(line, "");
    let line: String = line.trim().chars().filter(|c| !NOISE.contains(c)).collect();
    line.split([':', '：'])
        .last()
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOBS: &[&str] = &["default", "researcher", "writer"];

    #[test]
    fn numbered_answer() {
        let analysis = RoleAnalysis::parse("1. Project Analyst\n2. writer\n3. Chinese", JOBS);
        assert_eq!(
            analysis,
            RoleAnalysis {
                role: "Project Analyst".into(),
                template: "writer".into(),
                language: "Chinese".into(),
            }
        );
    }

    #[test]
    fn labels_and_markup_are_removed() {
        let answer = "**Role**: \"Senior Rust Engineer\"\r\n\r\nWorkflow： Researcher!\nLanguage: English";
        let analysis = RoleAnalysis::parse(answer, JOBS);
        assert_eq!(analysis.role, "Senior Rust Engineer");
        assert_eq!(analysis.template, "researcher");
        assert_eq!(analysis.language, "English");
    }

    #[test]
    fn unknown_template_falls_back_to_default() {
        let analysis = RoleAnalysis::parse("Poet\nsonnet-writer\nFrench", JOBS);
        assert_eq!(analysis.template, "default");
    }

    #[test]
    fn missing_lines_are_empty() {
        let analysis = RoleAnalysis::parse("Explorer", JOBS);
        assert_eq!(analysis.role, "Explorer");
        assert_eq!(analysis.template, "default");
        assert!(analysis.language.is_empty());

        assert_eq!(RoleAnalysis::parse("", JOBS).role, "");
    }
}
