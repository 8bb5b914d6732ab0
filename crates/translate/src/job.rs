//! The translation job: one forked conversation per section.

use missionclaw_agent::{Agent, CircuitBreaker, Turn};
use missionclaw_config::TranslateConfig;
use missionclaw_core::error::RetryExhausted;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::decompose::decompose;
use crate::error::TranslateError;

const START_PROMPT: &str = "Translate the content below into <language>. Give the translation only, \
without any comment or analysis. If it does not fit in one reply, you may split it over several replies. \
When the translation is finished, write \"Translation completed\" on a new line. Whenever I say \
\"Please continue\", output the rest of the translation; if the translation is already finished, \
just reply \"Translation completed\".\n\nContent to translate:\n\n<content>";

const CONTINUE_PROMPT: &str = "Please continue";

/// Text kept in place of a section that could not be translated.
pub const FAILED_SECTION: &str = "\n\n<failed>\n\n";

/// Translation runs hot.
const TEMPERATURE: f32 = 1.0;

const DEFAULT_OUTPUT: &str = "out/translate.md";

/// The completion marker at the very end of an answer.
static DONE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(translation\s+(is\s+)?(completed?|finished|done)\.?|翻译(已经?)?(完成|结束))\s*$")
        .expect("static regex")
});

static LEADING_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\n \t]*(#*)[ \t]*").expect("static regex"));

static ANSWER_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\n*#*\s*").expect("static regex"));

static CHINESE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)汉语|中文|chinese").expect("static regex"));

/// ASCII punctuation and its full-width counterpart.
static FULL_WIDTH: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [(",", "，"), ("!", "！"), (r"\?", "？"), (";", "；"), (":", "：")]
        .into_iter()
        .map(|(ascii, wide)| {
            let pattern = format!(r"\s*{ascii}[ \t]*");
            (Regex::new(&pattern).expect("static regex"), wide)
        })
        .collect()
});

/// One translated section.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub text: String,
    pub requests: u32,
    pub failed: bool,
}

impl Section {
    fn failed(requests: u32) -> Self {
        Self {
            text: FAILED_SECTION.to_string(),
            requests,
            failed: true,
        }
    }
}

/// Summary of a finished job.
#[derive(Debug, Clone)]
pub struct TranslateReport {
    pub text: String,
    pub sections: usize,
    pub failed_sections: usize,
    pub requests: u32,
    pub source_len: usize,
    pub elapsed: Duration,
    pub output: PathBuf,
}

pub struct TranslateJob {
    agent: Agent,
    breaker: Arc<CircuitBreaker>,
    language: String,
    output: PathBuf,
    pause: Duration,
    growth_limit: usize,
}

impl TranslateJob {
    pub fn new(agent: Agent, breaker: Arc<CircuitBreaker>) -> Self {
        Self::from_config(agent, breaker, &TranslateConfig::default())
    }

    pub fn from_config(agent: Agent, breaker: Arc<CircuitBreaker>, config: &TranslateConfig) -> Self {
        Self {
            agent,
            breaker,
            language: config.language.clone(),
            output: config
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            pause: Duration::from_secs(config.pause_secs),
            growth_limit: config.growth_limit,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_growth_limit(mut self, growth_limit: usize) -> Self {
        self.growth_limit = growth_limit;
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Translate `content` section by section, saving after each one.
    pub async fn run(&self, content: &str) -> TranslateReport {
        let started = Instant::now();
        let sections = decompose(content);
        let total = sections.len();

        let mut done: Vec<String> = Vec::with_capacity(total);
        let mut requests = 0;
        let mut failed_sections = 0;
        for (i, section) in sections.iter().enumerate() {
            info!("Translating: {} / {total}", i + 1);
            let result = self.translate_section(section).await;
            requests += result.requests;
            if result.failed {
                failed_sections += 1;
            }
            done.push(result.text);
            self.save(&done.join("\n\n")).await;

            if i + 1 < total {
                info!("take a break...");
                tokio::time::sleep(self.pause).await;
            }
        }

        let text = done.join("\n\n");
        let elapsed = started.elapsed();
        info!("Job done: {} bytes => {} bytes.", content.len(), text.len());
        info!("Timeused: {:.3}s.", elapsed.as_secs_f64());
        info!("AI Loops: {requests}");
        self.save(&text).await;

        TranslateReport {
            text,
            sections: total,
            failed_sections,
            requests,
            source_len: content.len(),
            elapsed,
            output: self.output.clone(),
        }
    }

    /// Translate one section in a fresh conversation.
    ///
    /// Asks again with a continue prompt until the answer ends with the
    /// completion marker, an answer comes back empty, or the translation
    /// outgrows `growth_limit` times the source.
    pub async fn translate_section(&self, content: &str) -> Section {
        let marks = LEADING_HEADING
            .captures(content)
            .and_then(|c| c.get(1))
            .map_or("", |m| m.as_str());
        let head = if marks.is_empty() { String::new() } else { format!("{marks} ") };
        let body = LEADING_HEADING.replace(content, "");
        let limit = body.chars().count() * self.growth_limit;

        let mut agent = self.agent.fork();
        let mut prompt = START_PROMPT
            .replace("<language>", &self.language)
            .replace("<content>", &body);
        let mut answer = String::new();
        let mut requests = 0;
        let mut continued = false;

        loop {
            let turn = match self.send(&mut agent, &prompt).await {
                Ok(turn) => turn,
                Err(e) => {
                    warn!(error = %e, "Translation failed");
                    return Section::failed(requests);
                }
            };
            requests += turn.requests;
            if turn.text.trim().is_empty() {
                warn!("Translation failed: empty answer");
                return Section::failed(requests);
            }

            let finished = DONE_MARKER.is_match(&turn.text);
            let reply = DONE_MARKER.replace(&turn.text, "");
            answer.push_str(&reply);
            info!("Partial translation: {} chars [{requests}]", reply.chars().count());

            if finished || reply.is_empty() {
                break;
            }
            if continued && answer.chars().count() >= limit {
                warn!("Translation grows too long, something went wrong");
                break;
            }

            continued = true;
            tokio::time::sleep(self.pause).await;
            prompt = CONTINUE_PROMPT.to_string();
        }

        let mut text = ANSWER_HEADING.replace(&answer, head.as_str()).into_owned();
        if CHINESE.is_match(&self.language) {
            text = full_width_punctuation(&text);
        }
        info!("Section translated: {} chars [{requests}]", text.chars().count());

        Section {
            text,
            requests,
            failed: false,
        }
    }

    /// One remembered exchange through the circuit breaker.
    async fn send(&self, agent: &mut Agent, prompt: &str) -> Result<Turn, RetryExhausted> {
        let turn = {
            let agent = &*agent;
            self.breaker
                .attempt(move || agent.converse(prompt, Some(TEMPERATURE), false))
                .await?
        };
        agent.remember(prompt, turn.text.clone());
        Ok(turn)
    }

    async fn save(&self, text: &str) {
        match write_output(&self.output, text).await {
            Ok(()) => info!(path = %self.output.display(), "Translation saved."),
            Err(e) => warn!("{e}"),
        }
    }
}

async fn write_output(path: &Path, text: &str) -> Result<(), TranslateError> {
    let wrap = |source| TranslateError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
    }
    tokio::fs::write(path, text).await.map_err(wrap)
}

fn full_width_punctuation(text: &str) -> String {
    FULL_WIDTH
        .iter()
        .fold(text.to_string(), |text, (ascii, wide)| {
            ascii.replace_all(&text, *wide).into_owned()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use missionclaw_config::PromptLibrary;
    use missionclaw_core::completion::{CompletionClient, CompletionRequest, CompletionResponse};
    use missionclaw_core::error::CompletionError;
    use missionclaw_core::AgentConfig;
    use std::sync::Mutex;

    /// Answers with the scripted texts in order, repeating the last one.
    struct Script {
        steps: Vec<Result<CompletionResponse, CompletionError>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Script {
        fn texts(texts: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                steps: texts.iter().map(|t| Ok(CompletionResponse::finished(*t))).collect(),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for Script {
        fn name(&self) -> &str {
            "script"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, CompletionError> {
            let mut prompts = self.prompts.lock().unwrap();
            let step = self.steps[prompts.len().min(self.steps.len() - 1)].clone();
            prompts.push(request.prompt);
            step
        }
    }

    fn job(client: Arc<Script>, dir: &Path) -> TranslateJob {
        let prompts = PromptLibrary::builtin().unwrap();
        let agent = Agent::new(AgentConfig::default(), client, Arc::new(prompts.agent().clone()));
        TranslateJob::new(agent, Arc::new(CircuitBreaker::new(2, Duration::from_secs(10))))
            .with_language("French")
            .with_output(dir.join("out").join("result.md"))
    }

    #[tokio::test(start_paused = true)]
    async fn continues_until_the_marker() {
        let dir = tempfile::tempdir().unwrap();
        let client = Script::texts(&["Bonj", "our le monde\nTranslation completed"]);
        let job = job(client.clone(), dir.path());

        let section = job.translate_section("Hello world").await;
        assert!(!section.failed);
        assert_eq!(section.text, "Bonjour le monde");
        assert_eq!(section.requests, 2);

        let prompts = client.prompts();
        assert!(prompts[0].contains("into French"));
        assert!(prompts[0].contains("Content to translate:\n\nHello world"));
        // the continue prompt replays the first exchange
        assert!(prompts[1].ends_with("Assistant: Bonj\n\nHuman: Please continue\n\nAssistant: "));
    }

    #[tokio::test(start_paused = true)]
    async fn chinese_marker_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(Script::texts(&["Bonjour\n翻译已经完成"]), dir.path());
        let section = job.translate_section("Hello").await;
        assert_eq!(section.text, "Bonjour");
        assert_eq!(section.requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn runaway_answer_is_cut() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(Script::texts(&["abcdefgh"]), dir.path()).with_growth_limit(2);
        let section = job.translate_section("abcd").await;
        // two answers reach 2 × 4 characters
        assert_eq!(section.requests, 2);
        assert_eq!(section.text, "abcdefghabcdefgh");
    }

    #[tokio::test(start_paused = true)]
    async fn heading_marks_are_restored() {
        let dir = tempfile::tempdir().unwrap();
        let client = Script::texts(&["# Bonjour\nTranslation completed"]);
        let job = job(client.clone(), dir.path());

        let section = job.translate_section("\n## Hello").await;
        assert_eq!(section.text, "## Bonjour");
        assert!(client.prompts()[0].ends_with("Content to translate:\n\nHello\n\nAssistant: "));
    }

    #[tokio::test(start_paused = true)]
    async fn chinese_output_uses_full_width_punctuation() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(Script::texts(&["你好, 世界! 真的? 是; 对: 好\n翻译完成"]), dir.path())
            .with_language("Chinese");
        let section = job.translate_section("Hello, world! Really? Yes; right: good").await;
        assert_eq!(section.text, "你好，世界！真的？是；对：好");
    }

    #[tokio::test(start_paused = true)]
    async fn retry_exhaustion_leaves_a_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(Script {
            steps: vec![Err(CompletionError::Network("down".into()))],
            prompts: Mutex::new(Vec::new()),
        });
        let job = job(client.clone(), dir.path());

        let section = job.translate_section("Hello").await;
        assert!(section.failed);
        assert_eq!(section.text, FAILED_SECTION);
        assert_eq!(client.prompts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_translates_every_section_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let client = Script::texts(&["Un\nTranslation completed", "# Deux\nTranslation completed"]);
        let job = job(client.clone(), dir.path());

        let report = job.run("One\n\n# Two").await;
        assert_eq!(report.sections, 2);
        assert_eq!(report.failed_sections, 0);
        assert_eq!(report.requests, 2);
        assert_eq!(report.text, "Un\n\n# Deux");

        let saved = std::fs::read_to_string(job.output()).unwrap();
        assert_eq!(saved, report.text);
        // each section starts from an empty memory
        assert!(!client.prompts()[1].contains("Assistant: Un"));
    }

    #[test]
    fn punctuation_conversion() {
        assert_eq!(full_width_punctuation("a , b:c"), "a，b：c");
    }
}
