//! Mission loop: drive one task to a terminal state.
//!
//! ```text
//! RoleAnalysis ─▶ MissionStart ─▶ MissionContinue ─┬─▶ Completed
//!                                      ▲           ├─▶ FailedExhausted
//!                                      └───────────┤─▶ FailedInactive
//!                                                  └─ (next turn)
//! ```
//!
//! After every dispatch the loop checks, in order: a tool asked to finish,
//! the request budget is spent, too many turns in a row produced no tool
//! reply. Every completion goes through the circuit breaker; once it opens
//! the mission fails with the breaker's error.

use missionclaw_config::{MissionConfig, PromptLibrary, Workflow};
use missionclaw_core::error::{Error, RetryExhausted};
use missionclaw_core::tool::ToolRegistry;
use missionclaw_core::MissionId;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::conversation::{Agent, Turn};
use crate::dispatch::{dispatch, DispatchReport};
use crate::extract::{normalize, PlanField, StructuredPlan};
use crate::retry::CircuitBreaker;
use crate::role::RoleAnalysis;

/// Role analysis always runs hot.
const ROLE_TEMPERATURE: f32 = 1.0;

/// Loop limits of one mission.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionSettings {
    /// Completion request budget, role analysis included. `None` is unbounded.
    pub max_loops: Option<u32>,
    /// Consecutive turns without a tool reply before giving up
    pub inactivity_threshold: u32,
    /// Pause before every continue turn
    pub turn_delay: Duration,
}

impl MissionSettings {
    pub fn with_max_loops(mut self, max_loops: Option<u32>) -> Self {
        self.max_loops = max_loops;
        self
    }
}

impl Default for MissionSettings {
    fn default() -> Self {
        Self::from(&MissionConfig::default())
    }
}

impl From<&MissionConfig> for MissionSettings {
    fn from(config: &MissionConfig) -> Self {
        Self {
            max_loops: config.max_loops,
            inactivity_threshold: config.inactivity_threshold,
            turn_delay: Duration::from_millis(config.turn_delay_ms),
        }
    }
}

/// How a mission ended. The `Display` strings are stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionOutcome {
    Completed,
    /// The request budget ran out
    Exhausted,
    /// The model stopped issuing useful commands
    Inactive,
    /// The mission was aborted by an error
    Failed(String),
}

impl MissionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for MissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("Mission Completed."),
            Self::Exhausted => f.write_str("Mission Failed: AI call times exhausted."),
            Self::Inactive => f.write_str("Mission maybe completed: AI didn't response actively."),
            Self::Failed(reason) => write!(f, "mission failed: {reason}"),
        }
    }
}

/// Everything known about a finished mission.
#[derive(Debug, Clone)]
pub struct MissionReport {
    pub id: MissionId,
    pub outcome: MissionOutcome,
    /// Completion requests issued
    pub requests: u32,
    /// Time spent waiting for the model
    pub elapsed: Duration,
    /// Absent when role analysis itself failed
    pub role: Option<RoleAnalysis>,
    pub final_heat: f32,
    /// Start and continue turns taken
    pub turns: u32,
}

#[derive(Debug, Default)]
struct MissionState {
    loops: u32,
    elapsed: Duration,
    heat: f32,
    empty_turns: u32,
    turns: u32,
    role: Option<RoleAnalysis>,
}

impl MissionState {
    fn record(&mut self, turn: &Turn) {
        self.loops += turn.requests;
        self.elapsed += turn.elapsed;
    }

    fn observe(&mut self, report: &DispatchReport) {
        self.turns += 1;
        if report.is_silent() {
            self.empty_turns += 1;
        } else {
            self.empty_turns = 0;
        }
    }
}

/// Runs missions for one agent.
pub struct MissionRunner {
    agent: Agent,
    tools: Arc<ToolRegistry>,
    prompts: Arc<PromptLibrary>,
    breaker: Arc<CircuitBreaker>,
    settings: MissionSettings,
}

impl MissionRunner {
    pub fn new(
        agent: Agent,
        tools: Arc<ToolRegistry>,
        prompts: Arc<PromptLibrary>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            agent,
            tools,
            prompts,
            breaker,
            settings: MissionSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: MissionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn settings(&self) -> &MissionSettings {
        &self.settings
    }

    /// Run `task` to a terminal state. Never fails; errors become a
    /// [`MissionOutcome::Failed`].
    pub async fn run(&mut self, task: &str) -> MissionReport {
        let id = MissionId::new();
        info!(mission = %id, max_loops = ?self.settings.max_loops, "Mission started");

        let mut state = MissionState::default();
        let outcome = match self.drive(task, &mut state).await {
            Ok(outcome) => outcome,
            Err(e) => MissionOutcome::Failed(e.to_string()),
        };

        match &outcome {
            MissionOutcome::Completed => info!(mission = %id, "{outcome}"),
            MissionOutcome::Inactive => warn!(mission = %id, "{outcome}"),
            MissionOutcome::Exhausted | MissionOutcome::Failed(_) => error!(mission = %id, "{outcome}"),
        }

        MissionReport {
            id,
            outcome,
            requests: state.loops,
            elapsed: state.elapsed,
            role: state.role,
            final_heat: state.heat,
            turns: state.turns,
        }
    }

    async fn drive(&mut self, task: &str, state: &mut MissionState) -> Result<MissionOutcome, Error> {
        let prompts = Arc::clone(&self.prompts);

        let jobs = prompts.jobs();
        let prompt = self
            .agent
            .prompts()
            .analyze_role
            .replace("<jobs>", &jobs.join(", "))
            .replace("<task>", task);
        let turn = self
            .turn(&prompt, ROLE_TEMPERATURE, true)
            .await
            .inspect_err(|e| error!("Analyze role failed: {e}"))?;
        state.record(&turn);

        let role = RoleAnalysis::parse(&turn.text, &jobs);
        info!("The most suitable role for this task is: {}", role.role);
        info!("The most suitable workflow for this task is: {}", role.template);
        info!("The output language for this task is: {}", role.language);

        let workflow = prompts.workflow(&role.template);
        state.heat = workflow.heat_max;

        let now = chrono::Local::now().format("%Y/%m/%d %H:%M:%S").to_string();
        let prompt = workflow.render_start(&now, &role.role, &self.tools.describe(), task);
        state.role = Some(role);

        let mut report = self.step(&prompt, state).await?;
        loop {
            if let Some(outcome) = self.verdict(state, &report) {
                return Ok(outcome);
            }
            if !self.settings.turn_delay.is_zero() {
                tokio::time::sleep(self.settings.turn_delay).await;
            }

            state.heat = cool(state.heat, &workflow);
            let prompt = if report.replies.is_empty() {
                workflow.mission_continue_empty.clone()
            } else {
                report.replies.join("\n")
            };
            report = self.step(&prompt, state).await?;
        }
    }

    /// One start or continue turn: ask, extract, remember, dispatch.
    async fn step(&mut self, prompt: &str, state: &mut MissionState) -> Result<DispatchReport, Error> {
        let turn = self.turn(prompt, state.heat, false).await?;
        state.record(&turn);

        let normalized = normalize(&turn.text);
        let plan = StructuredPlan::parse(&normalized);
        self.agent.remember(prompt, normalized);
        show_plan(&plan);

        let max = self
            .settings
            .max_loops
            .map_or_else(|| "unlimited".to_string(), |max| max.to_string());
        info!(
            "task used {:.3} seconds in {} loops (up to {max} loops).",
            state.elapsed.as_secs_f64(),
            state.loops
        );

        let report = dispatch(&self.tools, &plan.commands).await;
        state.observe(&report);
        Ok(report)
    }

    fn verdict(&self, state: &MissionState, report: &DispatchReport) -> Option<MissionOutcome> {
        if report.completed {
            return Some(MissionOutcome::Completed);
        }
        if self.settings.max_loops.is_some_and(|max| state.loops >= max) {
            return Some(MissionOutcome::Exhausted);
        }
        if state.empty_turns >= self.settings.inactivity_threshold {
            return Some(MissionOutcome::Inactive);
        }
        None
    }

    async fn turn(&self, prompt: &str, heat: f32, preamble: bool) -> Result<Turn, RetryExhausted> {
        let agent = &self.agent;
        self.breaker
            .attempt(move || agent.converse(prompt, Some(heat), preamble))
            .await
    }
}

/// One step of heat decay towards the workflow minimum.
fn cool(heat: f32, workflow: &Workflow) -> f32 {
    (heat - workflow.heat_min) * workflow.heat_decay_rate + workflow.heat_min
}

fn show_plan(plan: &StructuredPlan) {
    if plan.fallback {
        warn!("No plan fields found in the answer, giving up");
    }
    for (field, text) in plan.fields() {
        let text = text.replace("\r", "");
        match field {
            PlanField::Thoughts => info!("AI thought: {text}"),
            PlanField::Reasoning => info!("Reasons: {text}"),
            PlanField::Plan => info!("Next Plan:\n{text}"),
            PlanField::Criticism => info!("Criticism: {text}"),
            PlanField::Speak => info!("Talking to YOU: {text}"),
            PlanField::Command | PlanField::Unrecognized(_) => {}
        }
    }
}
