//! The mission engine: the heart of MissionClaw.
//!
//! A mission follows a **Plan → Act → Observe** cycle over a plain
//! text-completion API:
//!
//! 1. **Analyze** the task to pick a role, a workflow and a language
//! 2. **Ask** the model for a plan, continuing truncated answers
//! 3. **Extract** the plan fields and the command list from free text
//! 4. **Dispatch** the commands to tools, concurrently
//! 5. **Feed** the tool replies back and loop until a tool ends the
//!    mission, the request budget is spent or the model goes quiet
//!
//! Every completion request goes through a [`CircuitBreaker`] shared by
//! all callers of the same scope.

pub mod conversation;
pub mod dispatch;
pub mod extract;
pub mod mission;
pub mod retry;
pub mod role;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use conversation::{Agent, Turn};
pub use dispatch::{dispatch, DispatchReport};
pub use extract::{normalize, parse_commands, PlanField, StructuredPlan};
pub use mission::{MissionOutcome, MissionReport, MissionRunner, MissionSettings};
pub use retry::CircuitBreaker;
pub use role::RoleAnalysis;
