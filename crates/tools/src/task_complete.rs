//! Task complete tool: lets the model end the mission.

use async_trait::async_trait;
use missionclaw_core::error::ToolError;
use missionclaw_core::tool::{Arguments, Tool, ToolOutcome};

pub struct TaskCompleteTool;

#[async_trait]
impl Tool for TaskCompleteTool {
    fn name(&self) -> &str {
        "Task Complete"
    }

    fn command(&self) -> &str {
        "task_complete"
    }

    fn aliases(&self) -> &[&str] {
        &["complete", "finish", "done", "give_up"]
    }

    fn arg_names(&self) -> &[&str] {
        &["reason"]
    }

    fn description(&self) -> &str {
        "Shut down when every goal is reached, or when you cannot go further"
    }

    async fn execute(&self, args: &Arguments) -> Result<ToolOutcome, ToolError> {
        let reason = args
            .get("reason")
            .or_else(|| args.get("args"))
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .unwrap_or("Mission complete.");

        Ok(ToolOutcome::exit().with_speak(reason))
    }
}
