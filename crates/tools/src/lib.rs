//! Built-in tool implementations for MissionClaw.
//!
//! Tools give the mission something to do between turns: search the web,
//! read a page, and declare the mission complete.

pub mod browse;
pub mod google_search;
pub mod html;
pub mod task_complete;

use missionclaw_config::SearchConfig;
use missionclaw_core::tool::ToolRegistry;

pub use browse::BrowseTool;
pub use google_search::GoogleSearchTool;
pub use task_complete::TaskCompleteTool;

/// Create a default tool registry with all built-in tools.
pub fn default_registry(search: &SearchConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(
        GoogleSearchTool::with_proxy(search.proxy.as_deref()).with_result_limit(search.result_limit),
    ));
    registry.register(Box::new(BrowseTool::new()));
    registry.register(Box::new(TaskCompleteTool));
    registry
}
