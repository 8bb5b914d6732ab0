//! `missionclaw mission`: run one task to a terminal state.

use missionclaw_agent::{CircuitBreaker, MissionRunner, MissionSettings};
use missionclaw_config::AppConfig;
use missionclaw_tools::default_registry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub async fn run(
    config: &AppConfig,
    task: &str,
    max_loops: Option<u32>,
    knowledge: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    super::require_api_key(config)?;

    let prompts = config
        .prompt_library()
        .map_err(|e| format!("Failed to load prompts: {e}"))?;
    let mut agent = super::build_agent(config, &prompts);
    if let Some(path) = knowledge.or_else(|| config.knowledge_file.clone()) {
        agent.load_knowledge_or_warn(&path).await;
    }

    let tools = Arc::new(default_registry(&config.search));
    let breaker = CircuitBreaker::from_config(&config.retry);
    let settings =
        MissionSettings::from(&config.mission).with_max_loops(max_loops.or(config.mission.max_loops));

    let mut runner = MissionRunner::new(agent, tools, Arc::new(prompts), breaker).with_settings(settings);
    let report = runner.run(task).await;

    info!(
        mission = %report.id,
        requests = report.requests,
        turns = report.turns,
        "Mission finished in {:.1}s",
        report.elapsed.as_secs_f64()
    );
    println!("{}", report.outcome);
    Ok(())
}
