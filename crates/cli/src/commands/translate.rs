//! `missionclaw translate`: translate a document section by section.

use missionclaw_agent::CircuitBreaker;
use missionclaw_config::AppConfig;
use missionclaw_translate::{load_target, TranslateJob};
use std::path::PathBuf;

pub async fn run(
    config: &AppConfig,
    target: &str,
    language: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    super::require_api_key(config)?;

    let prompts = config
        .prompt_library()
        .map_err(|e| format!("Failed to load prompts: {e}"))?;
    let agent = super::build_agent(config, &prompts);
    let breaker = CircuitBreaker::from_config(&config.retry);

    let mut job = TranslateJob::from_config(agent, breaker, &config.translate);
    if let Some(language) = language {
        job = job.with_language(language);
    }
    if let Some(output) = output {
        job = job.with_output(output);
    }

    let content = load_target(target).await?;
    let report = job.run(&content).await;

    println!(
        "Translated {} sections into {} ({} failed), {} => {} bytes, {} requests in {:.1}s.",
        report.sections,
        job.language(),
        report.failed_sections,
        report.source_len,
        report.text.len(),
        report.requests,
        report.elapsed.as_secs_f64()
    );
    println!("Saved to {}", report.output.display());
    Ok(())
}
