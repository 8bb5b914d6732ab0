//! Tool dispatcher: run one turn's invocations and fold their results.
//!
//! All resolved invocations of a batch run concurrently and are joined
//! before anything is folded, so the completion flag and the replies are
//! computed in one place after every tool has finished. A failing or
//! panicking tool is reported and never cancels its siblings.

use futures::future::join_all;
use futures::FutureExt;
use missionclaw_core::error::ToolError;
use missionclaw_core::tool::{Invocation, ToolOutcome, ToolRegistry};
use std::panic::AssertUnwindSafe;
use tracing::{info, warn};

/// What a batch of invocations produced.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// `Command <name> returned: <payload>` for every tool that replied.
    /// Order carries no meaning.
    pub replies: Vec<String>,
    /// Some tool asked to end the mission
    pub completed: bool,
    /// Names that matched no tool
    pub unknown: Vec<String>,
    /// Tools that failed, with their error
    pub failures: Vec<(String, ToolError)>,
}

impl DispatchReport {
    pub fn is_silent(&self) -> bool {
        self.replies.is_empty()
    }
}

/// Resolve and run `invocations` against `registry`.
pub async fn dispatch(registry: &ToolRegistry, invocations: &[Invocation]) -> DispatchReport {
    let mut report = DispatchReport::default();

    let mut runs = Vec::with_capacity(invocations.len());
    for invocation in invocations {
        let Some(tool) = registry.resolve(&invocation.name) else {
            warn!("Invalid command: {}", invocation.name);
            report.unknown.push(invocation.name.clone());
            continue;
        };

        if invocation.args.is_empty() {
            info!("Execute command: {}({})", tool.name(), invocation.name);
        } else {
            info!(
                "Execute command: {}({}) : {}",
                tool.name(),
                invocation.name,
                invocation.describe_args()
            );
        }

        runs.push(async move {
            let result = AssertUnwindSafe(tool.execute(&invocation.args))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(ToolError::Panicked {
                        tool_name: tool.command().to_string(),
                    })
                });
            (invocation, tool.name(), result)
        });
    }

    for (invocation, tool_name, result) in join_all(runs).await {
        fold(&mut report, invocation, tool_name, result);
    }
    report
}

fn fold(
    report: &mut DispatchReport,
    invocation: &Invocation,
    tool_name: &str,
    result: Result<ToolOutcome, ToolError>,
) {
    match result {
        Ok(outcome) => {
            if let Some(speak) = &outcome.speak {
                info!("Execute command {tool_name} completed with respond: {speak}");
            }
            if outcome.exit {
                report.completed = true;
            } else if let Some(reply) = outcome.reply {
                report
                    .replies
                    .push(format!("Command {} returned: {reply}", invocation.name));
            }
        }
        Err(e) => {
            warn!(tool = %tool_name, error = %e, "Execute command {tool_name} failed");
            report.failures.push((invocation.name.clone(), e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use missionclaw_core::tool::{Arguments, Tool};
    use std::time::Duration;

    struct Reply(&'static str);

    #[async_trait]
    impl Tool for Reply {
        fn name(&self) -> &str { "Browse" }
        fn command(&self) -> &str { "browse" }
        fn aliases(&self) -> &[&str] { &["browse_website"] }
        fn description(&self) -> &str { "replies" }
        async fn execute(&self, args: &Arguments) -> Result<ToolOutcome, ToolError> {
            let delay = args.get("delay").and_then(|d| d.parse().ok()).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(ToolOutcome::reply(self.0).with_speak("browsed"))
        }
    }

    struct Finish;

    #[async_trait]
    impl Tool for Finish {
        fn name(&self) -> &str { "Finish" }
        fn command(&self) -> &str { "task_complete" }
        fn description(&self) -> &str { "ends" }
        async fn execute(&self, _args: &Arguments) -> Result<ToolOutcome, ToolError> {
            // exit wins over any reply
            Ok(ToolOutcome {
                reply: Some("ignored".into()),
                ..ToolOutcome::exit()
            })
        }
    }

    struct Broken;

    #[async_trait]
    impl Tool for Broken {
        fn name(&self) -> &str { "Broken" }
        fn command(&self) -> &str { "broken" }
        fn description(&self) -> &str { "fails" }
        async fn execute(&self, args: &Arguments) -> Result<ToolOutcome, ToolError> {
            if args.contains_key("panic") {
                panic!("tool blew up");
            }
            Err(ToolError::ExecutionFailed {
                tool_name: "broken".into(),
                reason: "no network".into(),
            })
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with_tool(Box::new(Reply("PAGE TEXT")))
            .with_tool(Box::new(Finish))
            .with_tool(Box::new(Broken))
    }

    #[tokio::test]
    async fn replies_use_the_name_the_model_wrote() {
        let report = dispatch(
            &registry(),
            &[Invocation::new("browse_website").with_arg("url", "https://example.com")],
        )
        .await;
        assert_eq!(report.replies, vec!["Command browse_website returned: PAGE TEXT"]);
        assert!(!report.completed);
        assert!(!report.is_silent());
    }

    #[tokio::test]
    async fn exit_completes_the_batch_without_a_reply() {
        let report = dispatch(
            &registry(),
            &[Invocation::new("browse"), Invocation::new("task_complete")],
        )
        .await;
        assert!(report.completed);
        assert_eq!(report.replies, vec!["Command browse returned: PAGE TEXT"]);
    }

    #[tokio::test]
    async fn unknown_names_are_skipped() {
        let report = dispatch(&registry(), &[Invocation::new("teleport"), Invocation::new("browse")]).await;
        assert_eq!(report.unknown, vec!["teleport"]);
        assert_eq!(report.replies.len(), 1);
    }

    #[tokio::test]
    async fn failures_do_not_cancel_siblings() {
        let report = dispatch(
            &registry(),
            &[
                Invocation::new("broken"),
                Invocation::new("broken").with_arg("panic", "yes"),
                Invocation::new("browse"),
            ],
        )
        .await;
        assert_eq!(report.replies.len(), 1);
        assert_eq!(report.failures.len(), 2);
        assert!(report
            .failures
            .iter()
            .any(|(_, e)| matches!(e, ToolError::Panicked { .. })));
        assert!(report
            .failures
            .iter()
            .any(|(_, e)| matches!(e, ToolError::ExecutionFailed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn invocations_run_concurrently() {
        let started = tokio::time::Instant::now();
        let report = dispatch(
            &registry(),
            &[
                Invocation::new("browse").with_arg("delay", "1000"),
                Invocation::new("browse").with_arg("delay", "1000"),
                Invocation::new("browse").with_arg("delay", "1000"),
            ],
        )
        .await;
        assert_eq!(report.replies.len(), 3);
        assert!(started.elapsed() < Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn empty_batch_is_silent() {
        let report = dispatch(&registry(), &[]).await;
        assert!(report.is_silent());
        assert!(!report.completed);
    }
}
