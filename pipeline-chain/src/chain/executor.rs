//! Ordered execution of chain links.

use super::{ChainLink, Command, Create, EvaluateWorkflowRules, Seed, SeedBlock};
use crate::errors::ChainError;
use crate::observability::{ChainSpanAttributes, SpanTimer};
use serde_json::json;
use tracing::{debug, info, warn};

/// What an execution reached.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    /// Links performed, in order, including the one that halted.
    pub performed: Vec<&'static str>,
    /// The link that halted the chain, if any.
    pub halted_at: Option<&'static str>,
    /// Wall time of the execution.
    pub duration_ms: f64,
}

impl ChainOutcome {
    /// Returns true if every link ran without halting.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.halted_at.is_none()
    }
}

/// Runs links in order against one command, stopping at the first break.
///
/// The executor never rolls anything back. Links record their own errors
/// on the pipeline; the command is left in whatever state was reached.
pub struct ChainExecutor {
    links: Vec<Box<dyn ChainLink>>,
}

impl ChainExecutor {
    /// Creates an executor over `links`.
    #[must_use]
    pub fn new(links: Vec<Box<dyn ChainLink>>) -> Self {
        Self { links }
    }

    /// The pipeline creation chain: seed, workflow rules, deferred seed
    /// block, create.
    #[must_use]
    pub fn default_chain() -> Self {
        Self::new(vec![
            Box::new(Seed::new()),
            Box::new(EvaluateWorkflowRules),
            Box::new(SeedBlock),
            Box::new(Create),
        ])
    }

    /// Appends a link.
    #[must_use]
    pub fn with_link(mut self, link: Box<dyn ChainLink>) -> Self {
        self.links.push(link);
        self
    }

    /// Returns the link names in execution order.
    #[must_use]
    pub fn link_names(&self) -> Vec<&'static str> {
        self.links.iter().map(|link| link.name()).collect()
    }

    /// Executes the chain.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error raised by a link. Remaining links are
    /// not run.
    pub async fn execute(&mut self, command: &mut Command) -> Result<ChainOutcome, ChainError> {
        let timer = SpanTimer::start("chain");
        let sink = command.event_sink().clone();
        let attributes = ChainSpanAttributes::new()
            .with_run_id(command.run_id().to_string())
            .with_project_id(command.project().id.0)
            .with_ref_name(command.pipeline.ref_name.clone());

        info!(
            run_id = %command.run_id(),
            project_id = %command.project().id,
            ref_name = %command.pipeline.ref_name,
            links = self.links.len(),
            span_attributes = ?attributes.to_attributes(),
            "Executing pipeline chain"
        );
        sink.emit(
            "chain.started",
            Some(json!({
                "attributes": attributes.to_json(),
                "links": self.link_names(),
            })),
        )
        .await;

        let mut performed = Vec::with_capacity(self.links.len());

        for link in &mut self.links {
            let name = link.name();
            let link_timer = SpanTimer::start(name);
            debug!(run_id = %command.run_id(), link = name, "Performing chain link");

            if let Err(err) = link.perform(command).await {
                let failed_at = attributes.clone().with_link(name).with_iid(command.pipeline.iid());
                warn!(
                    run_id = %command.run_id(),
                    link = name,
                    performed = ?performed,
                    span_attributes = ?failed_at.to_attributes(),
                    error = %err,
                    "Chain link failed"
                );
                sink.emit(
                    "chain.failed",
                    Some(json!({
                        "attributes": failed_at.to_json(),
                        "link": name,
                        "performed": performed,
                        "error": err.to_string(),
                    })),
                )
                .await;
                return Err(err);
            }

            performed.push(name);
            let link_ms = link_timer.finish();
            sink.emit(
                "chain.link.completed",
                Some(json!({ "link": name, "duration_ms": link_ms })),
            )
            .await;

            if link.should_break(command) {
                info!(
                    run_id = %command.run_id(),
                    link = name,
                    errors = command.pipeline.errors().len(),
                    "Pipeline chain halted"
                );
                sink.emit(
                    "chain.halted",
                    Some(json!({
                        "attributes": attributes.clone().with_link(name).with_iid(command.pipeline.iid()).to_json(),
                        "errors": command.pipeline.errors(),
                    })),
                )
                .await;

                return Ok(ChainOutcome {
                    performed,
                    halted_at: Some(name),
                    duration_ms: timer.finish(),
                });
            }
        }

        let duration_ms = timer.finish();
        info!(
            run_id = %command.run_id(),
            pipeline_id = ?command.pipeline.id,
            iid = ?command.pipeline.iid(),
            duration_ms,
            "Pipeline chain completed"
        );
        sink.emit(
            "chain.completed",
            Some(json!({
                "attributes": attributes.with_iid(command.pipeline.iid()).to_json(),
                "performed": performed,
                "duration_ms": duration_ms,
            })),
        )
        .await;

        Ok(ChainOutcome {
            performed,
            halted_at: None,
            duration_ms,
        })
    }
}

impl std::fmt::Debug for ChainExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainExecutor")
            .field("links", &self.link_names())
            .finish()
    }
}
