//! Workflow rule evaluation.

use super::{record_error, ChainLink, Command};
use crate::core::FailureReason;
use crate::errors::ChainError;
use crate::processor::When;
use crate::seed::rules::{self, Evaluation, InvalidPattern};
use async_trait::async_trait;
use tracing::{debug, info};

/// Message recorded when workflow rules filter the pipeline out.
pub const FILTERED_OUT_MESSAGE: &str = "Pipeline filtered out by workflow rules.";

/// Drops the pipeline when its workflow rules exclude the ref.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvaluateWorkflowRules;

#[async_trait]
impl ChainLink for EvaluateWorkflowRules {
    fn name(&self) -> &'static str {
        "evaluate_workflow_rules"
    }

    async fn perform(&mut self, command: &mut Command) -> Result<(), ChainError> {
        let result = command
            .processor_result
            .as_ref()
            .ok_or(ChainError::MissingProcessorResult)?;
        let evaluation = rules::evaluate(&result.workflow_rules, &command.pipeline.ref_name, When::Always);

        match evaluation {
            Ok(Evaluation::Included(when)) => {
                debug!(run_id = %command.run_id(), ?when, "Workflow rules passed");
            }
            Ok(Evaluation::Excluded) => {
                info!(
                    run_id = %command.run_id(),
                    ref_name = %command.pipeline.ref_name,
                    "Pipeline filtered out by workflow rules"
                );
                record_error(&mut command.pipeline, FILTERED_OUT_MESSAGE, FailureReason::FilteredByWorkflowRules);
            }
            Err(InvalidPattern(pattern)) => {
                record_error(
                    &mut command.pipeline,
                    format!("workflow rules have an invalid pattern '{pattern}'"),
                    FailureReason::ConfigError,
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Pipeline, Project, ProjectId};
    use crate::processor::{ProcessorResult, Rule};
    use pretty_assertions::assert_eq;

    fn command(ref_name: &str, rules: Vec<Rule>) -> Command {
        Command::builder(Project::new(1, "group/app"), Pipeline::new(ProjectId(1), ref_name))
            .processor_result(ProcessorResult::new(Vec::new()).with_workflow_rules(rules))
            .build()
    }

    #[tokio::test]
    async fn test_no_rules_passes() {
        let mut command = command("main", Vec::new());
        let mut link = EvaluateWorkflowRules;

        link.perform(&mut command).await.unwrap();

        assert!(!link.should_break(&command));
    }

    #[tokio::test]
    async fn test_never_filters_out() {
        let mut command = command("main", vec![Rule::if_ref("^main$", When::Never)]);
        let mut link = EvaluateWorkflowRules;

        link.perform(&mut command).await.unwrap();

        assert!(link.should_break(&command));
        assert_eq!(command.pipeline.errors(), [FILTERED_OUT_MESSAGE.to_string()]);
        assert_eq!(command.pipeline.failure_reason, Some(FailureReason::FilteredByWorkflowRules));
    }

    #[tokio::test]
    async fn test_no_matching_rule_filters_out() {
        let mut command = command("feature/x", vec![Rule::if_ref("^main$", When::Always)]);
        let mut link = EvaluateWorkflowRules;

        link.perform(&mut command).await.unwrap();

        assert!(link.should_break(&command));
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_config_error() {
        let mut command = command("main", vec![Rule::if_ref("(", When::Always)]);
        let mut link = EvaluateWorkflowRules;

        link.perform(&mut command).await.unwrap();

        assert_eq!(command.pipeline.failure_reason, Some(FailureReason::ConfigError));
        assert_eq!(
            command.pipeline.yaml_errors.as_deref(),
            Some("workflow rules have an invalid pattern '('")
        );
    }
}
