//! The chain link contract.

use super::Command;
use crate::core::{FailureReason, Pipeline};
use crate::errors::ChainError;
use async_trait::async_trait;

/// One step of pipeline creation.
///
/// `perform` mutates the command. Soft failures are recorded on the
/// pipeline and reported through `should_break`; an `Err` aborts the whole
/// chain without consulting `should_break`.
#[async_trait]
pub trait ChainLink: Send {
    /// Returns the link name for logs and events.
    fn name(&self) -> &'static str;

    /// Performs the step.
    async fn perform(&mut self, command: &mut Command) -> Result<(), ChainError>;

    /// Returns true if the chain must stop after this link.
    fn should_break(&self, command: &Command) -> bool {
        command.pipeline.has_errors()
    }
}

/// Records a user-visible error on the pipeline and drops it.
///
/// Configuration errors also land in `yaml_errors`.
pub fn record_error(pipeline: &mut Pipeline, message: impl Into<String>, reason: FailureReason) {
    let message = message.into();
    if reason == FailureReason::ConfigError {
        pipeline.yaml_errors = Some(message.clone());
    }
    pipeline.add_error(message);
    pipeline.drop_with(reason);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PipelineStatus, ProjectId};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_config_error() {
        let mut pipeline = Pipeline::new(ProjectId(1), "main");

        record_error(&mut pipeline, "bad needs", FailureReason::ConfigError);

        assert_eq!(pipeline.errors(), ["bad needs".to_string()]);
        assert_eq!(pipeline.yaml_errors.as_deref(), Some("bad needs"));
        assert_eq!(pipeline.failure_reason, Some(FailureReason::ConfigError));
        assert_eq!(pipeline.status, PipelineStatus::Failed);
    }

    #[test]
    fn test_record_filtered_keeps_yaml_errors_empty() {
        let mut pipeline = Pipeline::new(ProjectId(1), "main");

        record_error(&mut pipeline, "filtered", FailureReason::FilteredByWorkflowRules);

        assert!(pipeline.yaml_errors.is_none());
        assert_eq!(pipeline.failure_reason, Some(FailureReason::FilteredByWorkflowRules));
        assert!(pipeline.has_errors());
    }
}
