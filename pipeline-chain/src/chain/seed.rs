//! The seed link: allocates identity and builds the stage/job graph.

use super::{record_error, ChainLink, Command};
use crate::core::FailureReason;
use crate::errors::ChainError;
use crate::seed::PipelineSeed;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Prepares the pipeline and builds its seed graph.
///
/// Steps, in order:
/// 1. allocate the project-scoped iid (outside any pipeline transaction)
/// 2. attach the CI ref
/// 3. set the protected flag
/// 4. run the seed block, unless it is deferred past workflow rules
/// 5. build the seed graph, once per command run
/// 6. record the joined validation errors, or attach the graph
///
/// The graph is memoized against the command's run id, so an executor
/// reused across commands rebuilds it for each new command.
#[derive(Debug, Default)]
pub struct Seed {
    pipeline_seed: Option<(Uuid, Arc<PipelineSeed>)>,
}

impl Seed {
    /// Creates the link with no graph built yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn pipeline_seed(&mut self, command: &Command) -> Result<Arc<PipelineSeed>, ChainError> {
        if let Some((run_id, seed)) = &self.pipeline_seed {
            if *run_id == command.run_id() {
                return Ok(Arc::clone(seed));
            }
        }

        let result = command
            .processor_result
            .as_ref()
            .ok_or(ChainError::MissingProcessorResult)?;
        let seed = Arc::new(PipelineSeed::new(
            &command.pipeline,
            &result.stages_attributes,
            &command.config().seed_limits(),
        ));
        debug!(
            run_id = %command.run_id(),
            stages = seed.stages().len(),
            jobs = seed.size(),
            valid = seed.is_valid(),
            "Built pipeline seed"
        );

        self.pipeline_seed = Some((command.run_id(), Arc::clone(&seed)));
        Ok(seed)
    }
}

#[async_trait]
impl ChainLink for Seed {
    fn name(&self) -> &'static str {
        "seed"
    }

    async fn perform(&mut self, command: &mut Command) -> Result<(), ChainError> {
        if command.processor_result.is_none() {
            return Err(ChainError::MissingProcessorResult);
        }

        let stores = command.stores().clone();
        let iid = command
            .pipeline
            .ensure_project_iid(stores.sequences.as_ref())
            .await?;
        command.pipeline.ensure_ci_ref(stores.ci_refs.as_ref()).await?;

        // Ambiguous refs resolve here rather than failing graph construction.
        command.pipeline.protected = command.protected_ref();

        if !command.features().seed_block_after_workflow_rules {
            command.run_seeds_block();
        }

        let seed = self.pipeline_seed(command)?;

        if let Some(errors) = seed.errors() {
            for error in seed.seed_errors() {
                let info = error.info();
                debug!(
                    run_id = %command.run_id(),
                    iid,
                    code = %info.code,
                    fix_hint = ?info.fix_hint,
                    context = ?info.context,
                    "Seed validation error"
                );
            }
            record_error(&mut command.pipeline, errors.join("\n"), FailureReason::ConfigError);
            return Ok(());
        }

        command.pipeline_seed = Some(seed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Pipeline, PipelineStatus, Project, ProjectId};
    use crate::processor::{JobAttributes, ProcessorResult, StageAttributes};
    use crate::testing::fixtures;
    use tokio_test::assert_err;

    fn command(result: Option<ProcessorResult>) -> Command {
        let builder = Command::builder(Project::new(3, "group/app"), Pipeline::new(ProjectId(3), "main"));
        match result {
            Some(result) => builder.processor_result(result).build(),
            None => builder.build(),
        }
    }

    #[tokio::test]
    async fn test_missing_processor_result_leaves_pipeline_untouched() {
        let mut command = command(None);
        let mut link = Seed::new();

        let err = assert_err!(link.perform(&mut command).await);

        assert!(matches!(err, ChainError::MissingProcessorResult));
        assert_eq!(command.pipeline.iid(), None);
        assert!(command.pipeline.ci_ref.is_none());
        assert!(!command.pipeline.has_errors());
        assert_eq!(command.pipeline.status, PipelineStatus::New);
    }

    #[tokio::test]
    async fn test_graph_is_built_once_per_command() {
        let mut command = command(Some(fixtures::build_and_test()));
        let mut link = Seed::new();

        link.perform(&mut command).await.unwrap();
        let first = command.pipeline_seed.clone().unwrap();

        command.processor_result = Some(ProcessorResult::new(vec![StageAttributes::new(
            "deploy",
            vec![JobAttributes::new("ship")],
        )]));
        link.perform(&mut command).await.unwrap();
        let second = command.pipeline_seed.clone().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.build("ship").is_none());
    }

    #[tokio::test]
    async fn test_graph_is_rebuilt_for_another_command() {
        let mut link = Seed::new();
        let mut first = command(Some(fixtures::build_and_test()));
        link.perform(&mut first).await.unwrap();

        let mut second = command(Some(ProcessorResult::new(vec![StageAttributes::new(
            "deploy",
            vec![JobAttributes::new("ship")],
        )])));
        link.perform(&mut second).await.unwrap();

        let seed = second.pipeline_seed.clone().unwrap();
        let names: Vec<&str> = seed.stages().iter().map(|stage| stage.name.as_str()).collect();
        assert_eq!(names, vec!["deploy"]);
        assert!(seed.build("compile").is_none());
    }

    #[tokio::test]
    async fn test_fresh_instance_builds_fresh_graph() {
        let mut command = command(Some(fixtures::build_and_test()));
        Seed::new().perform(&mut command).await.unwrap();
        let first = command.pipeline_seed.clone().unwrap();

        Seed::new().perform(&mut command).await.unwrap();
        let second = command.pipeline_seed.clone().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalid_graph_is_not_attached() {
        let mut command = command(Some(fixtures::undefined_need()));
        let mut link = Seed::new();

        link.perform(&mut command).await.unwrap();

        assert!(link.should_break(&command));
        assert!(command.pipeline_seed.is_none());
        assert_eq!(command.pipeline.status, PipelineStatus::Failed);
    }
}
