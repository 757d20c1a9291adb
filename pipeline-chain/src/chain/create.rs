//! Persists the seeded pipeline.

use super::{record_error, ChainLink, Command};
use crate::core::{FailureReason, PipelineStatus};
use crate::errors::ChainError;
use crate::persistence::PipelineRecord;
use async_trait::async_trait;
use tracing::{info, warn};

/// Message recorded when no job survives rule evaluation.
pub const EMPTY_PIPELINE_MESSAGE: &str = "No stages / jobs for this pipeline.";

/// Writes the pipeline with its stages and jobs in one transaction.
#[derive(Debug, Default, Clone, Copy)]
pub struct Create;

#[async_trait]
impl ChainLink for Create {
    fn name(&self) -> &'static str {
        "create"
    }

    async fn perform(&mut self, command: &mut Command) -> Result<(), ChainError> {
        let seed = command
            .pipeline_seed
            .clone()
            .ok_or(ChainError::MissingPipelineSeed)?;

        if seed.size() == 0 {
            record_error(&mut command.pipeline, EMPTY_PIPELINE_MESSAGE, FailureReason::ConfigError);
            return Ok(());
        }

        let record = PipelineRecord::from_seed(&command.pipeline, &seed);
        let jobs = record.job_count();
        let mut transaction = command.stores().pipelines.begin().await?;

        let id = match transaction.insert_pipeline(record).await {
            Ok(id) => id,
            Err(err) => {
                if let Err(rollback_err) = transaction.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed insert also failed");
                }
                return Err(err.into());
            }
        };
        transaction.commit().await?;

        command.pipeline.id = Some(id);
        command.pipeline.status = PipelineStatus::Created;
        info!(
            run_id = %command.run_id(),
            pipeline_id = id,
            iid = ?command.pipeline.iid(),
            jobs,
            "Created pipeline"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Pipeline, Project, ProjectId};
    use crate::chain::Stores;
    use crate::persistence::InMemoryPipelineRepository;
    use crate::seed::{PipelineSeed, SeedLimits};
    use crate::testing::fixtures;
    use std::sync::Arc;

    fn command(repository: &InMemoryPipelineRepository) -> Command {
        let stores = Stores {
            pipelines: Arc::new(repository.clone()),
            ..Stores::in_memory()
        };
        Command::builder(Project::new(1, "group/app"), Pipeline::new(ProjectId(1), "main"))
            .stores(stores)
            .build()
    }

    #[tokio::test]
    async fn test_missing_seed_is_fatal() {
        let repository = InMemoryPipelineRepository::new();
        let mut command = command(&repository);

        let err = Create.perform(&mut command).await.unwrap_err();

        assert!(matches!(err, ChainError::MissingPipelineSeed));
        assert!(repository.is_empty());
    }

    #[tokio::test]
    async fn test_empty_seed_is_not_persisted() {
        let repository = InMemoryPipelineRepository::new();
        let mut command = command(&repository);
        command.pipeline_seed = Some(Arc::new(PipelineSeed::new(&command.pipeline, &[], &SeedLimits::default())));
        let mut link = Create;

        link.perform(&mut command).await.unwrap();

        assert!(link.should_break(&command));
        assert_eq!(command.pipeline.errors(), [EMPTY_PIPELINE_MESSAGE.to_string()]);
        assert!(repository.is_empty());
    }

    #[tokio::test]
    async fn test_persists_pipeline() {
        let repository = InMemoryPipelineRepository::new();
        let mut command = command(&repository);
        let result = fixtures::build_and_test();
        command.pipeline_seed = Some(Arc::new(PipelineSeed::new(
            &command.pipeline,
            &result.stages_attributes,
            &SeedLimits::default(),
        )));

        Create.perform(&mut command).await.unwrap();

        let id = command.pipeline.id.unwrap();
        let record = repository.find(id).unwrap();
        assert_eq!(command.pipeline.status, PipelineStatus::Created);
        assert_eq!(record.job_count(), 2);
        assert_eq!(record.stages[1].jobs[0].needs[0].name, "compile");
    }
}
