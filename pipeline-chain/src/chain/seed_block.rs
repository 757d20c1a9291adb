//! The deferred seed block link.
//!
//! Projects gated into `seed_block_after_workflow_rules` skip the seed block
//! in the seed link and run it here, once workflow rules have kept the
//! pipeline.

use super::{ChainLink, Command};
use crate::errors::ChainError;
use async_trait::async_trait;
use tracing::debug;

/// Runs the seed block deferred past workflow rules.
///
/// A no-op unless `seed_block_after_workflow_rules` is on for the project.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeedBlock;

#[async_trait]
impl ChainLink for SeedBlock {
    fn name(&self) -> &'static str {
        "seed_block"
    }

    async fn perform(&mut self, command: &mut Command) -> Result<(), ChainError> {
        if command.features().seed_block_after_workflow_rules && command.run_seeds_block() {
            debug!(run_id = %command.run_id(), "Ran deferred seed block");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainConfig, FeatureFlags, FeatureGate};
    use crate::core::ProjectId;
    use crate::testing::{fixtures, CommandFixture, SeedBlockRecorder};

    fn deferred() -> ChainConfig {
        ChainConfig::default().with_features(FeatureFlags {
            seed_block_after_workflow_rules: FeatureGate::for_projects([ProjectId(fixtures::PROJECT_ID)]),
        })
    }

    #[tokio::test]
    async fn test_runs_block_when_deferred() {
        let recorder = SeedBlockRecorder::new();
        let mut command = CommandFixture::new()
            .with_config(deferred())
            .with_seeds_block(recorder.block())
            .build();

        SeedBlock.perform(&mut command).await.unwrap();

        assert_eq!(recorder.call_count(), 1);
        assert!(!SeedBlock.should_break(&command));
    }

    #[tokio::test]
    async fn test_skips_block_when_not_deferred() {
        let recorder = SeedBlockRecorder::new();
        let mut command = CommandFixture::new().with_seeds_block(recorder.block()).build();

        SeedBlock.perform(&mut command).await.unwrap();

        assert_eq!(recorder.call_count(), 0);
    }

    #[tokio::test]
    async fn test_deferred_without_block_is_noop() {
        let mut command = CommandFixture::new().with_config(deferred()).build();

        SeedBlock.perform(&mut command).await.unwrap();

        assert!(!command.pipeline.has_errors());
        assert!(!SeedBlock.should_break(&command));
    }
}
