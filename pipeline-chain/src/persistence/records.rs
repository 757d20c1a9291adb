//! Flat records handed to the persistence layer.

use crate::core::{Pipeline, PipelineSource, ProjectId};
use crate::processor::When;
use crate::seed::{BuildSeed, PipelineSeed, StageSeed};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A need edge between two jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeedRecord {
    /// The needed job.
    pub name: String,
    /// Whether artifacts are downloaded from the needed job.
    pub artifacts: bool,
}

/// A persisted job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// The job name.
    pub name: String,
    /// The stage name.
    pub stage: String,
    /// The stage position.
    pub stage_idx: usize,
    /// Script lines.
    pub script: Vec<String>,
    /// When the job runs.
    pub when: When,
    /// Whether failure is tolerated.
    pub allow_failure: bool,
    /// Outgoing need edges.
    pub needs: Vec<NeedRecord>,
}

impl From<&BuildSeed> for JobRecord {
    fn from(build: &BuildSeed) -> Self {
        Self {
            name: build.name.clone(),
            stage: build.stage.clone(),
            stage_idx: build.stage_idx,
            script: build.script.clone(),
            when: build.when,
            allow_failure: build.allow_failure,
            needs: build
                .needs
                .iter()
                .map(|need| NeedRecord {
                    name: need.name.clone(),
                    artifacts: need.artifacts,
                })
                .collect(),
        }
    }
}

/// A persisted stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    /// The stage name.
    pub name: String,
    /// The stage position.
    pub position: usize,
    /// The stage's jobs.
    pub jobs: Vec<JobRecord>,
}

impl From<&StageSeed> for StageRecord {
    fn from(stage: &StageSeed) -> Self {
        Self {
            name: stage.name.clone(),
            position: stage.position,
            jobs: stage.builds.iter().map(JobRecord::from).collect(),
        }
    }
}

/// A persisted pipeline with its stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRecord {
    /// The record ID, assigned on insert.
    pub id: Option<i64>,
    /// The owning project.
    pub project_id: ProjectId,
    /// The project-scoped sequence number.
    pub iid: Option<i64>,
    /// The full ref path.
    pub ref_path: String,
    /// The CI ref record ID.
    pub ci_ref_id: Option<i64>,
    /// The commit SHA.
    pub sha: Option<String>,
    /// What triggered the pipeline.
    pub source: PipelineSource,
    /// Whether the ref is protected.
    pub protected: bool,
    /// Caller-supplied variables.
    pub variables: BTreeMap<String, String>,
    /// The pipeline's stages in order.
    pub stages: Vec<StageRecord>,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

impl PipelineRecord {
    /// Flattens a pipeline and its seed graph.
    #[must_use]
    pub fn from_seed(pipeline: &Pipeline, seed: &PipelineSeed) -> Self {
        Self {
            id: None,
            project_id: pipeline.project_id,
            iid: pipeline.iid(),
            ref_path: pipeline.ref_path(),
            ci_ref_id: pipeline.ci_ref.as_ref().map(|ci_ref| ci_ref.id),
            sha: pipeline.sha.clone(),
            source: pipeline.source,
            protected: pipeline.protected,
            variables: pipeline.variables.clone(),
            stages: seed.stages().iter().map(StageRecord::from).collect(),
            created_at: pipeline.created_at,
        }
    }

    /// Returns the number of jobs across all stages.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.stages.iter().map(|stage| stage.jobs.len()).sum()
    }
}
