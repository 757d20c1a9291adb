//! The pipeline under construction.

use super::{FailureReason, PipelineSource, PipelineStatus};
use crate::errors::{AllocationError, PersistenceError};
use crate::persistence::CiRefRegistry;
use crate::sequence::{SequenceAllocator, SequenceScope};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies a project, the parent scope of pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub i64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project:{}", self.0)
    }
}

/// A project that owns pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// The project ID.
    pub id: ProjectId,
    /// The namespaced path, e.g. `group/app`.
    pub full_path: String,
}

impl Project {
    /// Creates a new project.
    #[must_use]
    pub fn new(id: i64, full_path: impl Into<String>) -> Self {
        Self {
            id: ProjectId(id),
            full_path: full_path.into(),
        }
    }
}

/// A persisted git ref a project builds pipelines for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiRef {
    /// The record ID.
    pub id: i64,
    /// The owning project.
    pub project_id: ProjectId,
    /// The full ref path, e.g. `refs/heads/main`.
    pub ref_path: String,
}

/// A CI pipeline being built by the creation chain.
///
/// Created before the chain starts and mutated in place by each link.
/// Once anything lands in the error list the chain stops before persisting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Database ID, set once persisted.
    pub id: Option<i64>,
    /// The owning project.
    pub project_id: ProjectId,
    /// Project-scoped sequence number.
    iid: Option<i64>,
    /// Branch or tag name.
    pub ref_name: String,
    /// Whether `ref_name` is a tag.
    pub tag: bool,
    /// The commit SHA.
    pub sha: Option<String>,
    /// What triggered the pipeline.
    pub source: PipelineSource,
    /// The resolved CI ref.
    pub ci_ref: Option<CiRef>,
    /// Whether the ref is protected.
    pub protected: bool,
    /// Variables attached by callers.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    /// Current status.
    pub status: PipelineStatus,
    /// Why the pipeline failed, if it did.
    pub failure_reason: Option<FailureReason>,
    /// The joined configuration error message.
    pub yaml_errors: Option<String>,
    errors: Vec<String>,
    /// When the pipeline object was created.
    pub created_at: DateTime<Utc>,
}

impl Pipeline {
    /// Creates a new pipeline for a branch.
    #[must_use]
    pub fn new(project_id: ProjectId, ref_name: impl Into<String>) -> Self {
        Self {
            id: None,
            project_id,
            iid: None,
            ref_name: ref_name.into(),
            tag: false,
            sha: None,
            source: PipelineSource::default(),
            ci_ref: None,
            protected: false,
            variables: BTreeMap::new(),
            status: PipelineStatus::default(),
            failure_reason: None,
            yaml_errors: None,
            errors: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Marks the ref as a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: bool) -> Self {
        self.tag = tag;
        self
    }

    /// Sets the commit SHA.
    #[must_use]
    pub fn with_sha(mut self, sha: impl Into<String>) -> Self {
        self.sha = Some(sha.into());
        self
    }

    /// Sets the source.
    #[must_use]
    pub fn with_source(mut self, source: PipelineSource) -> Self {
        self.source = source;
        self
    }

    /// Returns the allocated sequence number.
    #[must_use]
    pub fn iid(&self) -> Option<i64> {
        self.iid
    }

    /// Returns the full ref path.
    #[must_use]
    pub fn ref_path(&self) -> String {
        if self.tag {
            format!("refs/tags/{}", self.ref_name)
        } else {
            format!("refs/heads/{}", self.ref_name)
        }
    }

    /// Allocates the project-scoped sequence number if not yet allocated.
    ///
    /// The allocator commits on its own; callers must not hold a pipeline
    /// transaction open around this call.
    pub async fn ensure_project_iid(
        &mut self,
        allocator: &dyn SequenceAllocator,
    ) -> Result<i64, AllocationError> {
        if let Some(iid) = self.iid {
            return Ok(iid);
        }

        let iid = allocator
            .next_value(SequenceScope::ci_pipelines(self.project_id))
            .await?;
        self.iid = Some(iid);
        Ok(iid)
    }

    /// Resolves and attaches the CI ref if not yet attached.
    pub async fn ensure_ci_ref(
        &mut self,
        registry: &dyn CiRefRegistry,
    ) -> Result<&CiRef, PersistenceError> {
        let ci_ref = match self.ci_ref.take() {
            Some(ci_ref) => ci_ref,
            None => registry.ensure_for(self.project_id, &self.ref_path()).await?,
        };
        Ok(self.ci_ref.insert(ci_ref))
    }

    /// Appends a user-visible error.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Returns the accumulated errors.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns true if any error has been recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Marks the pipeline failed with a reason.
    pub fn drop_with(&mut self, reason: FailureReason) {
        self.failure_reason = Some(reason);
        self.status = PipelineStatus::Failed;
    }
}
