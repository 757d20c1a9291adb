//! Error types for the pipeline creation chain.
//!
//! Two families matter to callers. [`ChainError`] is fatal: it aborts the
//! whole creation request and is never recorded on the pipeline.
//! [`SeedError`] is a validation failure of user-authored configuration: it
//! is data, joined into the pipeline's error list, and halts the chain
//! gracefully.

use crate::sequence::SequenceScope;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Fatal errors raised while running the chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The command carries no configuration processor result.
    #[error("missing configuration processor result")]
    MissingProcessorResult,

    /// A persisting link ran without a seed graph on the command.
    #[error("missing pipeline seed")]
    MissingPipelineSeed,

    /// Sequence allocation failed.
    #[error("{0}")]
    Allocation(#[from] AllocationError),

    /// The persistence layer failed.
    #[error("{0}")]
    Persistence(#[from] PersistenceError),
}

/// Errors from the sequence allocator.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The scope has no values left.
    #[error("sequence exhausted for {scope}")]
    Exhausted {
        /// The scope that ran out.
        scope: SequenceScope,
    },

    /// The storage backend failed.
    #[error("sequence backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The transaction was already committed or rolled back.
    #[error("transaction already closed")]
    TransactionClosed,

    /// The storage backend failed.
    #[error("persistence backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

/// Errors from loading chain configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("invalid chain configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment override holds an unusable value.
    #[error("invalid value for {key}: '{value}'")]
    InvalidOverride {
        /// The environment variable.
        key: String,
        /// The rejected value.
        value: String,
    },
}

/// Metadata about a validation error for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SeedErrorInfo {
    /// Error code (e.g., "SEED-005-CYCLE").
    pub code: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl SeedErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// A structural problem in the configured stages and jobs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    /// Two stages share a name.
    #[error("stage '{stage}' is defined more than once")]
    DuplicateStage {
        /// The duplicated stage.
        stage: String,
    },

    /// A stage's position is already taken by another stage.
    #[error("stage '{stage}' has position {position}, which is already taken by stage '{other}'")]
    ConflictingStagePosition {
        /// The stage declared later.
        stage: String,
        /// The stage already holding the position.
        other: String,
        /// The contested position.
        position: usize,
    },

    /// The same job name appears twice inside one stage.
    #[error("stage '{stage}' defines job '{job}' more than once")]
    DuplicateJobInStage {
        /// The stage name.
        stage: String,
        /// The duplicated job.
        job: String,
    },

    /// The same job name appears in two different stages.
    #[error("job '{job}' is defined in both stage '{first_stage}' and stage '{second_stage}'")]
    DuplicateJobAcrossStages {
        /// The duplicated job.
        job: String,
        /// The stage of the first definition.
        first_stage: String,
        /// The stage of the repeated definition.
        second_stage: String,
    },

    /// A job needs a job that is not defined anywhere.
    #[error("'{job}' job needs '{need}' job, but '{need}' does not exist in the pipeline")]
    UndefinedNeed {
        /// The job declaring the need.
        job: String,
        /// The missing job.
        need: String,
    },

    /// A job needs a job that its rules excluded from this pipeline.
    #[error("'{job}' job needs '{need}' job, but '{need}' is not in the pipeline")]
    ExcludedNeed {
        /// The job declaring the need.
        job: String,
        /// The excluded job.
        need: String,
    },

    /// A job declares more needs than allowed.
    #[error("'{job}' job can only need {limit} others, but it needs {count}")]
    TooManyNeeds {
        /// The job declaring the needs.
        job: String,
        /// The configured limit.
        limit: usize,
        /// The declared count.
        count: usize,
    },

    /// A rule pattern is not a valid regular expression.
    #[error("'{job}' has an invalid rule pattern '{pattern}'")]
    InvalidRulePattern {
        /// The job (or `workflow`) owning the rule.
        job: String,
        /// The rejected pattern.
        pattern: String,
    },

    /// Needs form a cycle.
    #[error("dependency cycle detected: {}", path.join(" -> "))]
    DependencyCycle {
        /// The jobs forming the cycle, first job repeated at the end.
        path: Vec<String>,
    },
}

impl SeedError {
    /// Returns the stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateStage { .. } => "SEED-006-DUPLICATE_STAGE",
            Self::ConflictingStagePosition { .. } => "SEED-006-STAGE_POSITION",
            Self::DuplicateJobInStage { .. } => "SEED-001-DUPLICATE",
            Self::DuplicateJobAcrossStages { .. } => "SEED-001-DUPLICATE_ACROSS",
            Self::UndefinedNeed { .. } => "SEED-002-UNDEFINED_NEED",
            Self::ExcludedNeed { .. } => "SEED-002-EXCLUDED_NEED",
            Self::TooManyNeeds { .. } => "SEED-003-NEEDS_LIMIT",
            Self::InvalidRulePattern { .. } => "SEED-004-RULE_PATTERN",
            Self::DependencyCycle { .. } => "SEED-005-CYCLE",
        }
    }

    /// Returns diagnostic metadata for the error.
    #[must_use]
    pub fn info(&self) -> SeedErrorInfo {
        let info = SeedErrorInfo::new(self.code());
        match self {
            Self::DuplicateStage { stage } => info
                .with_fix_hint("Rename one of the stages or merge their jobs.")
                .with_context_entry("stage", stage),
            Self::ConflictingStagePosition { stage, other, position } => info
                .with_fix_hint("Give each stage a distinct index.")
                .with_context_entry("stage", stage)
                .with_context_entry("other", other)
                .with_context_entry("position", position.to_string()),
            Self::DuplicateJobInStage { stage, job } => info
                .with_fix_hint("Rename one of the jobs.")
                .with_context_entry("stage", stage)
                .with_context_entry("job", job),
            Self::DuplicateJobAcrossStages { job, .. } => info
                .with_fix_hint("Job names must be unique across all stages.")
                .with_context_entry("job", job),
            Self::UndefinedNeed { job, need } | Self::ExcludedNeed { job, need } => info
                .with_fix_hint("Check for typos in the need, or mark it optional.")
                .with_context_entry("job", job)
                .with_context_entry("need", need),
            Self::TooManyNeeds { job, .. } => info
                .with_fix_hint("Split the job or depend on a stage instead.")
                .with_context_entry("job", job),
            Self::InvalidRulePattern { job, pattern } => info
                .with_context_entry("job", job)
                .with_context_entry("pattern", pattern),
            Self::DependencyCycle { path } => info
                .with_fix_hint("Remove one of the needs in the cycle to break it.")
                .with_context_entry("path", path.join(" -> ")),
        }
    }
}
