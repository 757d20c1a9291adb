//! Pipeline status, source and failure reason enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of a pipeline under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Built in memory, not yet persisted.
    #[default]
    New,
    /// Persisted with its stages and jobs.
    Created,
    /// Construction failed; the pipeline carries errors.
    Failed,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Created => write!(f, "created"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl PipelineStatus {
    /// Returns true if no further links should change the status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Created | Self::Failed)
    }
}

/// What triggered the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineSource {
    /// A git push.
    #[default]
    Push,
    /// Started from the web UI.
    Web,
    /// A pipeline schedule.
    Schedule,
    /// The API.
    Api,
    /// A merge request event.
    MergeRequestEvent,
}

impl fmt::Display for PipelineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::Web => write!(f, "web"),
            Self::Schedule => write!(f, "schedule"),
            Self::Api => write!(f, "api"),
            Self::MergeRequestEvent => write!(f, "merge_request_event"),
        }
    }
}

/// Why a pipeline failed to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The configuration is structurally invalid.
    ConfigError,
    /// Workflow rules excluded the pipeline.
    FilteredByWorkflowRules,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError => write!(f, "config_error"),
            Self::FilteredByWorkflowRules => write!(f, "filtered_by_workflow_rules"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(PipelineStatus::New.to_string(), "new");
        assert_eq!(PipelineStatus::Created.to_string(), "created");
        assert_eq!(PipelineStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_status_is_terminal() {
        assert!(!PipelineStatus::New.is_terminal());
        assert!(PipelineStatus::Created.is_terminal());
        assert!(PipelineStatus::Failed.is_terminal());
    }

    #[test]
    fn test_source_serialize() {
        let json = serde_json::to_string(&PipelineSource::MergeRequestEvent).unwrap();
        assert_eq!(json, r#""merge_request_event""#);

        let source: PipelineSource = serde_json::from_str(r#""schedule""#).unwrap();
        assert_eq!(source, PipelineSource::Schedule);
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(FailureReason::ConfigError.to_string(), "config_error");
    }
}
