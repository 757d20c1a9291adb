//! Job seeds.

use crate::processor::When;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A resolved need edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeedSeed {
    /// The needed job.
    pub name: String,
    /// Whether artifacts are downloaded from the needed job.
    pub artifacts: bool,
}

/// How a job is scheduled relative to others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingType {
    /// Waits for all earlier stages.
    Stage,
    /// Waits only for its needs.
    Dag,
}

/// An unpersisted job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSeed {
    /// The job name.
    pub name: String,
    /// The owning stage's name.
    pub stage: String,
    /// The owning stage's position.
    pub stage_idx: usize,
    /// Script lines.
    pub script: Vec<String>,
    /// When the job runs, after rules.
    pub when: When,
    /// Whether failure is tolerated.
    pub allow_failure: bool,
    /// Resolved dependencies.
    pub needs: Vec<NeedSeed>,
    /// Processor options carried through.
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

impl BuildSeed {
    /// Returns how the job is scheduled.
    #[must_use]
    pub fn scheduling_type(&self) -> SchedulingType {
        if self.needs.is_empty() {
            SchedulingType::Stage
        } else {
            SchedulingType::Dag
        }
    }

    /// Returns true if the job needs `name`.
    #[must_use]
    pub fn needs_job(&self, name: &str) -> bool {
        self.needs.iter().any(|need| need.name == name)
    }
}
