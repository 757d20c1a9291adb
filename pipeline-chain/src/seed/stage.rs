//! Stage seeds.

use super::BuildSeed;
use serde::{Deserialize, Serialize};

/// An unpersisted stage and its jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSeed {
    /// The stage name.
    pub name: String,
    /// The stage position.
    pub position: usize,
    /// Included jobs in declaration order.
    pub builds: Vec<BuildSeed>,
}

impl StageSeed {
    /// Returns the number of jobs.
    #[must_use]
    pub fn size(&self) -> usize {
        self.builds.len()
    }

    /// Finds a job by name.
    #[must_use]
    pub fn build(&self, name: &str) -> Option<&BuildSeed> {
        self.builds.iter().find(|build| build.name == name)
    }
}
