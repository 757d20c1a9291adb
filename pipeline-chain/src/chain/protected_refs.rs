//! Ref protection lookup.

use crate::core::ProjectId;
use regex::Regex;

/// Answers whether a ref is protected in a project.
#[cfg_attr(test, mockall::automock)]
pub trait ProtectedRefs: Send + Sync {
    /// Returns true if `ref_name` is protected.
    fn is_protected(&self, project_id: ProjectId, ref_name: &str, tag: bool) -> bool;
}

/// Protected branch and tag names, with `*` wildcards.
#[derive(Debug, Clone, Default)]
pub struct ProtectedRefPatterns {
    branches: Vec<Regex>,
    tags: Vec<Regex>,
}

impl ProtectedRefPatterns {
    /// Creates a set protecting nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Protects branches matching `pattern`, e.g. `release-*`.
    pub fn protect_branch(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.branches.push(wildcard(pattern)?);
        Ok(self)
    }

    /// Protects tags matching `pattern`, e.g. `v*`.
    pub fn protect_tag(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.tags.push(wildcard(pattern)?);
        Ok(self)
    }
}

impl ProtectedRefs for ProtectedRefPatterns {
    fn is_protected(&self, _project_id: ProjectId, ref_name: &str, tag: bool) -> bool {
        let patterns = if tag { &self.tags } else { &self.branches };
        patterns.iter().any(|re| re.is_match(ref_name))
    }
}

fn wildcard(pattern: &str) -> Result<Regex, regex::Error> {
    let body = regex::escape(pattern).replace(r"\*", ".*");
    Regex::new(&format!("^{body}$"))
}
