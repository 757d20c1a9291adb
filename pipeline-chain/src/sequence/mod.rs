//! Scoped sequence allocation (internal IDs).
//!
//! An internal ID is strictly increasing and unique within one parent
//! scope. Values are committed as soon as they are handed out and are never
//! returned, even when the operation that asked for them later fails.
//! Allocation is serialized by the store itself, not by an application lock,
//! and never joins the caller's pipeline transaction.

use crate::core::ProjectId;
use crate::errors::AllocationError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of record a sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalIdUsage {
    /// CI pipelines.
    CiPipelines,
}

impl fmt::Display for InternalIdUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CiPipelines => write!(f, "ci_pipelines"),
        }
    }
}

/// The scope a sequence is unique within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceScope {
    /// What the sequence numbers.
    pub usage: InternalIdUsage,
    /// The parent project.
    pub project_id: ProjectId,
}

impl SequenceScope {
    /// The pipeline sequence of a project.
    #[must_use]
    pub fn ci_pipelines(project_id: ProjectId) -> Self {
        Self {
            usage: InternalIdUsage::CiPipelines,
            project_id,
        }
    }
}

impl fmt::Display for SequenceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_id, self.usage)
    }
}

/// Storage primitive issuing scoped sequence numbers.
#[async_trait]
pub trait SequenceAllocator: Send + Sync {
    /// Issues and commits the next value for the scope.
    async fn next_value(&self, scope: SequenceScope) -> Result<i64, AllocationError>;

    /// Returns the last value issued for the scope, if any.
    async fn current_value(&self, scope: SequenceScope) -> Result<Option<i64>, AllocationError>;
}

/// In-memory sequence store.
///
/// Each scope's counter lives in one map entry; the entry lock is the
/// storage-level serialization point.
#[derive(Debug, Default)]
pub struct InMemorySequenceAllocator {
    last_values: DashMap<SequenceScope, i64>,
}

impl InMemorySequenceAllocator {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose scope continues after `last_value`.
    #[must_use]
    pub fn starting_after(scope: SequenceScope, last_value: i64) -> Self {
        let store = Self::new();
        store.last_values.insert(scope, last_value);
        store
    }
}

#[async_trait]
impl SequenceAllocator for InMemorySequenceAllocator {
    async fn next_value(&self, scope: SequenceScope) -> Result<i64, AllocationError> {
        let mut entry = self.last_values.entry(scope).or_insert(0);
        let next = entry
            .checked_add(1)
            .ok_or(AllocationError::Exhausted { scope })?;
        *entry = next;

        tracing::debug!(%scope, value = next, "Allocated internal id");
        Ok(next)
    }

    async fn current_value(&self, scope: SequenceScope) -> Result<Option<i64>, AllocationError> {
        Ok(self.last_values.get(&scope).map(|value| *value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn scope(project: i64) -> SequenceScope {
        SequenceScope::ci_pipelines(ProjectId(project))
    }

    #[tokio::test]
    async fn test_values_increase_per_scope() {
        let store = InMemorySequenceAllocator::new();

        assert_eq!(store.next_value(scope(1)).await.unwrap(), 1);
        assert_eq!(store.next_value(scope(1)).await.unwrap(), 2);
        assert_eq!(store.next_value(scope(2)).await.unwrap(), 1);
        assert_eq!(store.current_value(scope(1)).await.unwrap(), Some(2));
        assert_eq!(store.current_value(scope(3)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_starting_after() {
        let store = InMemorySequenceAllocator::starting_after(scope(1), 41);

        assert_eq!(store.next_value(scope(1)).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_exhausted_scope() {
        let store = InMemorySequenceAllocator::starting_after(scope(1), i64::MAX);

        let err = store.next_value(scope(1)).await.unwrap_err();
        assert!(matches!(err, AllocationError::Exhausted { .. }));
        assert_eq!(store.current_value(scope(1)).await.unwrap(), Some(i64::MAX));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocation_is_collision_free() {
        let store = Arc::new(InMemorySequenceAllocator::new());

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.next_value(scope(9)).await.unwrap() })
            })
            .collect();

        let values: HashSet<i64> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(values.len(), 64);
        assert_eq!(values, (1..=64).collect::<HashSet<_>>());
    }
}
