//! In-memory persistence backends.

use super::{CiRefRegistry, PipelineRecord, PipelineRepository, PipelineTransaction};
use crate::core::{CiRef, ProjectId};
use crate::errors::PersistenceError;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// In-memory CI ref registry.
#[derive(Debug, Default)]
pub struct InMemoryCiRefRegistry {
    refs: Mutex<HashMap<(ProjectId, String), CiRef>>,
    next_id: AtomicI64,
}

impl InMemoryCiRefRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of refs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.refs.lock().len()
    }

    /// Returns true if no ref has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.lock().is_empty()
    }
}

#[async_trait]
impl CiRefRegistry for InMemoryCiRefRegistry {
    async fn ensure_for(&self, project_id: ProjectId, ref_path: &str) -> Result<CiRef, PersistenceError> {
        let mut refs = self.refs.lock();
        let ci_ref = refs
            .entry((project_id, ref_path.to_string()))
            .or_insert_with(|| CiRef {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                project_id,
                ref_path: ref_path.to_string(),
            });
        Ok(ci_ref.clone())
    }
}

#[derive(Debug, Default)]
struct RepositoryState {
    pipelines: RwLock<Vec<PipelineRecord>>,
    next_id: AtomicI64,
}

/// In-memory pipeline repository.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPipelineRepository {
    state: Arc<RepositoryState>,
}

impl InMemoryPipelineRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all committed pipelines.
    #[must_use]
    pub fn pipelines(&self) -> Vec<PipelineRecord> {
        self.state.pipelines.read().clone()
    }

    /// Returns the number of committed pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.pipelines.read().len()
    }

    /// Returns true if nothing has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.pipelines.read().is_empty()
    }

    /// Finds a committed pipeline by ID.
    #[must_use]
    pub fn find(&self, id: i64) -> Option<PipelineRecord> {
        self.state
            .pipelines
            .read()
            .iter()
            .find(|record| record.id == Some(id))
            .cloned()
    }
}

#[async_trait]
impl PipelineRepository for InMemoryPipelineRepository {
    async fn begin(&self) -> Result<Box<dyn PipelineTransaction>, PersistenceError> {
        Ok(Box::new(InMemoryTransaction {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
            closed: false,
        }))
    }
}

struct InMemoryTransaction {
    state: Arc<RepositoryState>,
    staged: Vec<PipelineRecord>,
    closed: bool,
}

impl InMemoryTransaction {
    fn ensure_open(&self) -> Result<(), PersistenceError> {
        if self.closed {
            return Err(PersistenceError::TransactionClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl PipelineTransaction for InMemoryTransaction {
    async fn insert_pipeline(&mut self, mut record: PipelineRecord) -> Result<i64, PersistenceError> {
        self.ensure_open()?;

        // IDs come from a shared sequence; a rolled back insert burns its ID.
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        record.id = Some(id);
        self.staged.push(record);
        Ok(id)
    }

    async fn commit(&mut self) -> Result<(), PersistenceError> {
        self.ensure_open()?;
        self.closed = true;
        self.state.pipelines.write().append(&mut self.staged);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), PersistenceError> {
        self.ensure_open()?;
        self.closed = true;
        self.staged.clear();
        Ok(())
    }
}
