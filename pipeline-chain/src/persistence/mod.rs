//! Persistence contracts used by the chain.
//!
//! The chain only calls these traits; storage engines implement them. The
//! in-memory implementations back tests and embedding without a database.

mod memory;
mod records;

pub use memory::{InMemoryCiRefRegistry, InMemoryPipelineRepository};
pub use records::{JobRecord, NeedRecord, PipelineRecord, StageRecord};

use crate::core::{CiRef, ProjectId};
use crate::errors::PersistenceError;
use async_trait::async_trait;

/// Registry of persisted CI refs.
#[async_trait]
pub trait CiRefRegistry: Send + Sync {
    /// Returns the ref record for the project and path, creating it if needed.
    async fn ensure_for(&self, project_id: ProjectId, ref_path: &str) -> Result<CiRef, PersistenceError>;
}

/// Store for created pipelines.
#[async_trait]
pub trait PipelineRepository: Send + Sync {
    /// Opens a transaction.
    async fn begin(&self) -> Result<Box<dyn PipelineTransaction>, PersistenceError>;
}

/// A unit of work against a [`PipelineRepository`].
///
/// Nothing is visible to readers until [`commit`](Self::commit). Dropping
/// an open transaction discards its writes.
#[async_trait]
pub trait PipelineTransaction: Send {
    /// Stages a pipeline with its stages and jobs, returning the new ID.
    async fn insert_pipeline(&mut self, record: PipelineRecord) -> Result<i64, PersistenceError>;

    /// Makes staged writes durable.
    async fn commit(&mut self) -> Result<(), PersistenceError>;

    /// Discards staged writes.
    async fn rollback(&mut self) -> Result<(), PersistenceError>;
}
