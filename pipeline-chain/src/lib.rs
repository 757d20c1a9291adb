//! # Pipeline Chain
//!
//! Builds CI pipelines from processed configuration through an ordered
//! chain of links.
//!
//! The chain provides:
//!
//! - **Ordered links with early exit**: each link mutates a shared command;
//!   recorded pipeline errors halt the chain, fatal errors abort it
//! - **Sequence allocation**: project-scoped pipeline numbers committed
//!   outside the pipeline transaction and never reused
//! - **Seed graphs**: stage and job seeds with resolved `needs`, validated in
//!   one batch for duplicates, unresolved needs and cycles
//! - **Feature gates**: resolved once per execution from configuration
//! - **Observability**: `tracing` logs and chain events through an
//!   [`EventSink`](events::EventSink)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipeline_chain::prelude::*;
//!
//! let mut command = Command::builder(project, Pipeline::new(project.id, "main"))
//!     .processor_result(ProcessorResult::from_json_str(&processed)?)
//!     .stores(stores)
//!     .build();
//!
//! let outcome = ChainExecutor::default_chain().execute(&mut command).await?;
//! if outcome.is_complete() {
//!     println!("created pipeline #{:?}", command.pipeline.iid());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod chain;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod persistence;
pub mod processor;
pub mod seed;
pub mod sequence;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::chain::{
        ChainExecutor, ChainLink, ChainOutcome, Command, CommandBuilder, Create,
        EvaluateWorkflowRules, ProtectedRefPatterns, ProtectedRefs, Seed, SeedBlock, Stores,
    };
    pub use crate::config::{ChainConfig, FeatureFlags, FeatureGate};
    pub use crate::core::{
        FailureReason, Pipeline, PipelineSource, PipelineStatus, Project, ProjectId,
    };
    pub use crate::errors::{
        AllocationError, ChainError, ConfigError, PersistenceError, SeedError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::persistence::{
        CiRefRegistry, InMemoryCiRefRegistry, InMemoryPipelineRepository, PipelineRepository,
    };
    pub use crate::processor::{JobAttributes, Need, ProcessorResult, Rule, StageAttributes, When};
    pub use crate::seed::{PipelineSeed, SeedLimits};
    pub use crate::sequence::{InMemorySequenceAllocator, SequenceAllocator, SequenceScope};
}
