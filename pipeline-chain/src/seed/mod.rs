//! Seed graph: the unpersisted stages and jobs of a pipeline.
//!
//! This module provides:
//! - Stage and job seeds with resolved need edges
//! - Rule evaluation against the pipeline ref
//! - Batched validation (duplicates, unresolved needs, cycles)

mod build;
mod cycles;
mod pipeline;
pub mod rules;
mod stage;

pub use build::{BuildSeed, NeedSeed, SchedulingType};
pub use pipeline::{PipelineSeed, SeedLimits, DEFAULT_MAX_NEEDS};
pub use stage::StageSeed;
