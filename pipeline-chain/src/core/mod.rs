//! Core domain model types.
//!
//! This module contains the pipeline under construction and the enums that
//! describe its lifecycle.

mod pipeline;
mod status;

pub use pipeline::{CiRef, Pipeline, Project, ProjectId};
pub use status::{FailureReason, PipelineSource, PipelineStatus};
