//! Testing utilities for the pipeline chain.
//!
//! This module provides:
//! - Command fixtures and sample processor results
//! - Mock collaborators and recording links
//! - Assertions over chain outcomes and seed graphs

mod assertions;
pub mod fixtures;
mod mocks;

pub use assertions::{
    assert_chain_completed, assert_chain_halted_with, assert_needs, assert_pipeline_created,
    assert_seeded_stages,
};
pub use fixtures::CommandFixture;
pub use mocks::{CallLog, FailingSequenceAllocator, RecordingLink, SeedBlockRecorder, StaticProtectedRefs};
