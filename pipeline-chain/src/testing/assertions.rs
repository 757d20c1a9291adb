//! Test assertions for chain outcomes.

use crate::chain::{ChainOutcome, Command};
use crate::core::PipelineStatus;

/// Asserts that the chain halted at `link` with `message` among the errors.
pub fn assert_chain_halted_with(outcome: &ChainOutcome, command: &Command, link: &str, message: &str) {
    assert_eq!(
        outcome.halted_at,
        Some(link),
        "Expected chain to halt at '{}', performed: {:?}",
        link,
        outcome.performed
    );
    assert!(
        command.pipeline.errors().iter().any(|error| error == message),
        "Expected pipeline errors to contain {:?}, got {:?}",
        message,
        command.pipeline.errors()
    );
}

/// Asserts that every link ran without halting.
pub fn assert_chain_completed(outcome: &ChainOutcome, command: &Command) {
    assert!(
        outcome.is_complete(),
        "Expected chain to complete, halted at {:?} with errors {:?}",
        outcome.halted_at,
        command.pipeline.errors()
    );
}

/// Asserts that a seed graph is attached with stages named `expected`.
pub fn assert_seeded_stages(command: &Command, expected: &[&str]) {
    let seed = command
        .pipeline_seed
        .as_ref()
        .unwrap_or_else(|| panic!("Expected a seed graph, errors: {:?}", command.pipeline.errors()));
    let names: Vec<&str> = seed.stages().iter().map(|stage| stage.name.as_str()).collect();
    assert_eq!(names, expected, "Unexpected stage seeds");
}

/// Asserts that `job` in the attached seed graph needs exactly `expected`.
pub fn assert_needs(command: &Command, job: &str, expected: &[&str]) {
    let build = command
        .pipeline_seed
        .as_ref()
        .and_then(|seed| seed.build(job))
        .unwrap_or_else(|| panic!("Expected job '{}' in the seed graph", job));
    let needs: Vec<&str> = build.needs.iter().map(|need| need.name.as_str()).collect();
    assert_eq!(needs, expected, "Unexpected needs for '{}'", job);
}

/// Asserts that the pipeline was persisted.
pub fn assert_pipeline_created(command: &Command) {
    assert_eq!(
        command.pipeline.status,
        PipelineStatus::Created,
        "Expected a created pipeline, errors: {:?}",
        command.pipeline.errors()
    );
    assert!(command.pipeline.id.is_some(), "Expected a pipeline id");
}
