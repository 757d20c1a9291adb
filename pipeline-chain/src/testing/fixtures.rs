//! Command fixtures and sample processor results.

use std::sync::Arc;

use crate::chain::{Command, ProtectedRefs, Stores};
use crate::config::ChainConfig;
use crate::core::{Pipeline, Project, ProjectId};
use crate::events::{EventSink, NoOpEventSink};
use crate::processor::{JobAttributes, ProcessorResult, Rule, StageAttributes, When};

use super::StaticProtectedRefs;

/// Project ID used by fixtures.
pub const PROJECT_ID: i64 = 1;

/// A command builder with test defaults.
///
/// Defaults: project 1 on `main`, the [`build_and_test`] result, nothing
/// protected, in-memory stores, no event sink.
pub struct CommandFixture {
    /// The ref the pipeline is built for.
    pub ref_name: String,
    /// Whether the ref is a tag.
    pub tag: bool,
    /// The processed configuration.
    pub processor_result: Option<ProcessorResult>,
    /// Chain configuration.
    pub config: ChainConfig,
    /// Ref protection lookup.
    pub protected_refs: Arc<dyn ProtectedRefs>,
    /// Storage collaborators.
    pub stores: Stores,
    /// Event sink.
    pub event_sink: Arc<dyn EventSink>,
    seeds_block: Option<Box<dyn Fn(&mut Pipeline) + Send + Sync>>,
}

impl Default for CommandFixture {
    fn default() -> Self {
        Self {
            ref_name: "main".to_string(),
            tag: false,
            processor_result: Some(build_and_test()),
            config: ChainConfig::default(),
            protected_refs: Arc::new(StaticProtectedRefs(false)),
            stores: Stores::in_memory(),
            event_sink: Arc::new(NoOpEventSink),
            seeds_block: None,
        }
    }
}

impl CommandFixture {
    /// Creates a fixture with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ref.
    #[must_use]
    pub fn with_ref(mut self, ref_name: impl Into<String>) -> Self {
        self.ref_name = ref_name.into();
        self
    }

    /// Marks the ref as a tag.
    #[must_use]
    pub fn as_tag(mut self) -> Self {
        self.tag = true;
        self
    }

    /// Sets the processor result.
    #[must_use]
    pub fn with_processor_result(mut self, result: ProcessorResult) -> Self {
        self.processor_result = Some(result);
        self
    }

    /// Removes the processor result.
    #[must_use]
    pub fn without_processor_result(mut self) -> Self {
        self.processor_result = None;
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    /// Makes every ref protected or not.
    #[must_use]
    pub fn protected(mut self, protected: bool) -> Self {
        self.protected_refs = Arc::new(StaticProtectedRefs(protected));
        self
    }

    /// Sets the storage collaborators.
    #[must_use]
    pub fn with_stores(mut self, stores: Stores) -> Self {
        self.stores = stores;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the seed block.
    #[must_use]
    pub fn with_seeds_block<F>(mut self, block: F) -> Self
    where
        F: Fn(&mut Pipeline) + Send + Sync + 'static,
    {
        self.seeds_block = Some(Box::new(block));
        self
    }

    /// Builds the command.
    #[must_use]
    pub fn build(self) -> Command {
        let pipeline = Pipeline::new(ProjectId(PROJECT_ID), self.ref_name).with_tag(self.tag);
        let mut builder = Command::builder(Project::new(PROJECT_ID, "group/app"), pipeline)
            .config(self.config)
            .protected_refs(self.protected_refs)
            .stores(self.stores)
            .event_sink(self.event_sink);

        if let Some(result) = self.processor_result {
            builder = builder.processor_result(result);
        }
        if let Some(block) = self.seeds_block {
            builder = builder.seeds_block(block);
        }

        builder.build()
    }
}

/// `build: [compile]`, `test: [rspec needs compile]`.
#[must_use]
pub fn build_and_test() -> ProcessorResult {
    ProcessorResult::new(vec![
        StageAttributes::new("build", vec![JobAttributes::new("compile")]),
        StageAttributes::new("test", vec![JobAttributes::new("rspec").needs("compile")]),
    ])
}

/// `rspec` needs a job that does not exist.
#[must_use]
pub fn undefined_need() -> ProcessorResult {
    ProcessorResult::new(vec![
        StageAttributes::new("build", vec![JobAttributes::new("compile")]),
        StageAttributes::new("test", vec![JobAttributes::new("rspec").needs("setup")]),
    ])
}

/// `lint` and `rspec` need each other across stages.
#[must_use]
pub fn cyclic_needs() -> ProcessorResult {
    ProcessorResult::new(vec![
        StageAttributes::new("build", vec![JobAttributes::new("lint").needs("rspec")]),
        StageAttributes::new("test", vec![JobAttributes::new("rspec").needs("lint")]),
    ])
}

/// A duplicate job, an undefined need and a cycle in one configuration.
#[must_use]
pub fn several_errors() -> ProcessorResult {
    ProcessorResult::new(vec![
        StageAttributes::new(
            "build",
            vec![JobAttributes::new("compile"), JobAttributes::new("compile")],
        ),
        StageAttributes::new(
            "test",
            vec![
                JobAttributes::new("rspec").needs("setup"),
                JobAttributes::new("a").needs("b"),
                JobAttributes::new("b").needs("a"),
            ],
        ),
    ])
}

/// Every job is excluded by its rules on `main`.
#[must_use]
pub fn nothing_on_main() -> ProcessorResult {
    ProcessorResult::new(vec![StageAttributes::new(
        "deploy",
        vec![JobAttributes::new("ship").with_rule(Rule::if_ref("^release-", When::OnSuccess))],
    )])
}

/// [`build_and_test`] with workflow rules that drop `main`.
#[must_use]
pub fn filtered_on_main() -> ProcessorResult {
    build_and_test().with_workflow_rules(vec![Rule::if_ref("^main$", When::Never), Rule::always(When::Always)])
}
