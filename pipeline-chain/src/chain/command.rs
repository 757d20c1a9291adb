//! The shared state threaded through the chain.

use super::{ProtectedRefPatterns, ProtectedRefs};
use crate::config::{ChainConfig, ResolvedFeatures};
use crate::core::{Pipeline, Project};
use crate::events::{EventSink, NoOpEventSink};
use crate::persistence::{CiRefRegistry, InMemoryCiRefRegistry, InMemoryPipelineRepository, PipelineRepository};
use crate::processor::ProcessorResult;
use crate::seed::PipelineSeed;
use crate::sequence::{InMemorySequenceAllocator, SequenceAllocator};
use std::fmt;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// Caller-supplied callback that populates the pipeline.
pub type SeedBlockFn = Arc<dyn Fn(&mut Pipeline) + Send + Sync>;

/// Storage collaborators of the chain.
#[derive(Clone)]
pub struct Stores {
    /// Issues pipeline sequence numbers outside any transaction.
    pub sequences: Arc<dyn SequenceAllocator>,
    /// Resolves CI refs.
    pub ci_refs: Arc<dyn CiRefRegistry>,
    /// Persists created pipelines.
    pub pipelines: Arc<dyn PipelineRepository>,
}

impl Stores {
    /// Stores backed by fresh in-memory implementations.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            sequences: Arc::new(InMemorySequenceAllocator::new()),
            ci_refs: Arc::new(InMemoryCiRefRegistry::new()),
            pipelines: Arc::new(InMemoryPipelineRepository::new()),
        }
    }
}

impl fmt::Debug for Stores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

/// Context for one chain execution.
///
/// Owned by a single executor run and mutated in place by each link.
pub struct Command {
    run_id: Uuid,
    project: Project,
    /// The pipeline under construction.
    pub pipeline: Pipeline,
    /// The processed configuration.
    pub processor_result: Option<ProcessorResult>,
    /// Callback populating the pipeline.
    pub seeds_block: Option<SeedBlockFn>,
    /// The validated seed graph, set by the seed link.
    pub pipeline_seed: Option<Arc<PipelineSeed>>,
    config: ChainConfig,
    features: ResolvedFeatures,
    protected_refs: Arc<dyn ProtectedRefs>,
    protected_ref: OnceLock<bool>,
    stores: Stores,
    event_sink: Arc<dyn EventSink>,
}

impl Command {
    /// Starts building a command.
    #[must_use]
    pub fn builder(project: Project, pipeline: Pipeline) -> CommandBuilder {
        CommandBuilder::new(project, pipeline)
    }

    /// Returns the correlation ID of this execution.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the project.
    #[must_use]
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Returns the chain configuration.
    #[must_use]
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Returns the feature gates resolved for this project.
    #[must_use]
    pub fn features(&self) -> ResolvedFeatures {
        self.features
    }

    /// Returns the storage collaborators.
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    /// Returns whether the pipeline's ref is protected.
    ///
    /// Evaluated once per command.
    pub fn protected_ref(&self) -> bool {
        *self.protected_ref.get_or_init(|| {
            self.protected_refs
                .is_protected(self.project.id, &self.pipeline.ref_name, self.pipeline.tag)
        })
    }

    /// Runs the seed block, if any, against the pipeline.
    pub fn run_seeds_block(&mut self) -> bool {
        match self.seeds_block.clone() {
            Some(block) => {
                block(&mut self.pipeline);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("run_id", &self.run_id)
            .field("project", &self.project)
            .field("pipeline", &self.pipeline)
            .field("has_processor_result", &self.processor_result.is_some())
            .field("has_seeds_block", &self.seeds_block.is_some())
            .field("pipeline_seed", &self.pipeline_seed)
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Command`].
pub struct CommandBuilder {
    project: Project,
    pipeline: Pipeline,
    processor_result: Option<ProcessorResult>,
    seeds_block: Option<SeedBlockFn>,
    config: ChainConfig,
    protected_refs: Arc<dyn ProtectedRefs>,
    stores: Option<Stores>,
    event_sink: Arc<dyn EventSink>,
}

impl CommandBuilder {
    /// Creates a builder with defaults: no processor result, nothing
    /// protected, in-memory stores and a no-op event sink.
    #[must_use]
    pub fn new(project: Project, pipeline: Pipeline) -> Self {
        Self {
            project,
            pipeline,
            processor_result: None,
            seeds_block: None,
            config: ChainConfig::default(),
            protected_refs: Arc::new(ProtectedRefPatterns::new()),
            stores: None,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the processed configuration.
    #[must_use]
    pub fn processor_result(mut self, result: ProcessorResult) -> Self {
        self.processor_result = Some(result);
        self
    }

    /// Sets the seed block.
    #[must_use]
    pub fn seeds_block<F>(mut self, block: F) -> Self
    where
        F: Fn(&mut Pipeline) + Send + Sync + 'static,
    {
        self.seeds_block = Some(Arc::new(block));
        self
    }

    /// Sets the chain configuration.
    #[must_use]
    pub fn config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the ref protection lookup.
    #[must_use]
    pub fn protected_refs(mut self, protected_refs: Arc<dyn ProtectedRefs>) -> Self {
        self.protected_refs = protected_refs;
        self
    }

    /// Sets the storage collaborators.
    #[must_use]
    pub fn stores(mut self, stores: Stores) -> Self {
        self.stores = Some(stores);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn event_sink(mut self, event_sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    /// Builds the command, resolving feature gates for the project.
    #[must_use]
    pub fn build(self) -> Command {
        let features = self.config.features.resolve(self.project.id);

        Command {
            run_id: Uuid::new_v4(),
            project: self.project,
            pipeline: self.pipeline,
            processor_result: self.processor_result,
            seeds_block: self.seeds_block,
            pipeline_seed: None,
            config: self.config,
            features,
            protected_refs: self.protected_refs,
            protected_ref: OnceLock::new(),
            stores: self.stores.unwrap_or_else(Stores::in_memory),
            event_sink: self.event_sink,
        }
    }
}
