//! Mock collaborators and links for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::chain::{record_error, ChainLink, Command, ProtectedRefs};
use crate::core::{FailureReason, Pipeline, ProjectId};
use crate::errors::{AllocationError, ChainError};
use crate::sequence::{SequenceAllocator, SequenceScope};

/// A shared, ordered record of calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<&'static str>>>);

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a call.
    pub fn record(&self, name: &'static str) {
        self.0.lock().push(name);
    }

    /// Returns the calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.0.lock().clone()
    }
}

/// A link that records each call and optionally fails.
#[derive(Debug)]
pub struct RecordingLink {
    name: &'static str,
    log: CallLog,
    error: Option<(String, FailureReason)>,
    fatal: Option<ChainError>,
}

impl RecordingLink {
    /// Creates a link and the log it records into.
    #[must_use]
    pub fn new(name: &'static str) -> (Self, CallLog) {
        let log = CallLog::new();
        (Self::with_log(name, log.clone()), log)
    }

    /// Creates a link recording into `log`.
    #[must_use]
    pub fn with_log(name: &'static str, log: CallLog) -> Self {
        Self {
            name,
            log,
            error: None,
            fatal: None,
        }
    }

    /// Creates another link sharing this link's log.
    #[must_use]
    pub fn sibling(&self, name: &'static str) -> Self {
        Self::with_log(name, self.log.clone())
    }

    /// Records `message` on the pipeline when performed.
    #[must_use]
    pub fn recording_error(mut self, message: impl Into<String>, reason: FailureReason) -> Self {
        self.error = Some((message.into(), reason));
        self
    }

    /// Fails with `error` on the first perform.
    #[must_use]
    pub fn failing_with(mut self, error: ChainError) -> Self {
        self.fatal = Some(error);
        self
    }
}

#[async_trait]
impl ChainLink for RecordingLink {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn perform(&mut self, command: &mut Command) -> Result<(), ChainError> {
        self.log.record(self.name);

        if let Some(error) = self.fatal.take() {
            return Err(error);
        }
        if let Some((message, reason)) = &self.error {
            record_error(&mut command.pipeline, message.clone(), *reason);
        }
        Ok(())
    }
}

/// An allocator whose backend is always down.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSequenceAllocator;

#[async_trait]
impl SequenceAllocator for FailingSequenceAllocator {
    async fn next_value(&self, _scope: SequenceScope) -> Result<i64, AllocationError> {
        Err(AllocationError::Backend(anyhow::anyhow!("sequence backend unavailable")))
    }

    async fn current_value(&self, _scope: SequenceScope) -> Result<Option<i64>, AllocationError> {
        Err(AllocationError::Backend(anyhow::anyhow!("sequence backend unavailable")))
    }
}

/// Answers every protection query the same way.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProtectedRefs(pub bool);

impl ProtectedRefs for StaticProtectedRefs {
    fn is_protected(&self, _project_id: ProjectId, _ref_name: &str, _tag: bool) -> bool {
        self.0
    }
}

/// Observes seed block invocations.
#[derive(Debug, Clone, Default)]
pub struct SeedBlockRecorder {
    seen_iids: Arc<Mutex<Vec<Option<i64>>>>,
    log: Option<CallLog>,
}

impl SeedBlockRecorder {
    /// Creates a recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recorder that also records `"seeds_block"` into `log`.
    #[must_use]
    pub fn logging_to(log: CallLog) -> Self {
        Self {
            seen_iids: Arc::default(),
            log: Some(log),
        }
    }

    /// Returns a seed block reporting to this recorder.
    #[must_use]
    pub fn block(&self) -> impl Fn(&mut Pipeline) + Send + Sync + 'static {
        let recorder = self.clone();
        move |pipeline: &mut Pipeline| {
            recorder.seen_iids.lock().push(pipeline.iid());
            if let Some(log) = &recorder.log {
                log.record("seeds_block");
            }
        }
    }

    /// Returns how many times the block ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.seen_iids.lock().len()
    }

    /// Returns the pipeline iid seen by each call.
    #[must_use]
    pub fn seen_iids(&self) -> Vec<Option<i64>> {
        self.seen_iids.lock().clone()
    }
}
