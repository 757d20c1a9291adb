//! Span attributes and timing for chain execution.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// Attributes describing one chain execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainSpanAttributes {
    /// Correlation ID of the execution.
    pub run_id: Option<String>,
    /// The project the pipeline belongs to.
    pub project_id: Option<i64>,
    /// The pipeline's sequence number, once allocated.
    pub iid: Option<i64>,
    /// The ref being built.
    pub ref_name: Option<String>,
    /// The link currently running.
    pub link: Option<String>,
}

impl ChainSpanAttributes {
    /// Creates empty attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the run ID.
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Sets the project ID.
    #[must_use]
    pub fn with_project_id(mut self, project_id: i64) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Sets the sequence number.
    #[must_use]
    pub fn with_iid(mut self, iid: Option<i64>) -> Self {
        self.iid = iid;
        self
    }

    /// Sets the ref name.
    #[must_use]
    pub fn with_ref_name(mut self, ref_name: impl Into<String>) -> Self {
        self.ref_name = Some(ref_name.into());
        self
    }

    /// Sets the link name.
    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Renders the attributes under the `chain.` namespace.
    #[must_use]
    pub fn to_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        if let Some(ref v) = self.run_id {
            attrs.insert("chain.run_id".to_string(), v.clone());
        }
        if let Some(v) = self.project_id {
            attrs.insert("chain.project_id".to_string(), v.to_string());
        }
        if let Some(v) = self.iid {
            attrs.insert("chain.pipeline_iid".to_string(), v.to_string());
        }
        if let Some(ref v) = self.ref_name {
            attrs.insert("chain.ref".to_string(), v.clone());
        }
        if let Some(ref v) = self.link {
            attrs.insert("chain.link".to_string(), v.clone());
        }

        attrs
    }

    /// Renders the attributes as a JSON event payload.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Times one chain or link run and logs the duration when finished.
#[derive(Debug)]
pub struct SpanTimer {
    started: Instant,
    span: &'static str,
}

impl SpanTimer {
    /// Starts timing `span`.
    #[must_use]
    pub fn start(span: &'static str) -> Self {
        Self {
            started: Instant::now(),
            span,
        }
    }

    /// Milliseconds since the timer started.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// Stops the timer, logs the duration at debug level and returns it in
    /// milliseconds.
    pub fn finish(self) -> f64 {
        let duration_ms = self.elapsed_ms();
        tracing::debug!(span = self.span, duration_ms, "Span finished");
        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_span_attributes() {
        let attrs = ChainSpanAttributes::new()
            .with_run_id("run-1")
            .with_project_id(42)
            .with_iid(Some(7))
            .with_link("seed");

        let rendered = attrs.to_attributes();
        assert_eq!(rendered.get("chain.project_id"), Some(&"42".to_string()));
        assert_eq!(rendered.get("chain.pipeline_iid"), Some(&"7".to_string()));
        assert_eq!(rendered.get("chain.link"), Some(&"seed".to_string()));
        assert!(!rendered.contains_key("chain.ref"));
        assert_eq!(attrs.to_json()["project_id"], 42);
    }

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("seed");
        std::thread::sleep(std::time::Duration::from_millis(5));

        assert!(timer.elapsed_ms() >= 5.0);
        assert!(timer.finish() >= 5.0);
    }
}
