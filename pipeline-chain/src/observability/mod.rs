//! Observability utilities.

mod spans;
mod subscriber;

pub use spans::{ChainSpanAttributes, SpanTimer};
pub use subscriber::{init_tracing, LogFormat};
