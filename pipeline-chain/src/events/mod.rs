//! Event sinks for chain observability.
//!
//! The executor reports progress through an [`EventSink`] carried by the
//! command. Event types are dotted names:
//!
//! | Event                  | Emitted when                                 |
//! |------------------------|----------------------------------------------|
//! | `chain.started`        | before the first link runs                   |
//! | `chain.link.completed` | after a link's `perform` returns             |
//! | `chain.halted`         | a link asked the chain to stop               |
//! | `chain.completed`      | every link ran without halting               |
//! | `chain.failed`         | a link raised a fatal error                  |

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};
