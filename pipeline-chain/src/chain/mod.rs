//! The pipeline creation chain.
//!
//! A [`ChainExecutor`] runs [`ChainLink`]s in order against one [`Command`].
//! Each link mutates the command in place; a link that records errors on the
//! pipeline halts the chain through [`ChainLink::should_break`], while a
//! fatal [`ChainError`](crate::errors::ChainError) aborts it outright.
//!
//! ```text
//! Seed -> EvaluateWorkflowRules -> SeedBlock -> Create
//! ```

mod command;
mod create;
mod executor;
mod link;
mod protected_refs;
mod seed;
mod seed_block;
mod workflow_rules;


pub use command::{Command, CommandBuilder, SeedBlockFn, Stores};
pub use create::{Create, EMPTY_PIPELINE_MESSAGE};
pub use executor::{ChainExecutor, ChainOutcome};
pub use link::{record_error, ChainLink};
#[cfg(test)]
pub use protected_refs::MockProtectedRefs;
pub use protected_refs::{ProtectedRefPatterns, ProtectedRefs};
pub use seed::Seed;
pub use seed_block::SeedBlock;
pub use workflow_rules::{EvaluateWorkflowRules, FILTERED_OUT_MESSAGE};
