//! Restyle Engine - batch generation and review orchestration
//!
//! Two drivers over the shared index and generation client:
//! [`BatchOrchestrator`] walks every pending item of a source folder
//! sequentially, and [`ReviewWorkflowEngine`] runs the interactive
//! select-or-redo pass over the generated variation sets.

pub mod batch;
mod redo;
pub mod review;

pub use batch::{BatchOptions, BatchOrchestrator, BatchOutcome, BatchProgress, ItemFailure};
pub use redo::RedoRequest;
pub use review::{ReviewItem, ReviewOptions, ReviewWorkflowEngine};
