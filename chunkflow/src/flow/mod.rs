//! Conditional sequencing of steps.

mod controller;
mod transition;

pub use controller::{FlowController, FlowEnd, FlowOutcome};
pub use transition::{StatusPattern, TransitionRule, TransitionTable, TransitionTarget};
