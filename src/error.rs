//! Crate-wide error taxonomy.
//!
//! `Unschedulable`, `NodeLookupMiss` and `AllocationFailure` are recorded
//! against individual pods by the scheduling cycle and never bubble up as a
//! top-level `Err` — they are local failures, not aborts. `InvariantViolation`
//! and `BadInput` are returned from the simulation entry point and stop the
//! run.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("pod {pod} is unschedulable: {reason}")]
    Unschedulable { pod: String, reason: String },

    #[error("node lookup miss: {0}")]
    NodeLookupMiss(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("allocation failure for pod {pod} on node {node}")]
    AllocationFailure { pod: String, node: String },

    #[error("bad input: {0}")]
    BadInput(String),
}

impl SimError {
    /// Whether this error degrades to a recorded `Unschedulable` outcome
    /// rather than aborting the run (spec §7).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SimError::Unschedulable { .. }
                | SimError::NodeLookupMiss(_)
                | SimError::AllocationFailure { .. }
        )
    }
}

pub type SimResult<T> = Result<T, SimError>;
