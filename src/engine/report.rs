//! What happened during one tick.

use super::events::{ExitInfo, TransitionInfo};
use super::instance::WorkflowInstance;
use uuid::Uuid;

/// A transition committed by a workflow during the tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionRecord {
    pub workflow_id: Uuid,
    pub transition: TransitionInfo,
}

/// A workflow that completed during the tick, handed back for archival.
pub struct Completion<D> {
    pub exit: ExitInfo,
    pub workflow: WorkflowInstance<D>,
}

/// A workflow that faulted during the tick.
pub struct Failure<D> {
    /// The failure raised by the guard, action or subordinate
    pub error: anyhow::Error,
    pub workflow: WorkflowInstance<D>,
}

/// Summary of one tick, in the order events were emitted.
///
/// Finished workflows are moved out of the engine into the report, so the
/// caller owns them from here on.
pub struct TickReport<D> {
    pub tick: u64,
    pub transitioned: Vec<TransitionRecord>,
    /// Transitions made by nested workflows, keyed by the parent's id
    pub subordinate_transitioned: Vec<TransitionRecord>,
    pub completed: Vec<Completion<D>>,
    pub failed: Vec<Failure<D>>,
    /// Workflows started from the data source at the end of the tick
    pub started: Vec<Uuid>,
}

impl<D> TickReport<D> {
    pub(crate) fn new(tick: u64) -> Self {
        Self {
            tick,
            transitioned: Vec::new(),
            subordinate_transitioned: Vec::new(),
            completed: Vec::new(),
            failed: Vec::new(),
            started: Vec::new(),
        }
    }

    /// Nothing changed during the tick.
    pub fn is_quiet(&self) -> bool {
        self.transitioned.is_empty()
            && self.subordinate_transitioned.is_empty()
            && self.completed.is_empty()
            && self.failed.is_empty()
            && self.started.is_empty()
    }
}
