//! A single workflow execution.

use crate::core::{StateHistory, StateTransition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of a workflow instance. Exactly one holds at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStatus {
    Active,
    Completed,
    Faulted,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowStatus::Active => "Active",
            WorkflowStatus::Completed => "Complete",
            WorkflowStatus::Faulted => "Faulted",
        };
        f.write_str(label)
    }
}

/// One running execution: identity, current state, payload and status.
///
/// Instances are created by the engine and mutated only by tick processing.
/// Callers may change the payload between ticks through
/// [`WorkflowEngine::workflow_mut`](crate::engine::WorkflowEngine::workflow_mut).
pub struct WorkflowInstance<D> {
    pub(crate) id: Uuid,
    pub(crate) state: String,
    pub(crate) data: D,
    pub(crate) status: WorkflowStatus,
    pub(crate) awaiting_subordinate: bool,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) history: StateHistory,
}

impl<D> WorkflowInstance<D> {
    pub(crate) fn new(state: impl Into<String>, data: D) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: state.into(),
            data,
            status: WorkflowStatus::Active,
            awaiting_subordinate: false,
            started_at: Utc::now(),
            history: StateHistory::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn current_state(&self) -> &str {
        &self.state
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    pub fn into_data(self) -> D {
        self.data
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == WorkflowStatus::Active
    }

    pub fn is_completed(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }

    pub fn is_faulted(&self) -> bool {
        self.status == WorkflowStatus::Faulted
    }

    /// Whether a nested engine is still running on this instance's behalf.
    pub fn is_awaiting_subordinate(&self) -> bool {
        self.awaiting_subordinate
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    pub(crate) fn move_to(&mut self, target: &str, tick: u64) {
        let from = std::mem::replace(&mut self.state, target.to_string());
        self.history.record(StateTransition {
            from,
            to: target.to_string(),
            timestamp: Utc::now(),
            tick,
        });
    }
}

impl<D> PartialEq for WorkflowInstance<D> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<D> Eq for WorkflowInstance<D> {}

impl<D> fmt::Display for WorkflowInstance<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.state, self.status)
    }
}

impl<D: fmt::Debug> fmt::Debug for WorkflowInstance<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowInstance")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("status", &self.status)
            .field("awaiting_subordinate", &self.awaiting_subordinate)
            .field("data", &self.data)
            .finish()
    }
}
