//! Per-instance transition history.
//!
//! Every transition an instance commits is recorded with the wall-clock time
//! and the engine tick it happened on, so callers can reconstruct the path a
//! workflow took after it completes or faults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single committed transition.
///
/// # Example
///
/// ```rust
/// use easyflow::core::StateTransition;
/// use chrono::Utc;
///
/// let transition = StateTransition {
///     from: "Idle".to_string(),
///     to: "Running".to_string(),
///     timestamp: Utc::now(),
///     tick: 2,
/// };
/// assert_eq!(transition.tick, 2);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state being left
    pub from: String,
    /// The state being entered
    pub to: String,
    /// When the transition committed
    pub timestamp: DateTime<Utc>,
    /// Engine tick the transition committed on
    pub tick: u64,
}

/// Ordered history of state transitions.
///
/// # Example
///
/// ```rust
/// use easyflow::core::{StateHistory, StateTransition};
/// use chrono::Utc;
///
/// let mut history = StateHistory::new();
/// history.record(StateTransition {
///     from: "Start".into(),
///     to: "Middle".into(),
///     timestamp: Utc::now(),
///     tick: 1,
/// });
/// history.record(StateTransition {
///     from: "Middle".into(),
///     to: "End".into(),
///     timestamp: Utc::now(),
///     tick: 2,
/// });
///
/// assert_eq!(history.get_path(), vec!["Start", "Middle", "End"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateHistory {
    transitions: Vec<StateTransition>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Append a transition.
    pub fn record(&mut self, transition: StateTransition) {
        self.transitions.push(transition);
    }

    /// States traversed: the first source state, then each target.
    pub fn get_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(first.from.as_str());
        }
        for transition in &self.transitions {
            path.push(transition.to.as_str());
        }
        path
    }

    /// Time between the first and last recorded transition.
    ///
    /// Returns `None` if nothing has been recorded.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
