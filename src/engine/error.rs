//! Runtime errors raised by the execution engine.

use crate::storage::StorageError;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Which part of the tick a failing callback belonged to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Exit,
    Transition,
    Trigger,
    /// A nested engine's workflow failed
    Subordinate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Exit => "exit",
            Phase::Transition => "transition",
            Phase::Trigger => "trigger",
            Phase::Subordinate => "subordinate",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while running an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A guard or action failed under the `Throw` policy
    #[error("{phase} failed for workflow {workflow_id} in state '{state}': {source}")]
    CallbackFailed {
        workflow_id: Uuid,
        state: String,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    /// A nested engine's tick raised an error
    #[error("subordinate engine bound to state '{state}' failed")]
    Subordinate {
        state: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("state '{0}' is not defined in this engine")]
    UnknownState(String),

    #[error("workflow {0} is already active")]
    DuplicateWorkflow(Uuid),

    #[error("workflow {0} is not active and cannot be resumed")]
    InactiveWorkflow(Uuid),

    #[error("workflow {0} not found")]
    WorkflowNotFound(Uuid),

    #[error("no workflow storage is bound to this engine")]
    NoStorage,

    #[error("engine lock poisoned")]
    Poisoned,

    #[error("invalid engine configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// The guard or action failure behind this error, if there is one.
    pub fn callback_error(&self) -> Option<&anyhow::Error> {
        match self {
            EngineError::CallbackFailed { source, .. } => Some(source),
            EngineError::Subordinate { source, .. } => source.callback_error(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn callback_error_unwraps_nested_engines() {
        let inner = EngineError::CallbackFailed {
            workflow_id: Uuid::new_v4(),
            state: "Fetching".into(),
            phase: Phase::Trigger,
            source: anyhow!("socket closed"),
        };
        let outer = EngineError::Subordinate {
            state: "Download".into(),
            source: Box::new(inner),
        };

        let root = outer.callback_error().unwrap();
        assert_eq!(root.to_string(), "socket closed");
        assert!(EngineError::Poisoned.callback_error().is_none());
    }

    #[test]
    fn message_names_phase_and_state() {
        let id = Uuid::new_v4();
        let error = EngineError::CallbackFailed {
            workflow_id: id,
            state: "Idle".into(),
            phase: Phase::Exit,
            source: anyhow!("bad"),
        };

        assert_eq!(
            error.to_string(),
            format!("exit failed for workflow {id} in state 'Idle': bad")
        );
    }
}
