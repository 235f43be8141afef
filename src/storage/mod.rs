//! Storing and restoring workflow instances.
//!
//! The engine never touches storage during a tick. Callers persist active
//! workflows with [`WorkflowEngine::store_workflow`] and bring them back with
//! [`WorkflowEngine::load_workflow`] or [`WorkflowEngine::resume_workflow`].
//!
//! Snapshots carry the identity, current state, payload and history of a
//! workflow. Guards, actions and nested workflows are not part of a
//! snapshot; a workflow resumed into a state with a nested engine starts a
//! fresh nested workflow.
//!
//! [`WorkflowEngine::store_workflow`]: crate::engine::WorkflowEngine::store_workflow
//! [`WorkflowEngine::load_workflow`]: crate::engine::WorkflowEngine::load_workflow
//! [`WorkflowEngine::resume_workflow`]: crate::engine::WorkflowEngine::resume_workflow

use crate::core::StateHistory;
use crate::engine::{WorkflowInstance, WorkflowStatus};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;
pub mod memory;

pub use error::StorageError;
pub use memory::MemoryStorage;

/// Version identifier for the snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persists and restores workflow instances.
pub trait WorkflowStorage<D>: Send + Sync {
    fn store(&self, workflow: &WorkflowInstance<D>) -> Result<(), StorageError>;

    fn load(&self, id: Uuid) -> Result<WorkflowInstance<D>, StorageError>;
}

/// Serializable image of an active workflow.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowSnapshot<D> {
    /// Snapshot format version
    pub version: u32,

    pub id: Uuid,

    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,

    pub state: String,

    pub data: D,

    pub started_at: DateTime<Utc>,

    pub history: StateHistory,
}

impl<D: Clone> WorkflowSnapshot<D> {
    /// Capture an active workflow.
    pub fn capture(workflow: &WorkflowInstance<D>) -> Result<Self, StorageError> {
        if workflow.status != WorkflowStatus::Active {
            return Err(StorageError::NotActive(workflow.id));
        }

        Ok(Self {
            version: SNAPSHOT_VERSION,
            id: workflow.id,
            taken_at: Utc::now(),
            state: workflow.state.clone(),
            data: workflow.data.clone(),
            started_at: workflow.started_at,
            history: workflow.history.clone(),
        })
    }
}

impl<D> WorkflowSnapshot<D> {
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }

    /// Rebuild the workflow this snapshot was taken from.
    pub fn into_instance(self) -> Result<WorkflowInstance<D>, StorageError> {
        self.validate()?;
        Ok(WorkflowInstance {
            id: self.id,
            state: self.state,
            data: self.data,
            status: WorkflowStatus::Active,
            awaiting_subordinate: false,
            started_at: self.started_at,
            history: self.history,
        })
    }
}

impl<D: Serialize + DeserializeOwned> WorkflowSnapshot<D> {
    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StorageError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| StorageError::DeserializationFailed(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, StorageError> {
        bincode::serialize(self).map_err(|e| StorageError::SerializationFailed(e.to_string()))
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, StorageError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| StorageError::DeserializationFailed(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Order {
        lines: u32,
    }

    fn workflow() -> WorkflowInstance<Order> {
        let mut workflow = WorkflowInstance::new("Received", Order { lines: 2 });
        workflow.move_to("Packed", 4);
        workflow
    }

    #[test]
    fn capture_keeps_identity_state_and_history() {
        let original = workflow();
        let snapshot = WorkflowSnapshot::capture(&original).unwrap();

        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.id, original.id());
        assert_eq!(snapshot.state, "Packed");
        assert_eq!(snapshot.history.get_path(), vec!["Received", "Packed"]);
    }

    #[test]
    fn finished_workflows_cannot_be_captured() {
        let mut finished = workflow();
        finished.status = WorkflowStatus::Completed;

        assert!(matches!(
            WorkflowSnapshot::capture(&finished),
            Err(StorageError::NotActive(id)) if id == finished.id()
        ));
    }

    #[test]
    fn json_snapshot_restores_workflow() {
        let original = workflow();
        let json = WorkflowSnapshot::capture(&original).unwrap().to_json().unwrap();

        let restored = WorkflowSnapshot::<Order>::from_json(&json)
            .unwrap()
            .into_instance()
            .unwrap();

        assert_eq!(restored, original);
        assert_eq!(restored.current_state(), "Packed");
        assert_eq!(restored.data(), &Order { lines: 2 });
        assert!(restored.is_active());
        assert_eq!(restored.history(), original.history());
    }

    #[test]
    fn binary_snapshot_restores_workflow() {
        let original = workflow();
        let bytes = WorkflowSnapshot::capture(&original).unwrap().to_binary().unwrap();

        let restored = WorkflowSnapshot::<Order>::from_binary(&bytes)
            .unwrap()
            .into_instance()
            .unwrap();

        assert_eq!(restored.id(), original.id());
        assert_eq!(restored.data().lines, 2);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut snapshot = WorkflowSnapshot::capture(&workflow()).unwrap();
        snapshot.version = SNAPSHOT_VERSION + 1;
        let json = serde_json::to_string(&snapshot).unwrap();

        let result = WorkflowSnapshot::<Order>::from_json(&json);

        assert!(matches!(
            result,
            Err(StorageError::UnsupportedVersion { found, supported })
                if found == SNAPSHOT_VERSION + 1 && supported == SNAPSHOT_VERSION
        ));
    }

    #[test]
    fn malformed_json_is_deserialization_error() {
        let result = WorkflowSnapshot::<Order>::from_json("{ not json");
        assert!(matches!(result, Err(StorageError::DeserializationFailed(_))));
    }
}
