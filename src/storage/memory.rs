//! In-process workflow storage.

use super::{StorageError, WorkflowSnapshot, WorkflowStorage};
use crate::engine::WorkflowInstance;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::RwLock;
use uuid::Uuid;

/// Keeps binary snapshots in memory, keyed by workflow id.
///
/// Storing the same workflow again replaces the earlier snapshot.
pub struct MemoryStorage<D> {
    snapshots: RwLock<HashMap<Uuid, Vec<u8>>>,
    _payload: PhantomData<fn() -> D>,
}

impl<D> MemoryStorage<D> {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
            _payload: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().map(|snapshots| snapshots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.snapshots
            .read()
            .map(|snapshots| snapshots.contains_key(&id))
            .unwrap_or(false)
    }

    pub fn remove(&self, id: Uuid) -> Result<(), StorageError> {
        let mut snapshots = self.snapshots.write().map_err(|_| StorageError::Poisoned)?;
        snapshots.remove(&id).map(|_| ()).ok_or(StorageError::NotFound(id))
    }
}

impl<D> Default for MemoryStorage<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> WorkflowStorage<D> for MemoryStorage<D>
where
    D: Clone + Serialize + DeserializeOwned,
{
    fn store(&self, workflow: &WorkflowInstance<D>) -> Result<(), StorageError> {
        let bytes = WorkflowSnapshot::capture(workflow)?.to_binary()?;
        let mut snapshots = self.snapshots.write().map_err(|_| StorageError::Poisoned)?;
        snapshots.insert(workflow.id(), bytes);
        Ok(())
    }

    fn load(&self, id: Uuid) -> Result<WorkflowInstance<D>, StorageError> {
        let snapshots = self.snapshots.read().map_err(|_| StorageError::Poisoned)?;
        let bytes = snapshots.get(&id).ok_or(StorageError::NotFound(id))?;
        WorkflowSnapshot::<D>::from_binary(bytes)?.into_instance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_workflow_loads_back() {
        let storage = MemoryStorage::new();
        let workflow = WorkflowInstance::new("Queued", 7_u32);

        storage.store(&workflow).unwrap();
        let loaded = storage.load(workflow.id()).unwrap();

        assert_eq!(loaded, workflow);
        assert_eq!(*loaded.data(), 7);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn storing_again_replaces_snapshot() {
        let storage = MemoryStorage::new();
        let mut workflow = WorkflowInstance::new("Queued", 1_u32);
        storage.store(&workflow).unwrap();

        *workflow.data_mut() = 2;
        storage.store(&workflow).unwrap();

        assert_eq!(storage.len(), 1);
        assert_eq!(*storage.load(workflow.id()).unwrap().data(), 2);
    }

    #[test]
    fn missing_workflow_is_not_found() {
        let storage: MemoryStorage<u32> = MemoryStorage::new();
        let id = Uuid::new_v4();

        assert!(matches!(storage.load(id), Err(StorageError::NotFound(missing)) if missing == id));
        assert!(matches!(storage.remove(id), Err(StorageError::NotFound(_))));
    }
}
