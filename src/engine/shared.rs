//! Thread-safe handle around an engine.

use super::error::EngineError;
use super::machine::WorkflowEngine;
use super::report::TickReport;
use super::WorkflowData;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// A cloneable, lock-protected engine.
///
/// Every operation takes the lock for its whole duration, so a tick started
/// from one thread (including the ticks of nested engines) finishes before a
/// tick from another thread begins.
pub struct SharedEngine<D> {
    inner: Arc<Mutex<WorkflowEngine<D>>>,
}

impl<D> Clone for SharedEngine<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D> SharedEngine<D> {
    pub fn new(engine: WorkflowEngine<D>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, WorkflowEngine<D>>, EngineError> {
        self.inner.lock().map_err(|_| EngineError::Poisoned)
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut WorkflowEngine<D>) -> R) -> Result<R, EngineError> {
        let mut engine = self.lock()?;
        Ok(f(&mut engine))
    }

    pub fn active_count(&self) -> Result<usize, EngineError> {
        self.with(|engine| engine.active_count())
    }
}

impl<D: WorkflowData> SharedEngine<D> {
    pub fn tick(&self) -> Result<TickReport<D>, EngineError> {
        self.lock()?.tick()
    }

    pub fn start_workflow(&self, data: D) -> Result<Uuid, EngineError> {
        self.with(|engine| engine.start_workflow(data))
    }
}
