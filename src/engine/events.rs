//! Lifecycle events and their listeners.
//!
//! Listeners are plain callbacks registered per event kind. They run
//! synchronously, in registration order, on the thread driving the tick.

use super::instance::WorkflowInstance;
use serde::{Deserialize, Serialize};

/// A committed move between two states.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionInfo {
    pub from: String,
    pub to: String,
}

/// The exit a workflow completed through.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExitInfo {
    /// State the exit is declared on
    pub state: String,
    /// Position among that state's exits
    pub index: usize,
}

type StartedListener<D> = Box<dyn Fn(&WorkflowInstance<D>) + Send>;
type TransitionListener<D> = Box<dyn Fn(&TransitionInfo, &WorkflowInstance<D>) + Send>;
type CompletedListener<D> = Box<dyn Fn(&ExitInfo, &WorkflowInstance<D>) + Send>;
type FailedListener<D> = Box<dyn Fn(&anyhow::Error, &WorkflowInstance<D>) + Send>;

pub(crate) struct EventListeners<D> {
    started: Vec<StartedListener<D>>,
    transitioned: Vec<TransitionListener<D>>,
    completed: Vec<CompletedListener<D>>,
    failed: Vec<FailedListener<D>>,
    subordinate_transitioned: Vec<TransitionListener<D>>,
}

impl<D> EventListeners<D> {
    pub(crate) fn new() -> Self {
        Self {
            started: Vec::new(),
            transitioned: Vec::new(),
            completed: Vec::new(),
            failed: Vec::new(),
            subordinate_transitioned: Vec::new(),
        }
    }

    pub(crate) fn on_started(&mut self, listener: StartedListener<D>) {
        self.started.push(listener);
    }

    pub(crate) fn on_transitioned(&mut self, listener: TransitionListener<D>) {
        self.transitioned.push(listener);
    }

    pub(crate) fn on_completed(&mut self, listener: CompletedListener<D>) {
        self.completed.push(listener);
    }

    pub(crate) fn on_failed(&mut self, listener: FailedListener<D>) {
        self.failed.push(listener);
    }

    pub(crate) fn on_subordinate_transitioned(&mut self, listener: TransitionListener<D>) {
        self.subordinate_transitioned.push(listener);
    }

    pub(crate) fn started(&self, workflow: &WorkflowInstance<D>) {
        for listener in &self.started {
            listener(workflow);
        }
    }

    pub(crate) fn transitioned(&self, transition: &TransitionInfo, workflow: &WorkflowInstance<D>) {
        for listener in &self.transitioned {
            listener(transition, workflow);
        }
    }

    pub(crate) fn completed(&self, exit: &ExitInfo, workflow: &WorkflowInstance<D>) {
        for listener in &self.completed {
            listener(exit, workflow);
        }
    }

    pub(crate) fn failed(&self, error: &anyhow::Error, workflow: &WorkflowInstance<D>) {
        for listener in &self.failed {
            listener(error, workflow);
        }
    }

    pub(crate) fn subordinate_transitioned(
        &self,
        transition: &TransitionInfo,
        parent: &WorkflowInstance<D>,
    ) {
        for listener in &self.subordinate_transitioned {
            listener(transition, parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn listeners_run_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut listeners: EventListeners<()> = EventListeners::new();

        for tag in ["first", "second"] {
            let calls = Arc::clone(&calls);
            listeners.on_transitioned(Box::new(move |transition, _| {
                calls
                    .lock()
                    .unwrap()
                    .push(format!("{tag}:{}->{}", transition.from, transition.to));
            }));
        }

        let workflow = WorkflowInstance::new("B", ());
        listeners.transitioned(
            &TransitionInfo {
                from: "A".into(),
                to: "B".into(),
            },
            &workflow,
        );

        assert_eq!(*calls.lock().unwrap(), vec!["first:A->B", "second:A->B"]);
    }
}
