//! Nested engines bound to parent states.
//!
//! When a parent workflow enters a bound state, the coordinator starts a
//! workflow on the nested engine seeded with a clone of the parent's payload
//! and parks the parent until that workflow finishes. Parent and child ids are
//! tracked in both directions so that events coming out of the nested engine
//! can be routed back to the parent that owns them.

use super::error::EngineError;
use super::instance::WorkflowInstance;
use super::machine::WorkflowEngine;
use super::report::TickReport;
use super::WorkflowData;
use std::collections::HashMap;
use uuid::Uuid;

/// A nested engine owned by the parent for one of its states.
pub(crate) struct SubordinateBinding<D> {
    pub(crate) state: String,
    pub(crate) engine: WorkflowEngine<D>,
}

pub(crate) struct SubordinateCoordinator<D> {
    bindings: Vec<SubordinateBinding<D>>,
    parent_by_child: HashMap<Uuid, Uuid>,
    child_by_parent: HashMap<Uuid, Uuid>,
}

impl<D> SubordinateCoordinator<D> {
    pub(crate) fn new(bindings: Vec<SubordinateBinding<D>>) -> Self {
        Self {
            bindings,
            parent_by_child: HashMap::new(),
            child_by_parent: HashMap::new(),
        }
    }

    pub(crate) fn engine(&self, state: &str) -> Option<&WorkflowEngine<D>> {
        self.bindings
            .iter()
            .find(|binding| binding.state == state)
            .map(|binding| &binding.engine)
    }

    pub(crate) fn bound_states(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|binding| binding.state.as_str())
    }

    pub(crate) fn parent_of(&self, child: Uuid) -> Option<Uuid> {
        self.parent_by_child.get(&child).copied()
    }

    pub(crate) fn child_of(&self, parent: Uuid) -> Option<Uuid> {
        self.child_by_parent.get(&parent).copied()
    }

    /// Forget a finished child, returning the parent it belonged to.
    pub(crate) fn release(&mut self, child: Uuid) -> Option<Uuid> {
        let parent = self.parent_by_child.remove(&child)?;
        self.child_by_parent.remove(&parent);
        Some(parent)
    }

    fn link(&mut self, parent: Uuid, child: Uuid) {
        self.parent_by_child.insert(child, parent);
        self.child_by_parent.insert(parent, child);
    }
}

impl<D: WorkflowData> SubordinateCoordinator<D> {
    /// Start a nested workflow if the parent's current state is bound.
    ///
    /// Marks the parent as awaiting and returns the child's id.
    pub(crate) fn start(&mut self, parent: &mut WorkflowInstance<D>) -> Option<Uuid> {
        let binding = self
            .bindings
            .iter_mut()
            .find(|binding| binding.state == parent.state)?;

        let child = binding.engine.start_workflow(parent.data.clone());
        parent.awaiting_subordinate = true;
        self.link(parent.id, child);
        Some(child)
    }

    /// Tick every bound engine that has active workflows, in binding order.
    ///
    /// A nested engine that throws still hands back what it finalized, and
    /// the engines after it are ticked as usual.
    pub(crate) fn tick_bound_engines(&mut self) -> Vec<(TickReport<D>, Option<EngineError>)> {
        let mut reports = Vec::new();
        for binding in &mut self.bindings {
            if binding.engine.active_count() == 0 {
                continue;
            }

            let (report, thrown) = binding.engine.step();
            let thrown = thrown.map(|source| EngineError::Subordinate {
                state: binding.state.clone(),
                source: Box::new(source),
            });
            reports.push((report, thrown));
        }
        reports
    }
}
