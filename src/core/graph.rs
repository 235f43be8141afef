//! The immutable catalogue of states an engine executes.

use super::state::{StateDef, TransitionDef};
use std::collections::HashMap;

/// Fully resolved state graph.
///
/// Produced by [`GraphBuilder`](crate::builder::GraphBuilder); no wildcard
/// patterns survive into the graph. States keep their definition order.
#[derive(Debug)]
pub struct StateGraph<D> {
    states: Vec<StateDef<D>>,
    index: HashMap<String, usize>,
    entry: usize,
    trigger_count: usize,
}

impl<D> StateGraph<D> {
    /// Assemble a graph, numbering triggers in state then declaration order.
    pub(crate) fn new(mut states: Vec<StateDef<D>>, entry: usize) -> Self {
        let mut trigger_count = 0;
        for state in &mut states {
            for trigger in &mut state.triggers {
                trigger.id = trigger_count;
                trigger_count += 1;
            }
        }

        let index = states
            .iter()
            .enumerate()
            .map(|(i, state)| (state.name.clone(), i))
            .collect();

        Self {
            states,
            index,
            entry,
            trigger_count,
        }
    }

    pub fn state(&self, name: &str) -> Option<&StateDef<D>> {
        self.index.get(name).map(|&i| &self.states[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// States in definition order.
    pub fn states(&self) -> impl Iterator<Item = &StateDef<D>> {
        self.states.iter()
    }

    pub fn entry_state(&self) -> &StateDef<D> {
        &self.states[self.entry]
    }

    /// Every transition, grouped by source state in definition order.
    pub fn transitions(&self) -> impl Iterator<Item = &TransitionDef<D>> {
        self.states.iter().flat_map(|state| state.transitions.iter())
    }

    pub fn trigger_count(&self) -> usize {
        self.trigger_count
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Names of states with no transitions and no exits.
    pub fn dead_end_states(&self) -> Vec<&str> {
        self.states
            .iter()
            .filter(|state| state.is_dead_end())
            .map(|state| state.name())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::guard::Action;
    use crate::core::state::{ExitDef, TriggerDef};

    fn graph() -> StateGraph<u32> {
        let mut idle = StateDef::new("Idle", None);
        idle.transitions.push(TransitionDef::new("Idle", "Running", None, None));
        idle.triggers.push(TriggerDef::new(
            "Idle",
            None,
            Action::new(|n: &mut u32| *n += 1),
            None,
        ));

        let mut running = StateDef::new("Running", None);
        running.triggers.push(TriggerDef::new(
            "Running",
            None,
            Action::new(|n: &mut u32| *n += 1),
            None,
        ));
        running.triggers.push(TriggerDef::new(
            "Running",
            None,
            Action::new(|n: &mut u32| *n += 2),
            None,
        ));
        running.exits.push(ExitDef::new("Running", None, None));

        let parked = StateDef::new("Parked", None);

        StateGraph::new(vec![idle, running, parked], 0)
    }

    #[test]
    fn triggers_are_numbered_across_states() {
        let graph = graph();
        let ids: Vec<usize> = graph
            .states()
            .flat_map(|s| s.triggers().iter().map(|t| t.id()))
            .collect();

        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(graph.trigger_count(), 3);
    }

    #[test]
    fn lookup_by_name() {
        let graph = graph();
        assert_eq!(graph.entry_state().name(), "Idle");
        assert!(graph.contains("Running"));
        assert!(graph.state("Missing").is_none());
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn transitions_iterate_all_states() {
        let graph = graph();
        let edges: Vec<(&str, &str)> = graph.transitions().map(|t| (t.from(), t.to())).collect();
        assert_eq!(edges, vec![("Idle", "Running")]);
    }

    #[test]
    fn dead_ends_are_reported() {
        assert_eq!(graph().dead_end_states(), vec!["Parked"]);
    }
}
