//! Builder for transitions declared from one or more source states.

use crate::builder::error::BuildError;
use crate::core::{Action, Guard};

/// A transition ready to be expanded into the graph.
pub(crate) struct TransitionDecl<D> {
    pub(crate) sources: Vec<String>,
    pub(crate) target: String,
    pub(crate) guard: Option<Guard<D>>,
    pub(crate) action: Option<Action<D>>,
}

/// Builder for transitions with a fluent API.
///
/// Every source may be an exact state name or a wildcard pattern. Actions
/// run in the order they were added and stop at the first failure.
///
/// # Example
///
/// ```rust
/// use easyflow::builder::TransitionBuilder;
/// use easyflow::core::Guard;
///
/// #[derive(Clone)]
/// struct Ticket {
///     approved: bool,
///     urgent: bool,
///     escalations: u32,
/// }
///
/// let escalate = TransitionBuilder::<Ticket>::new()
///     .from("Triage")
///     .from("Review*")
///     .to("Escalated")
///     .when_any(vec![
///         Guard::new(|t: &Ticket| t.urgent),
///         Guard::new(|t: &Ticket| !t.approved),
///     ])
///     .action(|t: &mut Ticket| t.escalations += 1);
/// # let _ = escalate;
/// ```
pub struct TransitionBuilder<D> {
    from: Vec<String>,
    to: Option<String>,
    guard: Option<Guard<D>>,
    actions: Vec<Action<D>>,
}

impl<D: 'static> TransitionBuilder<D> {
    pub fn new() -> Self {
        Self {
            from: Vec::new(),
            to: None,
            guard: None,
            actions: Vec::new(),
        }
    }

    /// Add a source state or pattern (at least one is required).
    pub fn from(mut self, state: impl Into<String>) -> Self {
        self.from.push(state.into());
        self
    }

    /// Set the target state (required).
    pub fn to(mut self, state: impl Into<String>) -> Self {
        self.to = Some(state.into());
        self
    }

    /// Set the guard (optional). Replaces any earlier guard.
    pub fn guard(mut self, guard: Guard<D>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure (optional).
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&D) -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::new(predicate))
    }

    /// Guard that passes only when every guard passes.
    pub fn when_all(self, guards: Vec<Guard<D>>) -> Self {
        self.guard(Guard::all(guards))
    }

    /// Guard that passes when at least one guard passes.
    pub fn when_any(self, guards: Vec<Guard<D>>) -> Self {
        self.guard(Guard::any(guards))
    }

    /// Add an action run when the transition commits.
    pub fn action<F>(self, effect: F) -> Self
    where
        F: Fn(&mut D) + Send + Sync + 'static,
    {
        self.then(Action::new(effect))
    }

    /// Add an action that may fail.
    pub fn try_action<F>(self, effect: F) -> Self
    where
        F: Fn(&mut D) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.then(Action::fallible(effect))
    }

    /// Add a prepared action.
    pub fn then(mut self, action: Action<D>) -> Self {
        self.actions.push(action);
        self
    }

    pub(crate) fn build(self) -> Result<TransitionDecl<D>, BuildError> {
        if self.from.is_empty() {
            return Err(BuildError::MissingFromState);
        }
        let target = self.to.ok_or(BuildError::MissingToState)?;

        let mut actions = self.actions;
        let action = match actions.len() {
            0 => None,
            1 => actions.pop(),
            _ => Some(Action::chain(actions)),
        };

        Ok(TransitionDecl {
            sources: self.from,
            target,
            guard: self.guard,
            action,
        })
    }
}

impl<D: 'static> Default for TransitionBuilder<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_validates_required_fields() {
        let missing_to = TransitionBuilder::<u32>::new().from("Initial").build();
        assert!(matches!(missing_to, Err(BuildError::MissingToState)));

        let missing_from = TransitionBuilder::<u32>::new().to("Done").build();
        assert!(matches!(missing_from, Err(BuildError::MissingFromState)));
    }

    #[test]
    fn sources_accumulate_in_order() {
        let decl = TransitionBuilder::<u32>::new()
            .from("A")
            .from("B*")
            .to("C")
            .build()
            .unwrap();

        assert_eq!(decl.sources, vec!["A", "B*"]);
        assert_eq!(decl.target, "C");
        assert!(decl.guard.is_none());
        assert!(decl.action.is_none());
    }

    #[test]
    fn actions_compose_in_declaration_order() {
        let decl = TransitionBuilder::<Vec<u32>>::new()
            .from("A")
            .to("B")
            .action(|log| log.push(1))
            .action(|log| log.push(2))
            .build()
            .unwrap();

        let mut log = Vec::new();
        decl.action.unwrap().run(&mut log).unwrap();
        assert_eq!(log, vec![1, 2]);
    }

    #[test]
    fn when_all_and_when_any_combine_guards() {
        let guards = || {
            vec![
                Guard::new(|n: &u32| *n > 1),
                Guard::new(|n: &u32| *n % 2 == 0),
            ]
        };

        let all = TransitionBuilder::new()
            .from("A")
            .to("B")
            .when_all(guards())
            .build()
            .unwrap()
            .guard
            .unwrap();
        let any = TransitionBuilder::new()
            .from("A")
            .to("B")
            .when_any(guards())
            .build()
            .unwrap()
            .guard
            .unwrap();

        assert!(all.check(&4).unwrap());
        assert!(!all.check(&3).unwrap());
        assert!(any.check(&3).unwrap());
        assert!(!any.check(&1).unwrap());
    }
}
