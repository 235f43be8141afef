//! Builder for workflow graphs and the engines that run them.

use crate::builder::error::BuildError;
use crate::builder::transition::TransitionBuilder;
use crate::core::{Action, ExitDef, Guard, StateDef, StateGraph, StatePattern, TransitionDef, TriggerDef};
use crate::engine::{
    Clock, EngineConfig, EngineParts, WorkflowDataSource, WorkflowEngine,
};
use crate::policy::ErrorPolicy;
use crate::storage::WorkflowStorage;
use std::sync::Arc;
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::{debug, warn};

/// Fluent builder for a [`WorkflowEngine`].
///
/// States must be defined before anything refers to them. A wildcard
/// pattern such as `"Review*"` expands immediately into one declaration per
/// state defined so far; states defined later are not included.
pub struct GraphBuilder<D> {
    config: EngineConfig,
    states: Vec<StateDef<D>>,
    entry: Option<usize>,
    default_policy: Option<ErrorPolicy<D>>,
    policy_overrides: Vec<(String, ErrorPolicy<D>)>,
    subordinates: Vec<(String, WorkflowEngine<D>)>,
    clock: Option<Arc<dyn Clock>>,
    data_source: Option<Arc<dyn WorkflowDataSource<D>>>,
    storage: Option<Arc<dyn WorkflowStorage<D>>>,
}

impl<D: 'static> GraphBuilder<D> {
    /// Create a builder for an engine called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: EngineConfig::named(name),
            states: Vec::new(),
            entry: None,
            default_policy: None,
            policy_overrides: Vec::new(),
            subordinates: Vec::new(),
            clock: None,
            data_source: None,
            storage: None,
        }
    }

    /// Replace the engine configuration, name included.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Define a state and make it the one new workflows start in.
    pub fn entry_state(self, name: impl Into<String>) -> Result<Self, BuildError> {
        if let Some(entry) = self.entry {
            return Err(BuildError::EntryStateAlreadyDefined(
                self.states[entry].name.clone(),
            ));
        }

        let mut builder = self.define_state(name.into(), None)?;
        builder.entry = Some(builder.states.len() - 1);
        Ok(builder)
    }

    pub fn state(self, name: impl Into<String>) -> Result<Self, BuildError> {
        self.define_state(name.into(), None)
    }

    pub fn state_with_description(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, BuildError> {
        self.define_state(name.into(), Some(description.into()))
    }

    /// Define several states at once, in order.
    pub fn states<I, S>(self, names: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .try_fold(self, |builder, name| builder.state(name))
    }

    fn define_state(mut self, name: String, description: Option<String>) -> Result<Self, BuildError> {
        validate_name(&name)?;
        if self.position(&name).is_some() {
            return Err(BuildError::DuplicateState(name));
        }

        self.states.push(StateDef::new(name, description));
        Ok(self)
    }

    /// Unconditional transition. `from` may be a wildcard pattern.
    pub fn define_transition(self, from: &str, to: &str) -> Result<Self, BuildError> {
        self.transition(TransitionBuilder::new().from(from).to(to))
    }

    /// Add a transition from a [`TransitionBuilder`].
    ///
    /// A wildcard source never produces a transition from the target to
    /// itself; the target is skipped. An exact source equal to the target is
    /// rejected.
    pub fn transition(mut self, builder: TransitionBuilder<D>) -> Result<Self, BuildError> {
        let decl = builder.build()?;

        if StatePattern::is_wildcard(&decl.target) {
            return Err(BuildError::WildcardTarget(decl.target));
        }
        if self.position(&decl.target).is_none() {
            return Err(BuildError::UnknownState(decl.target));
        }

        let mut sources = Vec::new();
        for source in &decl.sources {
            if !StatePattern::is_wildcard(source) && *source == decl.target {
                return Err(BuildError::SelfTransition(decl.target));
            }
            sources.extend(self.resolve(source)?);
        }

        for index in sources {
            let state = &mut self.states[index];
            if state.name == decl.target {
                continue;
            }
            state.transitions.push(TransitionDef::new(
                state.name.clone(),
                decl.target.clone(),
                decl.guard.clone(),
                decl.action.clone(),
            ));
        }
        Ok(self)
    }

    /// Exit from `state` (or every state matching the pattern).
    pub fn define_exit(
        mut self,
        state: &str,
        guard: Option<Guard<D>>,
        action: Option<Action<D>>,
    ) -> Result<Self, BuildError> {
        for index in self.resolve(state)? {
            let def = &mut self.states[index];
            def.exits
                .push(ExitDef::new(def.name.clone(), guard.clone(), action.clone()));
        }
        Ok(self)
    }

    /// Exit taken when `predicate` holds.
    pub fn exit_when<F>(self, state: &str, predicate: F) -> Result<Self, BuildError>
    where
        F: Fn(&D) -> bool + Send + Sync + 'static,
    {
        self.define_exit(state, Some(Guard::new(predicate)), None)
    }

    /// Trigger on `state` (or every state matching the pattern).
    ///
    /// With a `rate_limit`, the trigger fires again only after strictly more
    /// than that interval has passed on the engine clock. The last-fired time
    /// is kept per trigger, so all workflows in the state share it.
    pub fn define_trigger(
        mut self,
        state: &str,
        guard: Option<Guard<D>>,
        action: Action<D>,
        rate_limit: Option<Duration>,
    ) -> Result<Self, BuildError> {
        for index in self.resolve(state)? {
            let def = &mut self.states[index];
            def.triggers.push(TriggerDef::new(
                def.name.clone(),
                guard.clone(),
                action.clone(),
                rate_limit,
            ));
        }
        Ok(self)
    }

    /// Trigger that fires on every tick a workflow spends in `state`.
    pub fn trigger<F>(self, state: &str, action: F) -> Result<Self, BuildError>
    where
        F: Fn(&mut D) + Send + Sync + 'static,
    {
        self.define_trigger(state, None, Action::new(action), None)
    }

    /// Trigger that fires at most once per `interval`.
    pub fn trigger_every<F>(self, state: &str, interval: Duration, action: F) -> Result<Self, BuildError>
    where
        F: Fn(&mut D) + Send + Sync + 'static,
    {
        self.define_trigger(state, None, Action::new(action), Some(interval))
    }

    /// Policy for states without an override. Takes precedence over the
    /// configured default.
    pub fn default_error_policy(mut self, policy: impl Into<ErrorPolicy<D>>) -> Self {
        self.default_policy = Some(policy.into());
        self
    }

    /// Override the policy for `state` (or every state matching the pattern).
    pub fn error_policy(
        mut self,
        state: &str,
        policy: impl Into<ErrorPolicy<D>>,
    ) -> Result<Self, BuildError> {
        let policy = policy.into();
        for index in self.resolve(state)? {
            let name = self.states[index].name.clone();
            self.policy_overrides.push((name, policy.clone()));
        }
        Ok(self)
    }

    /// Run `engine` whenever a workflow enters `state`.
    ///
    /// The parent workflow waits in `state` until the nested workflow
    /// finishes, then continues with `state`'s own exits and transitions.
    pub fn attach_subordinate(
        mut self,
        state: &str,
        engine: WorkflowEngine<D>,
    ) -> Result<Self, BuildError> {
        if StatePattern::is_wildcard(state) {
            return Err(BuildError::WildcardSubordinate(state.to_string()));
        }
        if self.position(state).is_none() {
            return Err(BuildError::UnknownState(state.to_string()));
        }
        if self.subordinates.iter().any(|(bound, _)| bound == state) {
            return Err(BuildError::DuplicateSubordinate(state.to_string()));
        }

        self.subordinates.push((state.to_string(), engine));
        Ok(self)
    }

    /// Clock used for trigger rate limits. Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn data_source(mut self, source: Arc<dyn WorkflowDataSource<D>>) -> Self {
        self.data_source = Some(source);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn WorkflowStorage<D>>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Build the engine.
    ///
    /// Reports every problem with the definition at once: a single problem is
    /// returned as is, several as [`BuildError::Invalid`].
    pub fn build(self) -> Result<WorkflowEngine<D>, BuildError> {
        let checks = vec![
            match self.entry {
                Some(_) => Validation::success(()),
                None => Validation::fail(BuildError::MissingEntryState),
            },
            if self.config.name.trim().is_empty() {
                Validation::fail(BuildError::EmptyEngineName)
            } else {
                Validation::success(())
            },
        ];

        let entry = match Validation::all_vec(checks).map(|_| ()) {
            Validation::Success(()) => self.entry.unwrap_or_default(),
            Validation::Failure(errors) => return Err(collapse(errors)),
        };

        let graph = StateGraph::new(self.states, entry);
        let dead_ends: Vec<&str> = graph
            .dead_end_states()
            .into_iter()
            .filter(|state| !self.subordinates.iter().any(|(bound, _)| bound == state))
            .collect();
        if !dead_ends.is_empty() {
            warn!(engine = %self.config.name, states = ?dead_ends, "states with no way out");
        }

        let default_policy = self
            .default_policy
            .unwrap_or_else(|| self.config.default_error_policy.into());

        Ok(WorkflowEngine::from_parts(EngineParts {
            config: self.config,
            graph,
            default_policy,
            policy_overrides: self.policy_overrides,
            subordinates: self.subordinates,
            clock: self.clock,
            data_source: self.data_source,
            storage: self.storage,
        }))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|state| state.name == name)
    }

    /// Indices of the states an exact name or wildcard pattern refers to.
    fn resolve(&self, state: &str) -> Result<Vec<usize>, BuildError> {
        if state.trim().is_empty() {
            return Err(BuildError::EmptyStateName);
        }

        if !StatePattern::is_wildcard(state) {
            return self
                .position(state)
                .map(|index| vec![index])
                .ok_or_else(|| BuildError::UnknownState(state.to_string()));
        }

        let pattern = StatePattern::new(state);
        let matching: Vec<usize> = self
            .states
            .iter()
            .enumerate()
            .filter(|(_, def)| pattern.matches(&def.name))
            .map(|(index, _)| index)
            .collect();

        if matching.is_empty() {
            debug!(engine = %self.config.name, pattern = state, "wildcard matches no states");
        }
        Ok(matching)
    }
}

fn validate_name(name: &str) -> Result<(), BuildError> {
    if name.trim().is_empty() {
        return Err(BuildError::EmptyStateName);
    }
    if let Some(character) = StatePattern::reserved_char(name) {
        return Err(BuildError::IllegalCharacter {
            name: name.to_string(),
            character,
        });
    }
    Ok(())
}

fn collapse(errors: NonEmptyVec<BuildError>) -> BuildError {
    let mut errors: Vec<BuildError> = errors.iter().cloned().collect();
    if errors.len() == 1 {
        errors.remove(0)
    } else {
        BuildError::Invalid(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> GraphBuilder<u32> {
        GraphBuilder::new("test")
            .entry_state("Start")
            .unwrap()
            .states(["Review", "ReviewLegal", "Done"])
            .unwrap()
    }

    #[test]
    fn state_names_are_validated() {
        let empty = GraphBuilder::<u32>::new("test").state("  ");
        assert!(matches!(empty, Err(BuildError::EmptyStateName)));

        let reserved = GraphBuilder::<u32>::new("test").state("A:B");
        assert!(matches!(
            reserved,
            Err(BuildError::IllegalCharacter { character: ':', .. })
        ));

        let wildcard = GraphBuilder::<u32>::new("test").state("A*");
        assert!(matches!(
            wildcard,
            Err(BuildError::IllegalCharacter { character: '*', .. })
        ));
    }

    #[test]
    fn duplicate_states_are_rejected() {
        let result = builder().state("Review");
        assert_eq!(result.err(), Some(BuildError::DuplicateState("Review".into())));
    }

    #[test]
    fn only_one_entry_state() {
        let result = builder().entry_state("Other");
        assert_eq!(
            result.err(),
            Some(BuildError::EntryStateAlreadyDefined("Start".into()))
        );
    }

    #[test]
    fn transitions_are_validated() {
        assert_eq!(
            builder().define_transition("Start", "Start").err(),
            Some(BuildError::SelfTransition("Start".into()))
        );
        assert_eq!(
            builder().define_transition("Start", "Nowhere").err(),
            Some(BuildError::UnknownState("Nowhere".into()))
        );
        assert_eq!(
            builder().define_transition("Nowhere", "Done").err(),
            Some(BuildError::UnknownState("Nowhere".into()))
        );
        assert_eq!(
            builder().define_transition("Start", "Rev*").err(),
            Some(BuildError::WildcardTarget("Rev*".into()))
        );
    }

    #[test]
    fn wildcard_source_expands_and_skips_target() {
        let engine = builder()
            .define_transition("Review*", "ReviewLegal")
            .unwrap()
            .build()
            .unwrap();

        let edges: Vec<(&str, &str)> = engine
            .transitions()
            .map(|transition| (transition.from(), transition.to()))
            .collect();
        assert_eq!(edges, vec![("Review", "ReviewLegal")]);
    }

    #[test]
    fn wildcard_expands_only_over_states_defined_so_far() {
        let engine = GraphBuilder::<u32>::new("test")
            .entry_state("A1")
            .unwrap()
            .state("Done")
            .unwrap()
            .define_transition("A*", "Done")
            .unwrap()
            .state("A2")
            .unwrap()
            .build()
            .unwrap();

        let graph = engine.graph();
        assert_eq!(graph.state("A1").unwrap().transitions().len(), 1);
        assert!(graph.state("A2").unwrap().transitions().is_empty());
    }

    #[test]
    fn subordinates_are_validated() {
        let child = || {
            GraphBuilder::<u32>::new("child")
                .entry_state("Inner")
                .unwrap()
                .build()
                .unwrap()
        };

        assert_eq!(
            builder().attach_subordinate("Rev*", child()).err(),
            Some(BuildError::WildcardSubordinate("Rev*".into()))
        );
        assert_eq!(
            builder().attach_subordinate("Nowhere", child()).err(),
            Some(BuildError::UnknownState("Nowhere".into()))
        );
        assert_eq!(
            builder()
                .attach_subordinate("Review", child())
                .unwrap()
                .attach_subordinate("Review", child())
                .err(),
            Some(BuildError::DuplicateSubordinate("Review".into()))
        );
    }

    #[test]
    fn build_requires_entry_state() {
        let result = GraphBuilder::<u32>::new("test").state("A").unwrap().build();
        assert_eq!(result.err(), Some(BuildError::MissingEntryState));
    }

    #[test]
    fn build_reports_all_problems() {
        let result = GraphBuilder::<u32>::new("").build();

        match result.err() {
            Some(BuildError::Invalid(errors)) => {
                assert_eq!(
                    errors,
                    vec![BuildError::MissingEntryState, BuildError::EmptyEngineName]
                );
            }
            other => panic!("expected accumulated errors, got {other:?}"),
        }
    }

    #[test]
    fn error_policy_overrides_expand_wildcards() {
        let engine = builder()
            .error_policy("Review*", ErrorPolicy::Ignore)
            .unwrap()
            .build()
            .unwrap();

        assert!(matches!(engine.error_policy_for("Review"), ErrorPolicy::Ignore));
        assert!(matches!(engine.error_policy_for("ReviewLegal"), ErrorPolicy::Ignore));
        assert!(matches!(engine.error_policy_for("Start"), ErrorPolicy::Throw));
    }

    #[test]
    fn configured_default_policy_applies() {
        let engine = builder()
            .config(EngineConfig {
                name: "configured".into(),
                default_error_policy: crate::policy::ErrorPolicyKind::StopWorkflow,
                fetch_timeout_ms: None,
            })
            .build()
            .unwrap();

        assert_eq!(engine.name(), "configured");
        assert!(matches!(engine.default_error_policy(), ErrorPolicy::StopWorkflow));
    }
}
