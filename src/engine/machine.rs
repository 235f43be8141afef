//! The workflow engine: graph, population and lifecycle API.

use super::clock::{Clock, SystemClock};
use super::config::EngineConfig;
use super::error::EngineError;
use super::events::{EventListeners, ExitInfo, TransitionInfo};
use super::instance::{WorkflowInstance, WorkflowStatus};
use super::shared::SharedEngine;
use super::source::WorkflowDataSource;
use super::subordinate::{SubordinateBinding, SubordinateCoordinator};
use super::WorkflowData;
use crate::core::{StateDef, StateGraph, StatePattern, TransitionDef};
use crate::policy::{ErrorPolicy, ErrorPolicyResolver};
use crate::storage::WorkflowStorage;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Everything the builder hands over to construct an engine.
pub(crate) struct EngineParts<D> {
    pub(crate) config: EngineConfig,
    pub(crate) graph: StateGraph<D>,
    pub(crate) default_policy: ErrorPolicy<D>,
    pub(crate) policy_overrides: Vec<(String, ErrorPolicy<D>)>,
    pub(crate) subordinates: Vec<(String, WorkflowEngine<D>)>,
    pub(crate) clock: Option<Arc<dyn Clock>>,
    pub(crate) data_source: Option<Arc<dyn WorkflowDataSource<D>>>,
    pub(crate) storage: Option<Arc<dyn WorkflowStorage<D>>>,
}

/// Advances a population of workflow instances one tick at a time.
///
/// Build one with [`GraphBuilder`](crate::builder::GraphBuilder), start
/// instances with [`start_workflow`](Self::start_workflow), then call
/// [`tick`](Self::tick) repeatedly.
///
/// # Example
///
/// ```rust
/// use easyflow::builder::{GraphBuilder, TransitionBuilder};
///
/// #[derive(Clone, Default)]
/// struct Job {
///     ready: bool,
/// }
///
/// let mut engine = GraphBuilder::<Job>::new("jobs")
///     .entry_state("Queued")?
///     .state("Done")?
///     .transition(TransitionBuilder::new().from("Queued").to("Done").when(|job: &Job| job.ready))?
///     .exit_when("Done", |_: &Job| true)?
///     .build()?;
///
/// let id = engine.start_workflow(Job::default());
/// engine.tick()?;
/// assert_eq!(engine.workflow(id).unwrap().current_state(), "Queued");
///
/// engine.workflow_mut(id).unwrap().data_mut().ready = true;
/// engine.tick()?;
/// assert_eq!(engine.workflow(id).unwrap().current_state(), "Done");
///
/// let report = engine.tick()?;
/// assert_eq!(report.completed.len(), 1);
/// assert_eq!(engine.active_count(), 0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct WorkflowEngine<D> {
    pub(super) name: String,
    pub(super) graph: StateGraph<D>,
    pub(super) policies: ErrorPolicyResolver<D>,
    pub(super) coordinator: SubordinateCoordinator<D>,
    pub(super) active: Vec<WorkflowInstance<D>>,
    pub(super) listeners: EventListeners<D>,
    pub(super) trigger_fired: Vec<Option<Duration>>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) clock_origin: Option<Duration>,
    pub(super) data_source: Option<Arc<dyn WorkflowDataSource<D>>>,
    pub(super) fetch_timeout: Option<Duration>,
    pub(super) storage: Option<Arc<dyn WorkflowStorage<D>>>,
    pub(super) tick_count: u64,
    pub(super) total_tick_time: Duration,
}

impl<D> WorkflowEngine<D> {
    pub(crate) fn from_parts(parts: EngineParts<D>) -> Self {
        let mut policies = ErrorPolicyResolver::new(parts.default_policy);
        for (state, policy) in parts.policy_overrides {
            policies.set_override(state, policy);
        }

        let bindings = parts
            .subordinates
            .into_iter()
            .map(|(state, engine)| SubordinateBinding { state, engine })
            .collect();

        Self {
            name: parts.config.name.clone(),
            trigger_fired: vec![None; parts.graph.trigger_count()],
            graph: parts.graph,
            policies,
            coordinator: SubordinateCoordinator::new(bindings),
            active: Vec::new(),
            listeners: EventListeners::new(),
            clock: parts
                .clock
                .unwrap_or_else(|| Arc::new(SystemClock::new())),
            clock_origin: None,
            data_source: parts.data_source,
            fetch_timeout: parts.config.fetch_timeout(),
            storage: parts.storage,
            tick_count: 0,
            total_tick_time: Duration::ZERO,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &StateGraph<D> {
        &self.graph
    }

    /// States in definition order.
    pub fn states(&self) -> impl Iterator<Item = &StateDef<D>> {
        self.graph.states()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &TransitionDef<D>> {
        self.graph.transitions()
    }

    pub fn entry_state(&self) -> &StateDef<D> {
        self.graph.entry_state()
    }

    /// Active workflows in the order they were started.
    pub fn active_workflows(&self) -> &[WorkflowInstance<D>] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn workflow(&self, id: Uuid) -> Option<&WorkflowInstance<D>> {
        self.active.iter().find(|workflow| workflow.id == id)
    }

    /// Mutable access to an active workflow, for changing its payload between ticks.
    pub fn workflow_mut(&mut self, id: Uuid) -> Option<&mut WorkflowInstance<D>> {
        self.active.iter_mut().find(|workflow| workflow.id == id)
    }

    pub fn is_awaiting_subordinate(&self, id: Uuid) -> bool {
        self.workflow(id)
            .is_some_and(|workflow| workflow.awaiting_subordinate)
    }

    /// The nested engine bound to `state`, if any.
    pub fn subordinate(&self, state: &str) -> Option<&WorkflowEngine<D>> {
        self.coordinator.engine(state)
    }

    /// States that have a nested engine bound to them.
    pub fn subordinate_states(&self) -> impl Iterator<Item = &str> {
        self.coordinator.bound_states()
    }

    /// The nested workflow currently running for `parent`.
    pub fn subordinate_workflow_of(&self, parent: Uuid) -> Option<Uuid> {
        self.coordinator.child_of(parent)
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn total_tick_time(&self) -> Duration {
        self.total_tick_time
    }

    /// Mean wall time per tick; zero before the first tick.
    pub fn average_tick_time(&self) -> Duration {
        match u32::try_from(self.tick_count) {
            Ok(0) => Duration::ZERO,
            Ok(count) => self.total_tick_time / count,
            Err(_) => Duration::from_secs_f64(
                self.total_tick_time.as_secs_f64() / self.tick_count as f64,
            ),
        }
    }

    pub fn default_error_policy(&self) -> &ErrorPolicy<D> {
        self.policies.default_policy()
    }

    /// The policy that will be applied to failures in `state` on the next tick.
    pub fn error_policy_for(&self, state: &str) -> &ErrorPolicy<D> {
        self.policies.resolve(state)
    }

    pub fn set_default_error_policy(&mut self, policy: impl Into<ErrorPolicy<D>>) {
        self.policies.set_default(policy.into());
    }

    /// Override the policy for a state or a wildcard pattern of states.
    ///
    /// Returns the number of states the override was applied to.
    pub fn set_error_policy_override(
        &mut self,
        state: &str,
        policy: impl Into<ErrorPolicy<D>>,
    ) -> Result<usize, EngineError> {
        let policy = policy.into();

        if !StatePattern::is_wildcard(state) {
            if !self.graph.contains(state) {
                return Err(EngineError::UnknownState(state.to_string()));
            }
            self.policies.set_override(state, policy);
            return Ok(1);
        }

        let pattern = StatePattern::new(state);
        let matching: Vec<String> = self
            .graph
            .states()
            .filter(|def| pattern.matches(def.name()))
            .map(|def| def.name().to_string())
            .collect();

        for name in &matching {
            self.policies.set_override(name.clone(), policy.clone());
        }
        Ok(matching.len())
    }

    pub fn remove_error_policy_override(&mut self, state: &str) -> Option<ErrorPolicy<D>> {
        self.policies.remove_override(state)
    }

    pub fn on_started<F>(&mut self, listener: F)
    where
        F: Fn(&WorkflowInstance<D>) + Send + 'static,
    {
        self.listeners.on_started(Box::new(listener));
    }

    pub fn on_transitioned<F>(&mut self, listener: F)
    where
        F: Fn(&TransitionInfo, &WorkflowInstance<D>) + Send + 'static,
    {
        self.listeners.on_transitioned(Box::new(listener));
    }

    pub fn on_completed<F>(&mut self, listener: F)
    where
        F: Fn(&ExitInfo, &WorkflowInstance<D>) + Send + 'static,
    {
        self.listeners.on_completed(Box::new(listener));
    }

    pub fn on_failed<F>(&mut self, listener: F)
    where
        F: Fn(&anyhow::Error, &WorkflowInstance<D>) + Send + 'static,
    {
        self.listeners.on_failed(Box::new(listener));
    }

    /// Listen for transitions made by nested workflows. The listener receives
    /// the parent workflow, not the nested one.
    pub fn on_subordinate_transitioned<F>(&mut self, listener: F)
    where
        F: Fn(&TransitionInfo, &WorkflowInstance<D>) + Send + 'static,
    {
        self.listeners.on_subordinate_transitioned(Box::new(listener));
    }

    pub fn storage(&self) -> Option<&Arc<dyn WorkflowStorage<D>>> {
        self.storage.as_ref()
    }

    /// Engine-clock reading for the current tick, starting the clock on the first.
    pub(super) fn read_clock(&mut self) -> Duration {
        let now = self.clock.now();
        match self.clock_origin {
            Some(origin) => now.saturating_sub(origin),
            None => {
                self.clock_origin = Some(now);
                Duration::ZERO
            }
        }
    }
}

impl<D: WorkflowData> WorkflowEngine<D> {
    /// Start a new workflow at the entry state.
    pub fn start_workflow(&mut self, data: D) -> Uuid {
        let instance = WorkflowInstance::new(self.graph.entry_state().name(), data);
        self.admit(instance)
    }

    /// Re-admit a previously stored workflow.
    ///
    /// The workflow must still be active, its state must exist in this graph
    /// and its id must not already be running. Resuming into a state with a
    /// nested engine starts a fresh nested workflow.
    pub fn resume_workflow(&mut self, mut instance: WorkflowInstance<D>) -> Result<Uuid, EngineError> {
        if instance.status != WorkflowStatus::Active {
            return Err(EngineError::InactiveWorkflow(instance.id));
        }
        if !self.graph.contains(&instance.state) {
            return Err(EngineError::UnknownState(instance.state));
        }
        if self.workflow(instance.id).is_some() {
            return Err(EngineError::DuplicateWorkflow(instance.id));
        }

        instance.awaiting_subordinate = false;
        self.coordinator.start(&mut instance);
        Ok(self.admit(instance))
    }

    /// Persist an active workflow through the bound storage.
    pub fn store_workflow(&self, id: Uuid) -> Result<(), EngineError> {
        let storage = self.storage.as_ref().ok_or(EngineError::NoStorage)?;
        let workflow = self.workflow(id).ok_or(EngineError::WorkflowNotFound(id))?;
        storage.store(workflow)?;
        Ok(())
    }

    /// Load a workflow from the bound storage and resume it.
    pub fn load_workflow(&mut self, id: Uuid) -> Result<Uuid, EngineError> {
        let storage = self.storage.as_ref().ok_or(EngineError::NoStorage)?;
        let instance = storage.load(id)?;
        self.resume_workflow(instance)
    }

    /// Wrap the engine for ticking from several threads.
    pub fn into_shared(self) -> SharedEngine<D> {
        SharedEngine::new(self)
    }

    fn admit(&mut self, instance: WorkflowInstance<D>) -> Uuid {
        let id = instance.id;
        debug!(engine = %self.name, workflow_id = %id, state = %instance.state, "workflow started");
        self.listeners.started(&instance);
        self.active.push(instance);
        id
    }
}
