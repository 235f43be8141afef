//! One tick of the engine.
//!
//! A tick runs in four steps:
//!
//! 1. every bound nested engine with work is ticked, and its completions,
//!    failures and transitions are applied to the parents that own them;
//! 2. each remaining active workflow is evaluated against its current state,
//!    exits first, then transitions, then triggers;
//! 3. workflows scheduled to exit run their exit action and are moved out
//!    along with faulted ones, and the transition, completion and failure
//!    events are emitted in that order;
//! 4. payloads fetched from the data source, if any, start new workflows.
//!
//! A failure under the `Throw` policy stops the scan where it happens. What
//! was already decided is still finalized, so committed transitions are
//! reported and completed workflows leave the population, before the error
//! reaches the caller.

use super::error::{EngineError, Phase};
use super::events::{ExitInfo, TransitionInfo};
use super::instance::{WorkflowInstance, WorkflowStatus};
use super::machine::WorkflowEngine;
use super::report::{Completion, Failure, TickReport, TransitionRecord};
use super::source::PendingFetch;
use super::WorkflowData;
use crate::core::passes;
use crate::policy::{ErrorPolicy, PolicyDecision};
use std::iter;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// What the end of the tick does with a workflow.
enum Decision {
    /// Complete through the exit at this position of the state's exits
    Exit(usize),
    Fault(anyhow::Error),
    /// Stay active without evaluation this tick
    Hold,
}

impl<D: WorkflowData> WorkflowEngine<D> {
    /// Advance every active workflow by one step.
    ///
    /// Returns what happened, including the workflows that finished. An
    /// error is returned only when a failure hits the `Throw` policy. The
    /// listeners have then already seen every transition, completion and
    /// failure finalized before the abort; workflows not reached stay
    /// active, and no data-source payloads are started.
    pub fn tick(&mut self) -> Result<TickReport<D>, EngineError> {
        match self.step() {
            (report, None) => Ok(report),
            (_, Some(error)) => Err(error),
        }
    }

    /// Run one tick, keeping the partial report when a failure is thrown.
    #[instrument(skip_all, fields(engine = %self.name, tick = self.tick_count + 1))]
    pub(crate) fn step(&mut self) -> (TickReport<D>, Option<EngineError>) {
        let started = Instant::now();
        self.tick_count += 1;
        let (report, thrown) = self.run_tick();
        self.total_tick_time += started.elapsed();

        match &thrown {
            None => debug!(
                active = self.active.len(),
                transitioned = report.transitioned.len(),
                completed = report.completed.len(),
                failed = report.failed.len(),
                started = report.started.len(),
                "tick finished"
            ),
            Some(error) => debug!(
                active = self.active.len(),
                transitioned = report.transitioned.len(),
                completed = report.completed.len(),
                error = %error,
                "tick aborted"
            ),
        }
        (report, thrown)
    }

    fn run_tick(&mut self) -> (TickReport<D>, Option<EngineError>) {
        let now = self.read_clock();
        let mut report = TickReport::new(self.tick_count);
        let pending = self.begin_fetch();

        let mut decisions: Vec<Option<Decision>> =
            iter::repeat_with(|| None).take(self.active.len()).collect();

        let mut thrown = self.absorb_subordinates(&mut decisions, &mut report).err();

        if thrown.is_none() {
            for (index, decision) in decisions.iter_mut().enumerate() {
                if decision.is_some() || self.active[index].awaiting_subordinate {
                    continue;
                }
                match self.evaluate(index, now, &mut report) {
                    Ok(outcome) => *decision = outcome,
                    Err(error) => {
                        thrown = Some(error);
                        break;
                    }
                }
            }
        }

        if let Err(error) = self.finalize(decisions, &mut report) {
            thrown = thrown.or(Some(error));
        }
        if thrown.is_some() {
            return (report, thrown);
        }

        if let Some(pending) = pending {
            for data in pending.collect(&self.name) {
                let id = self.start_workflow(data);
                report.started.push(id);
            }
        }

        (report, None)
    }

    fn begin_fetch(&self) -> Option<PendingFetch<D>> {
        let source = self.data_source.as_ref()?;
        let timeout = self.fetch_timeout.unwrap_or_else(|| source.fetch_timeout());
        PendingFetch::spawn(Arc::clone(source), timeout, &self.name)
    }

    fn position(&self, id: uuid::Uuid) -> Option<usize> {
        self.active.iter().position(|workflow| workflow.id == id)
    }

    /// Tick the nested engines and route what they report to the parents.
    ///
    /// Every report is applied in full, even when a nested engine or a
    /// parent's policy throws; the first such error is returned afterwards.
    fn absorb_subordinates(
        &mut self,
        decisions: &mut [Option<Decision>],
        report: &mut TickReport<D>,
    ) -> Result<(), EngineError> {
        let mut thrown = None;
        for (child_report, child_error) in self.coordinator.tick_bound_engines() {
            if thrown.is_none() {
                thrown = child_error;
            }

            let nested = child_report
                .transitioned
                .into_iter()
                .chain(child_report.subordinate_transitioned);
            for record in nested {
                let Some(parent_id) = self.coordinator.parent_of(record.workflow_id) else {
                    continue;
                };
                let Some(parent) = self.workflow(parent_id) else {
                    continue;
                };
                self.listeners
                    .subordinate_transitioned(&record.transition, parent);
                report.subordinate_transitioned.push(TransitionRecord {
                    workflow_id: parent_id,
                    transition: record.transition,
                });
            }

            for completion in child_report.completed {
                let Some(parent_id) = self.coordinator.release(completion.workflow.id) else {
                    continue;
                };
                let Some(index) = self.position(parent_id) else {
                    continue;
                };
                let parent = &mut self.active[index];
                parent.data = completion.workflow.into_data();
                parent.awaiting_subordinate = false;
                // Evaluation resumes at the unchanged state on the next tick.
                decisions[index] = Some(Decision::Hold);
            }

            for failure in child_report.failed {
                let Some(parent_id) = self.coordinator.release(failure.workflow.id) else {
                    continue;
                };
                let Some(index) = self.position(parent_id) else {
                    continue;
                };
                if let Err(error) = self.settle_subordinate_failure(index, failure.error, decisions) {
                    thrown = thrown.or(Some(error));
                }
            }
        }
        thrown.map_or(Ok(()), Err)
    }

    fn settle_subordinate_failure(
        &mut self,
        index: usize,
        error: anyhow::Error,
        decisions: &mut [Option<Decision>],
    ) -> Result<(), EngineError> {
        let parent = &mut self.active[index];
        let policy = self.policies.resolve(&parent.state);
        // The nested workflow is gone whatever the policy decides.
        parent.awaiting_subordinate = false;

        match settle(policy, parent, Phase::Subordinate, error, &self.name)? {
            Some(error) => decisions[index] = Some(Decision::Fault(error)),
            None => {
                if let Some(child) = self.coordinator.start(parent) {
                    warn!(
                        engine = %self.name,
                        workflow_id = %parent.id,
                        state = %parent.state,
                        subordinate = %child,
                        "restarted subordinate workflow"
                    );
                }
                decisions[index] = Some(Decision::Hold);
            }
        }
        Ok(())
    }

    /// Run the exit, transition and trigger phases for one workflow.
    fn evaluate(
        &mut self,
        index: usize,
        now: Duration,
        report: &mut TickReport<D>,
    ) -> Result<Option<Decision>, EngineError> {
        let WorkflowEngine {
            name,
            graph,
            policies,
            coordinator,
            active,
            trigger_fired,
            tick_count,
            ..
        } = self;
        let name: &str = name;

        let instance = &mut active[index];
        let state = graph
            .state(&instance.state)
            .ok_or_else(|| EngineError::UnknownState(instance.state.clone()))?;
        let policy = policies.resolve(&instance.state);

        for (position, exit) in state.exits.iter().enumerate() {
            match passes(exit.guard.as_ref(), &instance.data) {
                Ok(true) => return Ok(Some(Decision::Exit(position))),
                Ok(false) => {}
                Err(error) => {
                    if let Some(error) = settle(policy, instance, Phase::Exit, error, name)? {
                        return Ok(Some(Decision::Fault(error)));
                    }
                }
            }
        }

        for transition in &state.transitions {
            let outcome = passes(transition.guard.as_ref(), &instance.data).and_then(|open| {
                match (&transition.action, open) {
                    (Some(action), true) => action.run(&mut instance.data).map(|()| true),
                    _ => Ok(open),
                }
            });

            match outcome {
                Ok(true) => {}
                Ok(false) => continue,
                Err(error) => {
                    if let Some(error) = settle(policy, instance, Phase::Transition, error, name)? {
                        return Ok(Some(Decision::Fault(error)));
                    }
                    continue;
                }
            }

            instance.move_to(&transition.to, *tick_count);
            let info = TransitionInfo {
                from: transition.from.clone(),
                to: transition.to.clone(),
            };
            report.transitioned.push(TransitionRecord {
                workflow_id: instance.id,
                transition: info,
            });
            coordinator.start(instance);
            return Ok(None);
        }

        for trigger in &state.triggers {
            if !trigger.is_eligible(trigger_fired[trigger.id], now) {
                continue;
            }

            let outcome = passes(trigger.guard.as_ref(), &instance.data).and_then(|open| {
                if open {
                    trigger.action.run(&mut instance.data).map(|()| true)
                } else {
                    Ok(false)
                }
            });

            match outcome {
                Ok(true) => trigger_fired[trigger.id] = Some(now),
                Ok(false) => {}
                Err(error) => {
                    if let Some(error) = settle(policy, instance, Phase::Trigger, error, name)? {
                        return Ok(Some(Decision::Fault(error)));
                    }
                }
            }
        }

        Ok(None)
    }

    /// Run exit actions, move finished workflows into the report and emit
    /// the tick's events.
    ///
    /// When an exit action throws, that workflow and every later exiting one
    /// stay active with their exit actions not run. Everything else is still
    /// finalized before the error is returned.
    fn finalize(
        &mut self,
        mut decisions: Vec<Option<Decision>>,
        report: &mut TickReport<D>,
    ) -> Result<(), EngineError> {
        let mut thrown = None;
        for (index, decision) in decisions.iter_mut().enumerate() {
            let position = match decision {
                Some(Decision::Exit(position)) => *position,
                _ => continue,
            };
            if thrown.is_some() {
                *decision = None;
                continue;
            }

            let instance = &mut self.active[index];
            let action = self
                .graph
                .state(&instance.state)
                .and_then(|state| state.exits.get(position))
                .and_then(|exit| exit.action.as_ref());
            let Some(action) = action else {
                continue;
            };

            if let Err(error) = action.run(&mut instance.data) {
                let policy = self.policies.resolve(&instance.state);
                match settle(policy, instance, Phase::Exit, error, &self.name) {
                    Ok(Some(error)) => *decision = Some(Decision::Fault(error)),
                    Ok(None) => {}
                    Err(error) => {
                        *decision = None;
                        thrown = Some(error);
                    }
                }
            }
        }

        let population = mem::take(&mut self.active);
        let mut completed = Vec::new();
        let mut faulted = Vec::new();

        for (mut instance, decision) in population.into_iter().zip(decisions) {
            match decision {
                Some(Decision::Exit(position)) => {
                    instance.status = WorkflowStatus::Completed;
                    completed.push((instance, position));
                }
                Some(Decision::Fault(error)) => {
                    instance.status = WorkflowStatus::Faulted;
                    faulted.push((instance, error));
                }
                Some(Decision::Hold) | None => self.active.push(instance),
            }
        }

        for record in &report.transitioned {
            if let Some(workflow) = self.active.iter().find(|w| w.id == record.workflow_id) {
                self.listeners.transitioned(&record.transition, workflow);
            }
        }

        for (workflow, index) in completed {
            let exit = ExitInfo {
                state: workflow.state.clone(),
                index,
            };
            debug!(engine = %self.name, workflow_id = %workflow.id, state = %workflow.state, "workflow completed");
            self.listeners.completed(&exit, &workflow);
            report.completed.push(Completion { exit, workflow });
        }

        for (workflow, error) in faulted {
            debug!(engine = %self.name, workflow_id = %workflow.id, state = %workflow.state, error = %error, "workflow faulted");
            self.listeners.failed(&error, &workflow);
            report.failed.push(Failure { error, workflow });
        }

        thrown.map_or(Ok(()), Err)
    }
}

/// Apply a policy to a failure.
///
/// `Ok(None)` means carry on, `Ok(Some(error))` means fault the workflow with
/// `error`, and `Err` aborts the tick.
fn settle<D>(
    policy: &ErrorPolicy<D>,
    instance: &WorkflowInstance<D>,
    phase: Phase,
    error: anyhow::Error,
    engine: &str,
) -> Result<Option<anyhow::Error>, EngineError> {
    match policy.decide(&instance.data, &error) {
        PolicyDecision::Throw => Err(EngineError::CallbackFailed {
            workflow_id: instance.id,
            state: instance.state.clone(),
            phase,
            source: error,
        }),
        PolicyDecision::Stop => {
            warn!(
                engine,
                workflow_id = %instance.id,
                state = %instance.state,
                %phase,
                error = %error,
                "stopping workflow after failure"
            );
            Ok(Some(error))
        }
        PolicyDecision::Continue => {
            warn!(
                engine,
                workflow_id = %instance.id,
                state = %instance.state,
                %phase,
                error = %error,
                "ignoring failure"
            );
            Ok(None)
        }
    }
}
