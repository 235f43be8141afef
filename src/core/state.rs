//! State definitions and the declarations bound to them.

use super::guard::{Action, Guard};
use std::fmt;
use std::time::Duration;

/// A guarded edge from one state to another.
#[derive(Debug)]
pub struct TransitionDef<D> {
    pub(crate) from: String,
    pub(crate) to: String,
    pub(crate) guard: Option<Guard<D>>,
    pub(crate) action: Option<Action<D>>,
}

impl<D> TransitionDef<D> {
    pub(crate) fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        guard: Option<Guard<D>>,
        action: Option<Action<D>>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            guard,
            action,
        }
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn guard(&self) -> Option<&Guard<D>> {
        self.guard.as_ref()
    }

    pub fn action(&self) -> Option<&Action<D>> {
        self.action.as_ref()
    }
}

impl<D> Clone for TransitionDef<D> {
    fn clone(&self) -> Self {
        Self {
            from: self.from.clone(),
            to: self.to.clone(),
            guard: self.guard.clone(),
            action: self.action.clone(),
        }
    }
}

/// A guarded terminal condition on a state.
#[derive(Debug)]
pub struct ExitDef<D> {
    pub(crate) state: String,
    pub(crate) guard: Option<Guard<D>>,
    pub(crate) action: Option<Action<D>>,
}

impl<D> ExitDef<D> {
    pub(crate) fn new(
        state: impl Into<String>,
        guard: Option<Guard<D>>,
        action: Option<Action<D>>,
    ) -> Self {
        Self {
            state: state.into(),
            guard,
            action,
        }
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn guard(&self) -> Option<&Guard<D>> {
        self.guard.as_ref()
    }

    pub fn action(&self) -> Option<&Action<D>> {
        self.action.as_ref()
    }
}

/// A guarded, optionally rate-limited, repeatable action on a state.
///
/// The last-fired timestamp is not stored here: the graph is immutable once
/// built, so the engine keeps one timestamp per trigger, indexed by [`id`].
///
/// [`id`]: TriggerDef::id
#[derive(Debug)]
pub struct TriggerDef<D> {
    pub(crate) id: usize,
    pub(crate) state: String,
    pub(crate) guard: Option<Guard<D>>,
    pub(crate) action: Action<D>,
    pub(crate) rate_limit: Option<Duration>,
}

impl<D> TriggerDef<D> {
    pub(crate) fn new(
        state: impl Into<String>,
        guard: Option<Guard<D>>,
        action: Action<D>,
        rate_limit: Option<Duration>,
    ) -> Self {
        Self {
            id: 0,
            state: state.into(),
            guard,
            action,
            rate_limit,
        }
    }

    /// Index of this trigger across the whole graph.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn guard(&self) -> Option<&Guard<D>> {
        self.guard.as_ref()
    }

    pub fn action(&self) -> &Action<D> {
        &self.action
    }

    /// Minimum engine-clock interval between two fires.
    pub fn rate_limit(&self) -> Option<Duration> {
        self.rate_limit
    }

    /// Whether the trigger may fire at engine-clock reading `now`.
    ///
    /// A trigger that is not rate limited, or has never fired, is always
    /// eligible. Otherwise strictly more than the rate limit must have
    /// elapsed since the last fire.
    pub fn is_eligible(&self, last_fired: Option<Duration>, now: Duration) -> bool {
        match (self.rate_limit, last_fired) {
            (Some(limit), Some(fired_at)) => now.saturating_sub(fired_at) > limit,
            _ => true,
        }
    }
}

/// A named node in the state graph together with its ordered declarations.
#[derive(Debug)]
pub struct StateDef<D> {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) transitions: Vec<TransitionDef<D>>,
    pub(crate) exits: Vec<ExitDef<D>>,
    pub(crate) triggers: Vec<TriggerDef<D>>,
}

impl<D> StateDef<D> {
    pub(crate) fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            transitions: Vec::new(),
            exits: Vec::new(),
            triggers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Outgoing transitions in declaration order.
    pub fn transitions(&self) -> &[TransitionDef<D>] {
        &self.transitions
    }

    /// Exits in declaration order.
    pub fn exits(&self) -> &[ExitDef<D>] {
        &self.exits
    }

    /// Triggers in declaration order.
    pub fn triggers(&self) -> &[TriggerDef<D>] {
        &self.triggers
    }

    /// No way out: neither a transition nor an exit is declared.
    pub fn is_dead_end(&self) -> bool {
        self.transitions.is_empty() && self.exits.is_empty()
    }
}

impl<D> fmt::Display for StateDef<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(description) if !description.trim().is_empty() => {
                write!(f, "{}: {}", self.name, description)
            }
            _ => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(rate_limit: Option<Duration>) -> TriggerDef<()> {
        TriggerDef::new("Running", None, Action::new(|_: &mut ()| {}), rate_limit)
    }

    #[test]
    fn display_includes_description_when_present() {
        let plain: StateDef<()> = StateDef::new("Idle", None);
        let described: StateDef<()> = StateDef::new("Idle", Some("waiting for work".into()));
        let blank: StateDef<()> = StateDef::new("Idle", Some("  ".into()));

        assert_eq!(plain.to_string(), "Idle");
        assert_eq!(described.to_string(), "Idle: waiting for work");
        assert_eq!(blank.to_string(), "Idle");
    }

    #[test]
    fn unlimited_trigger_is_always_eligible() {
        let trigger = trigger(None);
        assert!(trigger.is_eligible(None, Duration::ZERO));
        assert!(trigger.is_eligible(Some(Duration::from_secs(5)), Duration::from_secs(5)));
    }

    #[test]
    fn rate_limited_trigger_needs_strictly_more_than_limit() {
        let trigger = trigger(Some(Duration::from_secs(10)));
        let fired = Some(Duration::from_secs(3));

        assert!(trigger.is_eligible(None, Duration::ZERO));
        assert!(!trigger.is_eligible(fired, Duration::from_secs(3)));
        assert!(!trigger.is_eligible(fired, Duration::from_secs(13)));
        assert!(trigger.is_eligible(fired, Duration::from_millis(13_001)));
    }

    #[test]
    fn state_without_transitions_or_exits_is_dead_end() {
        let mut state: StateDef<()> = StateDef::new("Stuck", None);
        assert!(state.is_dead_end());

        state.exits.push(ExitDef::new("Stuck", None, None));
        assert!(!state.is_dead_end());
    }
}
