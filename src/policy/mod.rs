//! Error policies for guard and action failures.
//!
//! When a guard or action fails during a tick, the engine asks the policy in
//! effect for the instance's current state what to do:
//!
//! - [`ErrorPolicy::Throw`] aborts the tick and hands the failure to its caller
//! - [`ErrorPolicy::StopWorkflow`] faults only the failing instance
//! - [`ErrorPolicy::Ignore`] treats the failing candidate as not matching
//! - [`ErrorPolicy::Custom`] decides per failure whether to continue
//!
//! Policies are resolved fresh on every tick from a per-state override table
//! with an engine-wide default, so they can be reconfigured between ticks.
//!
//! # Example
//!
//! ```rust
//! use easyflow::policy::{ErrorPolicy, ErrorPolicyKind, ErrorPolicyResolver, PolicyDecision};
//!
//! let mut resolver: ErrorPolicyResolver<u32> = ErrorPolicyResolver::new(ErrorPolicyKind::Throw.into());
//! resolver.set_override("Flaky", ErrorPolicy::Ignore);
//!
//! let error = anyhow::anyhow!("boom");
//! assert_eq!(resolver.resolve("Flaky").decide(&0, &error), PolicyDecision::Continue);
//! assert_eq!(resolver.resolve("Other").decide(&0, &error), PolicyDecision::Throw);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The canonical, configuration-friendly policies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorPolicyKind {
    /// Re-raise the failure to the caller of the tick
    #[default]
    Throw,

    /// Fault the failing instance; other instances are unaffected
    StopWorkflow,

    /// Swallow the failure and keep evaluating
    Ignore,
}

/// Outcome of consulting a policy about one failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Abort the whole tick
    Throw,

    /// Fault the instance
    Stop,

    /// Treat the failing candidate as non-matching and carry on
    Continue,
}

type ContinuePredicate<D> = dyn Fn(&D, &anyhow::Error) -> bool + Send + Sync;

/// Failure handling for one state, or the engine default.
pub enum ErrorPolicy<D> {
    Throw,
    StopWorkflow,
    Ignore,
    /// Continue when the predicate returns `true`, stop the workflow otherwise.
    Custom(Arc<ContinuePredicate<D>>),
}

impl<D> ErrorPolicy<D> {
    /// Build a custom policy from a `should_continue` predicate.
    pub fn custom<F>(should_continue: F) -> Self
    where
        F: Fn(&D, &anyhow::Error) -> bool + Send + Sync + 'static,
    {
        ErrorPolicy::Custom(Arc::new(should_continue))
    }

    pub fn decide(&self, data: &D, error: &anyhow::Error) -> PolicyDecision {
        match self {
            ErrorPolicy::Throw => PolicyDecision::Throw,
            ErrorPolicy::StopWorkflow => PolicyDecision::Stop,
            ErrorPolicy::Ignore => PolicyDecision::Continue,
            ErrorPolicy::Custom(should_continue) => {
                if should_continue(data, error) {
                    PolicyDecision::Continue
                } else {
                    PolicyDecision::Stop
                }
            }
        }
    }

    /// The canonical kind, or `None` for custom policies.
    pub fn kind(&self) -> Option<ErrorPolicyKind> {
        match self {
            ErrorPolicy::Throw => Some(ErrorPolicyKind::Throw),
            ErrorPolicy::StopWorkflow => Some(ErrorPolicyKind::StopWorkflow),
            ErrorPolicy::Ignore => Some(ErrorPolicyKind::Ignore),
            ErrorPolicy::Custom(_) => None,
        }
    }
}

impl<D> From<ErrorPolicyKind> for ErrorPolicy<D> {
    fn from(kind: ErrorPolicyKind) -> Self {
        match kind {
            ErrorPolicyKind::Throw => ErrorPolicy::Throw,
            ErrorPolicyKind::StopWorkflow => ErrorPolicy::StopWorkflow,
            ErrorPolicyKind::Ignore => ErrorPolicy::Ignore,
        }
    }
}

impl<D> Clone for ErrorPolicy<D> {
    fn clone(&self) -> Self {
        match self {
            ErrorPolicy::Throw => ErrorPolicy::Throw,
            ErrorPolicy::StopWorkflow => ErrorPolicy::StopWorkflow,
            ErrorPolicy::Ignore => ErrorPolicy::Ignore,
            ErrorPolicy::Custom(f) => ErrorPolicy::Custom(Arc::clone(f)),
        }
    }
}

impl<D> fmt::Debug for ErrorPolicy<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Throw => f.write_str("Throw"),
            ErrorPolicy::StopWorkflow => f.write_str("StopWorkflow"),
            ErrorPolicy::Ignore => f.write_str("Ignore"),
            ErrorPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Maps state names to their effective error policy.
pub struct ErrorPolicyResolver<D> {
    default: ErrorPolicy<D>,
    overrides: HashMap<String, ErrorPolicy<D>>,
}

impl<D> ErrorPolicyResolver<D> {
    pub fn new(default: ErrorPolicy<D>) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    /// The override for `state`, else the default.
    pub fn resolve(&self, state: &str) -> &ErrorPolicy<D> {
        self.overrides.get(state).unwrap_or(&self.default)
    }

    pub fn default_policy(&self) -> &ErrorPolicy<D> {
        &self.default
    }

    pub fn set_default(&mut self, policy: ErrorPolicy<D>) {
        self.default = policy;
    }

    /// Replace any existing override for `state`.
    pub fn set_override(&mut self, state: impl Into<String>, policy: ErrorPolicy<D>) {
        self.overrides.insert(state.into(), policy);
    }

    pub fn remove_override(&mut self, state: &str) -> Option<ErrorPolicy<D>> {
        self.overrides.remove(state)
    }

    pub fn has_override(&self, state: &str) -> bool {
        self.overrides.contains_key(state)
    }
}

impl<D> fmt::Debug for ErrorPolicyResolver<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorPolicyResolver")
            .field("default", &self.default)
            .field("overrides", &self.overrides)
            .finish()
    }
}
