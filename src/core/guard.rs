//! Guards and actions over a workflow's data payload.
//!
//! Guards decide whether an exit, transition or trigger applies to an
//! instance. Actions are the side effects run when one of them commits.
//! Both are fallible: an `Err` is routed through the engine's error policy.

use std::fmt;
use std::sync::Arc;

type Predicate<D> = dyn Fn(&D) -> anyhow::Result<bool> + Send + Sync;
type Effect<D> = dyn Fn(&mut D) -> anyhow::Result<()> + Send + Sync;

/// Predicate that determines if a candidate applies to an instance.
///
/// Guards are shared handles: cloning a guard is cheap, which is what lets a
/// wildcard declaration expand into one declaration per matching state.
///
/// # Example
///
/// ```rust
/// use easyflow::core::Guard;
///
/// struct Order {
///     paid: bool,
/// }
///
/// let is_paid = Guard::new(|order: &Order| order.paid);
///
/// assert!(is_paid.check(&Order { paid: true }).unwrap());
/// assert!(!is_paid.check(&Order { paid: false }).unwrap());
/// ```
pub struct Guard<D> {
    predicate: Arc<Predicate<D>>,
}

impl<D> Guard<D> {
    /// Create a guard from an infallible predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&D) -> bool + Send + Sync + 'static,
    {
        Self::fallible(move |data| Ok(predicate(data)))
    }

    /// Create a guard whose evaluation may fail.
    pub fn fallible<F>(predicate: F) -> Self
    where
        F: Fn(&D) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate the guard against a payload.
    pub fn check(&self, data: &D) -> anyhow::Result<bool> {
        (self.predicate)(data)
    }
}

impl<D: 'static> Guard<D> {
    /// Guard that passes only when every guard passes. Evaluation stops at the
    /// first guard that rejects or fails.
    pub fn all(guards: Vec<Guard<D>>) -> Self {
        Self::fallible(move |data| {
            for guard in &guards {
                if !guard.check(data)? {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }

    /// Guard that passes when at least one guard passes.
    pub fn any(guards: Vec<Guard<D>>) -> Self {
        Self::fallible(move |data| {
            for guard in &guards {
                if guard.check(data)? {
                    return Ok(true);
                }
            }
            Ok(false)
        })
    }
}

impl<D> Clone for Guard<D> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<D> fmt::Debug for Guard<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").finish_non_exhaustive()
    }
}

/// Side-effecting callable run against a workflow's payload.
pub struct Action<D> {
    effect: Arc<Effect<D>>,
}

impl<D> Action<D> {
    /// Create an action that cannot fail.
    pub fn new<F>(effect: F) -> Self
    where
        F: Fn(&mut D) + Send + Sync + 'static,
    {
        Self::fallible(move |data| {
            effect(data);
            Ok(())
        })
    }

    /// Create an action that may fail.
    pub fn fallible<F>(effect: F) -> Self
    where
        F: Fn(&mut D) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Action {
            effect: Arc::new(effect),
        }
    }

    /// Run the action.
    pub fn run(&self, data: &mut D) -> anyhow::Result<()> {
        (self.effect)(data)
    }
}

impl<D: 'static> Action<D> {
    /// Run several actions in order, stopping at the first failure.
    pub fn chain(actions: Vec<Action<D>>) -> Self {
        Self::fallible(move |data| {
            for action in &actions {
                action.run(data)?;
            }
            Ok(())
        })
    }
}

impl<D> Clone for Action<D> {
    fn clone(&self) -> Self {
        Self {
            effect: Arc::clone(&self.effect),
        }
    }
}

impl<D> fmt::Debug for Action<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").finish_non_exhaustive()
    }
}

/// Evaluate an optional guard; an absent guard always passes.
pub(crate) fn passes<D>(guard: Option<&Guard<D>>, data: &D) -> anyhow::Result<bool> {
    guard.map_or(Ok(true), |g| g.check(data))
}
