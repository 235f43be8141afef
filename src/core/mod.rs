//! Core workflow graph types.
//!
//! This module contains the data model the engine executes:
//! - State definitions with their ordered transitions, exits and triggers
//! - Guard predicates and actions over a workflow's payload
//! - Anchored wildcard patterns for addressing states by name
//! - Per-instance transition history
//!
//! Nothing in here runs a workflow; see [`crate::engine`] for that.

mod graph;
mod guard;
mod history;
mod pattern;
mod state;

pub use graph::StateGraph;
pub use guard::{Action, Guard};
pub use history::{StateHistory, StateTransition};
pub use pattern::{StatePattern, RESERVED_CHARS, WILDCARD};
pub use state::{ExitDef, StateDef, TransitionDef, TriggerDef};

pub(crate) use guard::passes;
