//! Definition-time errors.

use thiserror::Error;

/// Errors raised while declaring or building a workflow graph.
///
/// Every declaration is checked when it is made; only the checks that need
/// the whole definition are deferred to [`GraphBuilder::build`](super::GraphBuilder::build).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("state name must not be empty")]
    EmptyStateName,

    #[error("state name '{name}' contains reserved character '{character}'")]
    IllegalCharacter { name: String, character: char },

    #[error("state '{0}' is already defined")]
    DuplicateState(String),

    #[error("entry state is already '{0}'")]
    EntryStateAlreadyDefined(String),

    #[error("state '{0}' is not defined")]
    UnknownState(String),

    #[error("transition from '{0}' to itself is not allowed")]
    SelfTransition(String),

    #[error("transition target '{0}' must name a single state")]
    WildcardTarget(String),

    #[error("subordinate engines must be bound to a single state, got '{0}'")]
    WildcardSubordinate(String),

    #[error("state '{0}' already has a subordinate engine")]
    DuplicateSubordinate(String),

    #[error("no entry state defined. Call .entry_state(name) before .build()")]
    MissingEntryState,

    #[error("engine name must not be empty")]
    EmptyEngineName,

    #[error("transition source state not specified. Call .from(state)")]
    MissingFromState,

    #[error("transition target state not specified. Call .to(state)")]
    MissingToState,

    #[error("invalid workflow definition: {}", join(.0))]
    Invalid(Vec<BuildError>),
}

fn join(errors: &[BuildError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
