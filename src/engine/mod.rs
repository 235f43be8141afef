//! Execution engine.
//!
//! The engine owns a [`StateGraph`](crate::core::StateGraph), the population
//! of active [`WorkflowInstance`]s and any nested engines bound to its
//! states. Each call to [`WorkflowEngine::tick`] evaluates every active
//! workflow once:
//!
//! - **exits** are tried in declaration order and the first that matches
//!   schedules the workflow for completion;
//! - otherwise the first matching **transition** moves the workflow;
//! - otherwise every eligible **trigger** fires.
//!
//! Failures raised by guards and actions are handed to the
//! [`ErrorPolicy`](crate::policy::ErrorPolicy) resolved for the workflow's
//! current state.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod instance;
pub mod machine;
pub mod report;
pub mod shared;
pub mod source;
mod subordinate;
mod tick;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use error::{EngineError, Phase};
pub use events::{ExitInfo, TransitionInfo};
pub use instance::{WorkflowInstance, WorkflowStatus};
pub use machine::WorkflowEngine;
pub(crate) use machine::EngineParts;
pub use report::{Completion, Failure, TickReport, TransitionRecord};
pub use shared::SharedEngine;
pub use source::WorkflowDataSource;

/// Payloads a workflow can carry.
///
/// Nested engines receive a clone of the parent's payload, and payloads are
/// moved across threads by [`SharedEngine`] and data sources.
pub trait WorkflowData: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> WorkflowData for T {}
