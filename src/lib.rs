//! EasyFlow: a tick-driven workflow engine
//!
//! A workflow is a payload moving through a graph of named states. The
//! graph is declared once with a [`GraphBuilder`](builder::GraphBuilder);
//! the resulting [`WorkflowEngine`](engine::WorkflowEngine) then advances
//! every active workflow one step each time it is ticked.
//!
//! # Core Concepts
//!
//! - **States** carry ordered exits, transitions and triggers
//! - **Guards** decide whether an exit, transition or trigger applies
//! - **Actions** mutate the payload when one of them commits
//! - **Error policies** decide what a failing guard or action does to the tick
//! - **Subordinate engines** run a nested workflow while the parent waits
//!
//! # Example
//!
//! ```rust
//! use easyflow::builder::{GraphBuilder, TransitionBuilder};
//!
//! #[derive(Clone, Default)]
//! struct Counter {
//!     go: bool,
//!     count: u32,
//! }
//!
//! let mut engine = GraphBuilder::<Counter>::new("counter")
//!     .entry_state("Idle")?
//!     .state("Running")?
//!     .transition(TransitionBuilder::new().from("Idle").to("Running").when(|c: &Counter| c.go))?
//!     .exit_when("Running", |c: &Counter| c.count >= 3)?
//!     .trigger("Running", |c: &mut Counter| c.count += 1)?
//!     .build()?;
//!
//! let id = engine.start_workflow(Counter { go: true, count: 0 });
//! engine.tick()?; // Idle -> Running
//! for _ in 0..3 {
//!     engine.tick()?;
//! }
//! assert_eq!(engine.workflow(id).map(|w| w.data().count), Some(3));
//!
//! let report = engine.tick()?;
//! assert_eq!(report.completed[0].workflow.to_string(), "Running [Complete]");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod policy;
pub mod storage;

// Re-export commonly used types
pub use builder::{BuildError, GraphBuilder, TransitionBuilder};
pub use core::{Action, Guard, StateGraph, StatePattern};
pub use engine::{
    EngineConfig, EngineError, SharedEngine, TickReport, WorkflowData, WorkflowEngine,
    WorkflowInstance, WorkflowStatus,
};
pub use policy::{ErrorPolicy, ErrorPolicyKind};
pub use storage::{MemoryStorage, WorkflowSnapshot, WorkflowStorage};
