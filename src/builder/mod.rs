//! Builder API for declaring workflow graphs.
//!
//! Declarations are validated as they are made, so a mistake surfaces at the
//! call that introduced it rather than at tick time. States can be addressed
//! by exact name or by an anchored wildcard pattern.
//!
//! # Example
//!
//! ```rust
//! use easyflow::builder::{GraphBuilder, TransitionBuilder};
//! use easyflow::policy::ErrorPolicy;
//!
//! #[derive(Clone, Default)]
//! struct Document {
//!     approvals: u32,
//!     rejected: bool,
//! }
//!
//! let engine = GraphBuilder::<Document>::new("documents")
//!     .entry_state("Draft")?
//!     .states(["ReviewTechnical", "ReviewLegal", "Published", "Archived"])?
//!     .define_transition("Draft", "ReviewTechnical")?
//!     .transition(
//!         TransitionBuilder::new()
//!             .from("ReviewTechnical")
//!             .to("ReviewLegal")
//!             .when(|doc: &Document| doc.approvals >= 1),
//!     )?
//!     .transition(
//!         TransitionBuilder::new()
//!             .from("ReviewLegal")
//!             .to("Published")
//!             .when(|doc: &Document| doc.approvals >= 2),
//!     )?
//!     // Every review state can be rejected.
//!     .transition(
//!         TransitionBuilder::new()
//!             .from("Review*")
//!             .to("Archived")
//!             .when(|doc: &Document| doc.rejected),
//!     )?
//!     .exit_when("Published", |_: &Document| true)?
//!     .exit_when("Archived", |_: &Document| true)?
//!     .error_policy("Review*", ErrorPolicy::StopWorkflow)?
//!     .build()?;
//!
//! assert_eq!(engine.entry_state().name(), "Draft");
//! assert_eq!(engine.transitions().count(), 5);
//! # Ok::<(), easyflow::builder::BuildError>(())
//! ```

pub mod error;
pub mod graph;
pub mod transition;

pub use error::BuildError;
pub use graph::GraphBuilder;
pub use transition::TransitionBuilder;
