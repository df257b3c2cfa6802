//! Team-workflow graph engine.
//!
//! A declarative team configuration (member list, entry/finish points,
//! linear edge order, per-member review flags) is compiled by the
//! builder into a `WorkflowGraph`: member nodes, synthesized reviewer
//! nodes, and one outgoing edge per node, conditional where a review
//! gate applies.
//!
//! The `GraphExecutor` then walks the graph one node at a time, calling
//! the external `AgentInvoker` for each node, appending outputs into an
//! exclusively-owned `ExecutionState`, and following edges until the
//! terminal marker — or until the step budget runs out, which is
//! reported as a stall rather than silently truncated.

pub mod builder;
pub mod edge;
pub mod executor;
pub mod state;

pub use builder::{build, NodeKind, WorkflowGraph};
pub use edge::{reviewed_member, reviewer_node, Edge, EdgePredicate, Target, REVIEWER_SUFFIX};
pub use executor::{GraphExecutor, RunFailure};
pub use state::{project, EventRecord, ExecutionState, FinalState};
