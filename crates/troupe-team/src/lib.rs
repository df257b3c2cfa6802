pub mod graph;
pub mod registry;
pub mod run_log;
pub mod workflow;

pub use graph::{
    build, ExecutionState, FinalState, GraphExecutor, RunFailure, WorkflowGraph,
};
pub use registry::{resolve, Member};
pub use run_log::{RunLogWriter, RunRecord};
pub use workflow::run_team_workflow;
