use tracing::{debug, error, info, warn};

use troupe_core::error::TroupeError;
use troupe_core::traits::AgentInvoker;
use troupe_core::types::TurnContext;

use super::builder::{NodeKind, WorkflowGraph};
use super::edge::{reviewer_node, Edge, Target};
use super::state::{project, ExecutionState, FinalState};

/// A run that did not reach the terminal marker.
///
/// Carries the partial `ExecutionState` so callers can distinguish a
/// misconfigured loop from an external service failure and inspect what
/// was accumulated before the run stopped.
#[derive(Debug)]
pub struct RunFailure {
    pub error: TroupeError,
    pub state: ExecutionState,
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for RunFailure {}

/// Single-threaded interpreter for a `WorkflowGraph`.
///
/// Walks the graph from the entry node, invoking each node's agent and
/// evaluating conditional edges against the live state, until the
/// terminal marker is reached or the step budget runs out. One executor
/// invocation exclusively owns its `ExecutionState`; the graph itself is
/// only read.
pub struct GraphExecutor {
    max_steps: usize,
}

impl GraphExecutor {
    /// `max_steps` bounds total iterations, not wall-clock time. It is
    /// the only termination guarantee for a perpetually-unfinished
    /// review cycle.
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }

    pub async fn run(
        &self,
        graph: &WorkflowGraph,
        goal: &str,
        invoker: &dyn AgentInvoker,
    ) -> Result<FinalState, RunFailure> {
        let mut state = ExecutionState::new(graph.entry());
        let mut steps = 0usize;

        loop {
            let node = match state.current() {
                Target::Terminal => {
                    info!(steps, "workflow reached terminal marker");
                    return match project(&state, graph) {
                        Ok(final_state) => Ok(final_state),
                        Err(error) => Err(RunFailure { error, state }),
                    };
                }
                Target::Node(id) => id.clone(),
            };

            if steps >= self.max_steps {
                warn!(
                    steps,
                    node = %node,
                    "workflow stalled: step budget exhausted before terminal"
                );
                return Err(RunFailure {
                    error: TroupeError::Stalled { steps },
                    state,
                });
            }

            let Some(kind) = graph.node(&node) else {
                return Err(RunFailure {
                    error: TroupeError::Projection(format!("node '{node}' is not in the graph")),
                    state,
                });
            };

            let ctx = self.turn_context(&node, kind, goal, &state);
            info!(node = %node, member = %ctx.member, step = steps, "invoking graph node");

            match invoker.invoke(&ctx).await {
                Ok(message) => {
                    debug!(node = %node, finished = message.finished, "node responded");
                    state.push_output(&node, message);
                }
                Err(e) => {
                    error!(node = %node, error = %e, "agent invocation failed, aborting run");
                    state.record(&node, "failed");
                    return Err(RunFailure {
                        error: TroupeError::Invocation {
                            node,
                            message: e.to_string(),
                        },
                        state,
                    });
                }
            }

            let next = match graph.edge(&node) {
                Some(Edge::Unconditional { to }) => to.clone(),
                Some(Edge::Conditional {
                    predicate,
                    on_true,
                    on_false,
                }) => {
                    let member = graph.member_of(&node);
                    if predicate(&state, member) {
                        on_true.clone()
                    } else {
                        on_false.clone()
                    }
                }
                // Only the effective finish node is a sink.
                None if node == graph.finish() => Target::Terminal,
                None => {
                    return Err(RunFailure {
                        error: TroupeError::Projection(format!(
                            "node '{node}' has no outgoing edge"
                        )),
                        state,
                    });
                }
            };

            debug!(node = %node, next = %next, "edge traversed");
            state.set_current(next);
            steps += 1;
        }
    }

    /// Assemble everything the agent behind `node` needs to see: a
    /// reviewer gets the output it inspects, a member gets the latest
    /// feedback its reviewer addressed to it.
    fn turn_context(
        &self,
        node: &str,
        kind: &NodeKind,
        goal: &str,
        state: &ExecutionState,
    ) -> TurnContext {
        match kind {
            NodeKind::Member { .. } => {
                let mut ctx = TurnContext::member_turn(node, goal);
                if let Some(feedback) = state.last_output(&reviewer_node(node)) {
                    ctx = ctx.with_feedback(feedback.clone());
                }
                ctx
            }
            NodeKind::Reviewer { of } => {
                let mut ctx = TurnContext::review_turn(node, of.clone(), goal);
                if let Some(output) = state.last_output(of) {
                    ctx = ctx.with_under_review(output.clone());
                }
                ctx
            }
        }
    }
}
