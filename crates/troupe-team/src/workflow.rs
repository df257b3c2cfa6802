use tracing::{info, warn};

use troupe_core::config::AppConfig;
use troupe_core::error::Result;
use troupe_core::traits::AgentInvoker;

use crate::graph::{build, FinalState, GraphExecutor};
use crate::registry;

/// Run one team workflow end to end: resolve the team's members against
/// the agent registry, compile the graph, and drive it to completion.
///
/// Thin orchestration over the core pieces; on a run failure the partial
/// state is summarized to the log before the error propagates. Callers
/// that need the partial state itself use `GraphExecutor` directly.
pub async fn run_team_workflow(
    config: &AppConfig,
    team_name: &str,
    goal: &str,
    invoker: &dyn AgentInvoker,
) -> Result<FinalState> {
    let team = config.team(team_name)?;
    let members = registry::resolve(&team.members, &config.agents)?;
    let graph = build(&team.graph, &members)?;

    info!(
        team = team_name,
        members = members.len(),
        entry = graph.entry(),
        finish = graph.finish(),
        "starting team workflow"
    );

    let executor = GraphExecutor::new(config.run.max_steps);
    match executor.run(&graph, goal, invoker).await {
        Ok(final_state) => Ok(final_state),
        Err(failure) => {
            warn!(
                invocations = failure.state.invocations(),
                nodes_invoked = ?failure.state.outputs().keys().collect::<Vec<_>>(),
                "workflow did not complete"
            );
            Err(failure.error)
        }
    }
}
