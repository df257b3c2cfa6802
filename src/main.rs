use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use troupe_core::config::AppConfig;
use troupe_core::types::RunId;
use troupe_llm::ChatInvoker;
use troupe_team::run_log::{RunLogWriter, RunRecord};
use troupe_team::workflow::run_team_workflow;

#[derive(Parser)]
#[command(name = "troupe", version, about = "Team-workflow orchestrator for autonomous agents")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "troupe.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a team workflow for a goal
    Run {
        /// Team configuration to use
        #[arg(short, long, default_value = "small")]
        team: String,

        /// Step budget override
        #[arg(long)]
        max_steps: Option<usize>,

        /// The goal for the team
        #[arg(trailing_var_arg = true, required = true)]
        goal: Vec<String>,
    },
    /// Show the effective configuration
    Config,
    /// List configured teams
    Teams,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        AppConfig::load(&cli.config)
            .with_context(|| format!("loading config from {}", cli.config.display()))?
    } else {
        warn!(path = %cli.config.display(), "config file not found, using built-in defaults");
        AppConfig::builtin()
    };

    match cli.command {
        Commands::Run {
            team,
            max_steps,
            goal,
        } => {
            if let Some(max_steps) = max_steps {
                config.run.max_steps = max_steps;
            }
            let goal = goal.join(" ");

            let invoker = ChatInvoker::new(config.model.clone(), config.agents.clone());
            let final_state = run_team_workflow(&config, &team, &goal, &invoker).await?;

            let run_id = RunId::new();
            let record = RunRecord::new(config.model.clone(), &goal, &final_state);
            let writer = RunLogWriter::new(&config.run.log_dir);
            let path = writer.write(&run_id, &record).await?;
            info!(run_id = %run_id, record = %path.display(), "run complete");

            println!("{}", serde_json::to_string_pretty(&final_state.final_answers)?);
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Teams => {
            let mut names: Vec<_> = config.teams.keys().collect();
            names.sort();
            for name in names {
                let team = &config.teams[name];
                println!(
                    "{name}: {} ({} -> {})",
                    team.members.join(", "),
                    team.graph.entry,
                    team.graph.finish
                );
            }
        }
    }

    Ok(())
}
