use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TroupeError};

/// Top-level Troupe configuration.
///
/// Loaded once per process and passed explicitly into the builder and
/// executor; nothing reads ambient global state during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    /// Agent registry: member name → static capability record.
    #[serde(default)]
    pub agents: HashMap<String, AgentSpec>,
    /// Named team configurations.
    #[serde(default)]
    pub teams: HashMap<String, TeamConfig>,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            name: default_model_name(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model_name() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Static capability record for one agent in the registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Whether this agent's output passes through a review step before
    /// the workflow advances.
    #[serde(default)]
    pub needs_review: bool,
    #[serde(default)]
    pub persona: Option<String>,
    /// Model name override for this agent.
    #[serde(default)]
    pub model: Option<String>,
}

/// Declarative configuration for one team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    #[serde(default)]
    pub supervisor: Option<String>,
    pub members: Vec<String>,
    pub graph: GraphConfig,
}

/// The linear workflow declaration the graph builder compiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub entry: String,
    pub finish: String,
    pub edge_order: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Iteration ceiling for one workflow run. Bounds steps, not
    /// wall-clock time.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Directory for persisted run records.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            log_dir: default_log_dir(),
        }
    }
}

fn default_max_steps() -> usize {
    25
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TroupeError::ConfigNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        Ok(config)
    }

    /// Built-in configuration with the default two-member team, used
    /// when no config file is present.
    pub fn builtin() -> Self {
        let mut agents = HashMap::new();
        agents.insert(
            "prompt_engineer".to_string(),
            AgentSpec {
                needs_review: true,
                persona: Some(
                    "You rewrite the team goal into a precise, unambiguous prompt.".to_string(),
                ),
                model: None,
            },
        );
        agents.insert(
            "responder".to_string(),
            AgentSpec {
                needs_review: false,
                persona: Some(
                    "You are an honest, hardworking assistant. Answer the goal directly."
                        .to_string(),
                ),
                model: None,
            },
        );

        let mut teams = HashMap::new();
        teams.insert(
            "small".to_string(),
            TeamConfig {
                supervisor: Some("director".to_string()),
                members: vec!["prompt_engineer".to_string(), "responder".to_string()],
                graph: GraphConfig {
                    entry: "prompt_engineer".to_string(),
                    finish: "responder".to_string(),
                    edge_order: vec!["prompt_engineer".to_string(), "responder".to_string()],
                },
            },
        );

        Self {
            model: ModelConfig::default(),
            agents,
            teams,
            run: RunConfig::default(),
        }
    }

    /// Look up a team config by name.
    pub fn team(&self, name: &str) -> Result<&TeamConfig> {
        self.teams
            .get(name)
            .ok_or_else(|| TroupeError::TeamNotFound(name.to_string()))
    }
}
