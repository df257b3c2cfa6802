use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use troupe_core::config::ModelConfig;
use troupe_core::error::Result;
use troupe_core::types::RunId;

use crate::graph::FinalState;

/// Persisted record of one completed run.
///
/// Written once per run as its own timestamped artifact; existing
/// artifacts are never rewritten, so a crash mid-run loses at most the
/// record of that run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_datetime: String,
    pub model_config: ModelConfig,
    pub user_prompt: String,
    pub final_response: serde_json::Value,
}

impl RunRecord {
    pub fn new(model_config: ModelConfig, user_prompt: &str, final_state: &FinalState) -> Self {
        Self {
            run_datetime: Utc::now().to_rfc3339(),
            model_config,
            user_prompt: user_prompt.to_string(),
            final_response: final_state.final_answers.clone(),
        }
    }
}

/// Writes run records under a log directory.
pub struct RunLogWriter {
    log_dir: PathBuf,
}

impl RunLogWriter {
    pub fn new(log_dir: impl AsRef<Path>) -> Self {
        Self {
            log_dir: log_dir.as_ref().to_path_buf(),
        }
    }

    /// Write one record to `{log_dir}/{timestamp}_{run_id}.json`.
    pub async fn write(&self, run_id: &RunId, record: &RunRecord) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.log_dir).await?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let short_id = run_id.0.get(..8).unwrap_or(&run_id.0);
        let path = self.log_dir.join(format!("{timestamp}_{short_id}.json"));

        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, json).await?;

        info!(path = %path.display(), "run record written");
        Ok(path)
    }
}
