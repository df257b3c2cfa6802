use thiserror::Error;

/// Team configuration faults, raised before any agent is invoked.
///
/// Every variant is detectable from the declarative team config alone,
/// so a run that fails with one of these is guaranteed to have had zero
/// side effects.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("edge order is empty")]
    EmptyOrder,

    #[error("member '{0}' appears more than once in edge order")]
    DuplicateMember(String),

    #[error("entry point '{0}' is not in edge order")]
    EntryNotFound(String),

    #[error("finish point '{0}' is not in edge order")]
    FinishNotFound(String),

    #[error("unknown member '{0}'")]
    UnknownMember(String),
}

#[derive(Debug, Error)]
pub enum TroupeError {
    // Build-time errors
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("team not found: {0}")]
    TeamNotFound(String),

    // Run-time errors
    #[error("agent invocation failed: {node}: {message}")]
    Invocation { node: String, message: String },

    #[error("workflow stalled after {steps} steps")]
    Stalled { steps: usize },

    /// Internal-consistency failure: the graph and the execution record
    /// disagree. Signals a programming fault, not a user error.
    #[error("projection error: {0}")]
    Projection(String),

    // LLM errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM response parse error: {0}")]
    LlmParse(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // TOML errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TroupeError {
    /// Whether the caller can recover by re-running with a corrected
    /// configuration or a larger step budget.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Stalled { .. })
    }
}

pub type Result<T> = std::result::Result<T, TroupeError>;
