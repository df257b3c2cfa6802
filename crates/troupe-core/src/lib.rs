pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{ConfigError, Result, TroupeError};
pub use traits::AgentInvoker;
pub use types::*;
