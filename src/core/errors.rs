use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Details captured when a step's process exits badly. Stored on the step
/// result so the report can show why a tool failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecError {
    pub tool: String,
    pub exit_code: Option<i32>,
    pub stderr_tail: String,
    pub duration_ms: u128,
}

/// Run-level failures. Only these abort a run; step failures, parse
/// problems and intel outages are absorbed into the report instead.
#[derive(Error, Debug)]
pub enum AetherError {
    #[error("invalid target '{input}': {reason}")]
    Validation { input: String, reason: String },

    #[error("missing required tools: {}", missing.join(", "))]
    Dependency { missing: Vec<String> },

    #[error("workspace error at {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scan cancelled by operator")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

impl AetherError {
    pub fn validation(input: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Workspace {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for a fatal error. 130 mirrors a shell's SIGINT convention.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cancelled => 130,
            _ => 1,
        }
    }
}
