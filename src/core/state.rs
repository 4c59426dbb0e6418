use super::errors::{AetherError, ExecError};
use super::models::Target;
use super::profile::{ScanProfile, StepKind};
use crate::intel::IntelOutcome;
use crate::utils::fs::atomic_write;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const RAW_LOGS_DIR: &str = "raw_logs";
pub const MANIFEST_FILE: &str = "session.json";
pub const SUMMARY_MD: &str = "Summary.md";
pub const SUMMARY_JSON: &str = "Summary.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    WordlistMissing { path: PathBuf },
    ExcludedByProfile,
    Operator,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WordlistMissing { path } => write!(f, "wordlist not found: {}", path.display()),
            Self::ExcludedByProfile => f.write_str("excluded by profile"),
            Self::Operator => f.write_str("skipped by operator"),
        }
    }
}

/// Recorded result of one step. Cancellation never appears here: a
/// cancelled run stops before anything is recorded for the step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Failed { exit_code: Option<i32> },
    TimedOut,
    Skipped { reason: SkipReason },
}

impl StepOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
            Self::TimedOut => "timed out",
            Self::Skipped { .. } => "skipped",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub index: usize,
    pub step: StepKind,
    pub title: String,
    pub command: String,
    pub outcome: StepOutcome,
    pub duration_ms: u64,
    pub output_path: PathBuf,
    pub error: Option<ExecError>,
}

/// Filesystem-scoped context of one run. Serialized as the session
/// manifest so reports can be rebuilt from disk later.
#[derive(Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: u32,
    pub root: PathBuf,
    pub raw_logs: PathBuf,
    pub target: Target,
    pub profile: ScanProfile,
    pub started_at: DateTime<Utc>,
    steps: Vec<StepResult>,
    pub intel: Option<IntelOutcome>,
}

impl Session {
    pub(crate) fn new(id: u32, root: PathBuf, target: Target, profile: ScanProfile) -> Self {
        Self {
            id,
            raw_logs: root.join(RAW_LOGS_DIR),
            root,
            target,
            profile,
            started_at: Utc::now(),
            steps: Vec::new(),
            intel: None,
        }
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn record(&mut self, result: StepResult) {
        tracing::info!(
            "Step {} ({}) recorded as {}",
            result.index,
            result.title,
            result.outcome.label()
        );
        self.steps.push(result);
    }

    pub fn log_path(&self, step: StepKind) -> PathBuf {
        self.raw_logs.join(step.log_file())
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join(SUMMARY_MD)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(self.manifest_path(), json.as_bytes())
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session manifest: {:?}", path))?;
        let mut session: Session = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session manifest: {:?}", path))?;
        // The directory may have been moved since the run.
        session.root = root.to_path_buf();
        session.raw_logs = root.join(RAW_LOGS_DIR);
        Ok(session)
    }

    /// Deletes the whole session directory. Callers must have an explicit
    /// confirmation from the operator before getting here.
    pub fn discard(self) -> Result<(), AetherError> {
        tracing::warn!("Discarding session directory {:?}", self.root);
        fs::remove_dir_all(&self.root).map_err(|e| AetherError::workspace(&self.root, e))
    }
}
