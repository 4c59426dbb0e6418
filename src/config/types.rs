use crate::core::profile::StepKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub session: SessionConfig,
    pub tools: ToolsConfig,
    pub report: ReportConfig,
    pub threat_intel: ThreatIntelConfig,
    pub interrupt: InterruptConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory session folders are created under.
    pub base_dir: PathBuf,
    /// Session folder prefix; `{host}` expands to the sanitized target host.
    pub prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            prefix: "Aether_{host}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub fingerprint: ToolConfig,
    pub service_scan: ToolConfig,
    pub path_discovery: ToolConfig,
    pub wordlist: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            fingerprint: ToolConfig::new("whatweb", 300),
            service_scan: ToolConfig::new("nmap", 900),
            path_discovery: ToolConfig::new("ffuf", 600),
            wordlist: PathBuf::from("/usr/share/wordlists/dirb/common.txt"),
        }
    }
}

impl ToolsConfig {
    pub fn for_step(&self, step: StepKind) -> &ToolConfig {
        match step {
            StepKind::Fingerprint => &self.fingerprint,
            StepKind::ServiceScan => &self.service_scan,
            StepKind::PathDiscovery => &self.path_discovery,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolConfig {
    pub command: String,
    #[serde(default = "default_tool_timeout")]
    pub timeout_s: u64,
    /// Replaces the profile's argument template for this step.
    #[serde(default)]
    pub args: Option<String>,
}

fn default_tool_timeout() -> u64 {
    600
}

impl ToolConfig {
    pub fn new(command: &str, timeout_s: u64) -> Self {
        Self {
            command: command.to_string(),
            timeout_s,
            args: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Discovered paths listed in the report; the rest stay in ffuf.json.
    pub max_paths: usize,
    /// Length of the raw excerpt used when no tag list can be found.
    pub excerpt_chars: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_paths: 25,
            excerpt_chars: 400,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThreatIntelConfig {
    pub enabled: bool,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub endpoint: String,
    pub max_age_days: u32,
    pub timeout_s: u64,
}

impl Default for ThreatIntelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            endpoint: "https://api.abuseipdb.com/api/v2/check".to_string(),
            max_age_days: 90,
            timeout_s: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterruptConfig {
    /// First Ctrl-C skips the running step; a second one inside the window aborts.
    pub skip_step_first: bool,
    pub escalation_window_ms: u64,
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self {
            skip_step_first: false,
            escalation_window_ms: 2000,
        }
    }
}
