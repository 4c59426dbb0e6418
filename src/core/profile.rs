use serde::{Deserialize, Serialize};
use std::fmt;

/// Named preset controlling how hard each step pushes the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScanProfile {
    Stealth,
    Standard,
    Aggressive,
    IntelOnly,
}

impl ScanProfile {
    /// IntelOnly never touches the target with active tools.
    pub fn runs_tools(self) -> bool {
        !matches!(self, Self::IntelOnly)
    }

    /// Default argument template for a step, or `None` when the profile
    /// excludes the step entirely. Placeholders: `{url}`, `{host}`,
    /// `{output}`, `{wordlist}`.
    pub fn default_args(self, step: StepKind) -> Option<&'static str> {
        use ScanProfile::*;
        use StepKind::*;

        let args = match (self, step) {
            (IntelOnly, _) => return None,
            (Stealth, Fingerprint) => "-a 1 --color=never {url}",
            (Standard, Fingerprint) => "-a 3 --color=never {url}",
            (Aggressive, Fingerprint) => "-a 4 --color=never {url}",
            (Stealth, ServiceScan) => "-sV --version-light -T2 -F {host} -oN {output}",
            (Standard, ServiceScan) => "-sV -F {host} -oN {output}",
            (Aggressive, ServiceScan) => "-sV -sC -T4 --top-ports 1000 {host} -oN {output}",
            (Stealth, PathDiscovery) => {
                "-u {url}/FUZZ -w {wordlist} -mc 200,301,302 -t 5 -rate 10 -s -of json -o {output}"
            }
            (Standard, PathDiscovery) => {
                "-u {url}/FUZZ -w {wordlist} -mc 200,301,302 -t 40 -s -of json -o {output}"
            }
            (Aggressive, PathDiscovery) => {
                "-u {url}/FUZZ -w {wordlist} -mc 200,204,301,302,307,401,403 -t 100 -s -of json -o {output}"
            }
        };
        Some(args)
    }
}

impl fmt::Display for ScanProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stealth => "stealth",
            Self::Standard => "standard",
            Self::Aggressive => "aggressive",
            Self::IntelOnly => "intel-only",
        })
    }
}

/// The three pipeline steps, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Fingerprint,
    ServiceScan,
    PathDiscovery,
}

impl StepKind {
    pub const ALL: [StepKind; 3] = [Self::Fingerprint, Self::ServiceScan, Self::PathDiscovery];

    /// 1-based position shown to the operator.
    pub fn index(self) -> usize {
        match self {
            Self::Fingerprint => 1,
            Self::ServiceScan => 2,
            Self::PathDiscovery => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Fingerprint => "Tech Fingerprinting",
            Self::ServiceScan => "Service Discovery",
            Self::PathDiscovery => "Path Discovery",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Fingerprint => "Identifying web server, CMS, and frameworks...",
            Self::ServiceScan => "Scanning common ports and service versions...",
            Self::PathDiscovery => "Searching for hidden directories...",
        }
    }

    /// File name under `raw_logs/`. Post-processing tooling relies on these names.
    pub fn log_file(self) -> &'static str {
        match self {
            Self::Fingerprint => "tech.txt",
            Self::ServiceScan => "nmap.txt",
            Self::PathDiscovery => "ffuf.json",
        }
    }

    /// Fingerprinting reports on stdout; the other tools write their own files.
    pub fn stdout_is_log(self) -> bool {
        matches!(self, Self::Fingerprint)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intel_only_excludes_every_step() {
        for step in StepKind::ALL {
            assert!(ScanProfile::IntelOnly.default_args(step).is_none());
        }
        assert!(!ScanProfile::IntelOnly.runs_tools());
    }

    #[test]
    fn test_active_profiles_cover_every_step() {
        for profile in [ScanProfile::Stealth, ScanProfile::Standard, ScanProfile::Aggressive] {
            for step in StepKind::ALL {
                let args = profile.default_args(step).unwrap();
                assert!(shell_words::split(args).is_ok());
            }
        }
    }

    #[test]
    fn test_step_order_matches_index() {
        let indices: Vec<usize> = StepKind::ALL.iter().map(|s| s.index()).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }
}
