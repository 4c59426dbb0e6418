use crate::core::errors::AetherError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::sync::LazyLock;

static HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*$")
        .expect("host pattern is valid")
});

const MAX_HOST_LEN: usize = 253;

/// A validated scan target. Built only through [`Target::parse`], so every
/// value in circulation has a host that is safe to hand to external tools.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub raw: String,
    pub host: String,
    pub port: Option<u16>,
    pub url: String,
}

impl Target {
    pub fn parse(raw: &str) -> Result<Self, AetherError> {
        let input = raw.trim();
        if input.is_empty() {
            return Err(AetherError::validation(raw, "no target provided"));
        }
        if input.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(AetherError::validation(raw, "target contains whitespace or control characters"));
        }

        let (scheme, rest) = match input.split_once("://") {
            Some((scheme, rest)) => {
                let scheme = scheme.to_ascii_lowercase();
                if scheme != "http" && scheme != "https" {
                    return Err(AetherError::validation(raw, format!("unsupported scheme '{}'", scheme)));
                }
                (scheme, rest)
            }
            None => ("http".to_string(), input),
        };

        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, path) = rest.split_at(authority_end);
        if authority.is_empty() {
            return Err(AetherError::validation(raw, "missing host"));
        }

        let (host, port) = match authority.split_once(':') {
            Some((host, port)) => {
                let port: u16 = port
                    .parse()
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| AetherError::validation(raw, format!("invalid port '{}'", port)))?;
                (host, Some(port))
            }
            None => (authority, None),
        };

        let host = host.to_ascii_lowercase();
        if host.len() > MAX_HOST_LEN || !HOST_RE.is_match(&host) {
            return Err(AetherError::validation(
                raw,
                "host may only contain letters, digits, dots and hyphens",
            ));
        }

        let authority = match port {
            Some(port) => format!("{}:{}", host, port),
            None => host.clone(),
        };
        let url = format!("{}://{}{}", scheme, authority, path)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            raw: input.to_string(),
            host,
            port,
            url,
        })
    }

    /// The host as a literal IP address, when it is one.
    pub fn ip(&self) -> Option<IpAddr> {
        self.host.parse().ok()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proto {
    Tcp,
    Udp,
    Sctp,
}

impl Proto {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tcp" => Some(Self::Tcp),
            "udp" => Some(Self::Udp),
            "sctp" => Some(Self::Sctp),
            _ => None,
        }
    }
}

impl fmt::Display for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Sctp => "sctp",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPort {
    pub proto: Proto,
    pub port: u16,
    pub service: Option<String>,
    pub raw_line: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPath {
    pub path: String,
    pub status_code: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reputation {
    pub ip: String,
    pub score: u8,
    pub isp: Option<String>,
    pub country: Option<String>,
    pub report_count: u32,
}

/// A structured fact pulled out of a tool's raw output. Findings are
/// always re-derived from files on disk and never stored on their own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    OpenPort(OpenPort),
    TechTag { name: String },
    TechExcerpt { text: String },
    DiscoveredPath(DiscoveredPath),
    Reputation(Reputation),
}
