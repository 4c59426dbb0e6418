pub mod abuseipdb;

use crate::config::types::ThreatIntelConfig;
use crate::core::models::{Reputation, Target};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

pub use abuseipdb::ThreatIntelClient;

/// Reputation lookups never fail a run; an outage is carried as data and
/// noted in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntelOutcome {
    Available(Reputation),
    Unavailable { reason: String },
}

impl IntelOutcome {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable { reason: reason.into() }
    }
}

/// Resolves the target to an address and queries the reputation service.
/// Returns `None` when lookups are switched off.
pub async fn lookup_target(config: &ThreatIntelConfig, target: &Target) -> Option<IntelOutcome> {
    if !config.enabled {
        tracing::debug!("Threat intel disabled");
        return None;
    }

    let Some(api_key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        return Some(IntelOutcome::unavailable("no API key configured"));
    };

    let ip = match resolve(target).await {
        Ok(ip) => ip,
        Err(reason) => return Some(IntelOutcome::unavailable(reason)),
    };

    let client = match ThreatIntelClient::new(config, api_key) {
        Ok(client) => client,
        Err(e) => return Some(IntelOutcome::unavailable(format!("HTTP client setup failed: {}", e))),
    };

    Some(client.lookup(ip).await)
}

async fn resolve(target: &Target) -> Result<IpAddr, String> {
    if let Some(ip) = target.ip() {
        return Ok(ip);
    }

    let mut addrs = tokio::net::lookup_host((target.host.as_str(), 0))
        .await
        .map_err(|e| format!("could not resolve {}: {}", target.host, e))?;

    addrs
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| format!("{} resolved to no addresses", target.host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_skips_lookup() {
        let config = ThreatIntelConfig {
            enabled: false,
            ..ThreatIntelConfig::default()
        };
        let target = Target::parse("10.0.0.1").unwrap();
        assert_eq!(lookup_target(&config, &target).await, None);
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let config = ThreatIntelConfig {
            api_key: Some("  ".to_string()),
            ..ThreatIntelConfig::default()
        };
        let target = Target::parse("10.0.0.1").unwrap();
        assert!(matches!(
            lookup_target(&config, &target).await,
            Some(IntelOutcome::Unavailable { .. })
        ));
    }

    #[test]
    fn test_available_outcome_is_tagged_in_manifest() {
        let outcome = IntelOutcome::Available(Reputation {
            ip: "192.0.2.7".to_string(),
            score: 12,
            isp: Some("Example Transit".to_string()),
            country: None,
            report_count: 3,
        });

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "available");
        assert_eq!(json["score"], 12);

        let back: IntelOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
    }

    #[tokio::test]
    async fn test_literal_ip_needs_no_resolution() {
        let target = Target::parse("http://192.0.2.7:8080").unwrap();
        assert_eq!(resolve(&target).await.unwrap().to_string(), "192.0.2.7");
    }
}
