use super::IntelOutcome;
use crate::config::types::ThreatIntelConfig;
use crate::core::models::Reputation;
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct CheckResponse {
    data: Option<CheckData>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckData {
    abuse_confidence_score: u8,
    isp: Option<String>,
    country_code: Option<String>,
    #[serde(default)]
    total_reports: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    detail: String,
}

pub struct ThreatIntelClient {
    client: Client,
    endpoint: String,
    api_key: String,
    max_age_days: u32,
}

impl ThreatIntelClient {
    pub fn new(config: &ThreatIntelConfig, api_key: &str) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_s))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
            max_age_days: config.max_age_days,
        })
    }

    /// One GET against the check endpoint. Every failure mode comes back as
    /// `Unavailable` with a reason.
    pub async fn lookup(&self, ip: IpAddr) -> IntelOutcome {
        tracing::debug!("Querying reputation for {}", ip);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ipAddress", ip.to_string()),
                ("maxAgeInDays", self.max_age_days.to_string()),
            ])
            .header("Key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Reputation lookup failed: {}", e);
                return IntelOutcome::unavailable(format!("request failed: {}", e));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return IntelOutcome::unavailable(format!("failed to read response: {}", e)),
        };

        if !status.is_success() {
            let detail = parse_response(ip, &body)
                .err()
                .unwrap_or_else(|| "no error detail".to_string());
            tracing::warn!("Reputation service returned {}: {}", status, detail);
            return IntelOutcome::unavailable(format!("HTTP {}: {}", status.as_u16(), detail));
        }

        match parse_response(ip, &body) {
            Ok(reputation) => IntelOutcome::Available(reputation),
            Err(reason) => IntelOutcome::unavailable(reason),
        }
    }
}

/// Extracts the reputation record, or the service's error detail.
pub fn parse_response(ip: IpAddr, body: &str) -> Result<Reputation, String> {
    let parsed: CheckResponse =
        serde_json::from_str(body).map_err(|e| format!("malformed response: {}", e))?;

    if !parsed.errors.is_empty() {
        let details: Vec<&str> = parsed.errors.iter().map(|e| e.detail.as_str()).collect();
        return Err(details.join("; "));
    }

    let data = parsed.data.ok_or_else(|| "response has no data object".to_string())?;
    Ok(Reputation {
        ip: ip.to_string(),
        score: data.abuse_confidence_score,
        isp: data.isp,
        country: data.country_code,
        report_count: data.total_reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ip() -> IpAddr {
        "198.51.100.4".parse().unwrap()
    }

    #[test]
    fn test_parse_success_body() {
        let body = r#"{"data":{"ipAddress":"198.51.100.4","isPublic":true,"abuseConfidenceScore":87,
            "countryCode":"NL","isp":"Example Hosting BV","totalReports":142}}"#;
        assert_eq!(
            parse_response(ip(), body).unwrap(),
            Reputation {
                ip: "198.51.100.4".to_string(),
                score: 87,
                isp: Some("Example Hosting BV".to_string()),
                country: Some("NL".to_string()),
                report_count: 142,
            }
        );
    }

    #[test]
    fn test_parse_null_fields() {
        let body = r#"{"data":{"abuseConfidenceScore":0,"countryCode":null,"isp":null,"totalReports":0}}"#;
        let rep = parse_response(ip(), body).unwrap();
        assert_eq!(rep.country, None);
        assert_eq!(rep.score, 0);
    }

    #[test]
    fn test_parse_error_payload() {
        let body = r#"{"errors":[{"detail":"Authentication failed. Your API key is either missing, incorrect, or revoked.","status":401}]}"#;
        let err = parse_response(ip(), body).unwrap_err();
        assert!(err.starts_with("Authentication failed"));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_response(ip(), "<html>bad gateway</html>").is_err());
        assert!(parse_response(ip(), "{}").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let config = ThreatIntelConfig {
            endpoint: "http://127.0.0.1:1/api/v2/check".to_string(),
            timeout_s: 2,
            ..ThreatIntelConfig::default()
        };
        let client = ThreatIntelClient::new(&config, "key").unwrap();
        assert!(matches!(client.lookup(ip()).await, IntelOutcome::Unavailable { .. }));
    }
}
