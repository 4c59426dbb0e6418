use super::{Diagnostic, Parsed};
use crate::core::models::DiscoveredPath;
use serde_json::Value;

/// Reads the fuzzer's JSON report. Entries keep source order and are cut
/// to the first `limit`; entries missing `input.FUZZ` or `status` are dropped.
pub fn parse(output: &str, limit: usize) -> Parsed<DiscoveredPath> {
    if output.trim().is_empty() {
        return Parsed::empty(Diagnostic::Empty);
    }

    let doc: Value = match serde_json::from_str(output) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("Path discovery output is not valid JSON: {}", e);
            return Parsed::empty(Diagnostic::Malformed { detail: e.to_string() });
        }
    };

    let Some(results) = doc.get("results").and_then(Value::as_array) else {
        return Parsed::empty(Diagnostic::Malformed {
            detail: "missing top-level results array".to_string(),
        });
    };

    let valid: Vec<DiscoveredPath> = results.iter().filter_map(parse_entry).collect();
    let dropped = results.len() - valid.len();
    let total = valid.len();

    let mut parsed = Parsed::found(valid.into_iter().take(limit).collect());
    if dropped > 0 {
        parsed = parsed.with(Diagnostic::Malformed {
            detail: format!("{} result(s) lacked input.FUZZ or status", dropped),
        });
    }
    if total > limit {
        parsed = parsed.with(Diagnostic::Truncated { total });
    }
    parsed
}

fn parse_entry(entry: &Value) -> Option<DiscoveredPath> {
    let path = entry.pointer("/input/FUZZ")?.as_str()?;
    let status = entry.get("status")?.as_u64()?;
    Some(DiscoveredPath {
        path: path.to_string(),
        status_code: u16::try_from(status).ok()?,
    })
}
