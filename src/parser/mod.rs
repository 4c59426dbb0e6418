//! Parsers that turn raw tool logs into findings.
//!
//! Every parser is total: missing files, empty output and garbage all come
//! back as an empty finding set with diagnostics attached, never as an error.

pub mod paths;
pub mod ports;
pub mod tech;

use crate::utils::fs::read_optional;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    Missing,
    Empty,
    Unreadable { detail: String },
    Malformed { detail: String },
    MarkerAbsent,
    Truncated { total: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("output file was not produced"),
            Self::Empty => f.write_str("output file is empty"),
            Self::Unreadable { detail } => write!(f, "output file unreadable: {}", detail),
            Self::Malformed { detail } => write!(f, "malformed output: {}", detail),
            Self::MarkerAbsent => f.write_str("no successful HTTP response marker, showing raw excerpt"),
            Self::Truncated { total } => write!(f, "showing the first entries of {} results", total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parsed<T> {
    pub findings: Vec<T>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Parsed<T> {
    pub fn empty(diagnostic: Diagnostic) -> Self {
        Self {
            findings: Vec::new(),
            diagnostics: vec![diagnostic],
        }
    }

    pub fn found(findings: Vec<T>) -> Self {
        Self {
            findings,
            diagnostics: Vec::new(),
        }
    }

    pub fn with(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }
}

/// Reads `path` and hands its (lossily decoded) contents to `parse`.
pub fn parse_file<T>(path: &Path, parse: impl FnOnce(&str) -> Parsed<T>) -> Parsed<T> {
    match read_optional(path) {
        Ok(Some(bytes)) => parse(&String::from_utf8_lossy(&bytes)),
        Ok(None) => {
            tracing::debug!("Raw log not present: {:?}", path);
            Parsed::empty(Diagnostic::Missing)
        }
        Err(e) => {
            tracing::warn!("Failed to read raw log {:?}: {}", path, e);
            Parsed::empty(Diagnostic::Unreadable { detail: e.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_file_missing() {
        let tmp = TempDir::new().unwrap();
        let parsed = parse_file(&tmp.path().join("nmap.txt"), ports::parse);
        assert!(parsed.findings.is_empty());
        assert_eq!(parsed.diagnostics, vec![Diagnostic::Missing]);
    }

    #[test]
    fn test_parse_file_invalid_utf8_still_parses() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nmap.txt");
        let mut bytes = b"22/tcp open ssh OpenSSH \xff\xfe\n".to_vec();
        bytes.extend_from_slice(b"80/tcp closed http\n");
        std::fs::write(&path, bytes).unwrap();

        let parsed = parse_file(&path, ports::parse);
        assert_eq!(parsed.findings.len(), 1);
        assert_eq!(parsed.findings[0].port, 22);
    }
}
