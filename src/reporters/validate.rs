use crate::core::state::{Session, SUMMARY_JSON, SUMMARY_MD};
use anyhow::{bail, Result};
use std::fs;

pub fn validate_reports(session: &Session) -> Result<()> {
    let required_files = [session.root.join(SUMMARY_MD), session.root.join(SUMMARY_JSON)];

    for file in required_files {
        if !file.exists() {
            bail!("Required report file missing: {:?}", file);
        }

        let metadata = fs::metadata(&file)?;
        if metadata.len() == 0 {
            bail!("Report file is empty: {:?}", file);
        }
    }

    tracing::info!("All reports validated successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Target;
    use crate::core::profile::ScanProfile;
    use tempfile::TempDir;

    fn session(root: &std::path::Path) -> Session {
        Session::new(1, root.to_path_buf(), Target::parse("example.com").unwrap(), ScanProfile::Standard)
    }

    #[test]
    fn test_missing_report_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(validate_reports(&session(tmp.path())).is_err());
    }

    #[test]
    fn test_empty_report_fails() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(SUMMARY_MD), "").unwrap();
        fs::write(tmp.path().join(SUMMARY_JSON), "{}").unwrap();
        let err = validate_reports(&session(tmp.path())).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_present_reports_pass() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(SUMMARY_MD), "# Summary").unwrap();
        fs::write(tmp.path().join(SUMMARY_JSON), "{}").unwrap();
        validate_reports(&session(tmp.path())).unwrap();
    }
}
