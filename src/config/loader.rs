use super::types::GlobalConfig;
use crate::core::errors::AetherError;
use crate::core::profile::StepKind;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "aether.toml";
const API_KEY_ENV: &str = "ABUSEIPDB_API_KEY";

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist; the default locations are optional
    pub fn load_with_custom_path(custom_path: Option<&Path>) -> Result<GlobalConfig> {
        let mut config = match custom_path {
            Some(path) => Self::load_from_file(path)
                .with_context(|| format!("Failed to load config from custom path: {:?}", path))?,
            None => Self::load_from_defaults()?,
        };

        if config.threat_intel.api_key.is_none() {
            config.threat_intel.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
        }

        Ok(config)
    }

    fn load_from_defaults() -> Result<GlobalConfig> {
        for path in Self::default_paths() {
            if path.exists() {
                let config = Self::load_from_file(&path)
                    .with_context(|| format!("Failed to load config from {:?}", path))?;
                tracing::info!("Loaded configuration from: {:?}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using default settings");
        Ok(GlobalConfig::default())
    }

    fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".").join(CONFIG_FILE),
            PathBuf::from("config").join(CONFIG_FILE),
        ];
        if let Some(dirs) = ProjectDirs::from("", "", "aether") {
            paths.push(dirs.config_dir().join(CONFIG_FILE));
        }
        paths.push(PathBuf::from("/etc/aether").join(CONFIG_FILE));
        paths
    }

    fn load_from_file(path: &Path) -> Result<GlobalConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: GlobalConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {:?}", path))?;

        Self::validate_config(&config)?;

        Ok(config)
    }

    fn validate_config(config: &GlobalConfig) -> Result<(), AetherError> {
        let invalid = |msg: String| -> Result<(), AetherError> { Err(AetherError::Config(msg)) };

        for step in StepKind::ALL {
            let tool = config.tools.for_step(step);
            if tool.command.trim().is_empty() {
                return invalid(format!("{} command cannot be empty", step.title()));
            }
            if tool.timeout_s == 0 {
                return invalid(format!("{} timeout_s must be greater than 0", step.title()));
            }
            if let Some(args) = &tool.args {
                if let Err(e) = shell_words::split(args) {
                    return invalid(format!("{} args are not valid: {}", step.title(), e));
                }
            }
        }

        let prefix = &config.session.prefix;
        if prefix.trim().is_empty() || prefix.contains(['/', '\\']) {
            return invalid("session prefix must be a non-empty single path component".to_string());
        }

        if config.report.max_paths == 0 {
            return invalid("report max_paths must be greater than 0".to_string());
        }

        let endpoint = &config.threat_intel.endpoint;
        if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
            return invalid(format!("threat_intel endpoint must be an http(s) URL: {}", endpoint));
        }

        if config.interrupt.skip_step_first && config.interrupt.escalation_window_ms == 0 {
            return invalid("interrupt escalation_window_ms must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = GlobalConfig::default();
        assert_eq!(config.tools.fingerprint.command, "whatweb");
        assert_eq!(config.tools.service_scan.command, "nmap");
        assert_eq!(config.tools.path_discovery.command, "ffuf");
        assert_eq!(config.report.max_paths, 25);
        assert!(!config.interrupt.skip_step_first);
        assert!(ConfigLoader::validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_custom_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
[session]
base_dir = "/tmp/aether"
prefix = "recon"

[tools]
wordlist = "/opt/lists/small.txt"

[tools.service_scan]
command = "/opt/nmap/bin/nmap"
timeout_s = 120
args = "-sT -p 80,443 {host} -oN {output}"

[report]
max_paths = 5
"#;
        fs::write(&temp_file, config_content).unwrap();

        let config = ConfigLoader::load_with_custom_path(Some(temp_file.path())).unwrap();
        assert_eq!(config.session.prefix, "recon");
        assert_eq!(config.tools.service_scan.command, "/opt/nmap/bin/nmap");
        assert_eq!(config.tools.service_scan.timeout_s, 120);
        assert_eq!(
            config.tools.service_scan.args.as_deref(),
            Some("-sT -p 80,443 {host} -oN {output}")
        );
        assert_eq!(config.tools.fingerprint.command, "whatweb");
        assert_eq!(config.tools.wordlist, PathBuf::from("/opt/lists/small.txt"));
        assert_eq!(config.report.max_paths, 5);
        assert_eq!(config.report.excerpt_chars, 400);
    }

    #[test]
    fn test_validation_errors() {
        let temp_file = NamedTempFile::new().unwrap();
        let invalid_config = r#"
[tools.fingerprint]
command = "whatweb"
timeout_s = 0
"#;
        fs::write(&temp_file, invalid_config).unwrap();

        let result = ConfigLoader::load_with_custom_path(Some(temp_file.path()));
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("timeout_s must be greater than 0"));
    }

    #[test]
    fn test_unbalanced_args_rejected() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(
            &temp_file,
            "[tools.path_discovery]\ncommand = \"ffuf\"\nargs = \"-u '{url}/FUZZ\"\n",
        )
        .unwrap();

        assert!(ConfigLoader::load_with_custom_path(Some(temp_file.path())).is_err());
    }

    #[test]
    fn test_missing_custom_path_is_an_error() {
        let result = ConfigLoader::load_with_custom_path(Some(Path::new("/nonexistent/aether.toml")));
        assert!(result.is_err());
    }
}
