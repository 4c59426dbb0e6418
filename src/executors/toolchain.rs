use anyhow::{bail, Context, Result};
use std::process::Command;
use which::which;

/// Returns the tools that cannot be resolved on PATH, preserving input order
/// and dropping duplicates.
pub fn missing_tools(required: &[String]) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();

    for tool in required {
        match which(tool) {
            Ok(path) => {
                tracing::debug!("Found {}: {:?}", tool, path);
            }
            Err(_) => {
                if !missing.contains(tool) {
                    missing.push(tool.clone());
                }
            }
        }
    }

    if missing.is_empty() {
        tracing::info!("All required tools found");
    } else {
        tracing::warn!("Missing required tools: {}", missing.join(", "));
    }
    missing
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Pacman,
    Brew,
}

impl PackageManager {
    fn binary(self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Dnf => "dnf",
            PackageManager::Pacman => "pacman",
            PackageManager::Brew => "brew",
        }
    }

    fn install_args(self) -> &'static [&'static str] {
        match self {
            PackageManager::Apt => &["install", "-y"],
            PackageManager::Dnf => &["install", "-y"],
            PackageManager::Pacman => &["-S", "--noconfirm"],
            PackageManager::Brew => &["install"],
        }
    }

    /// Homebrew refuses to run as root; the others need it.
    fn needs_root(self) -> bool {
        !matches!(self, PackageManager::Brew)
    }

    /// Full argv for one batch install of `packages`.
    pub fn install_command(self, packages: &[String], as_root: bool) -> Vec<String> {
        let mut argv = Vec::new();
        if self.needs_root() && !as_root {
            argv.push("sudo".to_string());
        }
        argv.push(self.binary().to_string());
        argv.extend(self.install_args().iter().map(|a| a.to_string()));
        argv.extend(packages.iter().cloned());
        argv
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary())
    }
}

pub fn detect_package_manager() -> Option<PackageManager> {
    [
        PackageManager::Apt,
        PackageManager::Dnf,
        PackageManager::Pacman,
        PackageManager::Brew,
    ]
    .into_iter()
    .find(|pm| which(pm.binary()).is_ok())
}

pub fn is_running_as_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions.
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}

/// Runs the single batch remediation command with the terminal attached so
/// the package manager (and sudo) can prompt.
pub fn install_missing(manager: PackageManager, packages: &[String]) -> Result<()> {
    let argv = manager.install_command(packages, is_running_as_root());
    let Some((program, args)) = argv.split_first() else {
        bail!("Empty install command");
    };

    tracing::info!("Running: {}", shell_words::join(&argv));
    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("Failed to execute {}", program))?;

    if !status.success() {
        bail!("Installation failed with status: {:?}", status.code());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(tools: &[&str]) -> Vec<String> {
        tools.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_missing_tools_reports_only_unresolvable() {
        let required = names(&["sh", "aether-no-such-tool", "aether-no-such-tool"]);
        assert_eq!(missing_tools(&required), names(&["aether-no-such-tool"]));
    }

    #[test]
    fn test_missing_tools_empty_input() {
        assert!(missing_tools(&[]).is_empty());
    }

    #[test]
    fn test_apt_install_command() {
        let argv = PackageManager::Apt.install_command(&names(&["nmap", "ffuf"]), false);
        assert_eq!(argv, names(&["sudo", "apt-get", "install", "-y", "nmap", "ffuf"]));
    }

    #[test]
    fn test_root_skips_sudo() {
        let argv = PackageManager::Pacman.install_command(&names(&["whatweb"]), true);
        assert_eq!(argv, names(&["pacman", "-S", "--noconfirm", "whatweb"]));
    }

    #[test]
    fn test_brew_never_uses_sudo() {
        let argv = PackageManager::Brew.install_command(&names(&["nmap"]), false);
        assert_eq!(argv, names(&["brew", "install", "nmap"]));
    }
}
