use crate::core::profile::ScanProfile;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "aether", version, about = "Web reconnaissance orchestrator: fingerprint, service scan and path discovery in one run")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./aether.toml, then the user config dir)
    #[arg(short = 'c', long = "config", global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose human output
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Debug logs (implies verbose)
    #[arg(short = 'd', long = "debug", global = true, action = ArgAction::SetTrue)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the recon pipeline against a target
    Scan(ScanArgs),
    /// Report which required tools are missing
    Check {
        /// Profile whose tools should be checked
        #[arg(short = 'p', long = "profile", value_enum, default_value_t = ScanProfile::Standard)]
        profile: ScanProfile,
    },
    /// Rebuild Summary.md / Summary.json from a session directory
    Report {
        #[arg(value_name = "SESSION_DIR")]
        session_dir: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Target host, IP or URL (prompted for when omitted)
    #[arg(short = 't', long = "target")]
    pub target: Option<String>,

    #[arg(short = 'p', long = "profile", value_enum, default_value_t = ScanProfile::Standard)]
    pub profile: ScanProfile,

    /// Continue even when required tools are missing
    #[arg(long = "force", action = ArgAction::SetTrue)]
    pub force: bool,

    /// Answer yes to the tool installation prompt
    #[arg(short = 'y', long = "yes", action = ArgAction::SetTrue)]
    pub yes: bool,
}
