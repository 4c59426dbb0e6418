use crate::{
    cli::{prompt, Cli, Command, ScanArgs},
    config::{ConfigLoader, GlobalConfig},
    core::{
        events,
        pipeline::{self, ScanPipeline},
        AetherError, ScanProfile, Session, Target,
    },
    executors::{toolchain, Interrupter, ProcessRunner},
    intel,
    organizers::WorkspaceAllocator,
    reporters::{self, validate_reports},
    ui::{printer, progress},
    utils::logging,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub async fn run(cli: Cli) -> Result<()> {
    let level = logging::level_from_flags(cli.verbose, cli.debug);
    logging::init(level)?;

    let config = ConfigLoader::load_with_custom_path(cli.config.as_deref())?;

    match cli.command {
        Command::Scan(args) => scan(args, &config).await,
        Command::Check { profile } => check(&config, profile),
        Command::Report { session_dir } => regenerate(&session_dir, &config).map(|_| ()),
    }
}

async fn scan(args: ScanArgs, config: &GlobalConfig) -> Result<()> {
    printer::print_banner();

    let raw = match args.target {
        Some(target) => target,
        None => prompt::ask("Target (host, IP or URL)")?,
    };
    // Nothing touches the filesystem until the target is known good.
    let target = Target::parse(&raw)?;
    tracing::info!("Starting aether for target: {}", target);

    ensure_tools(config, args.profile, args.force, |question| args.yes || prompt::confirm(question))?;

    let allocator = WorkspaceAllocator::new(&config.session);
    let mut session = allocator.allocate(&target, args.profile)?;
    session.save()?;
    printer::print_run_header(&session.target, session.profile, &session.root);

    let interrupter = Interrupter::new();
    let listener = interrupter.listen_for_ctrl_c(&config.interrupt);

    let (tx, rx) = events::channel();
    let renderer = tokio::spawn(progress::render_events(rx));
    let mut pipeline = ScanPipeline::new(Box::new(ProcessRunner), &config.tools, interrupter.clone()).with_events(tx);
    let outcome = pipeline.run(&mut session).await;
    tracing::debug!("Pipeline ended in state {:?}", pipeline.state());
    drop(pipeline);
    if let Err(e) = renderer.await {
        tracing::debug!("Progress renderer stopped abnormally: {}", e);
    }

    match outcome {
        Ok(()) => {}
        Err(AetherError::Cancelled) => {
            listener.abort();
            return cancelled(session);
        }
        Err(e) => {
            listener.abort();
            return Err(e.into());
        }
    }

    let lookup = lookup_intel(config, &session.target, &interrupter).await;
    listener.abort();
    let Some(lookup) = lookup else {
        return cancelled(session);
    };

    if let Some(outcome) = &lookup {
        printer::print_intel(outcome);
    }
    session.intel = lookup;
    session.save()?;

    let report_path = write_report(&session, config)?;
    printer::print_summary(&session, &report_path);
    Ok(())
}

/// Threat intel lookup that yields to an abort. `None` means the run was
/// aborted, including an abort that landed after the last step finished.
async fn lookup_intel(
    config: &GlobalConfig,
    target: &Target,
    interrupter: &Interrupter,
) -> Option<Option<intel::IntelOutcome>> {
    tokio::select! {
        biased;
        _ = interrupter.aborted() => None,
        outcome = intel::lookup_target(&config.threat_intel, target) => Some(outcome),
    }
}

/// Dependency gate: report, offer one batch install, re-check. Missing
/// tools end the run unless `force` is set.
fn ensure_tools(
    config: &GlobalConfig,
    profile: ScanProfile,
    force: bool,
    confirm: impl Fn(&str) -> bool,
) -> Result<()> {
    let required = pipeline::required_tools(&config.tools, profile);
    let mut missing = toolchain::missing_tools(&required);
    if missing.is_empty() {
        return Ok(());
    }

    printer::print_tool_check(&required, &missing);

    match toolchain::detect_package_manager() {
        Some(manager) => {
            let packages: Vec<String> = missing.iter().map(|tool| package_name(tool)).collect();
            let command = manager.install_command(&packages, toolchain::is_running_as_root());
            let question = format!("\nInstall missing tools with `{}`?", shell_words::join(&command));

            if confirm(&question) {
                if let Err(e) = toolchain::install_missing(manager, &packages) {
                    tracing::warn!("Installation did not complete: {:#}", e);
                }
                missing = toolchain::missing_tools(&required);
            }
        }
        None => tracing::warn!("No supported package manager found; install the missing tools manually"),
    }

    if missing.is_empty() {
        return Ok(());
    }
    if force {
        tracing::warn!("Continuing without: {} (--force)", missing.join(", "));
        return Ok(());
    }
    Err(AetherError::Dependency { missing }.into())
}

/// Package to install for a configured command, which may be a full path.
fn package_name(tool: &str) -> String {
    Path::new(tool)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| tool.to_string())
}

fn cancelled(session: Session) -> Result<()> {
    printer::print_cancelled(&session.root);

    if prompt::confirm("Delete the partial session directory?") {
        let root = session.root.clone();
        session.discard()?;
        println!("Removed {}", root.display());
    } else {
        println!(
            "Kept {}. Run `aether report {}` to summarise what was collected.",
            session.root.display(),
            session.root.display()
        );
    }

    Err(AetherError::Cancelled.into())
}

fn check(config: &GlobalConfig, profile: ScanProfile) -> Result<()> {
    let required = pipeline::required_tools(&config.tools, profile);
    let missing = toolchain::missing_tools(&required);
    printer::print_tool_check(&required, &missing);

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AetherError::Dependency { missing }.into())
    }
}

fn write_report(session: &Session, config: &GlobalConfig) -> Result<PathBuf> {
    let report = reporters::synthesize(session, &config.report);
    let path = reporters::write_all(session, &report)?;
    validate_reports(session)?;
    Ok(path)
}

fn regenerate(session_dir: &Path, config: &GlobalConfig) -> Result<PathBuf> {
    let session = Session::load(session_dir)
        .with_context(|| format!("{:?} is not an aether session directory", session_dir))?;
    let path = write_report(&session, config)?;
    printer::print_summary(&session, &path);
    Ok(path)
}
