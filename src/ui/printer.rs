use crate::core::models::Target;
use crate::core::profile::ScanProfile;
use crate::core::state::{Session, StepOutcome, StepResult};
use crate::intel::IntelOutcome;
use crate::utils::time::format_millis;
use colored::Colorize;
use std::path::Path;

pub fn print_banner() {
    println!("{}", "═══════════════════════════════════════".cyan().bold());
    println!("{}", format!("  aether v{}  web recon orchestrator", env!("CARGO_PKG_VERSION")).cyan().bold());
    println!("{}", "═══════════════════════════════════════".cyan().bold());
}

pub fn print_run_header(target: &Target, profile: ScanProfile, session_dir: &Path) {
    println!("\n{}: {}", "Target".cyan().bold(), target);
    println!("{}: {}", "Profile".cyan().bold(), profile);
    println!("{}: {}", "Session".cyan().bold(), session_dir.display());
}

pub fn print_tool_check(required: &[String], missing: &[String]) {
    println!("\n{}", "Tool Availability Check:".cyan().bold());
    for tool in required {
        if missing.contains(tool) {
            println!("  {} {}", "✗".red(), tool.red().bold());
        } else {
            println!("  {} {}", "✓".green(), tool.green().bold());
        }
    }
}

pub fn print_step_started(step: &str, description: &str) {
    println!("\n{} {}", "[*]".blue().bold(), step.bold());
    println!("    {}", description.dimmed());
}

pub fn print_step_finished(result: &StepResult) {
    let duration = format_millis(result.duration_ms);
    match &result.outcome {
        StepOutcome::Completed => println!(
            "  {} {} completed in {}",
            "✓".green(),
            result.title,
            duration
        ),
        StepOutcome::Failed { exit_code } => {
            let code = exit_code.map_or_else(|| "none".to_string(), |c| c.to_string());
            println!("  {} {} failed (exit {}) after {}", "✗".red(), result.title, code, duration);
            if let Some(err) = &result.error {
                if let Some(line) = err.stderr_tail.lines().last() {
                    println!("    {}", line.dimmed());
                }
            }
        }
        StepOutcome::TimedOut => println!("  {} {} timed out after {}", "⏱".yellow(), result.title, duration),
        StepOutcome::Skipped { reason } => {
            println!("  {} {} skipped: {}", "-".dimmed(), result.title, reason)
        }
    }
}

pub fn print_intel(outcome: &IntelOutcome) {
    match outcome {
        IntelOutcome::Available(rep) => {
            let score = rep.score.to_string();
            let score = match rep.score {
                0..=24 => score.green(),
                25..=74 => score.yellow(),
                _ => score.red(),
            };
            println!(
                "\n{} {} abuse score {}% ({} reports)",
                "Threat intel:".cyan().bold(),
                rep.ip,
                score.bold(),
                rep.report_count
            );
        }
        IntelOutcome::Unavailable { reason } => {
            println!("\n{} unavailable ({})", "Threat intel:".cyan().bold(), reason.dimmed());
        }
    }
}

pub fn print_summary(session: &Session, report_path: &Path) {
    println!("\n{}", "═══════════════════════════════════════".green().bold());
    println!("{}", "Scan Complete".green().bold());
    println!("{}", "═══════════════════════════════════════".green().bold());
    println!("{}", super::table::step_summary(session.steps()));
    println!("\n{}: {}", "Report".cyan().bold(), report_path.display());
    println!("{}: {}", "Raw logs".cyan().bold(), session.raw_logs.display());
}

pub fn print_cancelled(session_dir: &Path) {
    println!("\n{}", "Scan aborted by operator.".yellow().bold());
    println!("Partial results are in {}", session_dir.display());
}
