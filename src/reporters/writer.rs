use crate::config::types::ReportConfig;
use crate::core::models::Finding;
use crate::core::profile::StepKind;
use crate::core::state::{Session, StepOutcome, SUMMARY_JSON};
use crate::intel::IntelOutcome;
use crate::parser::{self, paths, ports, tech, Parsed};
use crate::utils::fs::atomic_write;
use crate::utils::time::format_millis;
use anyhow::{Context, Result};
use minijinja::{context, Environment};
use serde::Serialize;
use std::path::PathBuf;

const SUMMARY_TEMPLATE: &str = include_str!("../../report_templates/summary.md.j2");

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub target: String,
    pub host: String,
    pub profile: String,
    pub generated_at: String,
    pub session_dir: String,
    pub raw_logs: String,
    pub tools: Vec<String>,
    pub steps: Vec<StepRow>,
    pub sections: Vec<Section>,
    pub findings: Vec<Finding>,
    pub intel: Option<IntelOutcome>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRow {
    pub index: usize,
    pub title: String,
    pub outcome: String,
    pub duration: String,
    pub command: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub title: String,
    pub items: Vec<String>,
    pub notes: Vec<String>,
}

impl Section {
    fn from_parsed<T>(title: &str, parsed: &Parsed<T>, render: impl Fn(&T) -> String) -> Self {
        Self {
            title: title.to_string(),
            items: parsed.findings.iter().map(render).collect(),
            notes: parsed.diagnostics.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Re-parses every raw log from disk and assembles the report. A missing
/// or broken log only empties its own section.
pub fn synthesize(session: &Session, config: &ReportConfig) -> Report {
    let tech = parser::parse_file(&session.log_path(StepKind::Fingerprint), |s| {
        tech::parse(s, config.excerpt_chars)
    });
    let ports = parser::parse_file(&session.log_path(StepKind::ServiceScan), ports::parse);
    let paths = parser::parse_file(&session.log_path(StepKind::PathDiscovery), |s| {
        paths::parse(s, config.max_paths)
    });

    let mut sections = vec![
        Section::from_parsed("Technology Stack", &tech, |f| match f {
            Finding::TechTag { name } => name.clone(),
            Finding::TechExcerpt { text } => format!("`{}`", text.replace(['\n', '\r'], " ")),
            other => format!("{:?}", other),
        }),
        Section::from_parsed("Open Ports", &ports, |p| p.raw_line.clone()),
        Section::from_parsed("Discovered Paths", &paths, |p| {
            format!("/{} (status {})", p.path.trim_start_matches('/'), p.status_code)
        }),
    ];

    let mut findings: Vec<Finding> = tech.findings;
    findings.extend(ports.findings.into_iter().map(Finding::OpenPort));
    findings.extend(paths.findings.into_iter().map(Finding::DiscoveredPath));

    let mut notes = Vec::new();
    match &session.intel {
        Some(IntelOutcome::Available(rep)) => {
            sections.push(Section {
                title: "Threat Intelligence".to_string(),
                items: vec![
                    format!("IP address: {}", rep.ip),
                    format!("Abuse confidence score: {}%", rep.score),
                    format!("ISP: {}", rep.isp.as_deref().unwrap_or("unknown")),
                    format!("Country: {}", rep.country.as_deref().unwrap_or("unknown")),
                    format!("Total reports: {}", rep.report_count),
                ],
                notes: Vec::new(),
            });
            findings.push(Finding::Reputation(rep.clone()));
        }
        Some(IntelOutcome::Unavailable { reason }) => {
            notes.push(format!("Threat intelligence unavailable: {}", reason));
        }
        None => {}
    }

    for step in session.steps() {
        if let Some(err) = &step.error {
            if !err.stderr_tail.is_empty() {
                notes.push(format!("{} stderr: {}", step.title, err.stderr_tail.replace('\n', " | ")));
            }
        }
    }

    Report {
        target: session.target.url.clone(),
        host: session.target.host.clone(),
        profile: session.profile.to_string(),
        generated_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        session_dir: session.root.display().to_string(),
        raw_logs: session.raw_logs.display().to_string(),
        tools: tools_used(session),
        steps: session.steps().iter().map(step_row).collect(),
        sections,
        findings,
        intel: session.intel.clone(),
        notes,
    }
}

fn step_row(step: &crate::core::state::StepResult) -> StepRow {
    let outcome = match &step.outcome {
        StepOutcome::Failed { exit_code: Some(code) } => format!("failed (exit {})", code),
        StepOutcome::Skipped { reason } => format!("skipped ({})", reason),
        other => other.label().to_string(),
    };
    StepRow {
        index: step.index,
        title: step.title.clone(),
        outcome,
        duration: format_millis(step.duration_ms),
        command: step.command.clone(),
    }
}

/// Programs that were actually launched, in step order.
fn tools_used(session: &Session) -> Vec<String> {
    let mut tools: Vec<String> = Vec::new();
    for step in session.steps() {
        let program = shell_words::split(&step.command)
            .ok()
            .and_then(|argv| argv.into_iter().next());
        if let Some(program) = program {
            let name = program.rsplit('/').next().unwrap_or(&program).to_string();
            if !tools.contains(&name) {
                tools.push(name);
            }
        }
    }
    tools
}

pub fn render_markdown(report: &Report) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("summary.md", SUMMARY_TEMPLATE)?;
    let template = env.get_template("summary.md")?;
    let rendered = template.render(context! { report => report })?;
    Ok(rendered)
}

/// Writes `Summary.md` and `Summary.json` into the session directory and
/// returns the markdown path.
pub fn write_all(session: &Session, report: &Report) -> Result<PathBuf> {
    let markdown = render_markdown(report).context("Failed to render summary template")?;
    let md_path = session.summary_path();
    atomic_write(&md_path, markdown.as_bytes())?;

    let json = serde_json::to_string_pretty(report)?;
    atomic_write(session.root.join(SUMMARY_JSON), json.as_bytes())?;

    tracing::info!("Report written to {:?}", md_path);
    Ok(md_path)
}
