use super::errors::AetherError;
use super::events::{EventSender, PipelineEvent};
use super::profile::{ScanProfile, StepKind};
use super::state::{Session, SkipReason, StepOutcome, StepResult};
use crate::config::types::ToolsConfig;
use crate::executors::{Interrupt, Interrupter, RunOutcome, StdoutSink, StepCommand, StepRunner};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    Running(StepKind),
    AllStepsAttempted,
    AbortedByCancellation,
}

enum Plan {
    Run(StepCommand, Duration),
    Skip(SkipReason),
}

/// Executables the profile will invoke, in step order.
pub fn required_tools(tools: &ToolsConfig, profile: ScanProfile) -> Vec<String> {
    if !profile.runs_tools() {
        return Vec::new();
    }
    StepKind::ALL
        .into_iter()
        .filter(|step| profile.default_args(*step).is_some())
        .map(|step| tools.for_step(step).command.clone())
        .collect()
}

/// Sequential fingerprint, service scan and path discovery against one
/// session. Failures and timeouts are recorded and the run moves on; an
/// abort stops it where it is.
pub struct ScanPipeline<'a> {
    runner: Box<dyn StepRunner + 'a>,
    tools: &'a ToolsConfig,
    interrupter: Interrupter,
    events: Option<EventSender>,
    state: PipelineState,
}

impl<'a> ScanPipeline<'a> {
    pub fn new(runner: Box<dyn StepRunner + 'a>, tools: &'a ToolsConfig, interrupter: Interrupter) -> Self {
        Self {
            runner,
            tools,
            interrupter,
            events: None,
            state: PipelineState::NotStarted,
        }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub async fn run(&mut self, session: &mut Session) -> Result<(), AetherError> {
        tracing::info!(
            "Starting {} pipeline against {} in {:?}",
            session.profile,
            session.target,
            session.root
        );

        for step in StepKind::ALL {
            if self.interrupter.is_aborted() {
                return Err(self.cancel(step, session));
            }
            self.state = PipelineState::Running(step);

            let result = match self.plan(step, session)? {
                Plan::Skip(reason) => {
                    tracing::info!("Skipping {}: {}", step, reason);
                    StepResult {
                        index: step.index(),
                        step,
                        title: step.title().to_string(),
                        command: String::new(),
                        outcome: StepOutcome::Skipped { reason },
                        duration_ms: 0,
                        output_path: session.log_path(step),
                        error: None,
                    }
                }
                Plan::Run(command, timeout) => {
                    let rendered = command.display();
                    self.emit(PipelineEvent::StepStarted {
                        step,
                        command: rendered.clone(),
                    });

                    let signals = self.interrupter.begin_step();
                    let execution = self.runner.run(&command, &session.raw_logs, timeout, &signals).await;
                    self.interrupter.end_step();

                    let (outcome, error) = match execution.outcome {
                        RunOutcome::Completed => (StepOutcome::Completed, None),
                        RunOutcome::Failed(err) => {
                            tracing::warn!("{} failed: exit {:?}", step, err.exit_code);
                            (StepOutcome::Failed { exit_code: err.exit_code }, Some(err))
                        }
                        RunOutcome::TimedOut => {
                            tracing::warn!("{} timed out after {}s", step, timeout.as_secs());
                            (StepOutcome::TimedOut, None)
                        }
                        RunOutcome::Interrupted(Interrupt::SkipStep) => (
                            StepOutcome::Skipped {
                                reason: SkipReason::Operator,
                            },
                            None,
                        ),
                        RunOutcome::Interrupted(Interrupt::AbortAll) => {
                            return Err(self.cancel(step, session));
                        }
                    };

                    StepResult {
                        index: step.index(),
                        step,
                        title: step.title().to_string(),
                        command: rendered,
                        outcome,
                        duration_ms: u64::try_from(execution.duration.as_millis()).unwrap_or(u64::MAX),
                        output_path: session.log_path(step),
                        error,
                    }
                }
            };

            session.record(result.clone());
            self.persist(session);
            self.emit(PipelineEvent::StepFinished(result));
        }

        self.state = PipelineState::AllStepsAttempted;
        self.emit(PipelineEvent::Finished);
        Ok(())
    }

    fn plan(&self, step: StepKind, session: &Session) -> Result<Plan, AetherError> {
        let Some(default_args) = session.profile.default_args(step) else {
            return Ok(Plan::Skip(SkipReason::ExcludedByProfile));
        };

        if step == StepKind::PathDiscovery && !self.tools.wordlist.is_file() {
            tracing::warn!("Wordlist not found at {:?}", self.tools.wordlist);
            return Ok(Plan::Skip(SkipReason::WordlistMissing {
                path: self.tools.wordlist.clone(),
            }));
        }

        let tool = self.tools.for_step(step);
        let template = tool.args.as_deref().unwrap_or(default_args);
        let output = session.log_path(step);

        let output_str = output.to_string_lossy();
        let wordlist_str = self.tools.wordlist.to_string_lossy();
        let args = expand_template(
            template,
            &[
                ("{url}", session.target.url.as_str()),
                ("{host}", session.target.host.as_str()),
                ("{output}", &*output_str),
                ("{wordlist}", &*wordlist_str),
            ],
        )?;

        let stdout = if step.stdout_is_log() {
            StdoutSink::File(output.clone())
        } else {
            StdoutSink::Capture
        };

        Ok(Plan::Run(
            StepCommand {
                program: tool.command.clone(),
                args,
                stdout,
            },
            Duration::from_secs(tool.timeout_s),
        ))
    }

    fn cancel(&mut self, step: StepKind, session: &Session) -> AetherError {
        tracing::warn!("Pipeline aborted during {}", step);
        self.state = PipelineState::AbortedByCancellation;
        self.persist(session);
        self.emit(PipelineEvent::Cancelled { step });
        AetherError::Cancelled
    }

    fn persist(&self, session: &Session) {
        if let Err(e) = session.save() {
            tracing::warn!("Failed to write session manifest: {:#}", e);
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

/// Splits the template into argv first, then substitutes per token, so a
/// target or path with spaces can never introduce extra arguments.
fn expand_template(template: &str, vars: &[(&str, &str)]) -> Result<Vec<String>, AetherError> {
    let tokens = shell_words::split(template)
        .map_err(|e| AetherError::Config(format!("bad argument template '{}': {}", template, e)))?;

    Ok(tokens
        .into_iter()
        .map(|token| {
            vars.iter()
                .fold(token, |acc, (key, value)| acc.replace(key, value))
        })
        .collect())
}
