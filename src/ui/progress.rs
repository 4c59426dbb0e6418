use super::printer;
use crate::core::events::{EventReceiver, PipelineEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("  {spinner:.green} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");
    pb.set_style(style);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Renders pipeline progress until the pipeline finishes, aborts, or drops
/// its sender.
pub async fn render_events(mut events: EventReceiver) {
    let mut current: Option<ProgressBar> = None;

    while let Some(event) = events.recv().await {
        match event {
            PipelineEvent::StepStarted { step, command } => {
                printer::print_step_started(&format!("Step {}: {}", step.index(), step.title()), step.description());
                tracing::debug!("{}", command);
                current = Some(spinner(format!("running {}", command)));
            }
            PipelineEvent::StepFinished(result) => {
                let was_running = current.take().map(|pb| pb.finish_and_clear()).is_some();
                // Skipped steps never announce a start.
                if !was_running {
                    printer::print_step_started(
                        &format!("Step {}: {}", result.index, result.title),
                        result.step.description(),
                    );
                }
                printer::print_step_finished(&result);
            }
            PipelineEvent::Cancelled { step } => {
                if let Some(pb) = current.take() {
                    pb.abandon_with_message(format!("{} interrupted", step.title()));
                }
                break;
            }
            PipelineEvent::Finished => break,
        }
    }

    if let Some(pb) = current.take() {
        pb.finish_and_clear();
    }
}
