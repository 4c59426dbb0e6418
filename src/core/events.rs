use super::profile::StepKind;
use super::state::StepResult;
use tokio::sync::mpsc;

/// Progress notifications from the pipeline to whatever is rendering it.
/// The pipeline never prints; the terminal layer consumes these.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    StepStarted { step: StepKind, command: String },
    StepFinished(StepResult),
    Cancelled { step: StepKind },
    Finished,
}

pub type EventSender = mpsc::UnboundedSender<PipelineEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<PipelineEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
