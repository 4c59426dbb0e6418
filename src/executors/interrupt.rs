use crate::config::types::InterruptConfig;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Operator intent behind an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    SkipStep,
    AbortAll,
}

/// Run-wide interrupt state. Aborting cancels every step token; skipping
/// cancels only the token of the step currently running.
#[derive(Clone, Default)]
pub struct Interrupter {
    abort: CancellationToken,
    current: Arc<Mutex<Option<CancellationToken>>>,
}

/// Cancellation view handed to a single step execution.
#[derive(Clone)]
pub struct StepSignals {
    step: CancellationToken,
    abort: CancellationToken,
}

impl StepSignals {
    pub async fn cancelled(&self) {
        self.step.cancelled().await
    }

    /// Which interrupt fired. Only meaningful once `cancelled()` resolved.
    pub fn interrupt(&self) -> Interrupt {
        if self.abort.is_cancelled() {
            Interrupt::AbortAll
        } else {
            Interrupt::SkipStep
        }
    }
}

impl Interrupter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_step(&self) -> StepSignals {
        let step = self.abort.child_token();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(step.clone());
        StepSignals {
            step,
            abort: self.abort.clone(),
        }
    }

    pub fn end_step(&self) {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Cancels the running step only. Returns false when nothing is running.
    pub fn skip_current(&self) -> bool {
        match self.current.lock().unwrap_or_else(PoisonError::into_inner).take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn abort(&self) {
        self.abort.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_cancelled()
    }

    /// Resolves once the run has been aborted.
    pub async fn aborted(&self) {
        self.abort.cancelled().await
    }

    /// Applies one operator interrupt. With `skip_first` a press skips the
    /// running step unless it lands within `window` of the previous skip;
    /// a press with nothing running, or without `skip_first`, aborts.
    pub fn on_interrupt(&self, skip_first: bool, last_skip: Option<Instant>, window: Duration) -> Interrupt {
        let escalate = last_skip.is_some_and(|t| t.elapsed() < window);
        if skip_first && !escalate && self.skip_current() {
            return Interrupt::SkipStep;
        }
        self.abort();
        Interrupt::AbortAll
    }

    /// Routes Ctrl-C to this interrupter until the run is aborted.
    pub fn listen_for_ctrl_c(&self, policy: &InterruptConfig) -> JoinHandle<()> {
        let interrupter = self.clone();
        let skip_first = policy.skip_step_first;
        let window = Duration::from_millis(policy.escalation_window_ms);

        tokio::spawn(async move {
            let mut last_skip: Option<Instant> = None;
            loop {
                if tokio::signal::ctrl_c().await.is_err() {
                    tracing::warn!("Unable to listen for Ctrl-C; interrupts disabled");
                    return;
                }
                match interrupter.on_interrupt(skip_first, last_skip, window) {
                    Interrupt::SkipStep => {
                        tracing::warn!("Interrupt received: skipping current step (press Ctrl-C again to abort)");
                        last_skip = Some(Instant::now());
                    }
                    Interrupt::AbortAll => {
                        tracing::warn!("Interrupt received: aborting scan");
                        return;
                    }
                }
            }
        })
    }
}
