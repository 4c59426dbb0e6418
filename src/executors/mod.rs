pub mod command;
pub mod interrupt;
pub mod toolchain;

pub use command::{ProcessRunner, RunOutcome, StdoutSink, StepCommand, StepRunner};
pub use interrupt::{Interrupt, Interrupter, StepSignals};
