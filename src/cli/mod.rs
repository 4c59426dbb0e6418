pub mod args;
pub mod prompt;

pub use args::{Cli, Command, ScanArgs};
