mod app;
mod cli;
mod config;
mod core;
mod executors;
mod intel;
mod organizers;
mod parser;
mod reporters;
mod ui;
mod utils;

use clap::Parser;
use crate::core::AetherError;

#[tokio::main]
async fn main() {
    human_panic::setup_panic!();

    let cli = cli::Cli::parse();
    if let Err(err) = app::run(cli).await {
        let code = err.downcast_ref::<AetherError>().map_or(1, AetherError::exit_code);
        eprintln!("fatal: {:#}", err);
        std::process::exit(code);
    }
}
