mod cli;
mod config;
mod engine;
mod export;
mod model;
mod orchestrator;
mod storage;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    match cli::run(args).await {
        Ok(0) => Ok(()),
        // The orchestrate subcommand mirrors sqlmap's own exit status.
        Ok(code) => std::process::exit(code),
        Err(e) => Err(e),
    }
}
