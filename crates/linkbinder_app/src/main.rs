mod cli;
mod commands;
mod file_store;
mod logging;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let destination = if cli.verbose {
        logging::LogDestination::Both
    } else {
        logging::LogDestination::File
    };
    logging::initialize(destination);

    commands::run(cli).await
}
