//! Pet store contract harness
//!
//! Runs the bundled pet store scenarios, or scenarios loaded from YAML,
//! against the configured endpoint. Exits non-zero when any scenario
//! fails or errors.

use clap::Parser;
use petstore_contract::{cli, commands::Commands, common::logging};

#[derive(Parser)]
#[command(name = "petstore-contract", about = "Contract tests for the pet store API")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Run { target, .. } | Commands::Test { target, .. } => target.verbose,
        Commands::List { .. } => false,
    };
    logging::init_cli(verbose);

    match cli::dispatch(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
