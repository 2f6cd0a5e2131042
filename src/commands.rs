//! CLI command definitions
//!
//! Defines the clap commands for the contract harness.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::config::BASE_URL_ENV;

/// Options shared by every command that talks to the service
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Base URL of the pet store (default: https://petstore.swagger.io/v2)
    #[arg(long, env = BASE_URL_ENV)]
    pub base_url: Option<String>,

    /// Maximum number of scenarios running at once
    #[arg(long, short)]
    pub jobs: Option<usize>,

    /// Show every step, not just failures and logs
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bundled pet store contract suite
    Run {
        /// Only run scenarios whose name or group contains this text
        #[arg(long, short)]
        filter: Option<String>,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Run scenarios from YAML files
    Test {
        /// Scenario files; each holds one scenario or a list of them
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// List the bundled scenarios
    List {
        /// Only list scenarios whose name or group contains this text
        #[arg(long, short)]
        filter: Option<String>,
    },
}
