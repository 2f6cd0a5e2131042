//! CLI command handling
//!
//! Resolves configuration, runs scenarios and prints the report. Returns the
//! process exit code.

use colored::Colorize;

use crate::commands::{Commands, TargetArgs};
use crate::common::config::Config;
use crate::common::Result;
use crate::petstore;
use crate::testing::{load_scenarios, print_report, Scenario, ScenarioRunner};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run { filter, target } => {
            let scenarios = petstore::filtered(filter.as_deref());
            if scenarios.is_empty() {
                return Ok(no_match(filter.as_deref()));
            }
            run(scenarios, target).await
        }

        Commands::Test { paths, target } => {
            let mut scenarios = Vec::new();
            for path in &paths {
                scenarios.extend(load_scenarios(path)?);
            }
            run(scenarios, target).await
        }

        Commands::List { filter } => {
            let scenarios = petstore::filtered(filter.as_deref());
            if scenarios.is_empty() {
                return Ok(no_match(filter.as_deref()));
            }
            list(&scenarios);
            Ok(0)
        }
    }
}

async fn run(scenarios: Vec<Scenario>, target: TargetArgs) -> Result<i32> {
    let config = Config::resolve(target.base_url, target.jobs, target.verbose)?;
    let runner = ScenarioRunner::http(config.endpoint.clone())?;

    println!(
        "{} {} scenario(s) against {}",
        "Running".blue().bold(),
        scenarios.len(),
        config.endpoint.to_string().white().bold()
    );
    tracing::info!(endpoint = %config.endpoint, jobs = config.jobs, "starting run");

    let outcomes = runner.run_all(&scenarios, config.jobs).await;
    let summary = print_report(&outcomes, config.verbose);

    Ok(summary.exit_code())
}

/// Report an empty selection; selecting nothing is a failed invocation
fn no_match(filter: Option<&str>) -> i32 {
    println!("No scenarios match '{}'", filter.unwrap_or_default());
    1
}

fn list(scenarios: &[Scenario]) {
    let mut current_group: Option<Option<&str>> = None;
    for scenario in scenarios {
        let group = scenario.group.as_deref();
        if current_group != Some(group) {
            println!("{}", group.unwrap_or("(ungrouped)").blue().bold());
            current_group = Some(group);
        }
        match &scenario.description {
            Some(desc) => println!("  {} {}", scenario.name, desc.dimmed()),
            None => println!("  {}", scenario.name),
        }
    }
}
