//! Contract verification harness
//!
//! Describes an HTTP contract as independent scenarios, runs them against
//! an endpoint and reports what passed, what failed and what only warned.
//! Scenarios come from the bundled pet store suite or from YAML files.

mod assertion;
mod config;
mod report;
mod runner;
pub mod template;

pub use assertion::{Assertion, JsonKind, Mismatch};
pub use config::{
    load_scenarios, next_timestamp_id, GeneratedVar, Generator, Scenario, Step, VarSource,
};
pub use report::{format_outcome, print_report, Summary};
pub use runner::{
    Failure, FailureKind, Outcome, ScenarioRunner, StepReport, StepStatus, Verdict,
};
