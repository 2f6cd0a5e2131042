//! Console report for scenario outcomes

use colored::Colorize;
use std::fmt::{self, Write as _};

use super::runner::{Outcome, StepStatus, Verdict};

/// Aggregate counts over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
    pub errored: usize,
}

impl Summary {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        outcomes
            .iter()
            .fold(Summary::default(), |mut summary, outcome| {
                match outcome.verdict() {
                    Verdict::Passed => summary.passed += 1,
                    Verdict::Warned => summary.warned += 1,
                    Verdict::Failed => summary.failed += 1,
                    Verdict::Errored => summary.errored += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.passed + self.warned + self.failed + self.errored
    }

    /// Warnings do not fail a run
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }

    /// Process exit status for this run
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} warned, {} failed, {} errored ({} total)",
            self.passed,
            self.warned,
            self.failed,
            self.errored,
            self.total()
        )
    }
}

/// Render one outcome. Failures, warnings and log lines are always shown;
/// per-step detail only when `verbose`.
pub fn format_outcome(outcome: &Outcome, verbose: bool) -> String {
    let mut out = String::new();

    let badge = match outcome.verdict() {
        Verdict::Passed => "PASS".green().bold(),
        Verdict::Warned => "WARN".yellow().bold(),
        Verdict::Failed => "FAIL".red().bold(),
        Verdict::Errored => "ERROR".red().bold(),
    };
    let _ = writeln!(
        out,
        "  {} {} {}",
        badge,
        outcome.name,
        format!("({} ms)", outcome.elapsed.as_millis()).dimmed()
    );

    if verbose {
        for step in &outcome.steps {
            let (mark, detail) = match &step.status {
                StepStatus::Passed => ("✓".green(), String::new()),
                StepStatus::Failed => ("✗".red(), String::new()),
                StepStatus::Blocked(reason) => ("-".yellow(), format!(" blocked: {}", reason)),
                StepStatus::TransportError => ("!".red(), " transport error".to_string()),
                StepStatus::Aborted => ("-".dimmed(), " not run".to_string()),
            };
            let status = step
                .http_status
                .map(|s| format!(" -> {}", s))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "      {} {} {} {}{}{}",
                mark,
                step.name,
                step.method.as_str().dimmed(),
                step.path.dimmed(),
                status,
                detail.dimmed()
            );
        }
    }

    for failure in &outcome.failures {
        let _ = writeln!(out, "      {} {}", "✗".red(), failure);
    }
    for warning in &outcome.warnings {
        let _ = writeln!(out, "      {} {}", "⚠".yellow(), warning);
    }
    for line in &outcome.logs {
        let _ = writeln!(out, "      {} {}", "›".cyan(), line);
    }

    out
}

/// Print outcomes under their group headings, then the summary line
pub fn print_report(outcomes: &[Outcome], verbose: bool) -> Summary {
    let mut current_group: Option<Option<&str>> = None;

    for outcome in outcomes {
        let group = outcome.group.as_deref();
        if current_group != Some(group) {
            if let Some(name) = group {
                println!("\n{}", name.blue().bold());
            }
            current_group = Some(group);
        }
        print!("{}", format_outcome(outcome, verbose));
    }

    let summary = Summary::from_outcomes(outcomes);
    let line = summary.to_string();
    println!();
    if summary.all_passed() {
        println!("{} {}", "✓".green().bold(), line.green().bold());
    } else {
        println!("{} {}", "✗".red().bold(), line.red().bold());
    }
    summary
}
