//! Scenario runner
//!
//! Executes scenarios step by step against the configured endpoint and turns
//! every response into an [`Outcome`]. Contract violations, transport
//! failures and blocked steps are all recorded in the outcome; `run` itself
//! never fails.

use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

use super::assertion::Mismatch;
use super::config::{Scenario, Step};
use super::template::{self, Bindings};
use crate::common::Result;
use crate::http::{Endpoint, HttpTransport, Method, PreparedRequest, ResponseCapture, Transport};

/// Why a scenario did not pass
#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    /// The response did not match an assertion
    Contract(Mismatch),
    /// No response was obtained
    Transport(String),
    /// The scenario or request could not be built
    Invalid(String),
}

/// One failure, attributed to the step that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub step: String,
    pub kind: FailureKind,
}

impl Failure {
    pub fn is_contract(&self) -> bool {
        matches!(self.kind, FailureKind::Contract(_))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FailureKind::Contract(mismatch) => write!(f, "[{}] {}", self.step, mismatch),
            FailureKind::Transport(message) => write!(f, "[{}] transport: {}", self.step, message),
            FailureKind::Invalid(message) => write!(f, "[{}] invalid: {}", self.step, message),
        }
    }
}

/// What happened to a single step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Passed,
    Failed,
    /// Skipped because something it depends on did not pass
    Blocked(String),
    /// The request itself failed
    TransportError,
    /// Not attempted after a transport failure earlier in the scenario
    Aborted,
}

/// Per-step record in an outcome
#[derive(Debug, Clone)]
pub struct StepReport {
    pub name: String,
    pub method: Method,
    /// Rendered path when the step ran, declared path otherwise
    pub path: String,
    pub status: StepStatus,
    pub http_status: Option<u16>,
    pub elapsed: Duration,
}

/// Overall classification of an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    /// Passed, with advisory mismatches
    Warned,
    /// At least one contract violation
    Failed,
    /// Transport failure or unbuildable scenario
    Errored,
}

/// Result of running one scenario
#[derive(Debug, Clone)]
pub struct Outcome {
    pub name: String,
    pub group: Option<String>,
    pub passed: bool,
    pub failures: Vec<Failure>,
    pub warnings: Vec<String>,
    pub logs: Vec<String>,
    pub steps: Vec<StepReport>,
    pub elapsed: Duration,
}

impl Outcome {
    fn new(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.clone(),
            group: scenario.group.clone(),
            passed: false,
            failures: Vec::new(),
            warnings: Vec::new(),
            logs: Vec::new(),
            steps: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn verdict(&self) -> Verdict {
        if self.failures.iter().any(|f| !f.is_contract()) {
            Verdict::Errored
        } else if !self.failures.is_empty() {
            Verdict::Failed
        } else if !self.warnings.is_empty() {
            Verdict::Warned
        } else {
            Verdict::Passed
        }
    }

    /// Status of a step by name
    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.name == name)
    }

    fn skip(&mut self, step: &Step, status: StepStatus) {
        self.steps.push(StepReport {
            name: step.name.clone(),
            method: step.request.method,
            path: step.request.path.clone(),
            status,
            http_status: None,
            elapsed: Duration::ZERO,
        });
    }
}

/// Runs scenarios against one endpoint
#[derive(Clone)]
pub struct ScenarioRunner {
    endpoint: Endpoint,
    transport: Arc<dyn Transport>,
}

impl ScenarioRunner {
    pub fn new(endpoint: Endpoint, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    /// Runner backed by a real HTTP client
    pub fn http(endpoint: Endpoint) -> Result<Self> {
        Ok(Self::new(endpoint, Arc::new(HttpTransport::new()?)))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Run one scenario to completion
    pub async fn run(&self, scenario: &Scenario) -> Outcome {
        let span = tracing::info_span!("scenario", name = %scenario.name);
        self.execute(scenario).instrument(span).await
    }

    /// Run scenarios with at most `jobs` in flight. Outcomes come back in the
    /// order the scenarios were given.
    ///
    /// A scenario that never finishes holds one slot only; the others keep
    /// starting as slots free up.
    pub async fn run_all(&self, scenarios: &[Scenario], jobs: usize) -> Vec<Outcome> {
        let mut finished: Vec<(usize, Outcome)> = stream::iter(scenarios.iter().enumerate())
            .map(|(index, scenario)| async move { (index, self.run(scenario).await) })
            .buffer_unordered(jobs.max(1))
            .collect()
            .await;
        finished.sort_by_key(|(index, _)| *index);
        finished.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn execute(&self, scenario: &Scenario) -> Outcome {
        let started = Instant::now();
        let mut outcome = Outcome::new(scenario);

        if let Err(e) = scenario.validate() {
            outcome.failures.push(Failure {
                step: "<scenario>".to_string(),
                kind: FailureKind::Invalid(e.to_string()),
            });
            outcome.elapsed = started.elapsed();
            tracing::warn!(error = %e, "scenario rejected");
            return outcome;
        }

        let mut bindings: Bindings = scenario
            .vars
            .iter()
            .map(|(name, source)| (name.clone(), source.resolve()))
            .collect();
        let mut passed_steps: HashSet<&str> = HashSet::new();
        let mut aborted = false;

        for step in &scenario.steps {
            if aborted {
                outcome.skip(step, StepStatus::Aborted);
                continue;
            }

            if let Some(reason) = blocked_reason(step, &passed_steps, &bindings) {
                tracing::info!(step = %step.name, %reason, "step blocked");
                outcome.skip(step, StepStatus::Blocked(reason));
                continue;
            }

            let step_started = Instant::now();
            let request = match self.prepare(step, &bindings) {
                Ok(request) => request,
                Err(e) => {
                    outcome.failures.push(Failure {
                        step: step.name.clone(),
                        kind: FailureKind::Invalid(e.to_string()),
                    });
                    outcome.skip(step, StepStatus::Failed);
                    continue;
                }
            };

            tracing::debug!(step = %step.name, method = %request.method, url = %request.url, "sending");
            let path = request.url.path().to_string();

            let response = match self.transport.send(&request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(step = %step.name, error = %e, "transport failure");
                    outcome.failures.push(Failure {
                        step: step.name.clone(),
                        kind: FailureKind::Transport(e.to_string()),
                    });
                    outcome.steps.push(StepReport {
                        name: step.name.clone(),
                        method: request.method,
                        path,
                        status: StepStatus::TransportError,
                        http_status: None,
                        elapsed: step_started.elapsed(),
                    });
                    aborted = true;
                    continue;
                }
            };

            let failures_before = outcome.failures.len();
            check_step(step, &response, &mut bindings, &mut outcome);
            let step_passed = outcome.failures.len() == failures_before;

            if let Some(log) = &step.log {
                let line = template::render_log(log, &bindings, &response);
                tracing::info!(step = %step.name, "{}", line);
                outcome.logs.push(line);
            }

            if step_passed {
                passed_steps.insert(step.name.as_str());
            }

            outcome.steps.push(StepReport {
                name: step.name.clone(),
                method: request.method,
                path,
                status: if step_passed {
                    StepStatus::Passed
                } else {
                    StepStatus::Failed
                },
                http_status: Some(response.status),
                elapsed: step_started.elapsed(),
            });
        }

        outcome.passed = outcome.failures.is_empty();
        outcome.elapsed = started.elapsed();
        tracing::info!(verdict = ?outcome.verdict(), elapsed_ms = outcome.elapsed.as_millis() as u64, "scenario finished");
        outcome
    }

    /// Render a step's request against the current bindings
    fn prepare(&self, step: &Step, bindings: &Bindings) -> Result<PreparedRequest> {
        let path = template::render_str(&step.request.path, bindings)?;
        let body = step
            .request
            .body
            .as_ref()
            .map(|body| template::render_value(body, bindings))
            .transpose()?;

        Ok(PreparedRequest {
            method: step.request.method,
            url: self.endpoint.url_for(&path)?,
            body,
        })
    }
}

/// A step is blocked when a required step did not pass or a value it
/// consumes was never bound because its producer did not pass
fn blocked_reason(step: &Step, passed: &HashSet<&str>, bindings: &Bindings) -> Option<String> {
    if let Some(required) = step.requires.iter().find(|r| !passed.contains(r.as_str())) {
        return Some(format!("requires step '{}'", required));
    }
    step.consumes()
        .into_iter()
        .find(|name| !bindings.contains_key(name))
        .map(|name| format!("no value for '{{{{{}}}}}'", name))
}

/// Evaluate every assertion of a step, then bind its captures if it passed
fn check_step(
    step: &Step,
    response: &ResponseCapture,
    bindings: &mut Bindings,
    outcome: &mut Outcome,
) {
    let mut failed = false;

    for assertion in &step.expect {
        let result = assertion
            .render(bindings)
            .map(|rendered| rendered.evaluate(response));
        match result {
            Ok(Ok(())) => {}
            Ok(Err(mismatch)) => {
                tracing::debug!(step = %step.name, %mismatch, "contract violation");
                outcome.failures.push(Failure {
                    step: step.name.clone(),
                    kind: FailureKind::Contract(mismatch),
                });
                failed = true;
            }
            Err(e) => {
                outcome.failures.push(Failure {
                    step: step.name.clone(),
                    kind: FailureKind::Invalid(e.to_string()),
                });
                failed = true;
            }
        }
    }

    for assertion in &step.advise {
        let result = assertion
            .render(bindings)
            .map(|rendered| rendered.evaluate(response));
        match result {
            Ok(Ok(())) => {}
            Ok(Err(mismatch)) => {
                tracing::warn!(step = %step.name, %mismatch, "advisory mismatch");
                outcome
                    .warnings
                    .push(format!("[{}] advisory: {}", step.name, mismatch));
            }
            Err(e) => outcome
                .warnings
                .push(format!("[{}] advisory skipped: {}", step.name, e)),
        }
    }

    if failed {
        return;
    }

    let mut captured = Vec::with_capacity(step.capture.len());
    for (var, path) in &step.capture {
        match response.field(path) {
            Some(value) => captured.push((var.clone(), value.clone())),
            None => {
                outcome.failures.push(Failure {
                    step: step.name.clone(),
                    kind: FailureKind::Contract(Mismatch {
                        assertion: format!("capture '{}'", var),
                        expected: format!("field '{}'", path),
                        actual: response.body_excerpt(),
                    }),
                });
                return;
            }
        }
    }
    bindings.extend(captured);
}
