//! Scenario definitions
//!
//! Scenarios are built in code for the bundled suite or loaded from YAML
//! files. Either way they go through [`Scenario::validate`] before running.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::assertion::Assertion;
use super::template;
use crate::common::{Error, Result};
use crate::http::{Method, RequestSpec};

/// A named, ordered sequence of request/assert steps
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Name of the scenario
    pub name: String,
    /// Endpoint group the scenario belongs to (e.g. "GET /pet/{petId}")
    #[serde(default)]
    pub group: Option<String>,
    /// Optional description of what the scenario verifies
    #[serde(default)]
    pub description: Option<String>,
    /// Values available to every step, resolved once per run
    #[serde(default)]
    pub vars: BTreeMap<String, VarSource>,
    /// Steps, executed in declared order
    pub steps: Vec<Step>,
}

/// Where a scenario variable comes from
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum VarSource {
    /// `{ generate: timestamp_id }`
    Generated(GeneratedVar),
    /// Any literal JSON value, including objects that carry a `generate` key
    /// next to other keys
    Literal(Value),
}

/// An object whose only key is `generate`
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneratedVar {
    pub generate: Generator,
}

/// Generated values
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Generator {
    /// Milliseconds since the epoch, unique within the process
    TimestampId,
    /// `text` repeated `count` times
    Repeat { text: String, count: usize },
}

/// One request, its assertions and what it hands to later steps
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Step {
    /// Step name, unique within the scenario
    pub name: String,
    /// Method, path and optional body
    #[serde(flatten)]
    pub request: RequestSpec,
    /// Assertions that fail the scenario
    #[serde(default)]
    pub expect: Vec<Assertion>,
    /// Assertions that only warn
    #[serde(default)]
    pub advise: Vec<Assertion>,
    /// Variable name -> response body path, bound when the step passes
    #[serde(default)]
    pub capture: BTreeMap<String, String>,
    /// Earlier steps that must pass before this one can run
    #[serde(default)]
    pub requires: Vec<String>,
    /// Line logged after the response arrives
    #[serde(default)]
    pub log: Option<String>,
}

static LAST_TIMESTAMP_ID: AtomicU64 = AtomicU64::new(0);

/// Current time in milliseconds, bumped when needed so that no two calls in
/// this process return the same id
pub fn next_timestamp_id() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let mut last = LAST_TIMESTAMP_ID.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_TIMESTAMP_ID.compare_exchange_weak(
            last,
            next,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

impl VarSource {
    pub fn generate(generator: Generator) -> Self {
        VarSource::Generated(GeneratedVar {
            generate: generator,
        })
    }

    /// Produce the value for one run
    pub fn resolve(&self) -> Value {
        match self {
            VarSource::Literal(value) => value.clone(),
            VarSource::Generated(GeneratedVar { generate }) => match generate {
                Generator::TimestampId => Value::from(next_timestamp_id()),
                Generator::Repeat { text, count } => Value::String(text.repeat(*count)),
            },
        }
    }
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
            description: None,
            vars: BTreeMap::new(),
            steps: Vec::new(),
        }
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn var(mut self, name: impl Into<String>, source: VarSource) -> Self {
        self.vars.insert(name.into(), source);
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Case-insensitive substring match on name or group
    pub fn matches(&self, filter: &str) -> bool {
        let needle = filter.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self
                .group
                .as_deref()
                .is_some_and(|g| g.to_lowercase().contains(&needle))
    }

    /// Check the step graph before anything is sent
    ///
    /// Every placeholder must name a scenario variable or a value captured by
    /// an earlier step, and every `requires` entry must name an earlier step.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::invalid_scenario(&self.name, reason);

        if self.name.trim().is_empty() {
            return Err(Error::invalid_scenario("<unnamed>", "scenario name is empty"));
        }
        if self.steps.is_empty() {
            return Err(invalid("scenario has no steps".to_string()));
        }

        let mut known: HashSet<&str> = self.vars.keys().map(String::as_str).collect();
        let mut earlier_steps: HashSet<&str> = HashSet::new();

        for step in &self.steps {
            if step.name.trim().is_empty() {
                return Err(invalid("step name is empty".to_string()));
            }
            if earlier_steps.contains(step.name.as_str()) {
                return Err(invalid(format!("duplicate step name '{}'", step.name)));
            }

            for required in &step.requires {
                if !earlier_steps.contains(required.as_str()) {
                    return Err(invalid(format!(
                        "step '{}' requires '{}', which is not an earlier step",
                        step.name, required
                    )));
                }
            }

            for name in step.consumes() {
                if !known.contains(name.as_str()) {
                    return Err(invalid(format!(
                        "step '{}' uses '{{{{{}}}}}', which no variable or earlier capture provides",
                        step.name, name
                    )));
                }
            }

            if let Some(log) = &step.log {
                for name in template::placeholders(log) {
                    if !template::is_response_reference(&name)
                        && !known.contains(name.as_str())
                        && !step.capture.contains_key(&name)
                    {
                        return Err(invalid(format!(
                            "log of step '{}' uses unknown '{{{{{}}}}}'",
                            step.name, name
                        )));
                    }
                }
            }

            for var in step.capture.keys() {
                if self.vars.contains_key(var) {
                    return Err(invalid(format!(
                        "step '{}' captures '{}', which shadows a scenario variable",
                        step.name, var
                    )));
                }
                known.insert(var.as_str());
            }

            earlier_steps.insert(step.name.as_str());
        }

        Ok(())
    }
}

impl Step {
    pub fn new(name: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            request: RequestSpec::new(method, path),
            expect: Vec::new(),
            advise: Vec::new(),
            capture: BTreeMap::new(),
            requires: Vec::new(),
            log: None,
        }
    }

    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::Get, path)
    }

    pub fn post(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::Post, path)
    }

    pub fn put(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::Put, path)
    }

    pub fn delete(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::Delete, path)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.request.body = Some(body);
        self
    }

    pub fn expect(mut self, assertion: Assertion) -> Self {
        self.expect.push(assertion);
        self
    }

    pub fn advise(mut self, assertion: Assertion) -> Self {
        self.advise.push(assertion);
        self
    }

    pub fn capture(mut self, var: impl Into<String>, path: impl Into<String>) -> Self {
        self.capture.insert(var.into(), path.into());
        self
    }

    pub fn requires(mut self, step: impl Into<String>) -> Self {
        self.requires.push(step.into());
        self
    }

    pub fn log(mut self, template: impl Into<String>) -> Self {
        self.log = Some(template.into());
        self
    }

    /// Values this step needs bound before it can be sent, deduplicated
    pub fn consumes(&self) -> Vec<String> {
        let mut names = template::placeholders(&self.request.path);
        if let Some(body) = &self.request.body {
            names.extend(template::value_placeholders(body));
        }
        for assertion in self.expect.iter().chain(&self.advise) {
            names.extend(assertion.placeholders());
        }

        let mut seen = HashSet::new();
        names.retain(|name| seen.insert(name.clone()));
        names
    }
}

/// Load scenarios from a YAML file holding one scenario or a list
pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::ScenarioRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    let scenarios = parse_scenarios(&content).map_err(|e| Error::ScenarioParse {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    for scenario in &scenarios {
        scenario.validate()?;
    }
    Ok(scenarios)
}

fn parse_scenarios(content: &str) -> std::result::Result<Vec<Scenario>, serde_yaml::Error> {
    let document: serde_yaml::Value = serde_yaml::from_str(content)?;
    if document.is_sequence() {
        serde_yaml::from_str(content)
    } else {
        serde_yaml::from_str(content).map(|scenario| vec![scenario])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const LIFECYCLE_YAML: &str = r#"
name: create then delete
group: DELETE /pet/{petId}
vars:
  pet_id: { generate: timestamp_id }
  long_name: { generate: { repeat: { text: "A", count: 3 } } }
  category: { id: 1, name: dog }
steps:
  - name: create
    method: POST
    path: /pet
    body: { id: "{{pet_id}}", name: "{{long_name}}", category: "{{category}}" }
    expect:
      - status: 200
      - field_equals: { path: id, value: "{{pet_id}}" }
    capture:
      created_name: name
    log: "Created {{body.name}}"
  - name: delete
    method: DELETE
    path: /pet/{{pet_id}}
    requires: [create]
    expect:
      - status: 200
"#;

    #[test]
    fn test_parse_single_scenario() {
        let scenarios = parse_scenarios(LIFECYCLE_YAML).unwrap();
        assert_eq!(scenarios.len(), 1);

        let scenario = &scenarios[0];
        assert_eq!(scenario.group.as_deref(), Some("DELETE /pet/{petId}"));
        assert_eq!(
            scenario.vars["pet_id"],
            VarSource::generate(Generator::TimestampId)
        );
        assert_eq!(
            scenario.vars["long_name"],
            VarSource::generate(Generator::Repeat {
                text: "A".to_string(),
                count: 3
            })
        );
        assert_eq!(
            scenario.vars["category"],
            VarSource::Literal(json!({"id": 1, "name": "dog"}))
        );

        let delete = &scenario.steps[1];
        assert_eq!(delete.request.method, Method::Delete);
        assert_eq!(delete.requires, vec!["create".to_string()]);
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_object_with_extra_keys_is_literal() {
        let yaml = r#"
name: literal vars
vars:
  spec: { generate: timestamp_id, note: kept as data }
  id: { generate: timestamp_id }
steps:
  - { name: fetch, method: GET, path: /store/inventory }
"#;
        let scenarios = parse_scenarios(yaml).unwrap();
        let vars = &scenarios[0].vars;
        assert_eq!(
            vars["spec"],
            VarSource::Literal(json!({"generate": "timestamp_id", "note": "kept as data"}))
        );
        assert_eq!(vars["id"], VarSource::generate(Generator::TimestampId));
        assert_eq!(
            vars["spec"].resolve(),
            json!({"generate": "timestamp_id", "note": "kept as data"})
        );
    }

    #[test]
    fn test_parse_list_of_scenarios() {
        let yaml = r#"
- name: inventory
  steps:
    - { name: fetch, method: GET, path: /store/inventory, expect: [ { status: 200 } ] }
- name: missing pet
  steps:
    - { name: fetch, method: get, path: /pet/99999999, expect: [ { status: 404 } ] }
"#;
        let scenarios = parse_scenarios(yaml).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[1].steps[0].request.method, Method::Get);
    }

    #[test]
    fn test_consumes_collects_all_placeholders() {
        let scenarios = parse_scenarios(LIFECYCLE_YAML).unwrap();
        let mut consumed = scenarios[0].steps[0].consumes();
        consumed.sort();
        assert_eq!(
            consumed,
            vec![
                "category".to_string(),
                "long_name".to_string(),
                "pet_id".to_string()
            ]
        );
        assert_eq!(scenarios[0].steps[1].consumes(), vec!["pet_id".to_string()]);
    }

    #[test]
    fn test_validate_rejects_unknown_placeholder() {
        let scenario = Scenario::new("ghost").step(Step::delete("delete", "/pet/{{ghost_id}}"));
        let err = scenario.validate().unwrap_err();
        assert!(err.to_string().contains("{{ghost_id}}"), "{}", err);
    }

    #[test]
    fn test_validate_rejects_forward_requires() {
        let scenario = Scenario::new("forward")
            .step(Step::get("read", "/pet/1").requires("create"))
            .step(Step::post("create", "/pet"));
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_steps() {
        let scenario = Scenario::new("dup")
            .step(Step::get("read", "/pet/1"))
            .step(Step::get("read", "/pet/2"));
        assert!(scenario.validate().is_err());
        assert!(Scenario::new("empty").validate().is_err());
    }

    #[test]
    fn test_capture_feeds_later_steps() {
        let scenario = Scenario::new("chain")
            .step(Step::post("create", "/pet").capture("pet_id", "id"))
            .step(Step::get("read", "/pet/{{pet_id}}"));
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_timestamp_ids_are_unique() {
        let ids: HashSet<u64> = (0..1000).map(|_| next_timestamp_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_matches_name_or_group() {
        let scenario = Scenario::new("Pet not found").group("GET /pet/{petId}");
        assert!(scenario.matches("not found"));
        assert!(scenario.matches("get /pet"));
        assert!(!scenario.matches("inventory"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LIFECYCLE_YAML.as_bytes()).unwrap();
        let scenarios = load_scenarios(file.path()).unwrap();
        assert_eq!(scenarios[0].name, "create then delete");
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"name: broken\nsteps: 12\n").unwrap();
        let err = load_scenarios(file.path()).unwrap_err();
        assert!(matches!(err, Error::ScenarioParse { .. }));
    }
}
