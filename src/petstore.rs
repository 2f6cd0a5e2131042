//! Bundled pet store contract suite
//!
//! Every scenario that writes uses an id generated for that run, so
//! concurrent runs against the shared sandbox do not step on each other.
//! Create-only scenarios leave their pets behind.

use serde_json::json;

use crate::testing::{Assertion, Generator, JsonKind, Scenario, Step, VarSource};

const GET_PET: &str = "GET /pet/{petId}";
const POST_PET: &str = "POST /pet";
const DELETE_PET: &str = "DELETE /pet/{petId}";
const PUT_PET: &str = "PUT /pet";
const INVENTORY: &str = "GET /store/inventory";

/// An id the sandbox does not hand out
const UNKNOWN_PET_ID: u64 = 99_999_999;
/// Larger unknown id used for updates
const UNKNOWN_UPDATE_ID: u64 = 999_999_999;
/// Length of the oversized pet name
const LONG_NAME_LEN: usize = 300;

const INVENTORY_KEYS: [&str; 3] = ["available", "pending", "sold"];

/// All bundled scenarios, grouped by endpoint
pub fn suite() -> Vec<Scenario> {
    let mut scenarios = Vec::new();
    scenarios.extend(get_pet());
    scenarios.extend(post_pet());
    scenarios.extend(delete_pet());
    scenarios.extend(put_pet());
    scenarios.extend(inventory());
    scenarios
}

/// Bundled scenarios whose name or group contains `filter`
pub fn filtered(filter: Option<&str>) -> Vec<Scenario> {
    match filter {
        Some(filter) => suite().into_iter().filter(|s| s.matches(filter)).collect(),
        None => suite(),
    }
}

fn pet_id() -> VarSource {
    VarSource::generate(Generator::TimestampId)
}

/// POST step creating the pet `{{pet_id}}` with the given name
fn create_pet(name: &str) -> Step {
    Step::post("create", "/pet")
        .body(json!({
            "id": "{{pet_id}}",
            "category": {"id": 1, "name": "dog"},
            "name": name,
            "status": "available"
        }))
        .expect(Assertion::Status(200))
        .expect(Assertion::field_equals("id", "{{pet_id}}"))
}

fn get_pet() -> Vec<Scenario> {
    vec![
        Scenario::new("existing pet is returned")
            .group(GET_PET)
            .step(
                Step::get("fetch", "/pet/1")
                    .expect(Assertion::Status(200))
                    .expect(Assertion::field_equals("id", 1))
                    .expect(Assertion::has_field("name"))
                    .expect(Assertion::has_field("status"))
                    .log("Name: {{body.name}} | Status: {{body.status}}"),
            ),
        Scenario::new("unknown pet is not found")
            .group(GET_PET)
            .step(
                Step::get("fetch", format!("/pet/{}", UNKNOWN_PET_ID))
                    .expect(Assertion::Status(404))
                    .expect(Assertion::field_equals("message", "Pet not found")),
            ),
        Scenario::new("non-numeric id is not found")
            .group(GET_PET)
            .step(Step::get("fetch", "/pet/invalid").expect(Assertion::Status(404))),
        Scenario::new("created pet can be read back")
            .group(GET_PET)
            .describe("Reading a freshly created pet returns the same id")
            .var("pet_id", pet_id())
            .step(create_pet("RoundTrip"))
            .step(
                Step::get("read", "/pet/{{pet_id}}")
                    .requires("create")
                    .expect(Assertion::Status(200))
                    .expect(Assertion::field_equals("id", "{{pet_id}}"))
                    .expect(Assertion::field_equals("name", "RoundTrip")),
            ),
    ]
}

fn post_pet() -> Vec<Scenario> {
    vec![
        Scenario::new("pet is created")
            .group(POST_PET)
            .var("pet_id", pet_id())
            .step(
                Step::post("create", "/pet")
                    .body(json!({
                        "id": "{{pet_id}}",
                        "category": {"id": 1, "name": "dog"},
                        "name": "TestDog",
                        "tags": [{"id": 1, "name": "friendly"}],
                        "status": "available"
                    }))
                    .expect(Assertion::Status(200))
                    .expect(Assertion::field_equals("id", "{{pet_id}}"))
                    .log("Created: {{body.name}}"),
            ),
        Scenario::new("incomplete pet is rejected")
            .group(POST_PET)
            .describe("The sandbox is known to accept this payload, so a 200 only warns")
            .step(
                Step::post("create", "/pet")
                    .body(json!({"name": "Incomplete", "status": "available"}))
                    .advise(Assertion::Status(400)),
            ),
        Scenario::new("long pet name is accepted")
            .group(POST_PET)
            .var("pet_id", pet_id())
            .var(
                "long_name",
                VarSource::generate(Generator::Repeat {
                    text: "A".to_string(),
                    count: LONG_NAME_LEN,
                }),
            )
            .step(
                Step::post("create", "/pet")
                    .body(json!({
                        "id": "{{pet_id}}",
                        "category": {"id": 1, "name": "dog"},
                        "name": "{{long_name}}",
                        "status": "available"
                    }))
                    .expect(Assertion::Status(200))
                    .log(format!("Name length: {}", LONG_NAME_LEN)),
            ),
    ]
}

fn delete_pet() -> Vec<Scenario> {
    vec![
        Scenario::new("deleted pet is gone")
            .group(DELETE_PET)
            .var("pet_id", pet_id())
            .step(create_pet("DeleteMe"))
            .step(
                Step::delete("delete", "/pet/{{pet_id}}")
                    .requires("create")
                    .expect(Assertion::Status(200)),
            )
            .step(
                Step::get("read", "/pet/{{pet_id}}")
                    .requires("delete")
                    .expect(Assertion::Status(404)),
            ),
        Scenario::new("unknown pet cannot be deleted")
            .group(DELETE_PET)
            .step(
                Step::delete("delete", format!("/pet/{}", UNKNOWN_PET_ID))
                    .expect(Assertion::Status(404)),
            ),
        Scenario::new("non-numeric id cannot be deleted")
            .group(DELETE_PET)
            .step(Step::delete("delete", "/pet/invalid").expect(Assertion::StatusIn(vec![400, 404]))),
    ]
}

fn put_pet() -> Vec<Scenario> {
    vec![
        Scenario::new("pet is updated")
            .group(PUT_PET)
            .var("pet_id", pet_id())
            .step(create_pet("ToUpdate"))
            .step(
                Step::put("update", "/pet")
                    .requires("create")
                    .body(json!({"id": "{{pet_id}}", "name": "UpdatedName", "status": "sold"}))
                    .expect(Assertion::Status(200))
                    .expect(Assertion::field_equals("name", "UpdatedName"))
                    .expect(Assertion::field_equals("status", "sold")),
            ),
        Scenario::new("unknown pet cannot be updated")
            .group(PUT_PET)
            .step(
                Step::put("update", "/pet")
                    .body(json!({"id": UNKNOWN_UPDATE_ID, "name": "Ghost", "status": "available"}))
                    .expect(Assertion::Status(404)),
            ),
        Scenario::new("malformed update is rejected")
            .group(PUT_PET)
            .var("pet_id", pet_id())
            .step(create_pet("ToUpdate"))
            .step(
                Step::put("update", "/pet")
                    .requires("create")
                    .body(json!({"id": "{{pet_id}}", "name": "", "status": 12345}))
                    .expect(Assertion::Status(400)),
            ),
    ]
}

fn inventory() -> Vec<Scenario> {
    let fetch = || Step::get("fetch", "/store/inventory");

    let has_keys = INVENTORY_KEYS
        .iter()
        .fold(fetch(), |step, key| step.expect(Assertion::has_field(*key)));
    let numeric = INVENTORY_KEYS.iter().fold(fetch(), |step, key| {
        step.expect(Assertion::field_type(*key, JsonKind::Number))
    });

    vec![
        Scenario::new("inventory responds")
            .group(INVENTORY)
            .step(fetch().expect(Assertion::Status(200))),
        Scenario::new("inventory is JSON")
            .group(INVENTORY)
            .step(fetch().expect(Assertion::header_matches("content-type", "application/json"))),
        Scenario::new("inventory has status keys")
            .group(INVENTORY)
            .step(has_keys),
        Scenario::new("inventory counts are numbers")
            .group(INVENTORY)
            .step(numeric),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_suite_is_valid() {
        for scenario in suite() {
            scenario
                .validate()
                .unwrap_or_else(|e| panic!("{}: {}", scenario.name, e));
        }
    }

    #[test]
    fn test_scenario_names_unique() {
        let scenarios = suite();
        let names: HashSet<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), scenarios.len());
        assert_eq!(scenarios.len(), 17);
    }

    #[test]
    fn test_writes_use_generated_ids() {
        for scenario in suite() {
            for step in &scenario.steps {
                let Some(body) = &step.request.body else {
                    continue;
                };
                match body.get("id") {
                    Some(id) if id.is_string() => assert_eq!(id, "{{pet_id}}", "{}", scenario.name),
                    Some(id) => assert_eq!(id, &json!(UNKNOWN_UPDATE_ID), "{}", scenario.name),
                    None => assert_eq!(scenario.name, "incomplete pet is rejected"),
                }
            }
        }
    }

    #[test]
    fn test_filter_by_group() {
        let inventory = filtered(Some("inventory"));
        assert_eq!(inventory.len(), 4);
        assert!(inventory.iter().all(|s| s.group.as_deref() == Some(INVENTORY)));
        assert_eq!(filtered(None).len(), suite().len());
        assert!(filtered(Some("no such scenario")).is_empty());
    }
}
