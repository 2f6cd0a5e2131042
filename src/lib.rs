//! Pet store contract harness
//!
//! Describes the pet store REST API as independent, order-agnostic
//! scenarios and verifies a live (or mock) service against them.

pub mod cli;
pub mod commands;
pub mod common;
pub mod http;
pub mod petstore;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use http::Endpoint;
pub use testing::{Outcome, Scenario, ScenarioRunner, Step, Summary};
