//! Error types for the contract harness
//!
//! These are harness-level errors: bad configuration, unreadable scenario
//! files, transport failures. Contract violations found while running a
//! scenario are not errors; they are recorded in the scenario's outcome.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the contract harness
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Invalid endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // === Scenario Errors ===
    #[error("Failed to read scenario file '{path}': {error}")]
    ScenarioRead { path: String, error: String },

    #[error("Failed to parse scenario file '{path}': {error}")]
    ScenarioParse { path: String, error: String },

    #[error("Invalid scenario '{scenario}': {reason}")]
    InvalidScenario { scenario: String, reason: String },

    #[error("No value bound for '{{{{{0}}}}}'")]
    Unbound(String),

    // === Transport Errors ===
    #[error("{method} {url} failed: {message}")]
    Transport {
        method: String,
        url: String,
        message: String,
    },

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid endpoint error
    pub fn invalid_endpoint(url: &str, reason: impl ToString) -> Self {
        Self::InvalidEndpoint {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid scenario error
    pub fn invalid_scenario(scenario: &str, reason: impl ToString) -> Self {
        Self::InvalidScenario {
            scenario: scenario.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a transport error for a request
    pub fn transport(method: &str, url: &str, message: impl ToString) -> Self {
        Self::Transport {
            method: method.to_string(),
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether this error came from the network rather than the harness
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_message_shows_placeholder() {
        let err = Error::Unbound("pet_id".to_string());
        assert_eq!(err.to_string(), "No value bound for '{{pet_id}}'");
    }

    #[test]
    fn test_transport_classification() {
        let err = Error::transport("GET", "http://localhost/pet/1", "connection refused");
        assert!(err.is_transport());
        assert_eq!(
            err.to_string(),
            "GET http://localhost/pet/1 failed: connection refused"
        );
        assert!(!Error::Config("x".to_string()).is_transport());
    }
}
