//! Runtime configuration
//!
//! The harness has no configuration file. The endpoint comes from the
//! `--base-url` flag, then the `PETSTORE_BASE_URL` environment variable,
//! then the public sandbox.

use crate::http::Endpoint;

use super::{Error, Result};

/// Public pet store sandbox
pub const DEFAULT_BASE_URL: &str = "https://petstore.swagger.io/v2";

/// Environment variable that overrides the endpoint
pub const BASE_URL_ENV: &str = "PETSTORE_BASE_URL";

/// Default number of scenarios in flight at once
pub const DEFAULT_JOBS: usize = 4;

/// Resolved harness configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Service under test
    pub endpoint: Endpoint,
    /// Maximum number of scenarios running concurrently
    pub jobs: usize,
    /// Print per-step detail in the report
    pub verbose: bool,
}

impl Config {
    /// Build a configuration from CLI values
    ///
    /// `base_url` is the flag value; when absent the environment and then
    /// the default are consulted.
    pub fn resolve(base_url: Option<String>, jobs: Option<usize>, verbose: bool) -> Result<Self> {
        let url = resolve_base_url(base_url, std::env::var(BASE_URL_ENV).ok());
        let endpoint = Endpoint::parse(&url)?;

        let jobs = jobs.unwrap_or(DEFAULT_JOBS);
        if jobs == 0 {
            return Err(Error::Config("--jobs must be at least 1".to_string()));
        }

        Ok(Self {
            endpoint,
            jobs,
            verbose,
        })
    }
}

/// Pick the base URL: explicit flag, then environment, then default.
/// Blank values are treated as unset.
pub fn resolve_base_url(flag: Option<String>, env: Option<String>) -> String {
    flag.filter(|s| !s.trim().is_empty())
        .or_else(|| env.filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}
