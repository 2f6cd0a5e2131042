//! HTTP plumbing for the harness
//!
//! The endpoint, the per-step request description, the captured response and
//! the transport seam that actually talks to the network.

mod capture;
mod transport;

pub use capture::{lookup, ResponseBody, ResponseCapture};
pub use transport::{HttpTransport, PreparedRequest, Transport};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::common::{Error, Result};

/// Base URL of the service under test
///
/// Request paths are appended to the base path, so a base of
/// `https://host/v2` and a path of `/pet/1` gives `https://host/v2/pet/1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    /// Validate and normalize a base URL
    pub fn parse(url: &str) -> Result<Self> {
        let trimmed = url.trim();
        let parsed = Url::parse(trimmed).map_err(|e| Error::invalid_endpoint(trimmed, e))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::invalid_endpoint(
                trimmed,
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(Error::invalid_endpoint(
                trimmed,
                "base URL must not carry a query or fragment",
            ));
        }

        Ok(Self {
            base: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// The normalized base URL, without a trailing slash
    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// Full URL for a request path
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base, path)
        } else {
            format!("{}/{}", self.base, path)
        };
        Url::parse(&joined).map_err(|e| Error::invalid_endpoint(&joined, e))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

/// HTTP methods the pet store contract uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "delete")]
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One request as declared by a scenario step
///
/// `path` and `body` may still contain `{{name}}` placeholders; they are
/// rendered right before the request is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let endpoint = Endpoint::parse("https://petstore.swagger.io/v2").unwrap();
        let url = endpoint.url_for("/pet/1").unwrap();
        assert_eq!(url.as_str(), "https://petstore.swagger.io/v2/pet/1");
    }

    #[test]
    fn test_endpoint_trailing_slash_normalized() {
        let endpoint = Endpoint::parse("http://127.0.0.1:8080/v2/").unwrap();
        assert_eq!(endpoint.as_str(), "http://127.0.0.1:8080/v2");
        let url = endpoint.url_for("store/inventory").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/v2/store/inventory");
    }

    #[test]
    fn test_endpoint_rejects_other_schemes() {
        assert!(Endpoint::parse("ftp://example.com/v2").is_err());
        assert!(Endpoint::parse("petstore").is_err());
        assert!(Endpoint::parse("http://example.com/v2?x=1").is_err());
    }

    #[test]
    fn test_method_accepts_lowercase() {
        let method: Method = serde_yaml::from_str("delete").unwrap();
        assert_eq!(method, Method::Delete);
        let method: Method = serde_yaml::from_str("PUT").unwrap();
        assert_eq!(method, Method::Put);
    }
}
