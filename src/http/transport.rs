//! Transport seam between the runner and the network
//!
//! The runner only sees [`Transport`]; production uses [`HttpTransport`]
//! backed by reqwest, tests substitute scripted transports.

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use super::{Method, ResponseBody, ResponseCapture};
use crate::common::{Error, Result};

/// A fully rendered request, ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Value>,
}

/// Sends one request and captures the response
///
/// Implementations make exactly one attempt. Any failure to obtain a
/// complete response is an [`Error::Transport`]; HTTP error statuses are
/// not failures at this layer.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> Result<ResponseCapture>;
}

/// reqwest-backed transport
///
/// No request timeout is configured; a hung request stalls only the
/// scenario that issued it.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("petstore-contract/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<ResponseCapture> {
        let method = request.method.as_str();
        let url = request.url.as_str();

        let mut builder = self
            .client
            .request(request.method.into(), request.url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::transport(method, url, describe(&e)))?;

        let status = response.status().as_u16();
        let mut capture = ResponseCapture::new(status, ResponseBody::Empty);
        for (name, value) in response.headers() {
            capture.append_header(name.as_str(), &String::from_utf8_lossy(value.as_bytes()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::transport(method, url, describe(&e)))?;
        capture.body = ResponseBody::from_bytes(&bytes);

        tracing::debug!(%method, %url, status, "response captured");
        Ok(capture)
    }
}

/// Flatten a reqwest error and its sources into one line
fn describe(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_body() || err.is_decode() {
        "failed reading body"
    } else {
        "request failed"
    };

    let mut message = kind.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
