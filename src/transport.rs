//! Upstream HTTP transport
//!
//! The cached fetcher only needs "perform a request, get status and body back",
//! so that capability is a trait and the reqwest client is one implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use thiserror::Error;

use crate::cache::Headers;

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Errors that can occur while performing an upstream request
#[derive(Debug, Error)]
pub enum TransportError {
    /// Method string is not a valid HTTP method
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// No response within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Could not connect to the server
    #[error("failed to connect: {0}")]
    Connect(String),

    /// Response body could not be read
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Any other request failure
    #[error("HTTP request failed: {0}")]
    Request(String),
}

impl TransportError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(timeout)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Performs one HTTP request
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(
        &self,
        method: &str,
        url: &str,
        headers: &Headers,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError>;
}

/// Transport backed by a reqwest client
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn perform(
        &self,
        method: &str,
        url: &str,
        headers: &Headers,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| TransportError::InvalidMethod(method.to_string()))?;

        let mut request = self.client.request(method, url).timeout(timeout);
        for (name, values) in headers {
            for value in values {
                request = request.header(name.as_str(), value.as_str());
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, timeout))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(e, timeout))?;

        Ok(RawResponse { status, body })
    }
}
