//! HTTP transport seam.
//!
//! The uploader builds fully signed [`http::Request`]s and hands them to a
//! [`Transport`]. [`ReqwestTransport`] sends them over the network; tests
//! substitute in-memory implementations.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};

/// Errors raised while delivering a request.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP client failed (connect, TLS, timeout, or body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The request could not be converted for the client.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The connection failed for a reason reported by a non-`reqwest` transport.
    #[error("connection failed: {0}")]
    Connection(String),
}

/// Sends a signed request and returns the buffered response.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send `request`. Non-2xx statuses are returned, not treated as errors.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response was received.
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Http`] if the client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let request = reqwest::Request::try_from(request)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response = self.client.execute(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let mut converted = Response::new(body);
        *converted.status_mut() = status;
        *converted.headers_mut() = headers;
        Ok(converted)
    }
}
