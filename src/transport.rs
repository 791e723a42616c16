//! The transport seam: send a request, get a response, or fail.
//!
//! TLS, connection pooling and DNS all live behind [`Transport`]. The default
//! implementation is [`ReqwestTransport`].

use crate::{metadata::PendingRequest, response::RawResponse, Error, Result};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Sends one physical request.
///
/// Implementations must not retry; retries belong to the
/// [`RetryPolicy`](crate::RetryPolicy).
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends the request and returns the raw response, whatever its status.
    async fn send(&self, request: PendingRequest) -> Result<RawResponse>;
}

/// A [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with the given per-send timeout and optional proxy.
    ///
    /// Gzip-encoded responses are decompressed transparently.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the proxy URL is invalid or
    /// the underlying client cannot be built.
    pub fn new(timeout: Duration, proxy: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(timeout).gzip(true);

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::InvalidConfiguration(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| {
            Error::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self { client })
    }

    /// Wraps an already configured `reqwest::Client`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: PendingRequest) -> Result<RawResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
