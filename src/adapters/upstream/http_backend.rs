//! HTTP generation backend.
//!
//! Posts the request as JSON and exposes the chunked response body as a
//! line stream.
//!
//! # Configuration
//!
//! ```ignore
//! let config = HttpBackendConfig::new("http://localhost:8000")
//!     .with_read_timeout(Duration::from_secs(300));
//!
//! let backend = HttpGenerationBackend::new(config)?;
//! ```

use async_trait::async_trait;
use futures::stream;
use reqwest::{Client, Response};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::line_buffer::{line_stream, StreamLimits, DEFAULT_MAX_LINE_LENGTH};
use crate::ports::{GenerationBackend, GenerationRequest, LineStream, UpstreamError};

/// Configuration for the HTTP backend.
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Scheme, host and port of the generation service.
    pub base_url: String,
    /// Path of the streaming endpoint.
    pub stream_path: String,
    /// Deadline for establishing the TCP/TLS connection.
    pub connect_timeout: Duration,
    /// Longest silence tolerated while waiting for headers or body bytes.
    ///
    /// This bounds idle gaps, not the total length of a reply.
    pub read_timeout: Duration,
    /// Longest line accepted from the response body.
    pub max_line_length: usize,
}

impl HttpBackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            stream_path: "/api/v1/chat/stream".to_string(),
            connect_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(300),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    pub fn with_stream_path(mut self, path: impl Into<String>) -> Self {
        self.stream_path = path.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    pub fn stream_limits(&self) -> StreamLimits {
        StreamLimits {
            read_timeout: self.read_timeout,
            max_line_length: self.max_line_length,
        }
    }

    /// Full URL of the streaming endpoint.
    pub fn stream_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.stream_path.trim_start_matches('/')
        )
    }
}

/// Generation backend reached over HTTP.
pub struct HttpGenerationBackend {
    config: HttpBackendConfig,
    client: Client,
}

impl HttpGenerationBackend {
    /// Builds the backend and its HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the client cannot be constructed.
    pub fn new(config: HttpBackendConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| UpstreamError::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    async fn send(&self, request: &GenerationRequest) -> Result<Response, UpstreamError> {
        let pending = self
            .client
            .post(self.config.stream_url())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send();

        tokio::time::timeout(self.config.read_timeout, pending)
            .await
            .map_err(|_| UpstreamError::Timeout)?
            .map_err(map_reqwest_error)
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    async fn open(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<LineStream, UpstreamError> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpstreamError::Cancelled),
            response = self.send(&request) => response?,
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Generation backend rejected request");
            let failure = UpstreamError::Status {
                status: status.as_u16(),
            };
            return Ok(Box::pin(stream::once(async move { Err(failure) })));
        }

        Ok(line_stream(
            response.bytes_stream(),
            cancel,
            self.config.stream_limits(),
            map_reqwest_error,
        ))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::transport(e.to_string())
    }
}
