//! Generation backend configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::upstream::{HttpBackendConfig, DEFAULT_MAX_LINE_LENGTH};

/// Where and how to reach the generation backend
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds between response bytes
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Longest line accepted from the backend's body
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Adapter configuration for the HTTP backend.
    pub fn backend_config(&self) -> HttpBackendConfig {
        HttpBackendConfig::new(self.base_url.clone())
            .with_stream_path(self.stream_path.clone())
            .with_connect_timeout(self.connect_timeout())
            .with_read_timeout(self.read_timeout())
            .with_max_line_length(self.max_line_bytes)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidUpstreamUrl);
        }
        if self.connect_timeout_secs == 0 || self.read_timeout_secs == 0 {
            return Err(ValidationError::InvalidUpstreamTimeout);
        }
        if self.max_line_bytes == 0 {
            return Err(ValidationError::InvalidMaxLineLength);
        }
        Ok(())
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            stream_path: default_stream_path(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_stream_path() -> String {
    "/api/v1/chat/stream".to_string()
}

fn default_connect_timeout() -> u64 {
    60
}

fn default_read_timeout() -> u64 {
    300
}

fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}
