//! HTTP client for the analytics collector
//!
//! One `POST` per event, form-encoded, no retries. Every failure comes back
//! as a [`TransportError`] so the dispatcher can decide what to do with it.

use std::time::Duration;

use crate::config::DispatchConfig;
use crate::error::{Error, Result, TransportError};
use crate::user_agent::UserAgent;

use super::event::EventPayload;

/// HTTP client for the collector endpoint
///
/// Cheap to clone; clones share one connection pool and user agent.
#[derive(Debug, Clone)]
pub struct CollectorClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl CollectorClient {
    /// Create a new collector client
    ///
    /// The user agent is fixed for the lifetime of the client.
    pub fn new(config: &DispatchConfig, user_agent: &UserAgent) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .user_agent(user_agent.as_str())
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim().to_string(),
        })
    }

    /// Send one event payload
    ///
    /// Returns the HTTP status on success.
    pub async fn send(
        &self,
        payload: &EventPayload,
        timeout: Duration,
    ) -> std::result::Result<u16, TransportError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .timeout(timeout)
            .form(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(TransportError::Status(status.as_u16()))
        }
    }

    /// Collector URL events are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
