use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::TelemetryError;
use crate::source::TelemetrySource;
use crate::types::Snapshot;

/// Fetches snapshots with `GET <endpoint>`.
pub struct HttpSource {
    client: Client,
    endpoint_url: String,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(endpoint_url: impl Into<String>, timeout: Duration) -> Result<Self, TelemetryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TelemetryError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint_url: endpoint_url.into(),
            timeout,
        })
    }

    fn map_error(&self, e: reqwest::Error) -> TelemetryError {
        if e.is_timeout() {
            TelemetryError::Timeout(self.timeout)
        } else if let Some(status) = e.status() {
            TelemetryError::Protocol { status: status.as_u16() }
        } else if e.is_decode() || e.is_body() {
            TelemetryError::Decode(e.to_string())
        } else {
            TelemetryError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl TelemetrySource for HttpSource {
    async fn fetch(&self) -> Result<Snapshot, TelemetryError> {
        let response = self
            .client
            .get(&self.endpoint_url)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::Protocol { status: status.as_u16() });
        }

        let text = response.text().await.map_err(|e| self.map_error(e))?;
        let snapshot = decode_snapshot(&text)?;
        debug!(
            status = %snapshot.status,
            timestamp = %snapshot.timestamp,
            alerts = snapshot.alerts.len(),
            "Fetched snapshot"
        );
        Ok(snapshot)
    }

    fn name(&self) -> &str {
        "http"
    }
}

pub fn decode_snapshot(body: &str) -> Result<Snapshot, TelemetryError> {
    if body.trim().is_empty() {
        return Err(TelemetryError::Decode("empty response body".to_string()));
    }
    Ok(serde_json::from_str(body)?)
}
