use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use crate::classify::Thresholds;
use crate::config::{Config, SourceKind};
use crate::display::{display_model, DisplayModel};
use crate::error::{ErrorKind, TelemetryError};
use crate::net::HttpSource;
use crate::poller::{PollStats, PollingClient};
use crate::simulate::SimulatedSource;
use crate::source::TelemetrySource;
use crate::state::{Current, TelemetryState};

#[derive(Debug, Clone, PartialEq)]
pub struct ReportedError {
    pub kind: ErrorKind,
    pub code: u32,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl From<&TelemetryError> for ReportedError {
    fn from(e: &TelemetryError) -> Self {
        ReportedError {
            kind: e.kind(),
            code: e.error_code(),
            message: e.to_string(),
            at: Utc::now(),
        }
    }
}

pub fn build_source(config: &Config) -> Result<Arc<dyn TelemetrySource>, TelemetryError> {
    match config.source {
        SourceKind::Http => Ok(Arc::new(HttpSource::new(config.endpoint_url.clone(), config.request_timeout())?)),
        SourceKind::Simulated => Ok(Arc::new(SimulatedSource::new())),
    }
}

/// One telemetry source feeding one state, with the display projection on top.
///
/// Which source is used is decided by the caller; nothing downstream of the
/// state cares whether readings are live or simulated.
pub struct Viewer {
    state: Arc<TelemetryState>,
    poller: PollingClient,
    thresholds: Thresholds,
    poll_interval: Duration,
    last_error: Arc<Mutex<Option<ReportedError>>>,
}

impl Viewer {
    pub fn new(source: Arc<dyn TelemetrySource>, config: &Config) -> Self {
        Self {
            state: Arc::new(TelemetryState::new()),
            poller: PollingClient::new(source, config.request_timeout()),
            thresholds: config.thresholds,
            poll_interval: config.poll_interval(),
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, TelemetryError> {
        Ok(Self::new(build_source(config)?, config))
    }

    pub fn start(&mut self) {
        let state = self.state.clone();
        let last_error = self.last_error.clone();
        self.poller.start(
            self.poll_interval,
            move |snapshot| state.update(snapshot),
            move |e| {
                let reported = ReportedError::from(&e);
                match last_error.lock() {
                    Ok(mut slot) => *slot = Some(reported),
                    Err(poisoned) => *poisoned.into_inner() = Some(reported),
                }
            },
        );
    }

    pub async fn stop(&mut self) {
        self.poller.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.poller.is_running()
    }

    pub fn state(&self) -> &Arc<TelemetryState> {
        &self.state
    }

    pub fn display_model(&self) -> DisplayModel {
        display_model(&self.state.load(), &self.thresholds, self.poll_interval)
    }

    pub fn subscribe(&self) -> watch::Receiver<Current> {
        self.state.subscribe()
    }

    pub fn last_error(&self) -> Option<ReportedError> {
        match self.last_error.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn stats(&self) -> PollStats {
        self.poller.stats()
    }
}
