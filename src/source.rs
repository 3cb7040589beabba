use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::TelemetryError;
use crate::types::Snapshot;

/// Where snapshots come from.
///
/// Production code uses `HttpSource`; `SimulatedSource` generates readings
/// locally and `ScriptedSource` replays canned responses. All of them plug
/// into the same poller and state.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Fetch the latest snapshot.
    async fn fetch(&self) -> Result<Snapshot, TelemetryError>;

    fn name(&self) -> &str;
}

struct Step {
    delay: Duration,
    result: Result<Snapshot, TelemetryError>,
}

/// Replays a fixed sequence of responses, one per fetch.
///
/// Once the script runs out it keeps answering with the `repeating`
/// snapshot if one was given, otherwise with a network error.
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    repeat: Option<Snapshot>,
    calls: AtomicU64,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            repeat: None,
            calls: AtomicU64::new(0),
        }
    }

    pub fn repeating(snapshot: Snapshot) -> Self {
        Self {
            repeat: Some(snapshot),
            ..Self::new()
        }
    }

    pub fn respond(self, snapshot: Snapshot) -> Self {
        self.push(Duration::ZERO, Ok(snapshot))
    }

    pub fn respond_after(self, delay: Duration, snapshot: Snapshot) -> Self {
        self.push(delay, Ok(snapshot))
    }

    pub fn fail(self, error: TelemetryError) -> Self {
        self.push(Duration::ZERO, Err(error))
    }

    fn push(self, delay: Duration, result: Result<Snapshot, TelemetryError>) -> Self {
        match self.steps.lock() {
            Ok(mut steps) => steps.push_back(Step { delay, result }),
            Err(poisoned) => poisoned.into_inner().push_back(Step { delay, result }),
        }
        self
    }

    /// Number of fetches issued so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Option<Step> {
        match self.steps.lock() {
            Ok(mut steps) => steps.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        }
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySource for ScriptedSource {
    async fn fetch(&self) -> Result<Snapshot, TelemetryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next_step() {
            Some(step) => {
                if !step.delay.is_zero() {
                    tokio::time::sleep(step.delay).await;
                }
                step.result
            }
            None => match &self.repeat {
                Some(snapshot) => Ok(snapshot.clone()),
                None => Err(TelemetryError::Network("no scripted response left".to_string())),
            },
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
