use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::types::Snapshot;

/// What readers see: the snapshot plus when it was accepted.
#[derive(Debug, Clone)]
pub struct Current {
    pub snapshot: Arc<Snapshot>,
    /// `None` while the fallback is shown.
    pub updated_at: Option<Instant>,
    pub updates: u64,
}

impl Current {
    fn fallback() -> Self {
        Current {
            snapshot: Arc::new(Snapshot::fallback()),
            updated_at: None,
            updates: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.updated_at.is_some()
    }

    pub fn age(&self) -> Option<Duration> {
        self.updated_at.map(|at| at.elapsed())
    }
}

/// Holds the most recently accepted snapshot.
///
/// Snapshots are swapped whole behind a `watch` channel, so a reader gets
/// either the previous or the next value, never a mix.
pub struct TelemetryState {
    tx: watch::Sender<Current>,
}

impl TelemetryState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Current::fallback());
        Self { tx }
    }

    /// Latest snapshot, or the Offline fallback before the first update.
    pub fn current(&self) -> Arc<Snapshot> {
        self.tx.borrow().snapshot.clone()
    }

    /// Latest snapshot, `None` until one has arrived.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        let current = self.tx.borrow();
        current.is_available().then(|| current.snapshot.clone())
    }

    pub fn load(&self) -> Current {
        self.tx.borrow().clone()
    }

    pub fn update(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        self.tx.send_modify(|current| {
            *current = Current {
                snapshot,
                updated_at: Some(Instant::now()),
                updates: current.updates + 1,
            };
            debug!(updates = current.updates, status = %current.snapshot.status, "Snapshot replaced");
        });
    }

    /// Time since the last accepted snapshot.
    pub fn age(&self) -> Option<Duration> {
        self.tx.borrow().age()
    }

    /// Older than `poll_interval`. The fallback is never stale, only absent.
    pub fn is_stale(&self, poll_interval: Duration) -> bool {
        self.age().map_or(false, |age| age > poll_interval)
    }

    pub fn subscribe(&self) -> watch::Receiver<Current> {
        self.tx.subscribe()
    }
}

impl Default for TelemetryState {
    fn default() -> Self {
        Self::new()
    }
}
