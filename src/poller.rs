use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::TelemetryError;
use crate::source::TelemetrySource;
use crate::types::Snapshot;

type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Snapshot, TelemetryError>> + Send + 'a>>;

#[derive(Debug, Default)]
struct PollCounters {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    skipped_ticks: AtomicU64,
    discarded: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub skipped_ticks: u64,
    /// Results that arrived after their poll generation was cancelled.
    pub discarded: u64,
}

impl PollCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn read(&self) -> PollStats {
        PollStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            skipped_ticks: self.skipped_ticks.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// Polls a `TelemetrySource` at a fixed rate.
///
/// The first fetch is issued on `start`, then one per interval measured from
/// the start of each tick. At most one fetch is outstanding; ticks that land
/// while it is running are skipped. Each fetch is bounded by the request
/// timeout, so a stalled request cannot starve later ticks.
///
/// Every `start` opens a new generation. `stop` retires the generation,
/// aborts the task and waits for it, so no callback runs once it returns.
pub struct PollingClient {
    source: Arc<dyn TelemetrySource>,
    request_timeout: Duration,
    generation: Arc<AtomicU64>,
    counters: Arc<PollCounters>,
    handle: Option<JoinHandle<()>>,
}

impl PollingClient {
    pub fn new(source: Arc<dyn TelemetrySource>, request_timeout: Duration) -> Self {
        Self {
            source,
            request_timeout,
            generation: Arc::new(AtomicU64::new(0)),
            counters: Arc::new(PollCounters::default()),
            handle: None,
        }
    }

    /// Starts polling. A client that is already running is restarted and
    /// its previous generation's results are dropped.
    ///
    /// Must be called within a tokio runtime.
    pub fn start<S, E>(&mut self, interval: Duration, on_snapshot: S, on_error: E)
    where
        S: FnMut(Snapshot) + Send + 'static,
        E: FnMut(TelemetryError) + Send + 'static,
    {
        self.retire();

        let interval = if interval.is_zero() {
            warn!("Poll interval of zero requested, using 1 ms");
            Duration::from_millis(1)
        } else {
            interval
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        info!(
            source = self.source.name(),
            interval_ms = interval.as_millis() as u64,
            timeout_ms = self.request_timeout.as_millis() as u64,
            generation,
            "Polling started"
        );

        let poll = PollLoop {
            source: self.source.clone(),
            interval,
            request_timeout: self.request_timeout,
            current_generation: self.generation.clone(),
            generation,
            counters: self.counters.clone(),
        };
        self.handle = Some(tokio::spawn(poll.run(on_snapshot, on_error)));
    }

    pub async fn stop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            // Wait for the task to unwind so a callback mid-flight finishes first.
            let _ = handle.await;
            info!(source = self.source.name(), "Polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    pub fn stats(&self) -> PollStats {
        self.counters.read()
    }

    fn retire(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for PollingClient {
    fn drop(&mut self) {
        self.retire();
    }
}

struct PollLoop {
    source: Arc<dyn TelemetrySource>,
    interval: Duration,
    request_timeout: Duration,
    current_generation: Arc<AtomicU64>,
    generation: u64,
    counters: Arc<PollCounters>,
}

impl PollLoop {
    fn is_current(&self) -> bool {
        self.current_generation.load(Ordering::SeqCst) == self.generation
    }

    async fn run<S, E>(self, mut on_snapshot: S, mut on_error: E)
    where
        S: FnMut(Snapshot),
        E: FnMut(TelemetryError),
    {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<FetchFuture<'_>> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if in_flight.is_some() {
                        PollCounters::bump(&self.counters.skipped_ticks);
                        debug!(generation = self.generation, "Fetch still outstanding, skipping tick");
                        continue;
                    }
                    PollCounters::bump(&self.counters.attempts);
                    debug!(source = self.source.name(), generation = self.generation, "Fetching snapshot");
                    in_flight = Some(Box::pin(fetch_bounded(self.source.as_ref(), self.request_timeout)));
                }
                result = wait_for(&mut in_flight) => {
                    in_flight = None;
                    if !self.is_current() {
                        PollCounters::bump(&self.counters.discarded);
                        debug!(generation = self.generation, "Discarding result of retired poll generation");
                        break;
                    }
                    match result {
                        Ok(snapshot) => {
                            PollCounters::bump(&self.counters.successes);
                            on_snapshot(snapshot);
                        }
                        Err(e) => {
                            PollCounters::bump(&self.counters.failures);
                            warn!(code = e.error_code(), error = %e, "Telemetry fetch failed");
                            on_error(e);
                        }
                    }
                }
            }
        }
    }
}

async fn fetch_bounded(source: &dyn TelemetrySource, limit: Duration) -> Result<Snapshot, TelemetryError> {
    match time::timeout(limit, source.fetch()).await {
        Ok(result) => result,
        Err(_) => Err(TelemetryError::Timeout(limit)),
    }
}

async fn wait_for(in_flight: &mut Option<FetchFuture<'_>>) -> Result<Snapshot, TelemetryError> {
    match in_flight {
        Some(fetch) => fetch.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::source::ScriptedSource;
    use crate::types::MachineStatus;
    use std::sync::Mutex;

    fn reading(temperature: f64) -> Snapshot {
        Snapshot {
            temperature,
            status: MachineStatus::Running,
            ..Snapshot::default()
        }
    }

    struct Recorder {
        snapshots: Arc<Mutex<Vec<Snapshot>>>,
        errors: Arc<Mutex<Vec<ErrorKind>>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                snapshots: Arc::new(Mutex::new(Vec::new())),
                errors: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn start(&self, client: &mut PollingClient, interval: Duration) {
            let snapshots = self.snapshots.clone();
            let errors = self.errors.clone();
            client.start(
                interval,
                move |s| snapshots.lock().unwrap().push(s),
                move |e| errors.lock().unwrap().push(e.kind()),
            );
        }

        fn temperatures(&self) -> Vec<f64> {
            self.snapshots.lock().unwrap().iter().map(|s| s.temperature).collect()
        }

        fn error_kinds(&self) -> Vec<ErrorKind> {
            self.errors.lock().unwrap().clone()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_is_immediate() {
        let source = Arc::new(ScriptedSource::new().respond(reading(101.0)));
        let mut client = PollingClient::new(source.clone(), Duration::from_secs(1));
        let recorder = Recorder::new();

        recorder.start(&mut client, Duration::from_secs(5));
        time::sleep(Duration::from_millis(1)).await;

        assert_eq!(recorder.temperatures(), vec![101.0]);
        assert_eq!(source.calls(), 1);
        client.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_rate_ticks() {
        let source = Arc::new(ScriptedSource::repeating(reading(100.0)));
        let mut client = PollingClient::new(source.clone(), Duration::from_secs(1));
        let recorder = Recorder::new();

        recorder.start(&mut client, Duration::from_secs(5));
        time::sleep(Duration::from_millis(10_500)).await;

        // t = 0, 5, 10
        assert_eq!(source.calls(), 3);
        assert_eq!(client.stats().successes, 3);
        client.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_skipped_while_fetch_outstanding() {
        let source = Arc::new(
            ScriptedSource::new()
                .respond_after(Duration::from_millis(2_500), reading(1.0))
                .respond(reading(2.0)),
        );
        let mut client = PollingClient::new(source.clone(), Duration::from_secs(10));
        let recorder = Recorder::new();

        recorder.start(&mut client, Duration::from_secs(1));
        time::sleep(Duration::from_millis(3_500)).await;

        let stats = client.stats();
        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.skipped_ticks, 2);
        assert_eq!(recorder.temperatures(), vec![1.0, 2.0]);
        client.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_fetch_times_out_and_polling_continues() {
        let source = Arc::new(
            ScriptedSource::new()
                .respond_after(Duration::from_secs(60), reading(1.0))
                .respond(reading(2.0)),
        );
        let mut client = PollingClient::new(source.clone(), Duration::from_secs(1));
        let recorder = Recorder::new();

        recorder.start(&mut client, Duration::from_secs(5));
        time::sleep(Duration::from_millis(5_500)).await;

        assert_eq!(recorder.error_kinds(), vec![ErrorKind::Network]);
        assert_eq!(recorder.temperatures(), vec![2.0]);
        client.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_not_fatal() {
        let source = Arc::new(
            ScriptedSource::new()
                .respond(reading(1.0))
                .fail(TelemetryError::Protocol { status: 500 })
                .fail(TelemetryError::Decode("truncated".to_string()))
                .respond(reading(4.0)),
        );
        let mut client = PollingClient::new(source, Duration::from_secs(1));
        let recorder = Recorder::new();

        recorder.start(&mut client, Duration::from_secs(1));
        time::sleep(Duration::from_millis(3_500)).await;

        assert_eq!(recorder.temperatures(), vec![1.0, 4.0]);
        assert_eq!(recorder.error_kinds(), vec![ErrorKind::Protocol, ErrorKind::Decode]);
        assert!(client.is_running());
        client.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_discards_in_flight_result() {
        let source = Arc::new(ScriptedSource::new().respond_after(Duration::from_secs(3), reading(9.0)));
        let mut client = PollingClient::new(source.clone(), Duration::from_secs(10));
        let recorder = Recorder::new();

        recorder.start(&mut client, Duration::from_secs(5));
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 1);

        client.stop().await;
        assert!(!client.is_running());
        time::sleep(Duration::from_secs(10)).await;

        assert!(recorder.temperatures().is_empty());
        assert!(recorder.error_kinds().is_empty());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_opens_new_generation() {
        let source = Arc::new(
            ScriptedSource::new()
                .respond_after(Duration::from_secs(3), reading(1.0))
                .respond(reading(2.0)),
        );
        let mut client = PollingClient::new(source.clone(), Duration::from_secs(10));
        let first = Recorder::new();
        let second = Recorder::new();

        first.start(&mut client, Duration::from_secs(5));
        time::sleep(Duration::from_secs(1)).await;
        second.start(&mut client, Duration::from_secs(5));
        time::sleep(Duration::from_secs(4)).await;

        assert!(first.temperatures().is_empty());
        assert_eq!(second.temperatures(), vec![2.0]);
        client.stop().await;
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let mut client = PollingClient::new(Arc::new(ScriptedSource::new()), Duration::from_secs(1));
        client.stop().await;
        assert!(!client.is_running());
        assert_eq!(client.stats(), PollStats::default());
    }
}
