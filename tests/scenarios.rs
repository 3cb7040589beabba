use std::sync::Arc;
use std::time::Duration;

use machine_telemetry::classify::{Color, PanelState, RiskBucket, RiskPresentation};
use machine_telemetry::config::{Config, SourceKind};
use machine_telemetry::net::decode_snapshot;
use machine_telemetry::source::ScriptedSource;
use machine_telemetry::{ErrorKind, MachineStatus, Snapshot, TelemetryError, Viewer};

fn config() -> Config {
    Config {
        poll_interval_ms: 5000,
        request_timeout_ms: 4000,
        source: SourceKind::Simulated,
        ..Config::default()
    }
}

fn tick(temperature: f64, timestamp: &str) -> Snapshot {
    Snapshot {
        temperature,
        pressure: 55.0,
        status: MachineStatus::Running,
        timestamp: timestamp.to_string(),
        ..Snapshot::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_fallback_before_any_fetch() {
    let viewer = Viewer::new(Arc::new(ScriptedSource::new()), &config());
    let current = viewer.state().current();

    assert_eq!(current.status, MachineStatus::Offline);
    assert!(current.alerts.is_empty());
    assert!(current.prediction.is_none());
    assert!(viewer.display_model().is_fallback);
    assert!(!viewer.display_model().has_data);
}

#[tokio::test(start_paused = true)]
async fn test_reported_offline_status_reads_as_fallback() {
    let body = r#"{"status":"Offline","temperature":20}"#;
    let source = ScriptedSource::new().respond(decode_snapshot(body).unwrap());
    let mut viewer = Viewer::new(Arc::new(source), &config());

    viewer.start();
    tokio::time::sleep(Duration::from_millis(1)).await;
    let model = viewer.display_model();
    viewer.stop().await;

    assert!(viewer.state().current().is_fallback());
    assert!(model.is_fallback);
    assert!(model.has_data);
    assert_eq!(model.temperature, 20.0);
}

#[tokio::test(start_paused = true)]
async fn test_running_machine_running_hot() {
    let body = r#"{"status":"Running","temperature":125,"pressure":50,"alerts":[]}"#;
    let source = ScriptedSource::new().respond(decode_snapshot(body).unwrap());
    let mut viewer = Viewer::new(Arc::new(source), &config());

    viewer.start();
    tokio::time::sleep(Duration::from_millis(1)).await;
    let model = viewer.display_model();
    viewer.stop().await;

    assert_eq!(model.temperature_flag.label, "High");
    assert_eq!(model.pressure_flag.label, "Normal");
    assert_eq!(model.status_color_class, "green");
    assert_eq!(model.prediction.panel_state(), PanelState::Pending);
    assert!(model.alerts.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_risk_label_kept_while_color_follows_probability() {
    let body = r#"{"prediction":{"failureProbability":72,"riskLevel":"Low","maintenanceDate":"2025-01-01"}}"#;
    let source = ScriptedSource::new().respond(decode_snapshot(body).unwrap());
    let mut viewer = Viewer::new(Arc::new(source), &config());

    viewer.start();
    tokio::time::sleep(Duration::from_millis(1)).await;
    let model = viewer.display_model();
    viewer.stop().await;

    match model.prediction {
        RiskPresentation::Ready { label, bucket, color, bar_percent, maintenance_date, .. } => {
            assert_eq!(label, "Low");
            assert_eq!(bucket, RiskBucket::High);
            assert_eq!(color, Color::Red);
            assert_eq!(bar_percent, 72.0);
            assert_eq!(maintenance_date, "2025-01-01");
        }
        other => panic!("expected ready prediction panel, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_network_error_keeps_last_good_snapshot() {
    let source = Arc::new(
        ScriptedSource::new()
            .respond(tick(100.0, "t1"))
            .respond(tick(101.0, "t2"))
            .fail(TelemetryError::Network("connection reset".to_string()))
            .respond(tick(103.0, "t4")),
    );
    let mut viewer = Viewer::new(source.clone(), &config());

    viewer.start();
    // ticks at 0s, 5s, 10s
    tokio::time::sleep(Duration::from_millis(10_100)).await;

    assert_eq!(viewer.state().current().timestamp, "t2");
    assert_eq!(viewer.state().current().temperature, 101.0);
    let error = viewer.last_error().unwrap();
    assert_eq!(error.kind, ErrorKind::Network);
    assert!(!viewer.display_model().is_fallback);

    // last good reading is now two intervals old
    tokio::time::sleep(Duration::from_millis(4_800)).await;
    assert!(viewer.display_model().stale);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(viewer.state().current().timestamp, "t4");
    assert!(!viewer.display_model().stale);
    assert_eq!(source.calls(), 4);

    let stats = viewer.stats();
    assert_eq!(stats.successes, 3);
    assert_eq!(stats.failures, 1);
    viewer.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_fetch_outstanding() {
    let source = Arc::new(
        ScriptedSource::new()
            .respond(tick(100.0, "before"))
            .respond_after(Duration::from_secs(3), tick(150.0, "late")),
    );
    let mut viewer = Viewer::new(source.clone(), &config());

    viewer.start();
    tokio::time::sleep(Duration::from_millis(6_000)).await;
    assert_eq!(source.calls(), 2);
    let before = viewer.state().current();

    viewer.stop().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(*viewer.state().current(), *before);
    assert_eq!(viewer.state().current().timestamp, "before");
    assert!(!viewer.is_running());
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_prediction_panel_is_not_sticky() {
    let with_prediction = decode_snapshot(
        r#"{"status":"Running","prediction":{"failureProbability":12.5,"riskLevel":"Low","maintenanceDate":"2025-02-01"}}"#,
    )
    .unwrap();
    let without_prediction = decode_snapshot(r#"{"status":"Running"}"#).unwrap();
    let source = ScriptedSource::new().respond(with_prediction).respond(without_prediction);
    let mut viewer = Viewer::new(Arc::new(source), &config());

    viewer.start();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(viewer.display_model().prediction.panel_state(), PanelState::Ready);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(viewer.display_model().prediction.panel_state(), PanelState::Pending);
    viewer.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_are_notified_per_accepted_snapshot() {
    let source = ScriptedSource::new()
        .respond(tick(100.0, "t1"))
        .fail(TelemetryError::Protocol { status: 500 })
        .respond(tick(102.0, "t3"));
    let mut viewer = Viewer::new(Arc::new(source), &config());
    let mut rx = viewer.subscribe();

    viewer.start();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().snapshot.timestamp, "t1");

    rx.changed().await.unwrap();
    let current = rx.borrow_and_update().clone();
    assert_eq!(current.snapshot.timestamp, "t3");
    assert_eq!(current.updates, 2);
    viewer.stop().await;
}
