use anyhow::Result;
use std::env;
use tokio::time;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use machine_telemetry::classify::RiskPresentation;
use machine_telemetry::display::DisplayModel;
use machine_telemetry::{Config, Viewer};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Console presenter: one structured log line per frame.
fn render(model: &DisplayModel) {
    if !model.has_data {
        info!(status = %model.status_text, "Waiting for first telemetry snapshot");
        return;
    }

    let (risk_label, risk_color, failure_probability) = match &model.prediction {
        RiskPresentation::Pending => ("analysing", "neutral", None),
        RiskPresentation::Ready { label, color, failure_probability, .. } => {
            (label.as_str(), color.as_class(), Some(*failure_probability))
        }
    };

    info!(
        status = %model.status_text,
        status_color = model.status_color_class,
        temperature = model.temperature,
        temperature_flag = model.temperature_flag.label,
        pressure = model.pressure,
        pressure_flag = model.pressure_flag.label,
        vibration = model.vibration,
        cycles = %model.cycle_count_formatted,
        alerts = model.alerts.len(),
        risk = risk_label,
        risk_color,
        failure_probability,
        history_points = model.history.len(),
        age_ms = model.age_ms,
        stale = model.stale,
        "Machine telemetry"
    );
    for alert in &model.alerts {
        warn!(kind = %alert.kind, at = %alert.timestamp, "{}", alert.message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::load()?;
    info!("Viewer starting with config: {:?}", config);

    let mut viewer = Viewer::from_config(&config)?;
    viewer.start();

    let mut render_interval = time::interval(config.render_interval());

    loop {
        tokio::select! {
            _ = render_interval.tick() => {
                let model = viewer.display_model();
                render(&model);
                if let Some(e) = viewer.last_error() {
                    if model.stale {
                        warn!(code = e.code, at = %e.at, "Showing stale telemetry: {}", e.message);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    viewer.stop().await;
    info!(stats = ?viewer.stats(), "Viewer stopped");
    Ok(())
}
