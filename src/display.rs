use serde::Serialize;
use std::time::Duration;

use crate::classify::{classify, ReadingStatus, RiskPresentation, Thresholds};
use crate::state::Current;
use crate::types::{Alert, HistoryPoint};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flag {
    pub label: &'static str,
    pub color: &'static str,
}

impl From<ReadingStatus> for Flag {
    fn from(status: ReadingStatus) -> Self {
        Flag {
            label: status.label(),
            color: status.color().as_class(),
        }
    }
}

/// Read-only projection a renderer consumes on each frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayModel {
    pub temperature: f64,
    pub pressure: f64,
    pub vibration: f64,
    pub cycle_count_formatted: String,
    pub status_text: String,
    pub status_color_class: &'static str,
    pub temperature_flag: Flag,
    pub pressure_flag: Flag,
    pub alerts: Vec<Alert>,
    pub prediction: RiskPresentation,
    pub history: Vec<HistoryPoint>,
    pub timestamp: String,
    /// Status is the `Offline` sentinel, so the numbers are not a live reading.
    pub is_fallback: bool,
    /// At least one snapshot has been accepted from the source.
    pub has_data: bool,
    pub age_ms: Option<u64>,
    pub stale: bool,
}

pub fn display_model(current: &Current, thresholds: &Thresholds, poll_interval: Duration) -> DisplayModel {
    let snapshot = &current.snapshot;
    let classification = classify(snapshot, thresholds);
    let age = current.age();

    DisplayModel {
        temperature: snapshot.temperature,
        pressure: snapshot.pressure,
        vibration: snapshot.vibration,
        cycle_count_formatted: format_thousands(snapshot.cycle_count),
        status_text: snapshot.status.to_string(),
        status_color_class: classification.status_color.as_class(),
        temperature_flag: classification.temperature.into(),
        pressure_flag: classification.pressure.into(),
        alerts: snapshot.alerts.clone(),
        prediction: classification.risk,
        history: snapshot.history.clone(),
        timestamp: snapshot.timestamp.clone(),
        is_fallback: snapshot.is_fallback(),
        has_data: current.is_available(),
        age_ms: age.map(|a| a.as_millis() as u64),
        stale: age.map_or(false, |a| a > poll_interval),
    }
}

/// `12840` → `"12,840"`.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
