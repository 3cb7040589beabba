//! Display classification of snapshot fields.
//!
//! Everything here is pure: the same snapshot and thresholds always give the
//! same labels.

use serde::{Deserialize, Serialize};

use crate::types::{MachineStatus, Prediction, Snapshot};

pub const TEMPERATURE_HIGH_C: f64 = 120.0;
pub const PRESSURE_HIGH_BAR: f64 = 70.0;
/// Probabilities below this are `Low`.
pub const RISK_MODERATE_FROM: f64 = 30.0;
/// Probabilities at or above this are `High`.
pub const RISK_HIGH_FROM: f64 = 65.0;

/// Readings strictly above a threshold are `High`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    pub temperature_high_c: f64,
    pub pressure_high_bar: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            temperature_high_c: TEMPERATURE_HIGH_C,
            pressure_high_bar: PRESSURE_HIGH_BAR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Color {
    Green,
    Yellow,
    Red,
    Neutral,
}

impl Color {
    pub fn as_class(&self) -> &'static str {
        match self {
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Red => "red",
            Color::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReadingStatus {
    Normal,
    High,
}

impl ReadingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ReadingStatus::Normal => "Normal",
            ReadingStatus::High => "High",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            ReadingStatus::Normal => Color::Green,
            ReadingStatus::High => Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskBucket {
    Low,
    Moderate,
    High,
}

impl RiskBucket {
    pub fn color(&self) -> Color {
        match self {
            RiskBucket::Low => Color::Green,
            RiskBucket::Moderate => Color::Yellow,
            RiskBucket::High => Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PanelState {
    Pending,
    Ready,
}

/// How the prediction panel is drawn.
///
/// `label` is the source's `riskLevel` text as received. `bucket` and `color`
/// come from the probability alone, so the two may disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state")]
pub enum RiskPresentation {
    Pending,
    Ready {
        label: String,
        bucket: RiskBucket,
        color: Color,
        failure_probability: f64,
        bar_percent: f64,
        maintenance_date: String,
    },
}

impl RiskPresentation {
    pub fn panel_state(&self) -> PanelState {
        match self {
            RiskPresentation::Pending => PanelState::Pending,
            RiskPresentation::Ready { .. } => PanelState::Ready,
        }
    }
}

pub fn temperature_status(temperature: f64, thresholds: &Thresholds) -> ReadingStatus {
    if temperature > thresholds.temperature_high_c {
        ReadingStatus::High
    } else {
        ReadingStatus::Normal
    }
}

pub fn pressure_status(pressure: f64, thresholds: &Thresholds) -> ReadingStatus {
    if pressure > thresholds.pressure_high_bar {
        ReadingStatus::High
    } else {
        ReadingStatus::Normal
    }
}

pub fn status_color(status: &MachineStatus) -> Color {
    match status {
        MachineStatus::Running => Color::Green,
        MachineStatus::Idle => Color::Yellow,
        MachineStatus::Error => Color::Red,
        _ => Color::Neutral,
    }
}

pub fn risk_bucket(failure_probability: f64) -> RiskBucket {
    if failure_probability < RISK_MODERATE_FROM {
        RiskBucket::Low
    } else if failure_probability < RISK_HIGH_FROM {
        RiskBucket::Moderate
    } else {
        RiskBucket::High
    }
}

pub fn risk_presentation(prediction: Option<&Prediction>) -> RiskPresentation {
    let Some(prediction) = prediction else {
        return RiskPresentation::Pending;
    };
    let bucket = risk_bucket(prediction.failure_probability);
    let bar_percent = if prediction.failure_probability.is_nan() {
        0.0
    } else {
        prediction.failure_probability.clamp(0.0, 100.0)
    };

    RiskPresentation::Ready {
        label: prediction.risk_level.as_str().to_string(),
        bucket,
        color: bucket.color(),
        failure_probability: prediction.failure_probability,
        bar_percent,
        maintenance_date: prediction.maintenance_date.clone(),
    }
}

/// All display labels for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub temperature: ReadingStatus,
    pub pressure: ReadingStatus,
    pub status_color: Color,
    pub risk: RiskPresentation,
}

pub fn classify(snapshot: &Snapshot, thresholds: &Thresholds) -> Classification {
    Classification {
        temperature: temperature_status(snapshot.temperature, thresholds),
        pressure: pressure_status(snapshot.pressure, thresholds),
        status_color: status_color(&snapshot.status),
        risk: risk_presentation(snapshot.prediction.as_ref()),
    }
}
