use async_trait::async_trait;
use chrono::{DateTime, Duration, Local};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::classify::{risk_bucket, RiskBucket, PRESSURE_HIGH_BAR, TEMPERATURE_HIGH_C};
use crate::error::TelemetryError;
use crate::source::TelemetrySource;
use crate::types::{Alert, HistoryPoint, MachineStatus, Prediction, RiskLevel, Snapshot};

pub const HISTORY_LEN: usize = 20;
pub const VIBRATION_SPIKE_G: f64 = 2.5;

// Above either of these the simulated machine reports Error.
const ERROR_TEMPERATURE_C: f64 = 130.0;
const ERROR_PRESSURE_BAR: f64 = 80.0;

struct SimState {
    rng: StdRng,
    history: VecDeque<HistoryPoint>,
}

/// Generates plausible readings for a hydraulic molding machine locally,
/// with no endpoint involved.
pub struct SimulatedSource {
    state: Mutex<SimState>,
}

impl SimulatedSource {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            state: Mutex::new(SimState {
                rng,
                history: VecDeque::with_capacity(HISTORY_LEN),
            }),
        }
    }

    pub fn generate(&self, now: DateTime<Local>) -> Snapshot {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let SimState { rng, history } = &mut *state;
        generate_snapshot(rng, history, now)
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySource for SimulatedSource {
    async fn fetch(&self) -> Result<Snapshot, TelemetryError> {
        Ok(self.generate(Local::now()))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn generate_snapshot<R: Rng>(rng: &mut R, history: &mut VecDeque<HistoryPoint>, now: DateTime<Local>) -> Snapshot {
    let temperature = round2(rng.gen_range(90.0..=135.0));
    let pressure = round2(rng.gen_range(40.0..=85.0));
    let vibration = round2(rng.gen_range(0.2..=3.1));
    let cycle_count: u64 = rng.gen_range(10_000..=25_000);

    let status = if temperature < ERROR_TEMPERATURE_C && pressure < ERROR_PRESSURE_BAR {
        MachineStatus::Running
    } else {
        MachineStatus::Error
    };

    let timestamp = now.format("%H:%M:%S").to_string();

    history.push_back(HistoryPoint {
        timestamp: timestamp.clone(),
        temperature,
        pressure,
        vibration,
    });
    while history.len() > HISTORY_LEN {
        history.pop_front();
    }

    Snapshot {
        temperature,
        pressure,
        vibration,
        cycle_count,
        status,
        alerts: alerts_for(temperature, pressure, vibration, &timestamp),
        prediction: Some(predict(temperature, pressure, vibration, cycle_count, now)),
        history: history.iter().cloned().collect(),
        timestamp,
    }
}

/// Alerts raised for a single reading, in fixed order: temperature,
/// pressure, vibration.
pub fn alerts_for(temperature: f64, pressure: f64, vibration: f64, timestamp: &str) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if temperature > TEMPERATURE_HIGH_C {
        alerts.push(Alert {
            kind: "Temperature High".to_string(),
            message: format!("Temperature reached {}°C", temperature),
            timestamp: timestamp.to_string(),
        });
    }

    if pressure > PRESSURE_HIGH_BAR {
        alerts.push(Alert {
            kind: "Pressure High".to_string(),
            message: format!("Pressure reached {} bar", pressure),
            timestamp: timestamp.to_string(),
        });
    }

    if vibration > VIBRATION_SPIKE_G {
        alerts.push(Alert {
            kind: "Vibration Spike".to_string(),
            message: format!("Unusual vibration detected ({} g)", vibration),
            timestamp: timestamp.to_string(),
        });
    }

    alerts
}

/// Failure-probability heuristic in [0, 100].
pub fn failure_score(temperature: f64, pressure: f64, vibration: f64, cycle_count: u64) -> f64 {
    let score = (temperature - 90.0) * 0.7
        + (pressure - 40.0) * 0.6
        + (vibration - 0.2) * 10.0
        + (cycle_count as f64 - 10_000.0) / 500.0;
    round2(score).clamp(0.0, 100.0)
}

pub fn predict(temperature: f64, pressure: f64, vibration: f64, cycle_count: u64, now: DateTime<Local>) -> Prediction {
    let score = failure_score(temperature, pressure, vibration, cycle_count);
    let risk_level = match risk_bucket(score) {
        RiskBucket::Low => RiskLevel::Low,
        RiskBucket::Moderate => RiskLevel::Moderate,
        RiskBucket::High => RiskLevel::High,
    };
    let days_until_maintenance = (30 - (score / 3.0) as i64).max(1);
    let maintenance_date = (now + Duration::days(days_until_maintenance))
        .format("%Y-%m-%d")
        .to_string();

    Prediction {
        failure_probability: score,
        maintenance_date,
        risk_level,
    }
}
