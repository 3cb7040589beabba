use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Operating state reported by the machine.
///
/// Decoding never fails: names outside the known set are kept verbatim in
/// `Other` so they can still be shown and classified.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum MachineStatus {
    Running,
    Idle,
    Error,
    #[default]
    Offline,
    MaintenanceDue,
    Other(String),
}

impl MachineStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MachineStatus::Running => "Running",
            MachineStatus::Idle => "Idle",
            MachineStatus::Error => "Error",
            MachineStatus::Offline => "Offline",
            MachineStatus::MaintenanceDue => "MaintenanceDue",
            MachineStatus::Other(s) => s,
        }
    }
}

impl From<String> for MachineStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Running" => MachineStatus::Running,
            "Idle" => MachineStatus::Idle,
            "Error" => MachineStatus::Error,
            "Offline" => MachineStatus::Offline,
            "MaintenanceDue" => MachineStatus::MaintenanceDue,
            _ => MachineStatus::Other(value),
        }
    }
}

impl From<MachineStatus> for String {
    fn from(value: MachineStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk label as supplied by the source. Shown as text only; the display
/// color comes from the probability bucket instead.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Other(String),
}

impl RiskLevel {
    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
            RiskLevel::Other(s) => s,
        }
    }
}

impl From<String> for RiskLevel {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Low" => RiskLevel::Low,
            "Moderate" => RiskLevel::Moderate,
            "High" => RiskLevel::High,
            _ => RiskLevel::Other(value),
        }
    }
}

impl From<RiskLevel> for String {
    fn from(value: RiskLevel) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub failure_probability: f64,
    #[serde(default)]
    pub maintenance_date: String,
    pub risk_level: RiskLevel,
}

// Chart input only
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct HistoryPoint {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub pressure: f64,
    #[serde(default)]
    pub vibration: f64,
}

/// One reading bundle from the telemetry endpoint.
///
/// Every field is optional on the wire. The `Default` value doubles as the
/// fallback shown before the first successful fetch: all zeros with the
/// `Offline` status sentinel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    /// °C
    #[serde(deserialize_with = "null_as_default")]
    pub temperature: f64,
    /// bar
    #[serde(deserialize_with = "null_as_default")]
    pub pressure: f64,
    /// g
    #[serde(deserialize_with = "null_as_default")]
    pub vibration: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub cycle_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub status: MachineStatus,
    #[serde(deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(deserialize_with = "null_as_default")]
    pub alerts: Vec<Alert>,
    pub prediction: Option<Prediction>,
    #[serde(deserialize_with = "null_as_default")]
    pub history: Vec<HistoryPoint>,
}

/// An explicit `null` decodes the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Snapshot {
    pub fn fallback() -> Self {
        Snapshot::default()
    }

    /// True when the status is the `Offline` sentinel, whether synthetic or
    /// reported by the source. Zero readings alone never mean "no data".
    pub fn is_fallback(&self) -> bool {
        self.status == MachineStatus::Offline
    }
}
