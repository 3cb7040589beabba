pub mod classify;
pub mod config;
pub mod display;
pub mod error;
pub mod net;
pub mod poller;
pub mod simulate;
pub mod source;
pub mod state;
pub mod types;
pub mod viewer;

pub use classify::{classify, Classification, Thresholds};
pub use config::Config;
pub use display::DisplayModel;
pub use error::{ErrorKind, TelemetryError};
pub use poller::PollingClient;
pub use source::TelemetrySource;
pub use state::TelemetryState;
pub use types::{Alert, HistoryPoint, MachineStatus, Prediction, RiskLevel, Snapshot};
pub use viewer::Viewer;
