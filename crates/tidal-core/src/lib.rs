pub mod config;
pub mod traits;
pub mod types;

pub use config::{ConfigError, HttpSettings, MAX_DURATION, ScalingConfig, TidalConfig};
pub use traits::{TelemetrySource, WorkloadController};
pub use types::*;
