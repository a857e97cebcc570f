//! Crate-level error type

use super::calibration::CalibrationError;
use super::circuit::TopologyError;
use super::clock::ClockError;
use super::config::ConfigError;

/// Anything that can stop a TDC from being built or driven
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TdcError {
    /// Rejected configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Ring description failed validation
    #[error("invalid ring topology: {0}")]
    Topology(#[from] TopologyError),

    /// Scheduler refused an event
    #[error("scheduler: {0}")]
    Clock(#[from] ClockError),

    /// Phase calibration failed
    #[error("calibration: {0}")]
    Calibration(#[from] CalibrationError),
}
