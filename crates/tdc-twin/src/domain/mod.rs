//! Domain Layer - the TDC twin assembly
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  Clock Module                  Circuit Module               │
//! │  ├─ VirtualClock<B>            ├─ NetTable / DelayElement   │
//! │  ├─ ProductionBackend          ├─ EdgeShapingLine           │
//! │  └─ VerificationBackend        └─ RingTopology / Ring       │
//! │                                                             │
//! │  Counter / Capture             Simulation Module            │
//! │  ├─ WrapCounter                └─ Tdc<B>                    │
//! │  └─ CaptureUnit                                             │
//! │                                                             │
//! │  Waveform                      Calibration                  │
//! │  └─ WaveformRecorder           └─ PhaseCalibration          │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Type Aliases
//!
//! - `ProductionTdc`: heap scheduler behind a `parking_lot` lock
//! - `VerificationTdc`: bounded linear-scan scheduler, same results
//!
//! Both backends are monomorphized into `Tdc<B>`, so choosing one costs
//! nothing at run time.
//!
//! ```rust
//! use tdc_twin::domain::*;
//!
//! let mut tdc = TdcBuilder::new()
//!     .stages(4)
//!     .counter_bits(2)
//!     .interleaved(false)
//!     .delays(GateDelays::symmetric(1))
//!     .build()
//!     .unwrap();
//!
//! let snapshot = tdc.measure(0, 200).unwrap();
//! assert_eq!(snapshot.ring.to_string(), "1111");
//! assert_eq!(snapshot.counter, 3);
//! ```

pub mod calibration;
pub mod capture;
pub mod circuit;
pub mod clock;
pub mod config;
pub mod counter;
pub mod error;
pub mod simulation;
pub mod waveform;

pub use calibration::{CalibrationError, Measurement, PhaseCalibration, PhaseEntry, WARMUP_LAPS};
pub use capture::{CaptureSnapshot, CaptureUnit, RaceEvent, RaceFlags};
pub use circuit::{
    EdgeShapingLine, GateFunction, LineRole, NetId, NetTable, RingOscillator, RingTopology, RingVariant, RingVector,
    StageDescriptor, TopologyError,
};
pub use clock::{ClockBackend, ClockError, EventClass, EventId, LogicalTimestamp, Ticks, VirtualClock};
pub use config::{ConfigError, GateDelays, TdcConfig, MAX_COUNTER_BITS};
pub use counter::{CounterAction, CounterEdge, WrapCounter};
pub use error::TdcError;
pub use simulation::{verification_capacity, ProductionTdc, Tdc, VerificationTdc};
pub use waveform::{DebugTaps, RecorderError, Transition, WaveformRecorder, DEFAULT_MAX_TRANSITIONS};

/// Fluent construction of a [`Tdc`]
///
/// # Example
///
/// ```rust
/// use tdc_twin::domain::TdcBuilder;
///
/// let tdc = TdcBuilder::new()
///     .stages(8)
///     .counter_bits(4)
///     .record_waveform(10_000)
///     .build()
///     .unwrap();
/// assert!(tdc.waveform().is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TdcBuilder {
    config: TdcConfig,
    waveform_capacity: Option<usize>,
}

impl TdcBuilder {
    /// Start from [`TdcConfig::default`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: TdcConfig) -> Self {
        Self {
            config,
            waveform_capacity: None,
        }
    }

    /// Ring length
    pub fn stages(mut self, n_delay: usize) -> Self {
        self.config.n_delay = n_delay;
        self
    }

    /// Counter width in bits
    pub fn counter_bits(mut self, n_ctr: u32) -> Self {
        self.config.n_ctr = n_ctr;
        self
    }

    /// Start line length
    pub fn start_delay(mut self, n_start_del: usize) -> Self {
        self.config.n_start_del = n_start_del;
        self
    }

    /// Stop line length
    pub fn stop_delay(mut self, n_stop_del: usize) -> Self {
        self.config.n_stop_del = n_stop_del;
        self
    }

    /// Select the interleaved topology
    pub fn interleaved(mut self, interleaved: bool) -> Self {
        self.config.interleaved = interleaved;
        self
    }

    /// Expose the debug taps
    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug_enabled = enabled;
        self
    }

    /// Gate delays
    pub fn delays(mut self, delays: GateDelays) -> Self {
        self.config.delays = delays;
        self
    }

    /// Record every net transition, up to `capacity`
    pub fn record_waveform(mut self, capacity: usize) -> Self {
        self.waveform_capacity = Some(capacity);
        self
    }

    /// Configuration assembled so far
    pub fn config(&self) -> &TdcConfig {
        &self.config
    }

    /// Build on the production scheduler
    pub fn build(self) -> Result<ProductionTdc, TdcError> {
        let mut tdc = Tdc::production(self.config)?;
        if let Some(capacity) = self.waveform_capacity {
            tdc.enable_waveform(capacity);
        }
        Ok(tdc)
    }

    /// Build on the bounded scheduler
    pub fn build_verification(self) -> Result<VerificationTdc, TdcError> {
        let mut tdc = Tdc::verification(self.config)?;
        if let Some(capacity) = self.waveform_capacity {
            tdc.enable_waveform(capacity);
        }
        Ok(tdc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = TdcBuilder::new();
        assert_eq!(builder.config(), &TdcConfig::default());

        let tdc = builder.build().unwrap();
        assert_eq!(tdc.ring().len(), 64);
        assert!(tdc.waveform().is_none());
        assert!(tdc.debug().is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let tdc = TdcBuilder::new()
            .stages(5)
            .counter_bits(3)
            .start_delay(4)
            .stop_delay(2)
            .interleaved(false)
            .debug(true)
            .build()
            .unwrap();

        let config = tdc.config();
        assert_eq!(config.n_delay, 5);
        assert_eq!(config.n_ctr, 3);
        assert_eq!(config.n_start_del, 4);
        assert_eq!(config.n_stop_del, 2);
        assert_eq!(config.variant(), RingVariant::Plain);
        assert!(tdc.debug().is_some());
    }

    #[test]
    fn test_builder_rejects_invalid() {
        assert!(matches!(
            TdcBuilder::new().stages(2).build(),
            Err(TdcError::Config(ConfigError::RingTooShort { n_delay: 2 }))
        ));
        assert!(matches!(
            TdcBuilder::new().counter_bits(0).build_verification(),
            Err(TdcError::Config(ConfigError::CounterTooNarrow))
        ));
    }

    #[test]
    fn test_production_and_verification_agree() {
        let builder = TdcBuilder::new()
            .stages(4)
            .counter_bits(2)
            .interleaved(false)
            .delays(GateDelays::symmetric(1));

        let mut production = builder.clone().build().unwrap();
        let mut verification = builder.build_verification().unwrap();

        let a = production.measure(0, 200).unwrap();
        let b = verification.measure(0, 200).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.ring.to_string(), "1111");
        assert_eq!(a.counter, 3);
    }

    #[test]
    fn test_builder_waveform() {
        let mut tdc = TdcBuilder::new()
            .stages(4)
            .interleaved(false)
            .delays(GateDelays::symmetric(1))
            .record_waveform(1_000)
            .build()
            .unwrap();

        tdc.set_start(0, true).unwrap();
        tdc.run_until(100).unwrap();

        let x0 = tdc.ring().ring_start();
        let rises = tdc.waveform().unwrap().rising_edges(x0);
        assert_eq!(rises[..3], [34, 50, 66]);
    }
}
