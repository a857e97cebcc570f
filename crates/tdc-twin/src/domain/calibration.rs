//! Phase calibration and decoding
//!
//! Turns a raw [`CaptureSnapshot`] back into a time interval. Calibration
//! free-runs a fresh instance and learns three things:
//!
//! ```text
//! start ──▶ first x[0] rise           injection latency
//!           x[0] rise ──▶ x[0] rise   period (after warm-up laps)
//!           ring vector ──▶ offset    phase table for one steady lap
//! ```
//!
//! Decoding is then
//!
//! ```text
//! interval = latency + ((counter - 1) mod 2^N_CTR) * period + offset(ring)
//! ```
//!
//! The result is exact at transition instants and floors to the previous
//! transition in between, so the error is bounded by the phase step that
//! contains the stop edge. It is only unique modulo `2^N_CTR * period`, and
//! intervals shorter than the injection latency fall in the dead zone.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::capture::CaptureSnapshot;
use super::circuit::{RingVariant, RingVector};
use super::clock::{ClockBackend, Ticks};
use super::config::TdcConfig;
use super::error::TdcError;
use super::simulation::Tdc;

/// Laps discarded before the period is trusted
pub const WARMUP_LAPS: usize = 4;

/// Calibration failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalibrationError {
    /// The ring did not lap often enough
    #[error("ring completed {laps} laps within {window} ticks, expected {expected}")]
    NoOscillation {
        /// Laps seen
        laps: usize,
        /// Laps needed
        expected: usize,
        /// Search window
        window: Ticks,
    },

    /// Two consecutive steady laps differ
    #[error("period has not settled: {first} then {second} ticks")]
    IrregularPeriod {
        /// First measured lap
        first: Ticks,
        /// Following lap
        second: Ticks,
    },

    /// One ring vector appears twice in a lap
    #[error("ring vector {vector} appears at offsets {first} and {second}")]
    AmbiguousPhase {
        /// Repeated vector
        vector: RingVector,
        /// First offset
        first: Ticks,
        /// Second offset
        second: Ticks,
    },
}

/// One row of the phase table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseEntry {
    /// Ticks after the lap's `ring_start` rise
    pub offset: Ticks,
    /// Vector held from this offset until the next entry
    pub ring: RingVector,
}

/// A decoded interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    /// Whole laps after the first `ring_start` rise
    pub laps: u64,
    /// Offset inside the lap
    pub fine: Ticks,
    /// Start-to-stop estimate
    pub interval: Ticks,
}

/// Calibrated phase-to-time mapping of one configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseCalibration {
    variant: RingVariant,
    injection_latency: Ticks,
    period: Ticks,
    counter_modulus: u64,
    phases: Vec<PhaseEntry>,
    #[serde(skip)]
    index: HashMap<RingVector, Ticks>,
}

impl PhaseCalibration {
    /// Calibrate `config` on a fresh production instance
    pub fn measure(config: &TdcConfig) -> Result<Self, TdcError> {
        Self::measure_with(Tdc::production(config.clone())?)
    }

    /// Calibrate using a caller-supplied instance
    ///
    /// The instance must be idle with both inputs low; the start edge is
    /// applied at its current time.
    pub fn measure_with<B: ClockBackend>(mut tdc: Tdc<B>) -> Result<Self, TdcError> {
        let origin = tdc.now();
        let expected = WARMUP_LAPS + 3;
        let window = search_window(&tdc);
        let ring_start = tdc.ring().ring_start();

        tdc.set_start(origin, true)?;

        let mut rises: Vec<Ticks> = Vec::with_capacity(expected);
        let mut previous = false;
        let mut trail: Vec<(Ticks, RingVector)> = Vec::new();
        while rises.len() < expected {
            let Some(elapsed) = tdc
                .advance_instant()?
                .map(|at| at - origin)
                .filter(|&elapsed| elapsed <= window)
            else {
                return Err(CalibrationError::NoOscillation {
                    laps: rises.len(),
                    expected,
                    window,
                }
                .into());
            };

            let x0 = tdc.nets().level(ring_start);
            if x0 && !previous {
                rises.push(elapsed);
            }
            previous = x0;

            if rises.len() > WARMUP_LAPS {
                let vector = tdc.ring_vector();
                if trail.last().map_or(true, |(_, last)| *last != vector) {
                    trail.push((elapsed, vector));
                }
            }
        }

        let lap_start = rises[WARMUP_LAPS];
        let first = rises[WARMUP_LAPS + 1] - lap_start;
        let second = rises[WARMUP_LAPS + 2] - rises[WARMUP_LAPS + 1];
        if first != second {
            return Err(CalibrationError::IrregularPeriod { first, second }.into());
        }

        let mut index = HashMap::new();
        let mut phases = Vec::new();
        for (at, ring) in trail.into_iter().take_while(|(at, _)| *at < lap_start + first) {
            let offset = at - lap_start;
            if let Some(&seen) = index.get(&ring) {
                return Err(CalibrationError::AmbiguousPhase {
                    vector: ring,
                    first: seen,
                    second: offset,
                }
                .into());
            }
            index.insert(ring.clone(), offset);
            phases.push(PhaseEntry { offset, ring });
        }

        tracing::debug!(
            variant = %tdc.config().variant(),
            latency = rises[0],
            period = first,
            phases = phases.len(),
            "phase calibration complete"
        );

        Ok(Self {
            variant: tdc.config().variant(),
            injection_latency: rises[0],
            period: first,
            counter_modulus: tdc.config().counter_modulus(),
            phases,
            index,
        })
    }

    /// Topology that was calibrated
    pub fn variant(&self) -> RingVariant {
        self.variant
    }

    /// Start edge to first `ring_start` rise
    pub fn injection_latency(&self) -> Ticks {
        self.injection_latency
    }

    /// Steady-state oscillation period
    pub fn period(&self) -> Ticks {
        self.period
    }

    /// Distinguishable ring vectors per period
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Phase table in offset order
    pub fn phases(&self) -> &[PhaseEntry] {
        &self.phases
    }

    /// Offset of `ring` inside a lap
    pub fn offset_of(&self, ring: &RingVector) -> Option<Ticks> {
        if self.index.is_empty() {
            // Deserialized tables carry no index
            return self.phases.iter().find(|p| &p.ring == ring).map(|p| p.offset);
        }
        self.index.get(ring).copied()
    }

    /// Gap from each phase to the next, wrapping at the period
    pub fn steps(&self) -> Vec<Ticks> {
        let mut offsets: Vec<Ticks> = self.phases.iter().map(|p| p.offset).collect();
        offsets.push(self.period);
        offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Smallest phase step
    pub fn finest_step(&self) -> Ticks {
        self.steps().into_iter().min().unwrap_or(self.period)
    }

    /// Largest phase step
    pub fn coarsest_step(&self) -> Ticks {
        self.steps().into_iter().max().unwrap_or(self.period)
    }

    /// Period divided by phase count
    pub fn mean_step(&self) -> f64 {
        self.period as f64 / self.phases.len().max(1) as f64
    }

    /// Unambiguous measurement range, `2^N_CTR * period`
    pub fn range(&self) -> Ticks {
        self.counter_modulus.saturating_mul(self.period)
    }

    /// Convert a snapshot into an interval
    ///
    /// `None` when the ring vector never occurs in steady state, which is
    /// the case for captures taken before the first lap or after a hold.
    pub fn decode(&self, snapshot: &CaptureSnapshot) -> Option<Measurement> {
        let fine = self.offset_of(&snapshot.ring)?;
        let modulus = self.counter_modulus;
        let laps = (u64::from(snapshot.counter) + modulus - 1) % modulus;
        Some(Measurement {
            laps,
            fine,
            interval: self.injection_latency + laps * self.period + fine,
        })
    }
}

/// Generous upper bound for the calibration run
fn search_window<B: ClockBackend>(tdc: &Tdc<B>) -> Ticks {
    let config = tdc.config();
    let lap = tdc.ring().topology().primary_period(&config.delays);
    let latency = tdc.start_line().span() + lap;
    2 * (latency + (WARMUP_LAPS as Ticks + 4) * lap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::GateDelays;

    #[test]
    fn test_plain_unit_calibration() {
        let cal = PhaseCalibration::measure(&TdcConfig::plain(4, 8, GateDelays::symmetric(1))).unwrap();

        assert_eq!(cal.variant(), RingVariant::Plain);
        assert_eq!(cal.injection_latency(), 34);
        assert_eq!(cal.period(), 16);
        assert_eq!(cal.phase_count(), 8);
        assert_eq!(cal.finest_step(), 2);
        assert_eq!(cal.coarsest_step(), 2);
        assert_eq!(cal.range(), 256 * 16);

        let offsets: Vec<_> = cal.phases().iter().map(|p| (p.offset, p.ring.to_string())).collect();
        assert_eq!(offsets[0], (0, "1000".to_string()));
        assert_eq!(offsets[3], (6, "1111".to_string()));
        assert_eq!(offsets[7], (14, "0000".to_string()));
    }

    #[test]
    fn test_decode_round_trip_at_transition() {
        let config = TdcConfig::plain(4, 8, GateDelays::symmetric(1));
        let cal = PhaseCalibration::measure(&config).unwrap();

        let mut tdc = Tdc::production(config).unwrap();
        let snapshot = tdc.measure(0, 200).unwrap();
        let decoded = cal.decode(&snapshot).unwrap();

        assert_eq!(decoded.laps, 10);
        assert_eq!(decoded.fine, 6);
        assert_eq!(decoded.interval, 200);
    }

    #[test]
    fn test_decode_unknown_vector() {
        let cal = PhaseCalibration::measure(&TdcConfig::plain(3, 4, GateDelays::symmetric(1))).unwrap();
        let mut snapshot = CaptureSnapshot::initial(3);
        // Never seen in steady state
        snapshot.ring = "101".parse().unwrap();
        assert!(cal.decode(&snapshot).is_none());
    }

    #[test]
    fn test_serialized_table_still_decodes() {
        let cal = PhaseCalibration::measure(&TdcConfig::plain(4, 8, GateDelays::symmetric(1))).unwrap();
        let json = serde_json::to_string(&cal).unwrap();
        let restored: PhaseCalibration = serde_json::from_str(&json).unwrap();

        let ring: RingVector = "1110".parse().unwrap();
        assert_eq!(restored.offset_of(&ring), Some(4));
        assert_eq!(restored.offset_of(&ring), cal.offset_of(&ring));
    }
}
