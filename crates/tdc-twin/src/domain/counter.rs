//! Wrap counter
//!
//! Counts laps of the ring. Two triggers reach it:
//!
//! | Trigger                     | Effect                              |
//! |-----------------------------|-------------------------------------|
//! | rising `start_pulse`        | reset to 0                          |
//! | rising `ring_start` (x[0])  | reset if `start_pulse` is high,     |
//! |                             | otherwise increment mod 2^N_CTR     |
//!
//! Overflow wraps silently.

use serde::{Deserialize, Serialize};

use super::clock::Ticks;

/// Which edge reached the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterEdge {
    /// Rising start monopulse
    StartPulse,
    /// Rising stage-0 output
    RingStart,
}

/// What an edge did to the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterAction {
    /// Value forced to zero
    Reset,
    /// Value advanced by one
    Increment {
        /// Whether the value wrapped to zero
        wrapped: bool,
    },
}

/// N_CTR-bit lap counter
#[derive(Debug, Clone)]
pub struct WrapCounter {
    width: u32,
    mask: u32,
    value: u32,
    last_update: Option<Ticks>,
}

impl WrapCounter {
    /// Create a counter `width` bits wide (1..=32), starting at zero
    pub fn new(width: u32) -> Self {
        debug_assert!((1..=32).contains(&width));
        let mask = if width >= 32 { u32::MAX } else { (1u32 << width) - 1 };
        Self {
            width,
            mask,
            value: 0,
            last_update: None,
        }
    }

    /// Current value
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Width in bits
    pub fn width(&self) -> u32 {
        self.width
    }

    /// 2^width
    pub fn modulus(&self) -> u64 {
        u64::from(self.mask) + 1
    }

    /// Tick of the last reset or increment
    pub fn last_update(&self) -> Option<Ticks> {
        self.last_update
    }

    /// Force to zero
    pub fn reset(&mut self, at: Ticks) {
        self.value = 0;
        self.last_update = Some(at);
    }

    /// Advance by one, wrapping
    ///
    /// # Returns
    /// `true` if the value wrapped to zero
    pub fn increment(&mut self, at: Ticks) -> bool {
        self.value = self.value.wrapping_add(1) & self.mask;
        self.last_update = Some(at);
        self.value == 0
    }

    /// Apply a trigger edge
    pub fn on_edge(&mut self, edge: CounterEdge, start_pulse: bool, at: Ticks) -> CounterAction {
        match edge {
            CounterEdge::StartPulse => {
                self.reset(at);
                CounterAction::Reset
            }
            CounterEdge::RingStart if start_pulse => {
                self.reset(at);
                CounterAction::Reset
            }
            CounterEdge::RingStart => CounterAction::Increment {
                wrapped: self.increment(at),
            },
        }
    }
}
