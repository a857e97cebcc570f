//! TDC configuration
//!
//! Everything here is fixed at construction. [`TdcConfig::validate`] is the
//! only place configuration errors are raised.

use serde::{Deserialize, Serialize};

use super::circuit::{DelayRole, RingVariant, MIN_STAGES};
use super::clock::Ticks;

/// Widest supported wrap counter
pub const MAX_COUNTER_BITS: u32 = 32;

/// Configuration errors, reported at construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `n_delay` below the minimum ring length
    #[error("N_DELAY must be at least {MIN_STAGES}, got {n_delay}")]
    RingTooShort {
        /// Requested ring length
        n_delay: usize,
    },

    /// `n_ctr` is zero
    #[error("N_CTR must be at least 1")]
    CounterTooNarrow,

    /// `n_ctr` beyond [`MAX_COUNTER_BITS`]
    #[error("N_CTR must be at most {MAX_COUNTER_BITS}, got {n_ctr}")]
    CounterTooWide {
        /// Requested width
        n_ctr: u32,
    },

    /// An edge-shaping line of length zero
    #[error("{line} line needs at least one delay element")]
    EmptyEdgeLine {
        /// Which line
        line: &'static str,
    },

    /// A gate delay of zero ticks
    #[error("{role} delay must be non-zero")]
    ZeroDelay {
        /// Which delay
        role: &'static str,
    },
}

/// Propagation delays per gate role, in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GateDelays {
    /// Edge-shaping line inverter
    pub line_inv: Ticks,
    /// Stage-0 injection NOR
    pub ring_nor: Ticks,
    /// Hold-gated NAND
    pub ring_nand: Ticks,
    /// Buffering and tap inverters
    pub ring_inv: Ticks,
    /// Interleave merge gate
    pub merge: Ticks,
}

impl Default for GateDelays {
    fn default() -> Self {
        Self {
            line_inv: 50,
            ring_nor: 50,
            ring_nand: 30,
            ring_inv: 20,
            merge: 20,
        }
    }
}

impl GateDelays {
    /// Unit-delay model: every plain ring stage and every line element takes
    /// `2 * half_stage` ticks
    ///
    /// With `half_stage = 1` one "time unit per stage" is two ticks.
    pub const fn symmetric(half_stage: Ticks) -> Self {
        Self {
            line_inv: 2 * half_stage,
            ring_nor: 2 * half_stage,
            ring_nand: half_stage,
            ring_inv: half_stage,
            merge: half_stage,
        }
    }

    /// Delay used by elements of `role`
    pub const fn for_role(&self, role: DelayRole) -> Ticks {
        match role {
            DelayRole::Line => self.line_inv,
            DelayRole::Injection => self.ring_nor,
            DelayRole::Gate => self.ring_nand,
            DelayRole::Buffer | DelayRole::Tap => self.ring_inv,
            DelayRole::Merge => self.merge,
        }
    }

    /// Reject zero delays
    ///
    /// A zero-delay element inside the ring would schedule at the current
    /// tick and break the same-tick class ordering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("line_inv", self.line_inv),
            ("ring_nor", self.ring_nor),
            ("ring_nand", self.ring_nand),
            ("ring_inv", self.ring_inv),
            ("merge", self.merge),
        ];
        match fields.iter().find(|(_, delay)| *delay == 0) {
            Some(&(role, _)) => Err(ConfigError::ZeroDelay { role }),
            None => Ok(()),
        }
    }
}

/// Construction-time parameters of one TDC instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TdcConfig {
    /// Ring length (N_DELAY)
    pub n_delay: usize,
    /// Wrap counter width in bits (N_CTR)
    pub n_ctr: u32,
    /// Start line length (N_START_DEL)
    pub n_start_del: usize,
    /// Stop line length (N_STOP_DEL)
    pub n_stop_del: usize,
    /// Interleaved topology
    pub interleaved: bool,
    /// Expose the debug taps
    pub debug_enabled: bool,
    /// Gate delays
    pub delays: GateDelays,
}

impl Default for TdcConfig {
    fn default() -> Self {
        Self {
            n_delay: 64,
            n_ctr: 8,
            n_start_del: 16,
            n_stop_del: 8,
            interleaved: true,
            debug_enabled: false,
            delays: GateDelays::default(),
        }
    }
}

impl TdcConfig {
    /// Plain ring with default widths and the given delays
    pub fn plain(n_delay: usize, n_ctr: u32, delays: GateDelays) -> Self {
        Self {
            n_delay,
            n_ctr,
            interleaved: false,
            delays,
            ..Self::default()
        }
    }

    /// Interleaved ring with default widths and the given delays
    pub fn interleaved(n_delay: usize, n_ctr: u32, delays: GateDelays) -> Self {
        Self {
            interleaved: true,
            ..Self::plain(n_delay, n_ctr, delays)
        }
    }

    /// Parse from TOML; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Topology variant selected by `interleaved`
    pub fn variant(&self) -> RingVariant {
        if self.interleaved {
            RingVariant::Interleaved
        } else {
            RingVariant::Plain
        }
    }

    /// Counter modulus, 2^N_CTR
    pub fn counter_modulus(&self) -> u64 {
        1u64 << self.n_ctr
    }

    /// Check every parameter
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_delay < MIN_STAGES {
            return Err(ConfigError::RingTooShort { n_delay: self.n_delay });
        }
        if self.n_ctr == 0 {
            return Err(ConfigError::CounterTooNarrow);
        }
        if self.n_ctr > MAX_COUNTER_BITS {
            return Err(ConfigError::CounterTooWide { n_ctr: self.n_ctr });
        }
        if self.n_start_del == 0 {
            return Err(ConfigError::EmptyEdgeLine { line: "start" });
        }
        if self.n_stop_del == 0 {
            return Err(ConfigError::EmptyEdgeLine { line: "stop" });
        }
        self.delays.validate()
    }
}
