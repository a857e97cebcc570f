//! Scripted stimulus
//!
//! A [`StimulusPlan`] is an ordered list of edges on the two input pins.
//! Running it schedules every edge up front, then advances the instance
//! through each rising stop edge and collects the capture it produced:
//!
//! ```text
//! i_start ──┐______________┌────────
//!           rise@0         fall@300   ...
//! i_stop  ─────────────┐_____________
//!                      rise@200  ──▶ snapshot
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::clock::{ClockBackend, ClockError, Ticks};
use crate::domain::{CaptureSnapshot, Tdc, TdcError};

/// Input pin of the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pin {
    /// `i_start`
    Start,
    /// `i_stop`
    Stop,
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "i_start"),
            Self::Stop => write!(f, "i_stop"),
        }
    }
}

/// One level change on a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// When the level changes
    pub at: Ticks,
    /// Which pin
    pub pin: Pin,
    /// New level
    pub level: bool,
}

impl Edge {
    fn is_stop_rise(&self) -> bool {
        self.pin == Pin::Stop && self.level
    }
}

/// Ordered edge script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusPlan {
    edges: Vec<Edge>,
}

impl StimulusPlan {
    /// Empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Rising start at `start`, rising stop at `stop`
    pub fn measurement(start: Ticks, stop: Ticks) -> Self {
        Self::new().rise(Pin::Start, start).rise(Pin::Stop, stop)
    }

    /// Drive `pin` high at `at`
    pub fn rise(self, pin: Pin, at: Ticks) -> Self {
        self.edge(Edge { at, pin, level: true })
    }

    /// Drive `pin` low at `at`
    pub fn fall(self, pin: Pin, at: Ticks) -> Self {
        self.edge(Edge { at, pin, level: false })
    }

    /// High at `at`, low again `width` ticks later
    ///
    /// # Errors
    /// [`ClockError::Overflow`] if the falling edge lands past the last tick.
    pub fn pulse(self, pin: Pin, at: Ticks, width: Ticks) -> Result<Self, ClockError> {
        let end = at
            .checked_add(width)
            .ok_or(ClockError::Overflow { now: at, delay: width })?;
        Ok(self.rise(pin, at).fall(pin, end))
    }

    /// Append an edge, keeping the plan sorted by time
    ///
    /// Edges at the same instant keep their insertion order.
    pub fn edge(mut self, edge: Edge) -> Self {
        let index = self.edges.partition_point(|e| e.at <= edge.at);
        self.edges.insert(index, edge);
        self
    }

    /// Edges in time order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Time of the last edge
    pub fn end_time(&self) -> Option<Ticks> {
        self.edges.last().map(|e| e.at)
    }

    /// Number of rising stop edges
    pub fn stop_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_stop_rise()).count()
    }

    /// Schedule every edge on `tdc` without advancing time
    pub fn apply<B: ClockBackend>(&self, tdc: &mut Tdc<B>) -> Result<(), TdcError> {
        for edge in &self.edges {
            match edge.pin {
                Pin::Start => tdc.set_start(edge.at, edge.level)?,
                Pin::Stop => tdc.set_stop(edge.at, edge.level)?,
            };
        }
        Ok(())
    }

    /// Schedule the plan, then run through it collecting captures
    ///
    /// One snapshot is returned for every rising stop edge that produced a
    /// capture; a rise on a pin that is already high produces none. After
    /// the last edge the instance keeps running for `settle` ticks.
    pub fn run<B: ClockBackend>(&self, tdc: &mut Tdc<B>, settle: Ticks) -> Result<Vec<CaptureSnapshot>, TdcError> {
        self.apply(tdc)?;

        let mut snapshots = Vec::with_capacity(self.stop_count());
        for edge in self.edges.iter().filter(|e| e.is_stop_rise()) {
            let before = tdc.capture_count();
            tdc.run_until(edge.at)?;
            if tdc.capture_count() > before {
                snapshots.push(tdc.result().clone());
            }
        }

        if let Some(end) = self.end_time() {
            let now = end.max(tdc.now());
            let until = now
                .checked_add(settle)
                .ok_or(ClockError::Overflow { now, delay: settle })?;
            tdc.run_until(until)?;
        }

        tracing::debug!(edges = self.edges.len(), captures = snapshots.len(), "stimulus plan complete");
        Ok(snapshots)
    }
}
