//! Waveform recording and debug taps
//!
//! The recorder keeps a bounded, time-ordered list of transitions on the
//! nets it watches: every ring stage output plus the two shaped control
//! signals. It is read-only with respect to the circuit; enabling it never
//! changes a measurement.

use serde::{Deserialize, Serialize};

use super::circuit::{NetId, RingVector};
use super::clock::Ticks;

/// Default transition budget
pub const DEFAULT_MAX_TRANSITIONS: usize = 100_000;

/// One recorded level change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// When the net moved
    pub at: Ticks,
    /// Which net
    pub net: NetId,
    /// New level
    pub level: bool,
}

/// Errors that can occur while recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderError {
    /// Transition buffer is full
    BufferFull {
        /// Configured capacity
        capacity: usize,
    },
    /// Transition earlier than the last one recorded
    OutOfOrder {
        /// Last recorded time
        last: Ticks,
        /// Rejected time
        received: Ticks,
    },
}

impl std::fmt::Display for RecorderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderError::BufferFull { capacity } => {
                write!(f, "Waveform buffer is full ({capacity} transitions)")
            }
            RecorderError::OutOfOrder { last, received } => {
                write!(f, "Transition at {received} recorded after {last}")
            }
        }
    }
}

impl std::error::Error for RecorderError {}

/// Bounded transition recorder
#[derive(Debug, Clone)]
pub struct WaveformRecorder {
    capacity: usize,
    transitions: Vec<Transition>,
    dropped: u64,
}

impl WaveformRecorder {
    /// Create a recorder holding at most `capacity` transitions
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            transitions: Vec::with_capacity(capacity.min(4096)),
            dropped: 0,
        }
    }

    /// Record one transition
    ///
    /// Once full, further transitions are counted in [`dropped`](Self::dropped)
    /// and rejected.
    pub fn record(&mut self, transition: Transition) -> Result<(), RecorderError> {
        if let Some(last) = self.transitions.last() {
            if transition.at < last.at {
                return Err(RecorderError::OutOfOrder {
                    last: last.at,
                    received: transition.at,
                });
            }
        }
        if self.transitions.len() >= self.capacity {
            self.dropped += 1;
            return Err(RecorderError::BufferFull {
                capacity: self.capacity,
            });
        }
        self.transitions.push(transition);
        Ok(())
    }

    /// All transitions in time order
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Transitions of one net
    pub fn for_net(&self, net: NetId) -> impl Iterator<Item = &Transition> + '_ {
        self.transitions.iter().filter(move |t| t.net == net)
    }

    /// Times at which `net` rose
    pub fn rising_edges(&self, net: NetId) -> Vec<Ticks> {
        self.for_net(net).filter(|t| t.level).map(|t| t.at).collect()
    }

    /// Gaps between consecutive rising edges of `net`
    pub fn periods(&self, net: NetId) -> Vec<Ticks> {
        self.rising_edges(net).windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// High interval of the first pulse on `net`, as `[rise, fall)`
    pub fn first_pulse(&self, net: NetId) -> Option<(Ticks, Ticks)> {
        let mut edges = self.for_net(net);
        let rise = edges.find(|t| t.level)?.at;
        let fall = edges.find(|t| !t.level)?.at;
        Some((rise, fall))
    }

    /// Last transition time of any watched net
    pub fn last_activity(&self) -> Option<Ticks> {
        self.transitions.last().map(|t| t.at)
    }

    /// Recorded count
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Whether the buffer is full
    pub fn is_full(&self) -> bool {
        self.transitions.len() >= self.capacity
    }

    /// Transitions rejected because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.transitions.clear();
        self.dropped = 0;
    }
}

impl Default for WaveformRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRANSITIONS)
    }
}

/// Live, unsampled observability taps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugTaps {
    /// Start monopulse
    pub start_pulse: bool,
    /// Active-low hold from the stop line
    pub hold_n: bool,
    /// Live counter
    pub counter: u32,
    /// Live ring vector
    pub ring: RingVector,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(at: Ticks, net: usize, level: bool) -> Transition {
        Transition {
            at,
            net: NetId::new(net),
            level,
        }
    }

    #[test]
    fn test_edges_and_periods() {
        let mut recorder = WaveformRecorder::new(16);
        for (at, level) in [(10, true), (18, false), (26, true), (34, false), (42, true)] {
            recorder.record(edge(at, 0, level)).unwrap();
            recorder.record(edge(at, 1, !level)).unwrap();
        }

        let x0 = NetId::new(0);
        assert_eq!(recorder.rising_edges(x0), vec![10, 26, 42]);
        assert_eq!(recorder.periods(x0), vec![16, 16]);
        assert_eq!(recorder.first_pulse(x0), Some((10, 18)));
        assert_eq!(recorder.first_pulse(NetId::new(1)), Some((18, 26)));
        assert_eq!(recorder.last_activity(), Some(42));
    }

    #[test]
    fn test_buffer_full() {
        let mut recorder = WaveformRecorder::new(2);
        recorder.record(edge(1, 0, true)).unwrap();
        recorder.record(edge(2, 0, false)).unwrap();

        assert_eq!(
            recorder.record(edge(3, 0, true)),
            Err(RecorderError::BufferFull { capacity: 2 })
        );
        assert!(recorder.is_full());
        assert_eq!(recorder.dropped(), 1);

        recorder.clear();
        assert!(recorder.is_empty());
        assert_eq!(recorder.dropped(), 0);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut recorder = WaveformRecorder::new(4);
        recorder.record(edge(10, 0, true)).unwrap();

        let err = recorder.record(edge(5, 0, false)).unwrap_err();
        assert_eq!(err, RecorderError::OutOfOrder { last: 10, received: 5 });
        assert_eq!(err.to_string(), "Transition at 5 recorded after 10");
    }
}
