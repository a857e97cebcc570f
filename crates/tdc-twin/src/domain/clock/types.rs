//! Virtual Clock Types
//!
//! Time is an unsigned tick count. Events that share a tick are ordered by
//! [`EventClass`] and then by insertion, which makes every run of the twin
//! fully reproducible.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::circuit::{ElementId, NetId};
use crate::domain::counter::CounterEdge;

/// Virtual time in ticks
///
/// The default gate delays are calibrated so that one tick reads as one
/// picosecond.
pub type Ticks = u64;

/// Unique event identifier (insertion order)
pub type EventId = u64;

/// A point in simulated time plus the number of events processed so far
///
/// Two snapshots taken at the same tick are still distinguishable by `step`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogicalTimestamp {
    /// Simulated time
    pub time: Ticks,
    /// Events processed by the scheduler up to and including this one
    pub step: u64,
}

impl LogicalTimestamp {
    /// Create a timestamp
    #[inline(always)]
    pub const fn new(time: Ticks, step: u64) -> Self {
        Self { time, step }
    }
}

impl std::fmt::Display for LogicalTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.time, self.step)
    }
}

/// Tie-break class for events scheduled at the same tick
///
/// Lower classes fire first:
///
/// ```text
/// Control  stimulus edges and the edge-shaping lines (incl. stop hold)
/// Ring     ring stage transitions
/// Counter  wrap counter triggers
/// Capture  stop-edge sampling
/// ```
///
/// A capture therefore always observes the post-update ring and counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventClass {
    /// Input stimulus and edge-shaping lines
    Control = 0,
    /// Ring oscillator elements
    Ring = 1,
    /// Wrap counter updates
    Counter = 2,
    /// Capture reads
    Capture = 3,
}

/// Event payload types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    /// External input edge driven by a harness
    Stimulus {
        /// Input net
        net: NetId,
        /// New level
        level: bool,
    },
    /// Delayed output change of a delay element
    OutputChange {
        /// Element whose output moves
        element: ElementId,
        /// New output level
        level: bool,
        /// Generation token; stale tokens are ignored
        generation: u64,
    },
    /// Wrap counter trigger
    CounterEdge(CounterEdge),
    /// Stop-edge capture
    Capture,
}

/// Scheduled event in the event queue
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    /// When this event fires
    pub at: Ticks,

    /// Same-tick tie-break class
    pub class: EventClass,

    /// Unique event identifier
    pub event_id: EventId,

    /// Event payload
    pub payload: EventPayload,
}

impl ScheduledEvent {
    /// Create a new scheduled event
    pub fn new(at: Ticks, class: EventClass, event_id: EventId, payload: EventPayload) -> Self {
        Self {
            at,
            class,
            event_id,
            payload,
        }
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.event_id == other.event_id
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reversed so that `BinaryHeap` pops the earliest event first.
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.class.cmp(&self.class))
            .then_with(|| other.event_id.cmp(&self.event_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(at: Ticks, class: EventClass, id: EventId) -> ScheduledEvent {
        ScheduledEvent::new(at, class, id, EventPayload::Capture)
    }

    #[test]
    fn test_event_ordering_by_time() {
        let e1 = capture(100, EventClass::Capture, 2);
        let e2 = capture(200, EventClass::Control, 1);

        // Earlier time has higher priority regardless of class
        assert!(e1 > e2);
    }

    #[test]
    fn test_event_ordering_by_class() {
        let ring = capture(100, EventClass::Ring, 7);
        let counter = capture(100, EventClass::Counter, 3);
        let sample = capture(100, EventClass::Capture, 1);

        assert!(ring > counter);
        assert!(counter > sample);
    }

    #[test]
    fn test_event_ordering_deterministic() {
        let e1 = capture(100, EventClass::Ring, 1);
        let e2 = capture(100, EventClass::Ring, 2);

        // Same time and class: insertion order wins
        assert!(e1 > e2);
    }

    #[test]
    fn test_timestamp_display() {
        assert_eq!(LogicalTimestamp::new(200, 17).to_string(), "200@17");
    }
}
