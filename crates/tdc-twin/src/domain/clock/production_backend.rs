//! Production Backend Implementation
//!
//! - `BinaryHeap` for O(log n) insertion and extraction
//! - `RwLock` around the state so read-only queries never contend
//! - Unbounded: a free-running ring keeps a steady number of pending events,
//!   so growth is bounded by the circuit size, not by run length

use super::backend::ClockBackend;
use super::types::{ScheduledEvent, Ticks};
use parking_lot::RwLock;
use std::collections::BinaryHeap;

/// Production-grade clock backend
pub struct ProductionBackend {
    state: RwLock<BackendState>,
}

struct BackendState {
    time: Ticks,

    /// Min-heap via `ScheduledEvent`'s reversed `Ord`
    event_queue: BinaryHeap<ScheduledEvent>,
}

impl ProductionBackend {
    /// Create new production backend
    pub fn new() -> Self {
        Self {
            state: RwLock::new(BackendState {
                time: 0,
                event_queue: BinaryHeap::new(),
            }),
        }
    }
}

impl Default for ProductionBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockBackend for ProductionBackend {
    fn current_time(&self) -> Ticks {
        self.state.read().time
    }

    fn set_time(&mut self, time: Ticks) {
        self.state.write().time = time;
    }

    fn push_event(&mut self, event: ScheduledEvent) -> bool {
        self.state.write().event_queue.push(event);
        true
    }

    fn pop_event(&mut self) -> Option<ScheduledEvent> {
        self.state.write().event_queue.pop()
    }

    fn peek_time(&self) -> Option<Ticks> {
        self.state.read().event_queue.peek().map(|event| event.at)
    }

    fn is_empty(&self) -> bool {
        self.state.read().event_queue.is_empty()
    }

    fn queue_len(&self) -> usize {
        self.state.read().event_queue.len()
    }

    fn reset(&mut self) {
        let mut state = self.state.write();
        state.time = 0;
        state.event_queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::types::{EventClass, EventPayload};

    fn event(at: Ticks, class: EventClass, id: u64) -> ScheduledEvent {
        ScheduledEvent::new(at, class, id, EventPayload::Capture)
    }

    #[test]
    fn test_production_backend_basic() {
        let mut backend = ProductionBackend::new();

        assert_eq!(backend.current_time(), 0);
        assert!(backend.is_empty());
        assert_eq!(backend.capacity(), None);

        assert!(backend.push_event(event(100, EventClass::Ring, 1)));
        assert!(!backend.is_empty());
        assert_eq!(backend.queue_len(), 1);
        assert_eq!(backend.peek_time(), Some(100));
    }

    #[test]
    fn test_production_backend_ordering() {
        let mut backend = ProductionBackend::new();

        backend.push_event(event(200, EventClass::Control, 1));
        backend.push_event(event(100, EventClass::Capture, 2));
        backend.push_event(event(100, EventClass::Ring, 3));
        backend.push_event(event(150, EventClass::Counter, 4));

        let order: Vec<_> = std::iter::from_fn(|| backend.pop_event())
            .map(|e| (e.at, e.class))
            .collect();
        assert_eq!(
            order,
            vec![
                (100, EventClass::Ring),
                (100, EventClass::Capture),
                (150, EventClass::Counter),
                (200, EventClass::Control),
            ]
        );
    }

    #[test]
    fn test_production_backend_reset() {
        let mut backend = ProductionBackend::new();
        backend.set_time(40);
        backend.push_event(event(50, EventClass::Ring, 1));

        backend.reset();

        assert_eq!(backend.current_time(), 0);
        assert!(backend.is_empty());
    }
}
