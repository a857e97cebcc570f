//! Verification Backend Implementation
//!
//! A bounded, allocation-once backend for audit runs:
//! - Fixed capacity chosen at construction, overflow is reported, not grown
//! - O(n) extraction by linear scan, so pop order is trivially inspectable
//! - Single-threaded (`RefCell`)
//!
//! A ring of N stages keeps at most a few events per element in flight, so a
//! capacity of a few times the element count is enough for any run length.

use super::backend::ClockBackend;
use super::types::{ScheduledEvent, Ticks};
use std::cell::RefCell;

/// Default slot count, sized for the largest default ring plus its lines
pub const DEFAULT_CAPACITY: usize = 1024;

/// Bounded clock backend
///
/// ```text
/// ┌─────────────────────────────────────────────┐
/// │ VerificationBackend                         │
/// ├─────────────────────────────────────────────┤
/// │ state: RefCell<BackendState>                │
/// │   ├─ time: u64                              │
/// │   ├─ capacity: usize                        │
/// │   └─ events: Vec<ScheduledEvent>            │
/// │       (unsorted, never grows past capacity) │
/// └─────────────────────────────────────────────┘
/// ```
pub struct VerificationBackend {
    state: RefCell<BackendState>,
}

struct BackendState {
    time: Ticks,
    capacity: usize,
    events: Vec<ScheduledEvent>,
}

impl VerificationBackend {
    /// Create a backend with [`DEFAULT_CAPACITY`] slots
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a backend holding at most `capacity` pending events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: RefCell::new(BackendState {
                time: 0,
                capacity,
                events: Vec::with_capacity(capacity),
            }),
        }
    }

    /// Index of the next event to fire
    ///
    /// `ScheduledEvent`'s `Ord` is reversed, so the earliest event is the
    /// maximum.
    fn find_next_event_index(events: &[ScheduledEvent]) -> Option<usize> {
        events
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(index, _)| index)
    }
}

impl Default for VerificationBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockBackend for VerificationBackend {
    fn current_time(&self) -> Ticks {
        self.state.borrow().time
    }

    fn set_time(&mut self, time: Ticks) {
        self.state.get_mut().time = time;
    }

    fn push_event(&mut self, event: ScheduledEvent) -> bool {
        let state = self.state.get_mut();
        if state.events.len() >= state.capacity {
            return false;
        }
        state.events.push(event);
        true
    }

    fn pop_event(&mut self) -> Option<ScheduledEvent> {
        let state = self.state.get_mut();
        let index = Self::find_next_event_index(&state.events)?;
        Some(state.events.swap_remove(index))
    }

    fn peek_time(&self) -> Option<Ticks> {
        let state = self.state.borrow();
        Self::find_next_event_index(&state.events).map(|index| state.events[index].at)
    }

    fn is_empty(&self) -> bool {
        self.state.borrow().events.is_empty()
    }

    fn queue_len(&self) -> usize {
        self.state.borrow().events.len()
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.state.borrow().capacity)
    }

    fn reset(&mut self) {
        let state = self.state.get_mut();
        state.time = 0;
        state.events.clear();
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
    fn test_verification_backend_basic() {
        let mut backend = VerificationBackend::new();

        assert_eq!(backend.current_time(), 0);
        assert!(backend.is_empty());
        assert_eq!(backend.capacity(), Some(DEFAULT_CAPACITY));

        assert!(backend.push_event(event(100, EventClass::Ring, 1)));
        assert_eq!(backend.queue_len(), 1);
        assert_eq!(backend.peek_time(), Some(100));
    }

    #[test]
    fn test_verification_backend_ordering() {
        let mut backend = VerificationBackend::with_capacity(8);

        backend.push_event(event(200, EventClass::Control, 1));
        backend.push_event(event(100, EventClass::Counter, 2));
        backend.push_event(event(100, EventClass::Ring, 3));
        backend.push_event(event(100, EventClass::Ring, 4));

        let ids: Vec<_> = std::iter::from_fn(|| backend.pop_event())
            .map(|e| e.event_id)
            .collect();
        assert_eq!(ids, vec![3, 4, 2, 1]);
    }

    #[test]
    fn test_verification_backend_capacity() {
        let mut backend = VerificationBackend::with_capacity(4);

        for i in 0..4 {
            assert!(backend.push_event(event(i * 100, EventClass::Ring, i)));
        }

        // Should reject when full
        assert!(!backend.push_event(event(999, EventClass::Ring, 999)));

        // Space frees up again after a pop
        assert!(backend.pop_event().is_some());
        assert!(backend.push_event(event(999, EventClass::Ring, 999)));
    }
}
