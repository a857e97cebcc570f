//! Virtual Clock Engine
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │            VirtualClock<Backend>                        │
//! │            (Generic, Monomorphized)                     │
//! ├───────────────────────┬─────────────────────────────────┤
//! │  Production:          │  BinaryHeap + RwLock            │
//! │  VirtualClock<Prod>   │  (unbounded, O(log n))          │
//! ├───────────────────────┼─────────────────────────────────┤
//! │  Verification:        │  bounded Vec + RefCell          │
//! │  VirtualClock<Verify> │  (fixed capacity, linear scan)  │
//! └───────────────────────┴─────────────────────────────────┘
//! ```
//!
//! The clock is the single owner of simulated time. Time only moves forward,
//! either by popping the next event or by an explicit idle advance.

use super::backend::ClockBackend;
use super::types::{EventClass, EventId, EventPayload, LogicalTimestamp, ScheduledEvent, Ticks};

/// Scheduling failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// Requested time is earlier than the current time
    #[error("cannot schedule at tick {at}: clock is already at {now}")]
    InPast {
        /// Requested time
        at: Ticks,
        /// Current time
        now: Ticks,
    },

    /// Requested time does not fit in the tick range
    #[error("tick overflow scheduling {delay} ticks after {now}")]
    Overflow {
        /// Current time
        now: Ticks,
        /// Requested delay
        delay: Ticks,
    },

    /// A bounded backend has no free slot
    #[error("event queue is full ({capacity} pending events)")]
    QueueFull {
        /// Backend capacity
        capacity: usize,
    },
}

/// Virtual clock with pluggable backend
pub struct VirtualClock<B: ClockBackend> {
    /// Pluggable backend (injected at construction)
    backend: B,

    /// Next event ID allocator
    next_event_id: EventId,

    /// Events popped so far
    steps: u64,
}

impl<B: ClockBackend> VirtualClock<B> {
    /// Create new virtual clock with custom backend
    ///
    /// ```rust
    /// use tdc_twin::domain::clock::{ProductionBackend, VirtualClock};
    ///
    /// let clock = VirtualClock::new(ProductionBackend::new());
    /// assert_eq!(clock.now(), 0);
    /// ```
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            next_event_id: 0,
            steps: 0,
        }
    }

    /// Current virtual time
    #[inline]
    pub fn now(&self) -> Ticks {
        self.backend.current_time()
    }

    /// Events processed so far
    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Current time paired with the step count
    pub fn timestamp(&self) -> LogicalTimestamp {
        LogicalTimestamp::new(self.now(), self.steps)
    }

    /// Pending events count
    pub fn pending_events(&self) -> usize {
        self.backend.queue_len()
    }

    /// Time of the next pending event
    pub fn next_event_time(&self) -> Option<Ticks> {
        self.backend.peek_time()
    }

    /// Schedule an event at an absolute time
    pub fn schedule_at(
        &mut self,
        at: Ticks,
        class: EventClass,
        payload: EventPayload,
    ) -> Result<EventId, ClockError> {
        let now = self.now();
        if at < now {
            return Err(ClockError::InPast { at, now });
        }

        let event_id = self.next_event_id;
        let event = ScheduledEvent::new(at, class, event_id, payload);
        if !self.backend.push_event(event) {
            return Err(ClockError::QueueFull {
                capacity: self.backend.capacity().unwrap_or(self.backend.queue_len()),
            });
        }
        self.next_event_id += 1;
        Ok(event_id)
    }

    /// Schedule an event `delay` ticks from now
    pub fn schedule(
        &mut self,
        delay: Ticks,
        class: EventClass,
        payload: EventPayload,
    ) -> Result<EventId, ClockError> {
        let now = self.now();
        let at = now
            .checked_add(delay)
            .ok_or(ClockError::Overflow { now, delay })?;
        self.schedule_at(at, class, payload)
    }

    /// Pop the next event and move time to it
    pub fn tick(&mut self) -> Option<ScheduledEvent> {
        let event = self.backend.pop_event()?;

        assert!(
            event.at >= self.backend.current_time(),
            "Time monotonicity violated: {} < {}",
            event.at,
            self.backend.current_time()
        );
        self.backend.set_time(event.at);
        self.steps += 1;

        Some(event)
    }

    /// Move time forward with no event processing
    ///
    /// Never moves backwards and never skips a pending event: the target is
    /// clamped to the next event time.
    pub fn advance_to(&mut self, time: Ticks) {
        let target = match self.backend.peek_time() {
            Some(next) => time.min(next),
            None => time,
        };
        if target > self.backend.current_time() {
            self.backend.set_time(target);
        }
    }

    /// Check if idle
    pub fn is_idle(&self) -> bool {
        self.backend.is_empty()
    }

    /// Reset to initial state
    pub fn reset(&mut self) {
        self.backend.reset();
        self.next_event_id = 0;
        self.steps = 0;
    }
}
