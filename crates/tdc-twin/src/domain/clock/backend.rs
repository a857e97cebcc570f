//! Clock Backend Abstraction Layer
//!
//! The backend owns the virtual time and the pending event set. Swapping the
//! backend changes the data structure behind the queue, never the order in
//! which events fire: both implementations pop by [`ScheduledEvent`]'s `Ord`.

use super::types::{ScheduledEvent, Ticks};

/// Backend abstraction for clock state management
///
/// The concrete backend is a type parameter of
/// [`VirtualClock`](super::VirtualClock), so every call is statically
/// dispatched.
pub trait ClockBackend {
    /// Current virtual time
    fn current_time(&self) -> Ticks;

    /// Set virtual time (tick or idle advance)
    fn set_time(&mut self, time: Ticks);

    /// Add event to queue
    ///
    /// # Returns
    /// `true` if the event was accepted, `false` if the backend is full
    fn push_event(&mut self, event: ScheduledEvent) -> bool;

    /// Remove and return the next event (earliest time, class, id)
    fn pop_event(&mut self) -> Option<ScheduledEvent>;

    /// Time of the next event without removing it
    fn peek_time(&self) -> Option<Ticks>;

    /// Check if event queue is empty
    fn is_empty(&self) -> bool;

    /// Get queue size
    fn queue_len(&self) -> usize;

    /// Maximum number of pending events, if bounded
    fn capacity(&self) -> Option<usize> {
        None
    }

    /// Reset to time zero with an empty queue
    fn reset(&mut self);
}
