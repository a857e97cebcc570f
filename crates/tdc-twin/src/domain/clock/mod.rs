//! Virtual Clock Module
//!
//! A single discrete-event scheduler owns simulated time and the pending
//! event set:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  Tdc orchestrator                                      │
//! │  clock.schedule(delay, class, payload)                 │
//! └────────────────────────────────────────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          │                       │
//!   VirtualClock<               VirtualClock<
//!     ProductionBackend>          VerificationBackend>
//!          │                       │
//!   BinaryHeap + RwLock        bounded Vec + RefCell
//! ```
//!
//! # Guarantees
//! - Time never decreases
//! - Events at one tick fire in [`EventClass`] order, then insertion order
//! - Nothing outside the clock mutates an event once it is enqueued

mod types;
mod backend;
mod production_backend;
mod verification_backend;
mod engine;

// Re-exports
pub use types::{EventClass, EventId, EventPayload, LogicalTimestamp, ScheduledEvent, Ticks};

pub use backend::ClockBackend;
pub use engine::{ClockError, VirtualClock};
pub use production_backend::ProductionBackend;
pub use verification_backend::{VerificationBackend, DEFAULT_CAPACITY};

// Convenience type aliases
/// Production clock (unbounded heap)
pub type ProductionClock = VirtualClock<ProductionBackend>;

/// Verification clock (bounded linear scan)
pub type VerificationClock = VirtualClock<VerificationBackend>;
