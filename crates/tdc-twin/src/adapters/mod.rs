//! Adapters Layer - Ports & Adapters Pattern
//!
//! Inbound adapters that turn external descriptions of stimulus into
//! scheduled domain events.

pub mod stimulus;

pub use stimulus::{Edge, Pin, StimulusPlan};
