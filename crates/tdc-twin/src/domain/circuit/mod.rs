//! Circuit primitives
//!
//! ```text
//! NetTable ── levels, fan-out, last change per wire
//!    │
//! DelayElement ── INV / NAND2 / NOR2 with inertial delay
//!    │
//!    ├── EdgeShapingLine ── start monopulse, stop hold
//!    └── RingOscillator  ── instantiated RingTopology
//! ```

mod edge_line;
mod element;
mod net;
mod ring;
mod topology;

pub use edge_line::{EdgeShapingLine, LineRole};
pub use element::{DelayElement, ElementId, GateFunction, PendingChange};
pub use net::{NetId, NetTable};
pub use ring::{ParseRingVectorError, RingOscillator, RingVector};
pub use topology::{
    DelayRole, ElementSpec, NodeRef, RingTopology, RingVariant, SkipTap, StageDescriptor, TopologyError,
    MIN_STAGES,
};
