//! Delay elements
//!
//! A [`DelayElement`] is one INV, NAND2 or NOR2 gate with a fixed inertial
//! propagation delay. Evaluation follows three rules:
//!
//! 1. An output change is scheduled exactly `delay` ticks after the input
//!    change that determines it.
//! 2. No event is scheduled when the output would not change.
//! 3. An input pulse shorter than the delay is swallowed: a pending change
//!    that the inputs no longer support is cancelled.
//!
//! Cancellation works by generation tokens. The element remembers the token
//! of its one pending change; an event carrying any other token is stale.

use serde::{Deserialize, Serialize};

use super::net::{NetId, NetTable};
use crate::domain::clock::{ClockError, EventClass, Ticks};

/// Element identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(usize);

impl ElementId {
    /// Create a new element ID
    #[inline(always)]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw index
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Logic function of a delay element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateFunction {
    /// Inverter
    Inv,
    /// 2-input NAND
    Nand2,
    /// 2-input NOR
    Nor2,
}

impl GateFunction {
    /// Number of inputs
    pub const fn arity(self) -> usize {
        match self {
            Self::Inv => 1,
            Self::Nand2 | Self::Nor2 => 2,
        }
    }

    /// Input level that decides the output on its own
    pub const fn controlling_value(self) -> Option<bool> {
        match self {
            Self::Inv => None,
            Self::Nand2 => Some(false),
            Self::Nor2 => Some(true),
        }
    }

    /// Evaluate on concrete levels
    pub fn apply(self, levels: impl IntoIterator<Item = bool>) -> bool {
        let mut levels = levels.into_iter();
        match self {
            Self::Inv => !levels.next().unwrap_or(false),
            Self::Nand2 => !levels.all(|l| l),
            Self::Nor2 => !levels.any(|l| l),
        }
    }

    /// Evaluate with unknown inputs (`None`)
    ///
    /// Returns `Some` whenever the known inputs already decide the output.
    pub fn resolve(self, levels: &[Option<bool>]) -> Option<bool> {
        match self.controlling_value() {
            None => levels.first().copied().flatten().map(|l| !l),
            Some(ctrl) => {
                if levels.iter().any(|l| *l == Some(ctrl)) {
                    Some(!ctrl)
                } else if levels.iter().all(|l| *l == Some(!ctrl)) {
                    Some(ctrl)
                } else {
                    None
                }
            }
        }
    }
}

impl std::fmt::Display for GateFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inv => write!(f, "INV"),
            Self::Nand2 => write!(f, "NAND2"),
            Self::Nor2 => write!(f, "NOR2"),
        }
    }
}

/// An output change waiting in the event queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingChange {
    /// When the output moves
    pub at: Ticks,
    /// Level it moves to
    pub level: bool,
    /// Token matched when the event fires
    pub generation: u64,
}

/// A logic gate with an inertial propagation delay
#[derive(Debug, Clone)]
pub struct DelayElement {
    function: GateFunction,
    inputs: Vec<NetId>,
    fast: Option<usize>,
    output: NetId,
    delay: Ticks,
    class: EventClass,
    level: bool,
    pending: Option<PendingChange>,
    generation: u64,
}

impl DelayElement {
    /// Create an element whose output currently sits at `level`
    pub fn new(
        function: GateFunction,
        inputs: Vec<NetId>,
        output: NetId,
        delay: Ticks,
        class: EventClass,
        level: bool,
    ) -> Self {
        debug_assert_eq!(inputs.len(), function.arity(), "{function} input count");
        Self {
            function,
            inputs,
            fast: None,
            output,
            delay,
            class,
            level,
            pending: None,
            generation: 0,
        }
    }

    /// Designate input `index` as the fast input
    ///
    /// The fast input is read at evaluation time and short-circuits the gate
    /// when it sits at the controlling value.
    pub fn with_fast_input(mut self, index: usize) -> Self {
        debug_assert!(index < self.inputs.len());
        self.fast = Some(index);
        self
    }

    /// Logic function
    pub fn function(&self) -> GateFunction {
        self.function
    }

    /// Input nets in pin order
    pub fn inputs(&self) -> &[NetId] {
        &self.inputs
    }

    /// Fast input pin, if any
    pub fn fast_input(&self) -> Option<usize> {
        self.fast
    }

    /// Output net
    pub fn output(&self) -> NetId {
        self.output
    }

    /// Propagation delay
    pub fn delay(&self) -> Ticks {
        self.delay
    }

    /// Tie-break class of this element's output events
    pub fn class(&self) -> EventClass {
        self.class
    }

    /// Current output level
    pub fn level(&self) -> bool {
        self.level
    }

    /// Pending change, if any
    pub fn pending(&self) -> Option<PendingChange> {
        self.pending
    }

    /// Output the gate would drive for the current input levels
    pub fn compute(&self, nets: &NetTable) -> bool {
        if let (Some(fast), Some(ctrl)) = (self.fast, self.function.controlling_value()) {
            if nets.level(self.inputs[fast]) == ctrl {
                return !ctrl;
            }
        }
        self.function.apply(self.inputs.iter().map(|&net| nets.level(net)))
    }

    /// Re-evaluate after an input change at `now`
    ///
    /// # Returns
    /// The change to enqueue, if any. A previously pending change that is no
    /// longer supported is dropped and its event becomes stale.
    ///
    /// # Errors
    /// [`ClockError::Overflow`] when the change would land past the last tick.
    /// The element is left untouched.
    pub fn evaluate(&mut self, nets: &NetTable, now: Ticks) -> Result<Option<PendingChange>, ClockError> {
        let next = self.compute(nets);
        let projected = self.pending.map_or(self.level, |p| p.level);
        if next == projected {
            return Ok(None);
        }

        if next == self.level {
            self.pending = None;
            return Ok(None);
        }

        let at = now.checked_add(self.delay).ok_or(ClockError::Overflow {
            now,
            delay: self.delay,
        })?;
        self.generation += 1;
        let change = PendingChange {
            at,
            level: next,
            generation: self.generation,
        };
        self.pending = Some(change);
        Ok(Some(change))
    }

    /// Apply a fired output event
    ///
    /// # Returns
    /// The new output level, or `None` if the event was stale.
    pub fn commit(&mut self, generation: u64) -> Option<bool> {
        match self.pending {
            Some(change) if change.generation == generation => {
                self.pending = None;
                self.level = change.level;
                Some(change.level)
            }
            _ => None,
        }
    }
}
