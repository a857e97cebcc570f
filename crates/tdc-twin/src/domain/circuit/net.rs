//! Signal nets
//!
//! Every wire in the twin is a [`NetId`] into one [`NetTable`]. The table
//! holds the level, the fan-out list and the tick of the last change, which
//! is what the capture race audit reads.

use serde::{Deserialize, Serialize};

use super::element::ElementId;
use crate::domain::clock::Ticks;

/// Net identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetId(usize);

impl NetId {
    /// Create a new net ID
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

#[derive(Debug, Clone)]
struct Net {
    name: String,
    level: bool,
    fanout: Vec<ElementId>,
    last_change: Option<Ticks>,
}

/// All nets of one circuit
#[derive(Debug, Clone, Default)]
pub struct NetTable {
    nets: Vec<Net>,
}

impl NetTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a net with its power-on level
    pub fn add(&mut self, name: impl Into<String>, level: bool) -> NetId {
        let id = NetId::new(self.nets.len());
        self.nets.push(Net {
            name: name.into(),
            level,
            fanout: Vec::new(),
            last_change: None,
        });
        id
    }

    /// Current level
    #[inline]
    pub fn level(&self, net: NetId) -> bool {
        self.nets[net.index()].level
    }

    /// Set a level at `now`
    ///
    /// # Returns
    /// `true` if the level actually changed
    pub fn set(&mut self, net: NetId, level: bool, now: Ticks) -> bool {
        let entry = &mut self.nets[net.index()];
        if entry.level == level {
            return false;
        }
        entry.level = level;
        entry.last_change = Some(now);
        true
    }

    /// Overwrite the level without recording a transition
    ///
    /// Only used while a circuit is being initialised.
    pub(crate) fn preset(&mut self, net: NetId, level: bool) {
        self.nets[net.index()].level = level;
    }

    /// Register `element` as a reader of `net`
    pub fn connect(&mut self, net: NetId, element: ElementId) {
        self.nets[net.index()].fanout.push(element);
    }

    /// Elements reading `net`, in connection order
    #[inline]
    pub fn fanout(&self, net: NetId) -> &[ElementId] {
        &self.nets[net.index()].fanout
    }

    /// Tick of the last level change
    pub fn last_change(&self, net: NetId) -> Option<Ticks> {
        self.nets[net.index()].last_change
    }

    /// Net name
    pub fn name(&self, net: NetId) -> &str {
        &self.nets[net.index()].name
    }

    /// Look a net up by name
    pub fn find(&self, name: &str) -> Option<NetId> {
        self.nets.iter().position(|n| n.name == name).map(NetId::new)
    }

    /// Number of nets
    pub fn len(&self) -> usize {
        self.nets.len()
    }

    /// Whether the table has no nets
    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_changes_only() {
        let mut nets = NetTable::new();
        let a = nets.add("a", false);

        assert!(!nets.set(a, false, 5));
        assert_eq!(nets.last_change(a), None);

        assert!(nets.set(a, true, 7));
        assert!(nets.level(a));
        assert_eq!(nets.last_change(a), Some(7));
    }

    #[test]
    fn test_find_and_fanout() {
        let mut nets = NetTable::new();
        let a = nets.add("a", false);
        let b = nets.add("b", true);
        nets.connect(b, ElementId::new(3));
        nets.connect(b, ElementId::new(1));

        assert_eq!(nets.find("b"), Some(b));
        assert_eq!(nets.find("missing"), None);
        assert!(nets.fanout(a).is_empty());
        assert_eq!(nets.fanout(b), &[ElementId::new(3), ElementId::new(1)]);
        assert_eq!(nets.name(b), "b");
        assert_eq!(nets.len(), 2);
    }
}
