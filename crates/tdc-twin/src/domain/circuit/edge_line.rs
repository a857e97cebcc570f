//! Edge-shaping lines
//!
//! A plain chain of K inverters behind one input. Two instances exist:
//!
//! ```text
//! i_start ──┬──[INV]─[INV]─ ... ─[INV]── delayed ──┐
//!           └───────────────────────────────────── AND NOT ── start_pulse
//!
//! i_stop  ────[INV]─[INV]─ ... ─[INV]── delayed ── NOT ── hold_n
//! ```
//!
//! The combining gate is ideal (zero delay), so a rising `i_start` produces
//! a pulse of exactly `K * delay` ticks.

use serde::{Deserialize, Serialize};

use super::element::{DelayElement, ElementId, GateFunction};
use super::net::{NetId, NetTable};
use crate::domain::clock::{EventClass, Ticks};

/// What the shaped output is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineRole {
    /// `input AND NOT delayed(input)`: one monopulse per rising edge
    StartMonopulse,
    /// `NOT delayed(input)`: active-low run enable for the ring
    StopHold,
}

impl LineRole {
    fn prefix(self) -> &'static str {
        match self {
            Self::StartMonopulse => "start_line",
            Self::StopHold => "stop_line",
        }
    }

    fn output_name(self) -> &'static str {
        match self {
            Self::StartMonopulse => "start_pulse",
            Self::StopHold => "hold_n",
        }
    }
}

/// One instantiated edge-shaping line
#[derive(Debug, Clone)]
pub struct EdgeShapingLine {
    role: LineRole,
    input: NetId,
    taps: Vec<NetId>,
    elements: Vec<ElementId>,
    output: NetId,
    delay: Ticks,
}

impl EdgeShapingLine {
    /// Build a chain of `length` inverters behind `input`
    ///
    /// Chain nets are initialised DC-consistent with the input's current
    /// level, so nothing moves until the input does.
    pub fn build(
        role: LineRole,
        input: NetId,
        length: usize,
        delay: Ticks,
        nets: &mut NetTable,
        elements: &mut Vec<DelayElement>,
    ) -> Self {
        let mut taps = Vec::with_capacity(length);
        let mut ids = Vec::with_capacity(length);
        let mut previous = input;
        for k in 0..length {
            let level = !nets.level(previous);
            let tap = nets.add(format!("{}[{k}]", role.prefix()), level);
            let id = ElementId::new(elements.len());
            elements.push(DelayElement::new(
                GateFunction::Inv,
                vec![previous],
                tap,
                delay,
                EventClass::Control,
                level,
            ));
            nets.connect(previous, id);
            taps.push(tap);
            ids.push(id);
            previous = tap;
        }

        let output = nets.add(role.output_name(), false);
        let line = Self {
            role,
            input,
            taps,
            elements: ids,
            output,
            delay,
        };
        let shaped = line.shape(nets);
        nets.preset(output, shaped);
        line
    }

    /// Role of this line
    pub fn role(&self) -> LineRole {
        self.role
    }

    /// Raw input net
    pub fn input(&self) -> NetId {
        self.input
    }

    /// Shaped output net
    pub fn output(&self) -> NetId {
        self.output
    }

    /// Chain length K
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Chain elements in order
    pub fn elements(&self) -> &[ElementId] {
        &self.elements
    }

    /// End-to-end delay of the chain
    pub fn span(&self) -> Ticks {
        self.delay * self.taps.len() as Ticks
    }

    /// Input level as seen at the end of the chain
    pub fn delayed(&self, nets: &NetTable) -> bool {
        let end = self.taps.last().copied().unwrap_or(self.input);
        nets.level(end) ^ (self.taps.len() % 2 == 1)
    }

    /// Level the shaped output should have now
    pub fn shape(&self, nets: &NetTable) -> bool {
        let delayed = self.delayed(nets);
        match self.role {
            LineRole::StartMonopulse => nets.level(self.input) && !delayed,
            LineRole::StopHold => !delayed,
        }
    }

    /// Whether a change on `net` can move the shaped output
    pub fn watches(&self, net: NetId) -> bool {
        net == self.input || self.taps.last() == Some(&net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(role: LineRole, length: usize) -> (NetTable, Vec<DelayElement>, EdgeShapingLine) {
        let mut nets = NetTable::new();
        let mut elements = Vec::new();
        let input = nets.add("in", false);
        let line = EdgeShapingLine::build(role, input, length, 5, &mut nets, &mut elements);
        (nets, elements, line)
    }

    #[test]
    fn test_chain_initialised_consistently() {
        let (nets, elements, line) = line(LineRole::StartMonopulse, 3);

        assert_eq!(line.len(), 3);
        assert_eq!(elements.len(), 3);
        for element in &elements {
            assert_eq!(element.compute(&nets), element.level());
        }
        assert!(!line.delayed(&nets));
        assert!(!nets.level(line.output()));
        assert_eq!(line.span(), 15);
    }

    #[test]
    fn test_stop_line_starts_enabled() {
        let (nets, _, line) = line(LineRole::StopHold, 8);
        assert!(nets.level(line.output()));
        assert_eq!(nets.name(line.output()), "hold_n");
    }

    #[test]
    fn test_start_shape_follows_input_until_delayed() {
        let (mut nets, _, line) = line(LineRole::StartMonopulse, 2);

        nets.set(line.input(), true, 0);
        assert!(line.shape(&nets));

        // Walk the chain by hand
        let taps: Vec<_> = (0..2)
            .map(|k| nets.find(&format!("start_line[{k}]")).unwrap())
            .collect();
        nets.set(taps[0], false, 5);
        nets.set(taps[1], true, 10);
        assert!(line.delayed(&nets));
        assert!(!line.shape(&nets));
    }

    #[test]
    fn test_watches_input_and_chain_end() {
        let (nets, _, line) = line(LineRole::StartMonopulse, 3);
        let middle = nets.find("start_line[1]").unwrap();
        let end = nets.find("start_line[2]").unwrap();

        assert!(line.watches(line.input()));
        assert!(line.watches(end));
        assert!(!line.watches(middle));
    }
}
