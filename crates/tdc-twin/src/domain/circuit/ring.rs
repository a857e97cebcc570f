//! Ring oscillator
//!
//! Instantiates a [`RingTopology`] into nets and delay elements. Stage
//! outputs are allocated first and contiguously, so `x[j]` lookups are a
//! range check.
//!
//! Power-on state: every stage output is low and every internal node is
//! consistent with its inputs. The injection NOR is the only element out of
//! balance, and it stays quiet until the start pulse moves.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::element::{DelayElement, ElementId, GateFunction};
use super::net::{NetId, NetTable};
use super::topology::{DelayRole, NodeRef, RingTopology, TopologyError};
use crate::domain::clock::EventClass;
use crate::domain::config::GateDelays;

/// Per-stage logic levels, stage 0 first
///
/// Displays and serializes as a bit string such as `"1100"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RingVector(Vec<bool>);

impl RingVector {
    /// All-low vector of `len` stages
    pub fn zeros(len: usize) -> Self {
        Self(vec![false; len])
    }

    /// Stage levels
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Level of one stage
    pub fn get(&self, stage: usize) -> Option<bool> {
        self.0.get(stage).copied()
    }

    /// Number of high stages
    pub fn count_ones(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }
}

impl From<Vec<bool>> for RingVector {
    fn from(levels: Vec<bool>) -> Self {
        Self(levels)
    }
}

impl FromIterator<bool> for RingVector {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for RingVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &bit in &self.0 {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Malformed bit string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid ring vector character {found:?} at position {position}")]
pub struct ParseRingVectorError {
    /// Offending character
    pub found: char,
    /// Character index
    pub position: usize,
}

impl FromStr for RingVector {
    type Err = ParseRingVectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .enumerate()
            .map(|(position, c)| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                found => Err(ParseRingVectorError { found, position }),
            })
            .collect()
    }
}

impl From<RingVector> for String {
    fn from(vector: RingVector) -> Self {
        vector.to_string()
    }
}

impl TryFrom<String> for RingVector {
    type Error = ParseRingVectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The instantiated feedback network
#[derive(Debug, Clone)]
pub struct RingOscillator {
    topology: RingTopology,
    outputs: Vec<NetId>,
    elements: Vec<ElementId>,
}

impl RingOscillator {
    /// Wire `topology` into `nets` and `elements`
    pub fn build(
        topology: RingTopology,
        delays: &GateDelays,
        start_pulse: NetId,
        hold_n: NetId,
        nets: &mut NetTable,
        elements: &mut Vec<DelayElement>,
    ) -> Result<Self, TopologyError> {
        let outputs: Vec<NetId> = (0..topology.len())
            .map(|j| nets.add(format!("x[{j}]"), false))
            .collect();
        let mut ids = Vec::with_capacity(topology.element_count());

        for stage in topology.stages() {
            let mut locals: Vec<NetId> = Vec::with_capacity(stage.chain.len());
            let mut tap: Option<NetId> = None;

            for (k, spec) in stage.chain.iter().enumerate() {
                // The tap inverter is placed right before its consumer
                if tap.is_none() && spec.inputs.contains(&NodeRef::Tap) {
                    let skip = stage.skip.ok_or(TopologyError::DanglingTap { stage: stage.index })?;
                    let source = outputs[skip.from];
                    tap = Some(if skip.inverted {
                        let level = !nets.level(source);
                        let net = nets.add(format!("x[{}].tap", stage.index), level);
                        let id = push_element(
                            elements,
                            nets,
                            DelayElement::new(
                                GateFunction::Inv,
                                vec![source],
                                net,
                                delays.for_role(DelayRole::Tap),
                                EventClass::Ring,
                                level,
                            ),
                        );
                        ids.push(id);
                        net
                    } else {
                        source
                    });
                }

                let inputs = spec
                    .inputs
                    .iter()
                    .map(|node| match *node {
                        NodeRef::Stage(i) => Ok(outputs[i]),
                        NodeRef::Local(l) => Ok(locals[l]),
                        NodeRef::Tap => tap.ok_or(TopologyError::DanglingTap { stage: stage.index }),
                        NodeRef::StartPulse => Ok(start_pulse),
                        NodeRef::HoldN => Ok(hold_n),
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                let last = k + 1 == stage.chain.len();
                let (output, level) = if last {
                    (outputs[stage.index], false)
                } else {
                    let level = spec.function.apply(inputs.iter().map(|&n| nets.level(n)));
                    (nets.add(format!("x[{}].{k}", stage.index), level), level)
                };

                let mut element = DelayElement::new(
                    spec.function,
                    inputs,
                    output,
                    delays.for_role(spec.delay),
                    EventClass::Ring,
                    level,
                );
                if let Some(fast) = spec.fast {
                    element = element.with_fast_input(fast);
                }
                ids.push(push_element(elements, nets, element));
                locals.push(output);
            }
        }

        Ok(Self {
            topology,
            outputs,
            elements: ids,
        })
    }

    /// Topology this ring was built from
    pub fn topology(&self) -> &RingTopology {
        &self.topology
    }

    /// Stage output nets
    pub fn outputs(&self) -> &[NetId] {
        &self.outputs
    }

    /// Ring elements in construction order
    pub fn elements(&self) -> &[ElementId] {
        &self.elements
    }

    /// Stage count
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Whether the ring has no stages
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// `ring_start`: stage 0 output
    pub fn ring_start(&self) -> NetId {
        self.outputs[0]
    }

    /// Stage index of a stage output net
    pub fn stage_of(&self, net: NetId) -> Option<usize> {
        let first = self.outputs.first()?.index();
        let offset = net.index().checked_sub(first)?;
        (offset < self.outputs.len()).then_some(offset)
    }

    /// Live stage levels
    pub fn vector(&self, nets: &NetTable) -> RingVector {
        self.outputs.iter().map(|&net| nets.level(net)).collect()
    }
}

fn push_element(elements: &mut Vec<DelayElement>, nets: &mut NetTable, element: DelayElement) -> ElementId {
    let id = ElementId::new(elements.len());
    for &input in element.inputs() {
        nets.connect(input, id);
    }
    elements.push(element);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::circuit::RingVariant;

    fn build(n: usize, variant: RingVariant) -> (NetTable, Vec<DelayElement>, RingOscillator) {
        let mut nets = NetTable::new();
        let mut elements = Vec::new();
        let start_pulse = nets.add("start_pulse", false);
        let hold_n = nets.add("hold_n", true);
        let topology = RingTopology::build(n, variant).unwrap();
        let ring = RingOscillator::build(
            topology,
            &GateDelays::symmetric(1),
            start_pulse,
            hold_n,
            &mut nets,
            &mut elements,
        )
        .unwrap();
        (nets, elements, ring)
    }

    #[test]
    fn test_ring_vector_text() {
        let vector: RingVector = "1100".parse().unwrap();
        assert_eq!(vector.as_slice(), &[true, true, false, false]);
        assert_eq!(vector.to_string(), "1100");
        assert_eq!(vector.count_ones(), 2);
        assert_eq!(
            "10x".parse::<RingVector>().unwrap_err(),
            ParseRingVectorError { found: 'x', position: 2 }
        );
    }

    #[test]
    fn test_plain_instantiation() {
        let (nets, elements, ring) = build(4, RingVariant::Plain);

        assert_eq!(ring.len(), 4);
        assert_eq!(ring.elements().len(), 7);
        assert_eq!(elements.len(), 7);
        assert_eq!(ring.vector(&nets), RingVector::zeros(4));
        assert_eq!(nets.name(ring.ring_start()), "x[0]");
    }

    #[test]
    fn test_power_on_only_injection_is_unbalanced() {
        for variant in [RingVariant::Plain, RingVariant::Interleaved] {
            let (nets, elements, ring) = build(5, variant);
            let unbalanced: Vec<_> = elements
                .iter()
                .filter(|e| e.compute(&nets) != e.level())
                .map(|e| e.output())
                .collect();
            assert_eq!(unbalanced, vec![ring.ring_start()], "{variant}");
        }
    }

    #[test]
    fn test_interleaved_taps() {
        let (nets, elements, ring) = build(4, RingVariant::Interleaved);

        // 3 + 3 * 3
        assert_eq!(elements.len(), 12);
        let tap = nets.find("x[2].tap").unwrap();
        assert!(nets.level(tap));
        assert!(nets.level(nets.find("x[1].tap").unwrap()));
        assert!(nets.find("x[0].tap").is_none());
        assert_eq!(nets.fanout(ring.outputs()[0]).len(), 2);
        // x[3] feeds stage 0's merge and stage 1's tap inverter
        assert_eq!(nets.fanout(ring.outputs()[3]).len(), 2);
    }

    #[test]
    fn test_stage_lookup() {
        let (nets, _, ring) = build(3, RingVariant::Plain);
        assert_eq!(ring.stage_of(ring.outputs()[2]), Some(2));
        assert_eq!(ring.stage_of(nets.find("hold_n").unwrap()), None);
        assert_eq!(ring.stage_of(nets.find("x[1].0").unwrap()), None);
    }
}
