//! Ring topology
//!
//! The ring is described as data: N [`StageDescriptor`]s, each naming the
//! element chain that drives one stage output and where its inputs come from.
//! The same builder produces both variants.
//!
//! ```text
//! Plain (N stages, one fan-out per stage)
//!
//!   stage 0:  NOR2(fast=start_pulse, x[N-1])                      -> x[0]
//!   stage j:  NAND2(fast=hold_n, x[j-1]) -> INV                   -> x[j]
//!
//! Interleaved (two fan-outs per stage: j+1 and j+2)
//!
//!   stage 0:  NOR2(x[N-1], x[N-2]) -> INV -> NOR2(fast=start_pulse, *)  -> x[0]
//!   stage 1:  NAND2(x[0], INV(x[N-1]))    -> NAND2(fast=hold_n, *)      -> x[1]
//!   stage j:  NAND2(fast=hold_n, x[j-1])  -> NOR2(*, INV(x[j-2]))       -> x[j]
//! ```
//!
//! Every skip hop has the parity of the two primary hops it bypasses, so each
//! cycle that winds the ring once stays odd. In the two wraparound stages the
//! tap enters at the head of the chain, so stage 0 drops its tap inverter and
//! stage 1 needs one. Those hops are then no shorter than a primary hop. A tap
//! at the tail would let an edge cut across most of a short ring and leave a
//! second edge circulating.
//!
//! A merge gate passes the earlier of its two edges in one direction and the
//! later one in the other. Edges of that first kind run along the skip taps
//! as two ladders offset by one primary hop; edges of the other kind follow
//! the primary chain. The period is therefore shorter than two loop delays,
//! and the finest phase step is shorter than one stage delay.

use serde::{Deserialize, Serialize};

use super::element::GateFunction;
use crate::domain::clock::Ticks;
use crate::domain::config::GateDelays;

/// Smallest ring that can close an odd loop with the special-cased stages
pub const MIN_STAGES: usize = 3;

/// Topology variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RingVariant {
    /// One feed-forward connection per stage
    Plain,
    /// Feed-forward plus a skip tap two stages ahead
    #[default]
    Interleaved,
}

impl std::fmt::Display for RingVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Interleaved => write!(f, "interleaved"),
        }
    }
}

/// Where an element input is wired from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    /// Output of another stage
    Stage(usize),
    /// Output of an earlier element in the same chain
    Local(usize),
    /// The stage's skip tap
    Tap,
    /// Start monopulse
    StartPulse,
    /// Active-low hold from the stop line
    HoldN,
}

/// Which gate delay an element uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelayRole {
    /// Edge-shaping line inverter
    Line,
    /// Stage-0 injection NOR
    Injection,
    /// Hold-gated NAND
    Gate,
    /// Buffering inverter
    Buffer,
    /// Interleave merge gate
    Merge,
    /// Skip-tap inverter
    Tap,
}

/// One element of a stage chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    /// Logic function
    pub function: GateFunction,
    /// Input sources in pin order
    pub inputs: Vec<NodeRef>,
    /// Fast input pin
    pub fast: Option<usize>,
    /// Delay class
    pub delay: DelayRole,
}

impl ElementSpec {
    fn new(function: GateFunction, inputs: Vec<NodeRef>, fast: Option<usize>, delay: DelayRole) -> Self {
        Self {
            function,
            inputs,
            fast,
            delay,
        }
    }
}

/// A skip connection from an earlier stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipTap {
    /// Source stage
    pub from: usize,
    /// Whether the tap passes through an inverter
    pub inverted: bool,
}

/// One ring stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescriptor {
    /// Stage position
    pub index: usize,
    /// Element chain; the last element drives the stage output
    pub chain: Vec<ElementSpec>,
    /// Optional skip tap feeding the chain
    pub skip: Option<SkipTap>,
    /// Stages reading this stage's output
    pub fanout: Vec<usize>,
}

impl StageDescriptor {
    /// Whether the hold signal gates this stage
    pub fn is_gated(&self) -> bool {
        self.references(NodeRef::HoldN)
    }

    /// Whether the start pulse enters the ring here
    pub fn is_injection(&self) -> bool {
        self.references(NodeRef::StartPulse)
    }

    fn references(&self, node: NodeRef) -> bool {
        self.chain.iter().any(|e| e.inputs.contains(&node))
    }

    fn position_of(&self, node: NodeRef) -> Option<usize> {
        self.chain.iter().position(|e| e.inputs.contains(&node))
    }
}

/// Topology validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// Ring shorter than [`MIN_STAGES`]
    #[error("ring needs at least {MIN_STAGES} stages, got {stages}")]
    TooFewStages {
        /// Requested stage count
        stages: usize,
    },

    /// The primary loop has an even number of inversions
    #[error("primary loop has {inversions} inversions; an even loop cannot oscillate")]
    EvenLoop {
        /// Inversions around the loop
        inversions: usize,
    },

    /// A skip hop disagrees in parity with the route it bypasses
    #[error("skip tap into stage {stage} has {skip} inversions but bypasses {route}")]
    SkipParityMismatch {
        /// Target stage
        stage: usize,
        /// Inversions on the skip hop
        skip: usize,
        /// Inversions on the bypassed primary route
        route: usize,
    },

    /// A stage cannot be held by the stop signal
    #[error("stage {stage} is not gated by the hold signal")]
    UngatedStage {
        /// Offending stage
        stage: usize,
    },

    /// A chain reads a skip tap the stage does not declare
    #[error("stage {stage} reads a skip tap it does not declare")]
    DanglingTap {
        /// Offending stage
        stage: usize,
    },

    /// The injection stage does not settle while the rest of the ring is held
    #[error("injection stage {stage} does not settle while the ring is held")]
    UnsettledInjection {
        /// Offending stage
        stage: usize,
    },
}

/// Data-driven ring description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingTopology {
    variant: RingVariant,
    stages: Vec<StageDescriptor>,
}

impl RingTopology {
    /// Build and validate an `n`-stage ring
    pub fn build(n: usize, variant: RingVariant) -> Result<Self, TopologyError> {
        if n < MIN_STAGES {
            return Err(TopologyError::TooFewStages { stages: n });
        }

        let stages = (0..n)
            .map(|index| match variant {
                RingVariant::Plain => plain_stage(index, n),
                RingVariant::Interleaved => interleaved_stage(index, n),
            })
            .collect();
        let topology = Self { variant, stages };
        topology.validate()?;
        Ok(topology)
    }

    /// Check loop parity and hold coverage
    pub fn validate(&self) -> Result<(), TopologyError> {
        self.check_odd_cycles()?;
        self.held_pattern().map(|_| ())
    }

    /// Variant
    pub fn variant(&self) -> RingVariant {
        self.variant
    }

    /// Stage count
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the ring has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// All stages in ring order
    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    /// One stage
    pub fn stage(&self, index: usize) -> Option<&StageDescriptor> {
        self.stages.get(index)
    }

    fn predecessor(&self, index: usize) -> usize {
        (index + self.len() - 1) % self.len()
    }

    /// Inversions from the predecessor's output to this stage's output
    pub fn primary_inversions(&self, index: usize) -> usize {
        let stage = &self.stages[index];
        let pred = NodeRef::Stage(self.predecessor(index));
        stage
            .position_of(pred)
            .map_or(0, |pos| stage.chain.len() - pos)
    }

    /// Inversions on the skip hop into this stage
    pub fn skip_inversions(&self, index: usize) -> Option<usize> {
        let stage = &self.stages[index];
        let skip = stage.skip?;
        let pos = stage.position_of(NodeRef::Tap)?;
        Some(stage.chain.len() - pos + usize::from(skip.inverted))
    }

    /// Inversions along primary hops from `from` (exclusive) to `to` (inclusive)
    fn route_inversions(&self, from: usize, to: usize) -> usize {
        let n = self.len();
        let hops = (to + n - from) % n;
        (1..=hops)
            .map(|k| self.primary_inversions((from + k) % n))
            .sum()
    }

    /// Verify that every cycle winding the ring once is odd
    pub fn check_odd_cycles(&self) -> Result<(), TopologyError> {
        let inversions: usize = (0..self.len()).map(|i| self.primary_inversions(i)).sum();
        if inversions % 2 == 0 {
            return Err(TopologyError::EvenLoop { inversions });
        }

        for stage in &self.stages {
            let (Some(skip), Some(skip_inv)) = (stage.skip, self.skip_inversions(stage.index)) else {
                continue;
            };
            let route = self.route_inversions(skip.from, stage.index);
            if skip_inv % 2 != route % 2 {
                return Err(TopologyError::SkipParityMismatch {
                    stage: stage.index,
                    skip: skip_inv,
                    route,
                });
            }
        }
        Ok(())
    }

    /// Stage outputs once the hold signal has been low long enough
    ///
    /// Gated stages must be decided by the hold signal alone; the injection
    /// stage must then be decided by the held outputs.
    pub fn held_pattern(&self) -> Result<Vec<bool>, TopologyError> {
        let unknown = vec![None; self.len()];
        let mut outputs = unknown.clone();

        for stage in &self.stages {
            if stage.is_gated() {
                outputs[stage.index] = Some(
                    settle(stage, &unknown).ok_or(TopologyError::UngatedStage { stage: stage.index })?,
                );
            } else if !stage.is_injection() {
                return Err(TopologyError::UngatedStage { stage: stage.index });
            }
        }

        let gated = outputs.clone();
        for stage in self.stages.iter().filter(|s| !s.is_gated()) {
            outputs[stage.index] = Some(
                settle(stage, &gated).ok_or(TopologyError::UnsettledInjection { stage: stage.index })?,
            );
        }

        Ok(outputs.into_iter().flatten().collect())
    }

    /// Delay from the predecessor's output to this stage's output
    pub fn stage_delay(&self, index: usize, delays: &GateDelays) -> Ticks {
        let stage = &self.stages[index];
        let pred = NodeRef::Stage(self.predecessor(index));
        let start = stage.position_of(pred).unwrap_or(0);
        stage.chain[start..]
            .iter()
            .map(|e| delays.for_role(e.delay))
            .sum()
    }

    /// Delay from the skip source's output to this stage's output
    pub fn skip_delay(&self, index: usize, delays: &GateDelays) -> Option<Ticks> {
        let stage = &self.stages[index];
        let skip = stage.skip?;
        let start = stage.position_of(NodeRef::Tap)?;
        let tap = if skip.inverted { delays.for_role(DelayRole::Tap) } else { 0 };
        Some(tap + stage.chain[start..].iter().map(|e| delays.for_role(e.delay)).sum::<Ticks>())
    }

    /// Sum of all primary stage delays
    pub fn loop_delay(&self, delays: &GateDelays) -> Ticks {
        (0..self.len()).map(|i| self.stage_delay(i, delays)).sum()
    }

    /// Period of an edge travelling the primary path only
    ///
    /// Exact for the plain ring. The interleaved ring runs faster because
    /// skip taps carry one edge direction ahead of the primary chain.
    pub fn primary_period(&self, delays: &GateDelays) -> Ticks {
        2 * self.loop_delay(delays)
    }

    /// Number of elements the ring instantiates
    pub fn element_count(&self) -> usize {
        self.stages
            .iter()
            .map(|s| s.chain.len() + usize::from(s.skip.is_some_and(|t| t.inverted)))
            .sum()
    }
}

/// Three-valued evaluation of one stage chain with hold asserted
fn settle(stage: &StageDescriptor, outputs: &[Option<bool>]) -> Option<bool> {
    let tap = stage
        .skip
        .and_then(|skip| outputs[skip.from].map(|level| level ^ skip.inverted));
    let mut locals: Vec<Option<bool>> = Vec::with_capacity(stage.chain.len());
    for spec in &stage.chain {
        let levels: Vec<Option<bool>> = spec
            .inputs
            .iter()
            .map(|node| match *node {
                NodeRef::Stage(i) => outputs[i],
                NodeRef::Local(k) => locals[k],
                NodeRef::Tap => tap,
                NodeRef::StartPulse | NodeRef::HoldN => Some(false),
            })
            .collect();
        locals.push(spec.function.resolve(&levels));
    }
    locals.last().copied().flatten()
}

fn fanout(index: usize, n: usize, variant: RingVariant) -> Vec<usize> {
    match variant {
        RingVariant::Plain => vec![(index + 1) % n],
        RingVariant::Interleaved => vec![(index + 1) % n, (index + 2) % n],
    }
}

fn plain_stage(index: usize, n: usize) -> StageDescriptor {
    let pred = NodeRef::Stage((index + n - 1) % n);
    let chain = if index == 0 {
        vec![ElementSpec::new(
            GateFunction::Nor2,
            vec![NodeRef::StartPulse, pred],
            Some(0),
            DelayRole::Injection,
        )]
    } else {
        vec![
            ElementSpec::new(GateFunction::Nand2, vec![NodeRef::HoldN, pred], Some(0), DelayRole::Gate),
            ElementSpec::new(GateFunction::Inv, vec![NodeRef::Local(0)], None, DelayRole::Buffer),
        ]
    };
    StageDescriptor {
        index,
        chain,
        skip: None,
        fanout: fanout(index, n, RingVariant::Plain),
    }
}

fn interleaved_stage(index: usize, n: usize) -> StageDescriptor {
    let pred = NodeRef::Stage((index + n - 1) % n);
    let (chain, skip) = match index {
        0 => (
            vec![
                ElementSpec::new(GateFunction::Nor2, vec![pred, NodeRef::Tap], Some(0), DelayRole::Merge),
                ElementSpec::new(GateFunction::Inv, vec![NodeRef::Local(0)], None, DelayRole::Buffer),
                ElementSpec::new(
                    GateFunction::Nor2,
                    vec![NodeRef::StartPulse, NodeRef::Local(1)],
                    Some(0),
                    DelayRole::Injection,
                ),
            ],
            SkipTap {
                from: n - 2,
                inverted: false,
            },
        ),
        1 => (
            vec![
                ElementSpec::new(GateFunction::Nand2, vec![pred, NodeRef::Tap], Some(0), DelayRole::Merge),
                ElementSpec::new(
                    GateFunction::Nand2,
                    vec![NodeRef::HoldN, NodeRef::Local(0)],
                    Some(0),
                    DelayRole::Gate,
                ),
            ],
            SkipTap {
                from: n - 1,
                inverted: true,
            },
        ),
        _ => (
            vec![
                ElementSpec::new(GateFunction::Nand2, vec![NodeRef::HoldN, pred], Some(0), DelayRole::Gate),
                ElementSpec::new(
                    GateFunction::Nor2,
                    vec![NodeRef::Local(0), NodeRef::Tap],
                    Some(0),
                    DelayRole::Merge,
                ),
            ],
            SkipTap {
                from: index - 2,
                inverted: true,
            },
        ),
    };
    StageDescriptor {
        index,
        chain,
        skip: Some(skip),
        fanout: fanout(index, n, RingVariant::Interleaved),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_few_stages() {
        assert_eq!(
            RingTopology::build(2, RingVariant::Plain).unwrap_err(),
            TopologyError::TooFewStages { stages: 2 }
        );
        assert!(RingTopology::build(3, RingVariant::Plain).is_ok());
        assert!(RingTopology::build(3, RingVariant::Interleaved).is_ok());
    }

    #[test]
    fn test_plain_structure() {
        let ring = RingTopology::build(4, RingVariant::Plain).unwrap();

        assert_eq!(ring.len(), 4);
        assert!(ring.stage(0).unwrap().is_injection());
        assert!(!ring.stage(0).unwrap().is_gated());
        assert!((1..4).all(|i| ring.stage(i).unwrap().is_gated()));
        assert_eq!(ring.stage(3).unwrap().fanout, vec![0]);
        assert_eq!(ring.primary_inversions(0), 1);
        assert_eq!(ring.primary_inversions(2), 2);
        assert_eq!(ring.element_count(), 7);
    }

    #[test]
    fn test_interleaved_wraparound_taps() {
        let ring = RingTopology::build(5, RingVariant::Interleaved).unwrap();

        assert_eq!(ring.stage(0).unwrap().skip, Some(SkipTap { from: 3, inverted: false }));
        assert_eq!(ring.stage(1).unwrap().skip, Some(SkipTap { from: 4, inverted: true }));
        assert_eq!(ring.stage(2).unwrap().skip, Some(SkipTap { from: 0, inverted: true }));
        assert_eq!(ring.stage(3).unwrap().fanout, vec![4, 0]);
        assert_eq!(ring.stage(4).unwrap().fanout, vec![0, 1]);
        assert!(ring.stage(0).unwrap().is_injection());
        assert!(ring.stage(1).unwrap().is_gated());
        // 3 + 4 * 3 (two gates and a tap inverter)
        assert_eq!(ring.element_count(), 15);
    }

    #[test]
    fn test_wraparound_hops_are_not_shortcuts() {
        let delays = GateDelays::default();
        let ring = RingTopology::build(5, RingVariant::Interleaved).unwrap();

        assert_eq!(ring.stage_delay(0, &delays), 90);
        assert_eq!(ring.skip_delay(0, &delays), Some(90));
        assert_eq!(ring.stage_delay(1, &delays), 50);
        assert_eq!(ring.skip_delay(1, &delays), Some(70));
        assert_eq!(ring.skip_delay(2, &delays), Some(40));

        for n in MIN_STAGES..=8 {
            let ring = RingTopology::build(n, RingVariant::Interleaved).unwrap();
            for stage in [0, 1] {
                let skip = ring.skip_delay(stage, &delays).unwrap();
                assert!(skip >= ring.stage_delay(stage, &delays), "n={n} stage={stage}");
            }
        }
    }

    #[test]
    fn test_every_variant_is_odd() {
        for n in MIN_STAGES..=16 {
            for variant in [RingVariant::Plain, RingVariant::Interleaved] {
                let ring = RingTopology::build(n, variant).unwrap();
                let loop_inversions: usize = (0..n).map(|i| ring.primary_inversions(i)).sum();
                assert_eq!(loop_inversions % 2, 1, "{variant} n={n}");
            }
        }
    }

    #[test]
    fn test_skip_parity_matches_route() {
        let ring = RingTopology::build(6, RingVariant::Interleaved).unwrap();
        assert_eq!(ring.skip_inversions(0), Some(3));
        assert_eq!(ring.skip_inversions(1), Some(3));
        assert_eq!(ring.skip_inversions(4), Some(2));
        assert_eq!(ring.route_inversions(4, 0), 5);
        assert_eq!(ring.route_inversions(2, 4), 4);
    }

    #[test]
    fn test_even_loop_rejected() {
        let mut ring = RingTopology::build(3, RingVariant::Plain).unwrap();
        // Drop the buffer of stage 2: the loop loses one inversion
        ring.stages[2].chain.pop();

        assert_eq!(
            ring.check_odd_cycles().unwrap_err(),
            TopologyError::EvenLoop { inversions: 4 }
        );
    }

    #[test]
    fn test_skip_parity_mismatch_rejected() {
        let mut ring = RingTopology::build(4, RingVariant::Interleaved).unwrap();
        ring.stages[0].skip = Some(SkipTap { from: 2, inverted: true });

        assert!(matches!(
            ring.check_odd_cycles(),
            Err(TopologyError::SkipParityMismatch { stage: 0, skip: 4, route: 5 })
        ));
    }

    #[test]
    fn test_ungated_stage_rejected() {
        let mut ring = RingTopology::build(4, RingVariant::Plain).unwrap();
        ring.stages[2].chain[0].inputs[0] = NodeRef::Stage(0);

        assert_eq!(
            ring.held_pattern().unwrap_err(),
            TopologyError::UngatedStage { stage: 2 }
        );
    }

    #[test]
    fn test_held_pattern() {
        let plain = RingTopology::build(5, RingVariant::Plain).unwrap();
        assert_eq!(plain.held_pattern().unwrap(), vec![true, false, false, false, false]);

        let interleaved = RingTopology::build(5, RingVariant::Interleaved).unwrap();
        assert_eq!(interleaved.held_pattern().unwrap(), vec![true, true, false, false, false]);

        // Stage 0 reads the held stage 1 through its skip tap
        let smallest = RingTopology::build(3, RingVariant::Interleaved).unwrap();
        assert_eq!(smallest.held_pattern().unwrap(), vec![false, true, false]);
    }

    #[test]
    fn test_primary_period() {
        let delays = GateDelays::symmetric(1);
        let plain = RingTopology::build(4, RingVariant::Plain).unwrap();
        assert_eq!(plain.loop_delay(&delays), 8);
        assert_eq!(plain.primary_period(&delays), 16);

        let delays = GateDelays::default();
        let plain = RingTopology::build(64, RingVariant::Plain).unwrap();
        assert_eq!(plain.primary_period(&delays), 6400);
    }
}
