//! TDC orchestrator
//!
//! [`Tdc`] owns the scheduler and every piece of circuit state, wires the
//! components together and exposes the external signal interface.
//!
//! ```text
//! i_start ─▶ EdgeShapingLine(start) ─▶ start_pulse ─┬─▶ RingOscillator ─▶ x[0] ─▶ WrapCounter
//!                                                   └─────────────────────────────▶ (reset)
//! i_stop  ─▶ EdgeShapingLine(stop)  ─▶ hold_n ─────────▶ RingOscillator
//!    └───────────────────────────────────────────────▶ CaptureUnit ◀─ ring vector, counter
//! ```
//!
//! # Event Processing
//!
//! One event is popped per [`step`](Tdc::step). A net that changes
//! re-evaluates its readers, which schedule their own output changes
//! `delay` ticks later; the shaped line outputs follow combinationally.
//! Rising edges on `ring_start`, `start_pulse` and `i_stop` enqueue counter
//! and capture events at the current tick, where the class ordering places
//! them after every ring transition of that tick.
//!
//! A free-running ring never drains the queue. Drive it with
//! [`run_until`](Tdc::run_until), never with a run-to-idle loop.

use tracing::{debug, trace, warn};

use super::capture::{CaptureSnapshot, CaptureUnit, RaceFlags};
#[cfg(feature = "verification")]
use super::capture::RaceEvent;
use super::circuit::{
    DelayElement, EdgeShapingLine, LineRole, NetId, NetTable, RingOscillator, RingTopology, RingVector,
};
use super::clock::{
    ClockBackend, EventClass, EventId, EventPayload, LogicalTimestamp, ProductionBackend, Ticks,
    VerificationBackend, VirtualClock,
};
use super::config::TdcConfig;
use super::counter::{CounterAction, CounterEdge, WrapCounter};
use super::error::TdcError;
use super::waveform::{DebugTaps, Transition, WaveformRecorder};

/// Nets and elements of one TDC instance
struct Circuit {
    nets: NetTable,
    elements: Vec<DelayElement>,
    i_start: NetId,
    i_stop: NetId,
    start_line: EdgeShapingLine,
    stop_line: EdgeShapingLine,
    ring: RingOscillator,
}

impl Circuit {
    fn build(config: &TdcConfig) -> Result<Self, TdcError> {
        let topology = RingTopology::build(config.n_delay, config.variant())?;

        let mut nets = NetTable::new();
        let mut elements = Vec::new();
        let i_start = nets.add("i_start", false);
        let i_stop = nets.add("i_stop", false);
        let start_line = EdgeShapingLine::build(
            LineRole::StartMonopulse,
            i_start,
            config.n_start_del,
            config.delays.line_inv,
            &mut nets,
            &mut elements,
        );
        let stop_line = EdgeShapingLine::build(
            LineRole::StopHold,
            i_stop,
            config.n_stop_del,
            config.delays.line_inv,
            &mut nets,
            &mut elements,
        );
        let ring = RingOscillator::build(
            topology,
            &config.delays,
            start_line.output(),
            stop_line.output(),
            &mut nets,
            &mut elements,
        )?;

        Ok(Self {
            nets,
            elements,
            i_start,
            i_stop,
            start_line,
            stop_line,
            ring,
        })
    }
}

/// A time-to-digital converter twin
///
/// # Type Parameters
/// - `B`: Clock backend (Production or Verification)
pub struct Tdc<B: ClockBackend = ProductionBackend> {
    config: TdcConfig,
    clock: VirtualClock<B>,
    circuit: Circuit,
    counter: WrapCounter,
    capture: CaptureUnit,
    recorder: Option<WaveformRecorder>,
    #[cfg(feature = "verification")]
    race_log: Vec<RaceEvent>,
}

/// TDC on the unbounded heap scheduler
pub type ProductionTdc = Tdc<ProductionBackend>;

/// TDC on the bounded linear-scan scheduler
pub type VerificationTdc = Tdc<VerificationBackend>;

impl Tdc<ProductionBackend> {
    /// Build on the production scheduler
    pub fn production(config: TdcConfig) -> Result<Self, TdcError> {
        Self::new(config, ProductionBackend::new())
    }
}

impl Tdc<VerificationBackend> {
    /// Build on a bounded scheduler sized for `config`
    pub fn verification(config: TdcConfig) -> Result<Self, TdcError> {
        let capacity = verification_capacity(&config);
        Self::new(config, VerificationBackend::with_capacity(capacity))
    }
}

/// Queue slots that comfortably cover the live plus stale events of a circuit
pub fn verification_capacity(config: &TdcConfig) -> usize {
    4 * (config.n_start_del + config.n_stop_del + 3 * config.n_delay) + 16
}

impl<B: ClockBackend> Tdc<B> {
    /// Validate `config` and wire the circuit
    pub fn new(config: TdcConfig, backend: B) -> Result<Self, TdcError> {
        config.validate()?;
        let circuit = Circuit::build(&config)?;
        debug!(
            stages = config.n_delay,
            counter_bits = config.n_ctr,
            variant = %config.variant(),
            nets = circuit.nets.len(),
            elements = circuit.elements.len(),
            "tdc wired"
        );

        Ok(Self {
            counter: WrapCounter::new(config.n_ctr),
            capture: CaptureUnit::new(config.n_delay),
            clock: VirtualClock::new(backend),
            recorder: None,
            #[cfg(feature = "verification")]
            race_log: Vec::new(),
            circuit,
            config,
        })
    }

    /// Return to the power-on state, dropping every pending event
    pub fn reset(&mut self) -> Result<(), TdcError> {
        self.circuit = Circuit::build(&self.config)?;
        self.clock.reset();
        self.counter = WrapCounter::new(self.config.n_ctr);
        self.capture = CaptureUnit::new(self.config.n_delay);
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.clear();
        }
        #[cfg(feature = "verification")]
        self.race_log.clear();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stimulus
    // ------------------------------------------------------------------

    /// Schedule an `i_start` level change
    pub fn set_start(&mut self, at: Ticks, level: bool) -> Result<EventId, TdcError> {
        let net = self.circuit.i_start;
        self.schedule_input(net, at, level)
    }

    /// Schedule an `i_stop` level change
    pub fn set_stop(&mut self, at: Ticks, level: bool) -> Result<EventId, TdcError> {
        let net = self.circuit.i_stop;
        self.schedule_input(net, at, level)
    }

    fn schedule_input(&mut self, net: NetId, at: Ticks, level: bool) -> Result<EventId, TdcError> {
        let id = self
            .clock
            .schedule_at(at, EventClass::Control, EventPayload::Stimulus { net, level })?;
        trace!(net = self.circuit.nets.name(net), at, level, "stimulus scheduled");
        Ok(id)
    }

    /// Single-interval convenience: rising start, rising stop, run to stop
    ///
    /// Inputs are left high; lower them before the next measurement.
    pub fn measure(&mut self, start_at: Ticks, stop_at: Ticks) -> Result<CaptureSnapshot, TdcError> {
        self.set_start(start_at, true)?;
        self.set_stop(stop_at, true)?;
        self.run_until(stop_at)?;
        Ok(self.capture.latest().clone())
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Process one event
    ///
    /// # Returns
    /// `false` if nothing was pending
    pub fn step(&mut self) -> Result<bool, TdcError> {
        let Some(event) = self.clock.tick() else {
            return Ok(false);
        };
        trace!(at = event.at, class = ?event.class, payload = ?event.payload, "event");
        self.dispatch(event.payload)?;
        Ok(true)
    }

    /// Process every event at the next pending tick
    ///
    /// # Returns
    /// The tick processed, or `None` if nothing was pending
    pub fn advance_instant(&mut self) -> Result<Option<Ticks>, TdcError> {
        let Some(at) = self.clock.next_event_time() else {
            return Ok(None);
        };
        while self.clock.next_event_time() == Some(at) {
            self.step()?;
        }
        Ok(Some(at))
    }

    /// Process all events up to and including `until`, then move time there
    ///
    /// # Returns
    /// Number of events processed
    pub fn run_until(&mut self, until: Ticks) -> Result<usize, TdcError> {
        let mut processed = 0;
        while self.clock.next_event_time().is_some_and(|at| at <= until) {
            self.step()?;
            processed += 1;
        }
        self.clock.advance_to(until);
        Ok(processed)
    }

    /// [`run_until`](Self::run_until) `now + delta`
    pub fn run_for(&mut self, delta: Ticks) -> Result<usize, TdcError> {
        self.run_until(self.now().saturating_add(delta))
    }

    // ------------------------------------------------------------------
    // Event handlers
    // ------------------------------------------------------------------

    fn dispatch(&mut self, payload: EventPayload) -> Result<(), TdcError> {
        match payload {
            EventPayload::Stimulus { net, level } => self.drive_net(net, level),
            EventPayload::OutputChange {
                element,
                level,
                generation,
            } => {
                let element = &mut self.circuit.elements[element.index()];
                match element.commit(generation) {
                    Some(committed) => {
                        debug_assert_eq!(committed, level);
                        let output = element.output();
                        self.drive_net(output, committed)
                    }
                    None => Ok(()),
                }
            }
            EventPayload::CounterEdge(edge) => {
                self.clock_counter(edge);
                Ok(())
            }
            EventPayload::Capture => {
                self.sample();
                Ok(())
            }
        }
    }

    fn drive_net(&mut self, net: NetId, level: bool) -> Result<(), TdcError> {
        let now = self.clock.now();
        if !self.circuit.nets.set(net, level, now) {
            return Ok(());
        }
        self.record(net, level, now);
        self.propagate(net, now)?;

        if self.circuit.start_line.watches(net) {
            let output = self.circuit.start_line.output();
            let shaped = self.circuit.start_line.shape(&self.circuit.nets);
            self.drive_net(output, shaped)?;
        }
        if self.circuit.stop_line.watches(net) {
            let output = self.circuit.stop_line.output();
            let shaped = self.circuit.stop_line.shape(&self.circuit.nets);
            self.drive_net(output, shaped)?;
        }

        if level {
            if net == self.circuit.i_stop {
                self.clock
                    .schedule_at(now, EventClass::Capture, EventPayload::Capture)?;
            } else if net == self.circuit.ring.ring_start() {
                self.clock.schedule_at(
                    now,
                    EventClass::Counter,
                    EventPayload::CounterEdge(CounterEdge::RingStart),
                )?;
            } else if net == self.circuit.start_line.output() {
                self.clock.schedule_at(
                    now,
                    EventClass::Counter,
                    EventPayload::CounterEdge(CounterEdge::StartPulse),
                )?;
            }
        }
        Ok(())
    }

    fn propagate(&mut self, net: NetId, now: Ticks) -> Result<(), TdcError> {
        let Circuit { nets, elements, .. } = &mut self.circuit;
        for &id in nets.fanout(net) {
            let element = &mut elements[id.index()];
            if let Some(change) = element.evaluate(nets, now)? {
                self.clock.schedule_at(
                    change.at,
                    element.class(),
                    EventPayload::OutputChange {
                        element: id,
                        level: change.level,
                        generation: change.generation,
                    },
                )?;
            }
        }
        Ok(())
    }

    fn record(&mut self, net: NetId, level: bool, now: Ticks) {
        let Some(recorder) = self.recorder.as_mut() else {
            return;
        };
        let circuit = &self.circuit;
        let watched = circuit.ring.stage_of(net).is_some()
            || net == circuit.start_line.output()
            || net == circuit.stop_line.output();
        if !watched {
            return;
        }
        if let Err(err) = recorder.record(Transition { at: now, net, level }) {
            trace!(%err, "waveform transition dropped");
        }
    }

    fn clock_counter(&mut self, edge: CounterEdge) {
        let now = self.clock.now();
        let start_pulse = self.circuit.nets.level(self.circuit.start_line.output());
        match self.counter.on_edge(edge, start_pulse, now) {
            CounterAction::Reset => debug!(time = now, ?edge, "counter reset"),
            CounterAction::Increment { wrapped: true } => trace!(time = now, "counter wrapped"),
            CounterAction::Increment { wrapped: false } => {}
        }
    }

    fn sample(&mut self) {
        let timestamp = self.clock.timestamp();
        let now = timestamp.time;
        let nets = &self.circuit.nets;
        let race = RaceFlags {
            ring: self
                .circuit
                .ring
                .outputs()
                .iter()
                .any(|&net| nets.last_change(net) == Some(now)),
            counter: self.counter.last_update() == Some(now),
        };
        if race.any() {
            warn!(
                time = now,
                ring = race.ring,
                counter = race.counter,
                "capture coincides with a transition; post-update values latched"
            );
            #[cfg(feature = "verification")]
            self.race_log.push(RaceEvent { timestamp, race });
        }

        let snapshot = CaptureSnapshot {
            ring: self.circuit.ring.vector(nets),
            counter: self.counter.value(),
            timestamp,
            race,
        };
        let latched = self.capture.capture(snapshot);
        debug!(time = now, ring = %latched.ring, counter = latched.counter, "captured");
    }

    // ------------------------------------------------------------------
    // Outputs
    // ------------------------------------------------------------------

    /// Latched snapshot
    pub fn result(&self) -> &CaptureSnapshot {
        self.capture.latest()
    }

    /// `o_result_ring`
    pub fn result_ring(&self) -> &RingVector {
        &self.capture.latest().ring
    }

    /// `o_result_ctr`
    pub fn result_ctr(&self) -> u32 {
        self.capture.latest().counter
    }

    /// Number of captures taken
    pub fn capture_count(&self) -> u64 {
        self.capture.count()
    }

    /// Live ring vector
    pub fn ring_vector(&self) -> RingVector {
        self.circuit.ring.vector(&self.circuit.nets)
    }

    /// Live counter value
    pub fn counter_value(&self) -> u32 {
        self.counter.value()
    }

    /// Live start monopulse
    pub fn start_pulse(&self) -> bool {
        self.circuit.nets.level(self.circuit.start_line.output())
    }

    /// Live active-low hold
    pub fn hold_n(&self) -> bool {
        self.circuit.nets.level(self.circuit.stop_line.output())
    }

    /// Debug taps, when `debug_enabled`
    pub fn debug(&self) -> Option<DebugTaps> {
        self.config.debug_enabled.then(|| DebugTaps {
            start_pulse: self.start_pulse(),
            hold_n: self.hold_n(),
            counter: self.counter_value(),
            ring: self.ring_vector(),
        })
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Construction parameters
    pub fn config(&self) -> &TdcConfig {
        &self.config
    }

    /// Current simulated time
    pub fn now(&self) -> Ticks {
        self.clock.now()
    }

    /// Current time and step count
    pub fn timestamp(&self) -> LogicalTimestamp {
        self.clock.timestamp()
    }

    /// Pending events
    pub fn pending_events(&self) -> usize {
        self.clock.pending_events()
    }

    /// Whether nothing is pending
    pub fn is_idle(&self) -> bool {
        self.clock.is_idle()
    }

    /// Wired ring
    pub fn ring(&self) -> &RingOscillator {
        &self.circuit.ring
    }

    /// Start edge-shaping line
    pub fn start_line(&self) -> &EdgeShapingLine {
        &self.circuit.start_line
    }

    /// Stop edge-shaping line
    pub fn stop_line(&self) -> &EdgeShapingLine {
        &self.circuit.stop_line
    }

    /// Every net of the circuit
    pub fn nets(&self) -> &NetTable {
        &self.circuit.nets
    }

    /// Start recording transitions, keeping at most `capacity`
    pub fn enable_waveform(&mut self, capacity: usize) {
        self.recorder = Some(WaveformRecorder::new(capacity));
    }

    /// Recorded transitions, if enabled
    pub fn waveform(&self) -> Option<&WaveformRecorder> {
        self.recorder.as_ref()
    }

    /// Detach the recorder
    pub fn take_waveform(&mut self) -> Option<WaveformRecorder> {
        self.recorder.take()
    }

    /// Every capture race seen so far
    #[cfg(feature = "verification")]
    pub fn race_log(&self) -> &[RaceEvent] {
        &self.race_log
    }
}
