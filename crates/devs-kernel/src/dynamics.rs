//! The `Dynamics` trait — the contract every atomic model implements.

use devs_core::{ModelId, ModelRng, Time, Value};

use crate::{EventList, ExternalEvent, ModelResult};

/// Everything an atomic model receives when the coordinator instantiates it.
pub struct DynamicsInit {
    /// Structural position of the model in the flattened hierarchy.
    pub id: ModelId,
    /// Full path of the model, e.g. `"top:agents:agent1"`.
    pub name: String,
    /// Deterministic RNG seeded from the run seed and `id`.
    pub rng: ModelRng,
}

/// Pluggable atomic model behavior.
///
/// The coordinator keeps, per model, the absolute date of its next internal
/// event: `last transition date + time_advance()`.  It calls:
///
/// 1. [`init`][Self::init] once, with the run's begin date.
/// 2. [`output`][Self::output] on every imminent model before any
///    transition of the cycle.
/// 3. Exactly one transition per touched model per cycle: internal for
///    imminent models, external for models that only received input,
///    confluent for models that are both.
///
/// `time_advance` is re-read after every transition.
///
/// # Contract
///
/// - Must not block or spawn work; all interaction goes through events.
/// - `time_advance` must never be negative.  `Time::INFINITY` means passive.
pub trait Dynamics: Send + 'static {
    /// Initialise the model at `time`; returns the first time advance.
    fn init(&mut self, time: Time) -> ModelResult<Time>;

    /// Duration until the next internal event, measured from the last
    /// transition.
    fn time_advance(&self) -> Time;

    /// Emit output events.  Called only when the model is imminent.
    fn output(&self, _time: Time, _output: &mut EventList) {}

    fn internal_transition(&mut self, _time: Time) -> ModelResult<()> {
        Ok(())
    }

    fn external_transition(&mut self, _events: &[ExternalEvent], _time: Time) -> ModelResult<()> {
        Ok(())
    }

    /// Imminent and receiving input at the same instant.
    ///
    /// Default: the internal transition first, then the external transition
    /// with the routed events, both at `time`.
    fn confluent_transitions(&mut self, time: Time, events: &[ExternalEvent]) -> ModelResult<()> {
        self.internal_transition(time)?;
        self.external_transition(events, time)
    }

    /// Answer an observation query on `port`.  `None` if the port is unknown.
    fn observation(&self, _port: &str, _time: Time) -> Option<Value> {
        None
    }

    /// Called once after the run ends.
    fn finish(&mut self, _time: Time) {}
}

/// A model that never schedules anything and ignores its input.
///
/// Useful as a placeholder or as a sink at the end of a coupling.
pub struct Passive;

impl Dynamics for Passive {
    fn init(&mut self, _time: Time) -> ModelResult<Time> {
        Ok(Time::INFINITY)
    }

    fn time_advance(&self) -> Time {
        Time::INFINITY
    }
}
