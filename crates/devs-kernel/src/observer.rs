//! Observation views and the observer trait that receives their samples.

use devs_core::{ModelId, Time, Value};

/// When a view samples its observables.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewKind {
    /// At `begin`, `begin + step`, `begin + 2·step`, … up to the end date.
    Timed(Time),
    /// After every transition of an observed model.
    Event,
    /// Once, when the run ends.
    Finish,
}

/// One sample: the answer of `Dynamics::observation` for a (model, port).
#[derive(Debug)]
pub struct Observation<'a> {
    pub view:       &'a str,
    pub time:       Time,
    pub model:      ModelId,
    pub model_name: &'a str,
    pub port:       &'a str,
    /// `None` when the model does not know the port.
    pub value:      Option<Value>,
}

/// Callbacks invoked by [`RootCoordinator::run`][crate::RootCoordinator::run].
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example — cycle counter
///
/// ```rust,ignore
/// struct Cycles(u64);
///
/// impl SimObserver for Cycles {
///     fn on_cycle_end(&mut self, _time: Time, _imminent: usize, _touched: usize) {
///         self.0 += 1;
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called before the imminent models of a cycle emit their output.
    fn on_cycle_start(&mut self, _time: Time) {}

    /// Called once every transition of the cycle has run.
    ///
    /// `imminent` counts internal events, `touched` every model that
    /// transitioned (imminent or receiving input).
    fn on_cycle_end(&mut self, _time: Time, _imminent: usize, _touched: usize) {}

    /// Called for every sample any view takes.
    fn on_observation(&mut self, _obs: &Observation<'_>) {}

    /// Called once after finish views have been sampled.
    fn on_sim_end(&mut self, _final_time: Time) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

// ── Internal view state ───────────────────────────────────────────────────────

pub(crate) struct View {
    pub name:        String,
    pub kind:        ViewKind,
    /// Next timed sample date; unused for other kinds.
    pub next_sample: Time,
    pub observables: Vec<(ModelId, String)>,
}

impl View {
    pub fn observes(&self, model: ModelId) -> bool {
        self.observables.iter().any(|(m, _)| *m == model)
    }
}
