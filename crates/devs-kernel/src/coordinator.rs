//! The `RootCoordinator` and its event loop.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use devs_core::{ModelId, SimClock, SimConfig, Time, Value};

use crate::graph::{FlatModel, Routes};
use crate::observer::View;
use crate::{EventCalendar, EventList, ExternalEvent, Observation, SimError, SimObserver, SimResult, ViewKind};

/// What a finished (or stopped) run reports.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSummary {
    /// Date the run stopped at: the end date, or the last processed cycle
    /// when the run was cancelled or ran out of events with an unbounded
    /// duration.
    pub end_time:  Time,
    /// Number of processed cycles (distinct event dates).
    pub cycles:    u64,
    /// `true` if the stop flag ended the run early.
    pub cancelled: bool,
}

/// Drives a flattened model hierarchy through simulated time.
///
/// Each cycle at date `tn` (the earliest pending internal event):
///
/// 1. **Timed views** take every sample dated strictly before `tn`.
/// 2. **Output**: every imminent model emits events; each event is copied
///    to every coupled destination, in declaration order.
/// 3. **Transitions**, in ascending `ModelId`: confluent for imminent models
///    with input, internal for the other imminent models, external for
///    models that only received input.  The next event date of each is
///    `tn + time_advance()`.
/// 4. **Event views** sample each transitioned model.
///
/// The loop stops when the next date lies beyond `config.end()` (events at
/// exactly the end date are processed), when no model has a pending event,
/// or when the stop flag is raised.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct RootCoordinator {
    pub config: SimConfig,
    pub clock:  SimClock,

    models:      Vec<FlatModel>,
    routes:      Vec<Routes>,
    calendar:    EventCalendar,
    views:       Vec<View>,
    stop:        Option<Arc<AtomicBool>>,
    initialized: bool,
    finished:    bool,
    cycles:      u64,
}

impl RootCoordinator {
    pub(crate) fn new(
        config: SimConfig,
        models: Vec<FlatModel>,
        routes: Vec<Routes>,
        views:  Vec<View>,
        stop:   Option<Arc<AtomicBool>>,
    ) -> Self {
        let calendar = EventCalendar::with_models(models.len());
        Self {
            clock: config.make_clock(),
            config,
            models,
            routes,
            calendar,
            views,
            stop,
            initialized: false,
            finished: false,
            cycles: 0,
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Run from the current date to the end of the simulation.
    ///
    /// Initialises every model on the first call.  Once this returns `Ok`,
    /// finish views have been sampled and every model's `finish` hook has
    /// run; calling it again is a no-op.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<RunSummary> {
        if self.finished {
            return Ok(self.summary(false));
        }
        info!(
            begin = %self.config.begin,
            end = %self.config.end(),
            models = self.models.len(),
            seed = self.config.seed,
            "simulation starting"
        );
        self.initialize()?;

        let end = self.config.end();
        let mut cancelled = false;
        loop {
            if self.stop_requested() {
                cancelled = true;
                break;
            }
            let tn = self.calendar.next_time();
            if tn.is_infinity() || tn > end {
                break;
            }
            self.process_cycle(tn, observer)?;
        }

        if !cancelled && end.is_finite() {
            self.flush_timed_views(end, true, observer);
            self.clock.advance_to(end);
        }
        let final_time = self.clock.current;
        self.sample_views(ViewKind::Finish, final_time, observer);
        for model in &mut self.models {
            model.dynamics.finish(final_time);
        }
        self.finished = true;
        observer.on_sim_end(final_time);

        let summary = self.summary(cancelled);
        info!(
            end = %summary.end_time,
            cycles = summary.cycles,
            cancelled = summary.cancelled,
            "simulation finished"
        );
        Ok(summary)
    }

    /// Process exactly one cycle, ignoring the end date.
    ///
    /// Returns the cycle's date, or `None` if no model has a pending event.
    /// Useful for tests and incremental stepping.
    pub fn step<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<Option<Time>> {
        self.initialize()?;
        let tn = self.calendar.next_time();
        if tn.is_infinity() {
            return Ok(None);
        }
        self.process_cycle(tn, observer)?;
        Ok(Some(tn))
    }

    /// `ModelId` of the atomic model at `path` (e.g. `"top:agent"`).
    pub fn model_id(&self, path: &str) -> Option<ModelId> {
        self.models
            .iter()
            .position(|m| m.name == path)
            .map(ModelId::from_index)
    }

    pub fn model_name(&self, model: ModelId) -> Option<&str> {
        self.models.get(model.index()).map(|m| m.name.as_str())
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Date of the earliest pending internal event.
    pub fn next_event_time(&self) -> Time {
        self.calendar.next_time()
    }

    /// Query a model directly, outside any view.
    pub fn observe(&self, model: ModelId, port: &str) -> Option<Value> {
        let m = self.models.get(model.index())?;
        m.dynamics.observation(port, self.clock.current)
    }

    // ── Cycle processing ──────────────────────────────────────────────────

    fn initialize(&mut self) -> SimResult<()> {
        if self.initialized {
            return Ok(());
        }
        let begin = self.config.begin;
        for i in 0..self.models.len() {
            let id = ModelId::from_index(i);
            let model = &mut self.models[i];
            let ta = model.dynamics.init(begin).map_err(|source| SimError::Model {
                model: model.name.clone(),
                time: begin,
                source,
            })?;
            self.schedule(id, begin, ta)?;
        }
        for view in &mut self.views {
            view.next_sample = begin;
        }
        self.initialized = true;
        Ok(())
    }

    fn process_cycle<O: SimObserver>(&mut self, tn: Time, observer: &mut O) -> SimResult<()> {
        self.flush_timed_views(tn, false, observer);
        self.clock.advance_to(tn);
        observer.on_cycle_start(tn);

        // ── Output: imminent models emit, events are routed into bags ─────
        let imminent = self.calendar.pop_imminent(tn);
        let mut bags: BTreeMap<ModelId, Vec<ExternalEvent>> = BTreeMap::new();
        let mut emitted = EventList::new();
        for &source in &imminent {
            self.models[source.index()].dynamics.output(tn, &mut emitted);
            for event in emitted.drain(..) {
                // Events on uncoupled ports are dropped.
                let Some(targets) = self.routes[source.index()].get(event.port()) else {
                    continue;
                };
                for (target, port) in targets {
                    bags.entry(*target).or_default().push(event.retargeted(port));
                }
            }
        }

        // ── Transitions in ascending ModelId ──────────────────────────────
        let mut touched: Vec<ModelId> = imminent.iter().chain(bags.keys()).copied().collect();
        touched.sort_unstable();
        touched.dedup();

        for &id in &touched {
            let bag = bags.remove(&id);
            let is_imminent = imminent.binary_search(&id).is_ok();
            let model = &mut self.models[id.index()];
            let result = match (is_imminent, bag) {
                (true, Some(events)) => model.dynamics.confluent_transitions(tn, &events),
                (true, None) => model.dynamics.internal_transition(tn),
                (false, Some(events)) => model.dynamics.external_transition(&events, tn),
                (false, None) => Ok(()),
            };
            result.map_err(|source| SimError::Model {
                model: model.name.clone(),
                time: tn,
                source,
            })?;
            let ta = model.dynamics.time_advance();
            self.schedule(id, tn, ta)?;
            self.sample_event_views(id, tn, observer);
        }

        self.cycles += 1;
        debug!(time = %tn, imminent = imminent.len(), touched = touched.len(), "cycle");
        observer.on_cycle_end(tn, imminent.len(), touched.len());
        Ok(())
    }

    fn schedule(&mut self, id: ModelId, now: Time, ta: Time) -> SimResult<()> {
        if ta < Time::ZERO {
            return Err(SimError::InvalidTimeAdvance {
                model: self.models[id.index()].name.clone(),
                time:  now,
                ta,
            });
        }
        self.calendar.schedule(id, now + ta);
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        self.stop.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn summary(&self, cancelled: bool) -> RunSummary {
        RunSummary { end_time: self.clock.current, cycles: self.cycles, cancelled }
    }

    // ── Views ─────────────────────────────────────────────────────────────

    /// Take every timed sample dated before `limit` (or at it, if
    /// `inclusive`).
    fn flush_timed_views<O: SimObserver>(&mut self, limit: Time, inclusive: bool, observer: &mut O) {
        for view in &mut self.views {
            let ViewKind::Timed(step) = view.kind else { continue };
            while view.next_sample < limit || (inclusive && view.next_sample == limit) {
                let at = view.next_sample;
                for (model, port) in &view.observables {
                    emit(&self.models, &view.name, *model, port, at, observer);
                }
                view.next_sample = at + step;
            }
        }
    }

    fn sample_event_views<O: SimObserver>(&self, id: ModelId, time: Time, observer: &mut O) {
        for view in self.views.iter().filter(|v| v.kind == ViewKind::Event && v.observes(id)) {
            for (model, port) in view.observables.iter().filter(|(m, _)| *m == id) {
                emit(&self.models, &view.name, *model, port, time, observer);
            }
        }
    }

    fn sample_views<O: SimObserver>(&self, kind: ViewKind, time: Time, observer: &mut O) {
        for view in self.views.iter().filter(|v| v.kind == kind) {
            for (model, port) in &view.observables {
                emit(&self.models, &view.name, *model, port, time, observer);
            }
        }
    }
}

fn emit<O: SimObserver>(
    models:   &[FlatModel],
    view:     &str,
    model:    ModelId,
    port:     &str,
    time:     Time,
    observer: &mut O,
) {
    let m = &models[model.index()];
    observer.on_observation(&Observation {
        view,
        time,
        model,
        model_name: &m.name,
        port,
        value: m.dynamics.observation(port, time),
    });
}
