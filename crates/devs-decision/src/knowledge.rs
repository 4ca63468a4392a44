//! `KnowledgeBase` — registries, facts and the plan of one decision agent.
//!
//! Register every predicate, fact handler and callback first, then load the
//! plan; the plan resolves names against the registries at load time.

use std::sync::Arc;

use devs_core::{ActivityId, Time, Value};
use devs_kernel::EventList;

use crate::{Activity, ActivityState, DecisionResult, Facts, Plan, Registries};

#[derive(Default)]
pub struct KnowledgeBase {
    registries: Registries,
    facts:      Facts,
    plan:       Plan,
    /// Activities that changed state since the last [`take_changed`](Self::take_changed).
    changed:    Vec<ActivityId>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration ──────────────────────────────────────────────────────

    pub fn add_predicate<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Facts, Time) -> bool + Send + Sync + 'static,
    {
        self.registries.predicates.insert(name, Arc::new(f));
    }

    pub fn add_fact<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut Facts, &Value) + Send + Sync + 'static,
    {
        self.registries.facts.insert(name, Arc::new(f));
    }

    pub fn add_acknowledge_function<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&str, &Activity, &mut Facts) + Send + Sync + 'static,
    {
        self.registries.acknowledgers.insert(name, Arc::new(f));
    }

    pub fn add_output_function<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&str, &Activity, &mut EventList) + Send + Sync + 'static,
    {
        self.registries.outputters.insert(name, Arc::new(f));
    }

    pub fn add_update_function<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&str, &Activity, &mut Facts) + Send + Sync + 'static,
    {
        self.registries.updaters.insert(name, Arc::new(f));
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    // ── Plan ──────────────────────────────────────────────────────────────

    /// Load plan text.  See [`Plan::fill`].
    pub fn load_plan(&mut self, text: &str) -> DecisionResult<()> {
        self.plan.fill(&self.registries, text)
    }

    /// Define a rule over registered predicates.
    pub fn add_rule(&mut self, name: &str, predicates: &[&str]) -> DecisionResult<()> {
        self.plan.add_rule(&self.registries, name, predicates)
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn plan_mut(&mut self) -> &mut Plan {
        &mut self.plan
    }

    // ── Facts ─────────────────────────────────────────────────────────────

    pub fn facts(&self) -> &Facts {
        &self.facts
    }

    pub fn facts_mut(&mut self) -> &mut Facts {
        &mut self.facts
    }

    /// Run the fact handler registered as `name` on `value`.
    pub fn apply_fact(&mut self, name: &str, value: &Value) -> DecisionResult<()> {
        let handler = self.registries.facts.require(name)?;
        handler.apply(&mut self.facts, value);
        Ok(())
    }

    // ── Evaluation ────────────────────────────────────────────────────────

    /// Re-evaluate every activity at `time`.
    pub fn process(&mut self, time: Time) -> DecisionResult<()> {
        self.plan
            .activities_mut()
            .process(time, &mut self.facts, &mut self.changed)
    }

    /// Acknowledge completion of a started activity.  `Ok(false)` when the
    /// activity was not started.
    pub fn set_activity_done(&mut self, name: &str, time: Time) -> DecisionResult<bool> {
        self.plan
            .activities_mut()
            .set_done(name, time, &mut self.facts, &mut self.changed)
    }

    /// Acknowledge failure of an activity.  `Ok(false)` when it was already
    /// done or failed.
    pub fn set_activity_failed(&mut self, name: &str, time: Time) -> DecisionResult<bool> {
        self.plan
            .activities_mut()
            .set_failed(name, time, &mut self.facts, &mut self.changed)
    }

    /// Earliest date after `time` at which an activity may change by itself.
    pub fn next_date(&self, time: Time) -> Time {
        self.plan.activities().next_date(time)
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Changed activities, in order of first change.
    pub fn take_changed(&mut self) -> Vec<ActivityId> {
        std::mem::take(&mut self.changed)
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn activity(&self, name: &str) -> Option<&Activity> {
        self.plan.activities().get(name)
    }

    pub fn activity_state(&self, name: &str) -> Option<ActivityState> {
        self.activity(name).map(Activity::state)
    }

    /// Names of the activities currently in `state`.
    pub fn activities_in(&self, state: ActivityState) -> Vec<&str> {
        self.plan
            .activities()
            .iter()
            .filter(|(_, _, a)| a.state() == state)
            .map(|(_, name, _)| name)
            .collect()
    }
}
