//! Named function registries and the callback traits they hold.
//!
//! Registries are filled before a plan is loaded; the plan refers to their
//! entries by name.  A missing name is a typed configuration error, never a
//! silent no-op.
//!
//! Every callback trait is implemented for the matching closure signature,
//! so registering a closure is enough:
//!
//! ```rust,ignore
//! kb.add_output_function("out", |name: &str, act: &Activity, out: &mut EventList| {
//!     if act.is_started() {
//!         out.push(ExternalEvent::new("ack").with("name", name).with("value", "done"));
//!     }
//! });
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;

use devs_core::Value;
use devs_kernel::EventList;

use crate::{Activity, DecisionError, DecisionResult, Facts, Predicate};

// ── Callback traits ───────────────────────────────────────────────────────────

/// Applies an incoming fact event to the agent's knowledge.
pub trait FactHandler: Send + Sync {
    fn apply(&self, facts: &mut Facts, value: &Value);
}

impl<F> FactHandler for F
where
    F: Fn(&mut Facts, &Value) + Send + Sync,
{
    #[inline]
    fn apply(&self, facts: &mut Facts, value: &Value) {
        self(facts, value)
    }
}

/// Notified on every state change of the activities it is attached to.
pub trait Acknowledger: Send + Sync {
    fn acknowledge(&self, name: &str, activity: &Activity, facts: &mut Facts);
}

impl<F> Acknowledger for F
where
    F: Fn(&str, &Activity, &mut Facts) + Send + Sync,
{
    #[inline]
    fn acknowledge(&self, name: &str, activity: &Activity, facts: &mut Facts) {
        self(name, activity, facts)
    }
}

/// Emits external events for an activity whose state just changed.
pub trait Outputter: Send + Sync {
    fn output(&self, name: &str, activity: &Activity, output: &mut EventList);
}

impl<F> Outputter for F
where
    F: Fn(&str, &Activity, &mut EventList) + Send + Sync,
{
    #[inline]
    fn output(&self, name: &str, activity: &Activity, output: &mut EventList) {
        self(name, activity, output)
    }
}

/// Called on every evaluation for running (started or ff) activities.
pub trait Updater: Send + Sync {
    fn update(&self, name: &str, activity: &Activity, facts: &mut Facts);
}

impl<F> Updater for F
where
    F: Fn(&str, &Activity, &mut Facts) + Send + Sync,
{
    #[inline]
    fn update(&self, name: &str, activity: &Activity, facts: &mut Facts) {
        self(name, activity, facts)
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Name → shared handle.
pub struct Registry<T: ?Sized> {
    kind:    &'static str,
    entries: FxHashMap<String, Arc<T>>,
}

impl<T: ?Sized> Registry<T> {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, entries: FxHashMap::default() }
    }

    /// Register `handle` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, handle: Arc<T>) {
        self.entries.insert(name.into(), handle);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<T>> {
        self.entries.get(name)
    }

    /// Like [`get`][Self::get], with a typed error naming the registry.
    pub fn require(&self, name: &str) -> DecisionResult<Arc<T>> {
        self.entries.get(name).cloned().ok_or_else(|| match self.kind {
            "predicate" => DecisionError::UnknownPredicate(name.to_owned()),
            "fact" => DecisionError::UnknownFact(name.to_owned()),
            kind => DecisionError::UnknownCallback { kind, name: name.to_owned() },
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every registry a plan can refer to.
pub struct Registries {
    pub predicates:      Registry<dyn Predicate>,
    pub facts:           Registry<dyn FactHandler>,
    pub acknowledgers:   Registry<dyn Acknowledger>,
    pub outputters:      Registry<dyn Outputter>,
    pub updaters:        Registry<dyn Updater>,
}

impl Default for Registries {
    fn default() -> Self {
        Self {
            predicates:    Registry::new("predicate"),
            facts:         Registry::new("fact"),
            acknowledgers: Registry::new("acknowledge"),
            outputters:    Registry::new("output"),
            updaters:      Registry::new("update"),
        }
    }
}
