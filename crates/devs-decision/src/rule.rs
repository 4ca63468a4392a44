//! Facts, predicates and rules.
//!
//! A [`Rule`] is the conjunction of its predicates; [`Rules`] is the
//! disjunction of its rules.  Every predicate of every rule is evaluated on
//! each query, so predicates must be pure functions of the facts and the
//! current date.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use devs_core::{Time, Value};

// ── Facts ─────────────────────────────────────────────────────────────────────

/// The agent's knowledge: named values written by fact handlers and
/// callbacks, read by predicates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Facts {
    values: BTreeMap<String, Value>,
}

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// `false` when the fact is missing or not a boolean.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn double(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_double)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_integer)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ── Predicate ─────────────────────────────────────────────────────────────────

/// A boolean test over the facts at a given date.
///
/// Implemented for every `Fn(&Facts, Time) -> bool + Send + Sync`.
pub trait Predicate: Send + Sync {
    fn eval(&self, facts: &Facts, time: Time) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&Facts, Time) -> bool + Send + Sync,
{
    #[inline]
    fn eval(&self, facts: &Facts, time: Time) -> bool {
        self(facts, time)
    }
}

// ── Rule ──────────────────────────────────────────────────────────────────────

/// Conjunction of named predicates.  An empty rule is true.
#[derive(Clone, Default)]
pub struct Rule {
    predicates: Vec<(String, Arc<dyn Predicate>)>,
}

impl Rule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, predicate: Arc<dyn Predicate>) {
        self.predicates.push((name.into(), predicate));
    }

    /// Builder-style [`add`][Self::add].
    pub fn with(mut self, name: impl Into<String>, predicate: Arc<dyn Predicate>) -> Self {
        self.add(name, predicate);
        self
    }

    /// Evaluate every predicate, then combine.
    pub fn is_valid(&self, facts: &Facts, time: Time) -> bool {
        self.predicates
            .iter()
            .fold(true, |acc, (_, p)| p.eval(facts, time) & acc)
    }

    pub fn predicate_names(&self) -> impl Iterator<Item = &str> {
        self.predicates.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.predicate_names()).finish()
    }
}

// ── Rules ─────────────────────────────────────────────────────────────────────

/// Disjunction of named rules, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Rules {
    rules: Vec<(String, Rule)>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `rule` under `name`, replacing an existing rule of that name.
    /// Returns the stored rule for further editing.
    pub fn add(&mut self, name: impl Into<String>, rule: Rule) -> &mut Rule {
        let name = name.into();
        let index = match self.rules.iter().position(|(n, _)| *n == name) {
            Some(i) => {
                self.rules[i].1 = rule;
                i
            }
            None => {
                self.rules.push((name, rule));
                self.rules.len() - 1
            }
        };
        &mut self.rules[index].1
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// `true` iff at least one rule holds.  Every rule is evaluated.
    /// An empty set is false.
    pub fn is_valid(&self, facts: &Facts, time: Time) -> bool {
        self.rules
            .iter()
            .fold(false, |acc, (_, r)| r.is_valid(facts, time) | acc)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
