//! `EventCalendar` — absolute next-event dates for every atomic model.
//!
//! Each model has at most one pending internal event.  Rescheduling a model
//! cancels its previous entry, so the calendar is keyed both ways: date →
//! models (to find the imminent set) and model → date (to cancel).
//!
//! Passive models (`Time::INFINITY`) are remembered in the per-model table
//! but never enter the date map, so `next_time` only ever sees real dates.

use std::collections::{BTreeMap, BTreeSet};

use devs_core::{ModelId, Time};

#[derive(Default)]
pub struct EventCalendar {
    inner:     BTreeMap<Time, BTreeSet<ModelId>>,
    /// Indexed by `ModelId`; `Time::INFINITY` when nothing is pending.
    scheduled: Vec<Time>,
    /// Number of models with a finite pending date.
    total:     usize,
}

impl EventCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calendar for `n` models, all passive.
    pub fn with_models(n: usize) -> Self {
        Self { inner: BTreeMap::new(), scheduled: vec![Time::INFINITY; n], total: 0 }
    }

    /// Set the next internal event of `model` to `time`, replacing any
    /// previous entry.
    pub fn schedule(&mut self, model: ModelId, time: Time) {
        self.cancel(model);
        if model.index() >= self.scheduled.len() {
            self.scheduled.resize(model.index() + 1, Time::INFINITY);
        }
        self.scheduled[model.index()] = time;
        if !time.is_infinity() {
            self.inner.entry(time).or_default().insert(model);
            self.total += 1;
        }
    }

    /// Drop the pending event of `model`, if any.
    pub fn cancel(&mut self, model: ModelId) {
        let Some(slot) = self.scheduled.get_mut(model.index()) else {
            return;
        };
        let time = std::mem::replace(slot, Time::INFINITY);
        if time.is_infinity() {
            return;
        }
        if let Some(set) = self.inner.get_mut(&time) {
            if set.remove(&model) {
                self.total -= 1;
            }
            if set.is_empty() {
                self.inner.remove(&time);
            }
        }
    }

    /// Earliest pending date, or `Time::INFINITY` if every model is passive.
    pub fn next_time(&self) -> Time {
        self.inner.keys().next().copied().unwrap_or(Time::INFINITY)
    }

    /// Remove and return every model scheduled at exactly `time`, in
    /// ascending `ModelId` order.
    pub fn pop_imminent(&mut self, time: Time) -> Vec<ModelId> {
        let Some(set) = self.inner.remove(&time) else {
            return Vec::new();
        };
        self.total -= set.len();
        let models: Vec<ModelId> = set.into_iter().collect();
        for &m in &models {
            self.scheduled[m.index()] = Time::INFINITY;
        }
        models
    }

    /// Pending date of `model` (`Time::INFINITY` if passive or unknown).
    pub fn scheduled_time(&self, model: ModelId) -> Time {
        self.scheduled.get(model.index()).copied().unwrap_or(Time::INFINITY)
    }

    /// Number of models with a finite pending date.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
