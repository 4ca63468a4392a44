//! `Activity` — one schedulable unit of work and its state machine.
//!
//! # States
//!
//! ```text
//! Wait ──► Started ──► Done
//!   │         │  └───► Ff ──► Done
//!   └─────────┴─────────┴───► Failed
//! ```
//!
//! `Done` and `Failed` are terminal.  The recorded dates (`started`, `ff`,
//! `done`) stay at `Time::NEGATIVE_INFINITY` until the matching transition
//! happens; failing records the done date.
//!
//! # Temporal constraints
//!
//! Exactly one of four shapes holds ([`Temporal`]).  Each shape yields a
//! start window and a finish window:
//!
//! | Shape                    | Start window           | Finish window            |
//! |--------------------------|------------------------|--------------------------|
//! | start date, finish date  | `[start, finish]`      | `(-inf, finish]`         |
//! | start date, finish range | `[start, maxfinish]`   | `[minfinish, maxfinish]` |
//! | start range, finish date | `[minstart, maxstart]` | `(-inf, finish]`         |
//! | start range, finish range| `[minstart, maxstart]` | `[minfinish, maxfinish]` |

use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use devs_core::{Time, Value};
use devs_kernel::EventList;

use crate::{Acknowledger, Facts, Outputter, Rule, Rules, Updater};

/// Reserved parameter key holding sequence-recursion bookkeeping.
pub const INTERNAL_PARAMS: &str = "__internal";

// ── ActivityState ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActivityState {
    /// Not started yet.  Initial state.
    Wait,
    /// Running.
    Started,
    /// Completion acknowledged, waiting for finish-to-finish constraints.
    Ff,
    Done,
    Failed,
}

impl ActivityState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ActivityState::Done | ActivityState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityState::Wait => "wait",
            ActivityState::Started => "started",
            ActivityState::Ff => "started-ff",
            ActivityState::Done => "done",
            ActivityState::Failed => "failed",
        }
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── DateType ──────────────────────────────────────────────────────────────────

/// Bitmask naming which temporal bounds an activity uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DateType(u8);

impl DateType {
    pub const START:  DateType = DateType(1 << 0);
    pub const FINISH: DateType = DateType(1 << 1);
    pub const MINS:   DateType = DateType(1 << 2);
    pub const MAXS:   DateType = DateType(1 << 3);
    pub const MINF:   DateType = DateType(1 << 4);
    pub const MAXF:   DateType = DateType(1 << 5);

    #[inline]
    pub fn contains(self, other: DateType) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for DateType {
    type Output = DateType;
    fn bitor(self, rhs: DateType) -> DateType {
        DateType(self.0 | rhs.0)
    }
}

// ── Temporal ──────────────────────────────────────────────────────────────────

/// The four supported temporal constraint shapes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Temporal {
    StartTimeFinishTime {
        start:  Time,
        finish: Time,
    },
    StartTimeFinishRange {
        start:     Time,
        minfinish: Time,
        maxfinish: Time,
    },
    StartRangeFinishTime {
        minstart: Time,
        maxstart: Time,
        finish:   Time,
    },
    StartRangeFinishRange {
        minstart:  Time,
        maxstart:  Time,
        minfinish: Time,
        maxfinish: Time,
    },
}

impl Default for Temporal {
    /// Unconstrained: `[-inf, +inf]`.
    fn default() -> Self {
        Temporal::StartTimeFinishTime { start: Time::NEGATIVE_INFINITY, finish: Time::INFINITY }
    }
}

impl Temporal {
    /// Check the bounds are consistent.  Returns a description of the first
    /// violated requirement.
    pub fn validate(&self) -> Result<(), &'static str> {
        match *self {
            Temporal::StartTimeFinishTime { start, finish } => {
                if start > finish {
                    return Err("start must not be after finish");
                }
            }
            Temporal::StartTimeFinishRange { start, minfinish, maxfinish } => {
                if minfinish > maxfinish {
                    return Err("minfinish must not be after maxfinish");
                }
                if start > maxfinish {
                    return Err("start must not be after maxfinish");
                }
            }
            Temporal::StartRangeFinishTime { minstart, maxstart, finish } => {
                if minstart > maxstart {
                    return Err("minstart must not be after maxstart");
                }
                if minstart > finish {
                    return Err("minstart must not be after finish");
                }
            }
            Temporal::StartRangeFinishRange { minstart, maxstart, minfinish, maxfinish } => {
                if minstart > maxstart {
                    return Err("minstart must not be after maxstart");
                }
                if minfinish > maxfinish {
                    return Err("minfinish must not be after maxfinish");
                }
                if minstart > maxfinish {
                    return Err("minstart must not be after maxfinish");
                }
            }
        }
        Ok(())
    }

    pub fn date_type(&self) -> DateType {
        match self {
            Temporal::StartTimeFinishTime { .. } => DateType::START | DateType::FINISH,
            Temporal::StartTimeFinishRange { .. } => {
                DateType::START | DateType::MINF | DateType::MAXF
            }
            Temporal::StartRangeFinishTime { .. } => {
                DateType::MINS | DateType::MAXS | DateType::FINISH
            }
            Temporal::StartRangeFinishRange { .. } => {
                DateType::MINS | DateType::MAXS | DateType::MINF | DateType::MAXF
            }
        }
    }

    /// `(earliest, latest)` start dates.
    pub fn start_window(&self) -> (Time, Time) {
        match *self {
            Temporal::StartTimeFinishTime { start, finish } => (start, finish),
            Temporal::StartTimeFinishRange { start, maxfinish, .. } => (start, maxfinish),
            Temporal::StartRangeFinishTime { minstart, maxstart, .. }
            | Temporal::StartRangeFinishRange { minstart, maxstart, .. } => (minstart, maxstart),
        }
    }

    /// `(earliest, latest)` finish dates.
    pub fn finish_window(&self) -> (Time, Time) {
        match *self {
            Temporal::StartTimeFinishTime { finish, .. }
            | Temporal::StartRangeFinishTime { finish, .. } => (Time::NEGATIVE_INFINITY, finish),
            Temporal::StartTimeFinishRange { minfinish, maxfinish, .. }
            | Temporal::StartRangeFinishRange { minfinish, maxfinish, .. } => (minfinish, maxfinish),
        }
    }
}

// ── Activity ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Activity {
    state:         ActivityState,
    rules:         Rules,
    rules_failure: Rules,
    /// `true`: every gating precedence must hold (AND); `false`: one is
    /// enough (OR).
    waitall:       bool,
    temporal:      Temporal,
    started:       Time,
    ff:            Time,
    done:          Time,
    acknowledger:  Option<Arc<dyn Acknowledger>>,
    outputter:     Option<Arc<dyn Outputter>>,
    updater:       Option<Arc<dyn Updater>>,
    params:        BTreeMap<String, Value>,
}

impl Default for Activity {
    fn default() -> Self {
        Self {
            state:         ActivityState::Wait,
            rules:         Rules::new(),
            rules_failure: Rules::new(),
            waitall:       true,
            temporal:      Temporal::default(),
            started:       Time::NEGATIVE_INFINITY,
            ff:            Time::NEGATIVE_INFINITY,
            done:          Time::NEGATIVE_INFINITY,
            acknowledger:  None,
            outputter:     None,
            updater:       None,
            params:        BTreeMap::new(),
        }
    }
}

impl Activity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy with the same rules, constraints, callbacks and parameters,
    /// back in `Wait` with every recorded date cleared.
    pub fn fresh_copy(&self) -> Activity {
        Activity {
            state:   ActivityState::Wait,
            started: Time::NEGATIVE_INFINITY,
            ff:      Time::NEGATIVE_INFINITY,
            done:    Time::NEGATIVE_INFINITY,
            ..self.clone()
        }
    }

    // ── State ─────────────────────────────────────────────────────────────

    pub fn state(&self) -> ActivityState {
        self.state
    }

    pub fn is_wait(&self) -> bool {
        self.state == ActivityState::Wait
    }

    pub fn is_started(&self) -> bool {
        self.state == ActivityState::Started
    }

    pub fn is_ff(&self) -> bool {
        self.state == ActivityState::Ff
    }

    pub fn is_done(&self) -> bool {
        self.state == ActivityState::Done
    }

    pub fn is_failed(&self) -> bool {
        self.state == ActivityState::Failed
    }

    /// Started or waiting on finish-to-finish constraints.
    pub fn is_running(&self) -> bool {
        matches!(self.state, ActivityState::Started | ActivityState::Ff)
    }

    pub(crate) fn mark_started(&mut self, date: Time) {
        debug_assert!(self.is_wait());
        self.state = ActivityState::Started;
        self.started = date;
    }

    pub(crate) fn mark_ff(&mut self, date: Time) {
        debug_assert!(self.is_started());
        self.state = ActivityState::Ff;
        self.ff = date;
    }

    pub(crate) fn mark_done(&mut self, date: Time) {
        debug_assert!(self.is_running());
        self.state = ActivityState::Done;
        self.done = date;
    }

    pub(crate) fn mark_failed(&mut self, date: Time) {
        debug_assert!(!self.state.is_terminal());
        self.state = ActivityState::Failed;
        self.done = date;
    }

    pub fn started_date(&self) -> Time {
        self.started
    }

    pub fn ff_date(&self) -> Time {
        self.ff
    }

    pub fn done_date(&self) -> Time {
        self.done
    }

    // ── Rules ─────────────────────────────────────────────────────────────

    pub fn add_rule(&mut self, name: impl Into<String>, rule: Rule) {
        self.rules.add(name, rule);
    }

    pub fn add_failure_rule(&mut self, name: impl Into<String>, rule: Rule) {
        self.rules_failure.add(name, rule);
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn rules_failure(&self) -> &Rules {
        &self.rules_failure
    }

    /// Normal rules hold.  No rules at all counts as holding.
    pub fn valid_rules(&self, facts: &Facts, time: Time) -> bool {
        self.rules.is_empty() || self.rules.is_valid(facts, time)
    }

    /// Failure rules hold.  No failure rules never fails.
    pub fn valid_failure_rules(&self, facts: &Facts, time: Time) -> bool {
        !self.rules_failure.is_empty() && self.rules_failure.is_valid(facts, time)
    }

    pub fn wait_all(&self) -> bool {
        self.waitall
    }

    pub fn set_wait_all(&mut self, waitall: bool) {
        self.waitall = waitall;
    }

    // ── Temporal constraints ──────────────────────────────────────────────

    pub fn set_temporal(&mut self, temporal: Temporal) -> Result<(), &'static str> {
        temporal.validate()?;
        self.temporal = temporal;
        Ok(())
    }

    pub fn init_start_time_finish_time(&mut self, start: Time, finish: Time) -> Result<(), &'static str> {
        self.set_temporal(Temporal::StartTimeFinishTime { start, finish })
    }

    pub fn init_start_time_finish_range(
        &mut self,
        start:     Time,
        minfinish: Time,
        maxfinish: Time,
    ) -> Result<(), &'static str> {
        self.set_temporal(Temporal::StartTimeFinishRange { start, minfinish, maxfinish })
    }

    pub fn init_start_range_finish_time(
        &mut self,
        minstart: Time,
        maxstart: Time,
        finish:   Time,
    ) -> Result<(), &'static str> {
        self.set_temporal(Temporal::StartRangeFinishTime { minstart, maxstart, finish })
    }

    pub fn init_start_range_finish_range(
        &mut self,
        minstart:  Time,
        maxstart:  Time,
        minfinish: Time,
        maxfinish: Time,
    ) -> Result<(), &'static str> {
        self.set_temporal(Temporal::StartRangeFinishRange { minstart, maxstart, minfinish, maxfinish })
    }

    pub fn temporal(&self) -> &Temporal {
        &self.temporal
    }

    pub fn date(&self) -> DateType {
        self.temporal.date_type()
    }

    pub fn earliest_start(&self) -> Time {
        self.temporal.start_window().0
    }

    pub fn latest_start(&self) -> Time {
        self.temporal.start_window().1
    }

    pub fn earliest_finish(&self) -> Time {
        self.temporal.finish_window().0
    }

    pub fn latest_finish(&self) -> Time {
        self.temporal.finish_window().1
    }

    /// Inclusive: `earliest start <= time <= latest finish`.
    pub fn is_valid_time_constraint(&self, time: Time) -> bool {
        self.earliest_start() <= time && time <= self.latest_finish()
    }

    pub fn is_before_time_constraint(&self, time: Time) -> bool {
        time < self.earliest_start()
    }

    pub fn is_after_time_constraint(&self, time: Time) -> bool {
        time > self.latest_finish()
    }

    /// Inside the start window.
    pub fn can_start_at(&self, time: Time) -> bool {
        let (earliest, latest) = self.temporal.start_window();
        earliest <= time && time <= latest
    }

    /// Earliest bound of the current state's window strictly after `time`,
    /// or `Time::INFINITY`.
    pub fn next_time(&self, time: Time) -> Time {
        let (a, b) = match self.state {
            ActivityState::Wait => self.temporal.start_window(),
            ActivityState::Started | ActivityState::Ff => self.temporal.finish_window(),
            ActivityState::Done | ActivityState::Failed => return Time::INFINITY,
        };
        [a, b]
            .into_iter()
            .filter(|&c| c > time)
            .min()
            .unwrap_or(Time::INFINITY)
    }

    // ── Callbacks ─────────────────────────────────────────────────────────

    pub fn set_acknowledger(&mut self, f: Arc<dyn Acknowledger>) {
        self.acknowledger = Some(f);
    }

    pub fn set_outputter(&mut self, f: Arc<dyn Outputter>) {
        self.outputter = Some(f);
    }

    pub fn set_updater(&mut self, f: Arc<dyn Updater>) {
        self.updater = Some(f);
    }

    pub fn acknowledge(&self, name: &str, facts: &mut Facts) {
        if let Some(f) = &self.acknowledger {
            f.acknowledge(name, self, facts);
        }
    }

    pub fn output(&self, name: &str, output: &mut EventList) {
        if let Some(f) = &self.outputter {
            f.output(name, self, output);
        }
    }

    pub fn update(&self, name: &str, facts: &mut Facts) {
        if let Some(f) = &self.updater {
            f.update(name, self, facts);
        }
    }

    // ── Parameters ────────────────────────────────────────────────────────

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.params
    }
}

impl fmt::Debug for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activity")
            .field("state", &self.state)
            .field("temporal", &self.temporal)
            .field("rules", &self.rules)
            .field("rules_failure", &self.rules_failure)
            .field("waitall", &self.waitall)
            .field("started", &self.started)
            .field("ff", &self.ff)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
