//! `Activities` — the activity arena, its precedence graph and the
//! evaluation pass that drives every activity's state machine.
//!
//! Activities are stored in insertion order and addressed by a stable
//! [`ActivityId`]; ids are never reused or invalidated, so sequence
//! recursion can append while callers hold ids.  New activities produced
//! during an evaluation pass are appended only once the pass is over.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use devs_core::{ActivityId, Time, Value};

use crate::activity::INTERNAL_PARAMS;
use crate::{
    Activity, ActivityState, DecisionError, DecisionResult, Facts, PrecedenceConstraint,
    PrecedenceStatus, PrecedenceType,
};

/// Why an activity failed.  Only rule, deadline and acknowledged failures
/// trigger sequence recursion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FailureCause {
    Rules,
    Deadline,
    Precedence,
    Acknowledged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Change {
    Start,
    Done,
    Fail(FailureCause),
}

struct Entry {
    name:       String,
    activity:   Activity,
    /// Date the activity was generated by recursion; `-inf` for plan
    /// activities.
    created_at: Time,
}

#[derive(Default)]
pub struct Activities {
    entries:     Vec<Entry>,
    index:       FxHashMap<String, ActivityId>,
    precedences: Vec<PrecedenceConstraint>,
    /// Per activity: indices into `precedences` of edges ending there.
    incoming:    Vec<Vec<usize>>,
    /// Unbounded sequence activities that failed at their creation date;
    /// expanded by the next evaluation at a later date.
    deferred:    Vec<ActivityId>,
}

impl Activities {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Arena ─────────────────────────────────────────────────────────────

    /// Append `activity` under `name`.
    pub fn add(&mut self, name: impl Into<String>, activity: Activity) -> DecisionResult<ActivityId> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(DecisionError::DuplicateActivity(name));
        }
        let id = ActivityId::from_index(self.entries.len());
        self.index.insert(name.clone(), id);
        self.entries.push(Entry { name, activity, created_at: Time::NEGATIVE_INFINITY });
        self.incoming.push(Vec::new());
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Option<ActivityId> {
        self.index.get(name).copied()
    }

    pub fn require(&self, name: &str) -> DecisionResult<ActivityId> {
        self.id(name).ok_or_else(|| DecisionError::UnknownActivity(name.to_owned()))
    }

    pub fn get(&self, name: &str) -> Option<&Activity> {
        self.id(name).map(|id| &self.entries[id.index()].activity)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Activity> {
        let id = self.id(name)?;
        Some(&mut self.entries[id.index()].activity)
    }

    /// # Panics
    /// Panics if `id` was not issued by this container.
    pub fn by_id(&self, id: ActivityId) -> &Activity {
        &self.entries[id.index()].activity
    }

    pub fn name(&self, id: ActivityId) -> &str {
        &self.entries[id.index()].name
    }

    /// `(id, name, activity)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ActivityId, &str, &Activity)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (ActivityId::from_index(i), e.name.as_str(), &e.activity))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Precedence graph ──────────────────────────────────────────────────

    pub fn add_constraint(
        &mut self,
        first:      &str,
        second:     &str,
        kind:       PrecedenceType,
        mintimelag: Time,
        maxtimelag: Time,
    ) -> DecisionResult<()> {
        let first = self.require(first)?;
        let second = self.require(second)?;
        self.link(first, second, kind, mintimelag, maxtimelag)
    }

    pub fn add_start_to_start_constraint(&mut self, first: &str, second: &str, min: Time, max: Time) -> DecisionResult<()> {
        self.add_constraint(first, second, PrecedenceType::StartToStart, min, max)
    }

    pub fn add_finish_to_start_constraint(&mut self, first: &str, second: &str, min: Time, max: Time) -> DecisionResult<()> {
        self.add_constraint(first, second, PrecedenceType::FinishToStart, min, max)
    }

    pub fn add_finish_to_finish_constraint(&mut self, first: &str, second: &str, min: Time, max: Time) -> DecisionResult<()> {
        self.add_constraint(first, second, PrecedenceType::FinishToFinish, min, max)
    }

    fn link(
        &mut self,
        first:      ActivityId,
        second:     ActivityId,
        kind:       PrecedenceType,
        mintimelag: Time,
        maxtimelag: Time,
    ) -> DecisionResult<()> {
        let edge = PrecedenceConstraint::new(first, second, kind, mintimelag, maxtimelag)?;
        self.incoming[second.index()].push(self.precedences.len());
        self.precedences.push(edge);
        Ok(())
    }

    pub fn precedences(&self) -> &[PrecedenceConstraint] {
        &self.precedences
    }

    /// Edges ending at `id`.
    pub fn incoming(&self, id: ActivityId) -> impl Iterator<Item = &PrecedenceConstraint> {
        self.incoming[id.index()].iter().map(|&i| &self.precedences[i])
    }

    /// Combined status of the SS and FS edges ending at `id`.
    pub fn start_gate(&self, id: ActivityId, time: Time) -> PrecedenceStatus {
        let waitall = self.by_id(id).wait_all();
        PrecedenceStatus::combine(
            self.incoming(id)
                .filter(|e| e.kind.gates_start())
                .map(|e| e.status(self.by_id(e.first), time)),
            waitall,
        )
    }

    /// Combined status of the FF edges ending at `id`, and of its earliest
    /// finish date, for a completion at `time`.
    pub fn finish_gate(&self, id: ActivityId, time: Time) -> PrecedenceStatus {
        let activity = self.by_id(id);
        if time < activity.earliest_finish() {
            return PrecedenceStatus::Wait;
        }
        PrecedenceStatus::combine(
            self.incoming(id)
                .filter(|e| e.kind == PrecedenceType::FinishToFinish)
                .map(|e| e.finish_status(self.by_id(e.first), time)),
            activity.wait_all(),
        )
    }

    // ── Evaluation ────────────────────────────────────────────────────────

    /// Bring every activity up to date at `time`.
    ///
    /// Passes over the arena until no activity changes state.  Sequence
    /// recursion triggered during a pass is applied after it; expansions
    /// deferred at an earlier date run first.  Acknowledge callbacks fire
    /// on each change; update callbacks fire once per call for every
    /// running activity.  Ids of changed activities are appended
    /// to `changed` (without duplicates).
    pub fn process(
        &mut self,
        time:    Time,
        facts:   &mut Facts,
        changed: &mut Vec<ActivityId>,
    ) -> DecisionResult<()> {
        let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deferred)
            .into_iter()
            .partition(|id| self.entries[id.index()].created_at < time);
        self.deferred = later;
        for id in due {
            self.expand_recursion(id, time)?;
        }

        loop {
            let mut progressed = false;
            let mut recurse = Vec::new();
            for i in 0..self.entries.len() {
                let id = ActivityId::from_index(i);
                let Some(change) = self.evaluate(id, time, facts) else { continue };
                self.apply(id, change, time, facts, changed);
                if triggers_recursion(change) {
                    if self.defers_expansion(id, change, time) {
                        self.deferred.push(id);
                    } else {
                        recurse.push(id);
                    }
                }
                progressed = true;
            }
            for id in recurse {
                if self.expand_recursion(id, time)?.is_some() {
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }

        for entry in &self.entries {
            if entry.activity.is_running() {
                entry.activity.update(&entry.name, facts);
            }
        }
        Ok(())
    }

    /// Next state change of `id` at `time`, if any.
    fn evaluate(&self, id: ActivityId, time: Time, facts: &Facts) -> Option<Change> {
        let activity = self.by_id(id);
        match activity.state() {
            ActivityState::Wait => {
                if activity.valid_failure_rules(facts, time) {
                    Some(Change::Fail(FailureCause::Rules))
                } else if time > activity.latest_start() {
                    Some(Change::Fail(FailureCause::Deadline))
                } else {
                    match self.start_gate(id, time) {
                        PrecedenceStatus::Failed => Some(Change::Fail(FailureCause::Precedence)),
                        PrecedenceStatus::Valid
                            if activity.can_start_at(time) && activity.valid_rules(facts, time) =>
                        {
                            Some(Change::Start)
                        }
                        _ => None,
                    }
                }
            }
            ActivityState::Started => {
                if activity.valid_failure_rules(facts, time) {
                    Some(Change::Fail(FailureCause::Rules))
                } else if activity.is_after_time_constraint(time) {
                    Some(Change::Fail(FailureCause::Deadline))
                } else {
                    None
                }
            }
            ActivityState::Ff => {
                if activity.valid_failure_rules(facts, time) {
                    return Some(Change::Fail(FailureCause::Rules));
                }
                match self.finish_gate(id, time) {
                    PrecedenceStatus::Valid => Some(Change::Done),
                    PrecedenceStatus::Failed => Some(Change::Fail(FailureCause::Precedence)),
                    PrecedenceStatus::Wait if activity.is_after_time_constraint(time) => {
                        Some(Change::Fail(FailureCause::Deadline))
                    }
                    PrecedenceStatus::Wait => None,
                }
            }
            ActivityState::Done | ActivityState::Failed => None,
        }
    }

    fn apply(
        &mut self,
        id:      ActivityId,
        change:  Change,
        time:    Time,
        facts:   &mut Facts,
        changed: &mut Vec<ActivityId>,
    ) {
        let entry = &mut self.entries[id.index()];
        match change {
            Change::Start => entry.activity.mark_started(time),
            Change::Done => entry.activity.mark_done(time),
            Change::Fail(_) => entry.activity.mark_failed(time),
        }
        debug!(
            activity = %entry.name,
            state = %entry.activity.state(),
            time = %time,
            ?change,
            "activity state change"
        );
        entry.activity.acknowledge(&entry.name, facts);
        if !changed.contains(&id) {
            changed.push(id);
        }
    }

    // ── Acknowledgements ──────────────────────────────────────────────────

    /// Completion of `name` acknowledged at `time`.
    ///
    /// A started activity becomes done when its finish gate holds, waits in
    /// `Ff` while its earliest finish or an FF lag window is still ahead,
    /// and fails when the gate cannot hold (an FF predecessor has not
    /// finished, or its window has closed).  In any other state the
    /// acknowledgement is ignored and `Ok(false)` is returned.
    pub fn set_done(
        &mut self,
        name:    &str,
        time:    Time,
        facts:   &mut Facts,
        changed: &mut Vec<ActivityId>,
    ) -> DecisionResult<bool> {
        let id = self.require(name)?;
        if !self.by_id(id).is_started() {
            warn!(activity = name, state = %self.by_id(id).state(), %time, "ignoring done acknowledgement");
            return Ok(false);
        }
        match self.finish_gate(id, time) {
            PrecedenceStatus::Valid => {
                self.apply(id, Change::Done, time, facts, changed);
                self.expand_recursion(id, time)?;
            }
            PrecedenceStatus::Wait => {
                let entry = &mut self.entries[id.index()];
                entry.activity.mark_ff(time);
                debug!(activity = name, %time, "activity waiting on finish constraints");
                entry.activity.acknowledge(&entry.name, facts);
                if !changed.contains(&id) {
                    changed.push(id);
                }
            }
            PrecedenceStatus::Failed => {
                self.apply(id, Change::Fail(FailureCause::Precedence), time, facts, changed);
            }
        }
        Ok(true)
    }

    /// Failure of `name` acknowledged at `time`.  Ignored (returns
    /// `Ok(false)`) for terminal activities.
    pub fn set_failed(
        &mut self,
        name:    &str,
        time:    Time,
        facts:   &mut Facts,
        changed: &mut Vec<ActivityId>,
    ) -> DecisionResult<bool> {
        let id = self.require(name)?;
        if self.by_id(id).state().is_terminal() {
            warn!(activity = name, state = %self.by_id(id).state(), %time, "ignoring fail acknowledgement");
            return Ok(false);
        }
        let change = Change::Fail(FailureCause::Acknowledged);
        self.apply(id, change, time, facts, changed);
        self.expand_recursion(id, time)?;
        Ok(true)
    }

    // ── Scheduling ────────────────────────────────────────────────────────

    /// Earliest date strictly after `time` at which some activity's state
    /// could change on its own: its own window bounds, plus the window
    /// bounds of precedence edges gating it.
    pub fn next_date(&self, time: Time) -> Time {
        let own = self
            .entries
            .iter()
            .map(|e| e.activity.next_time(time))
            .min()
            .unwrap_or(Time::INFINITY);
        let edges = self
            .precedences
            .iter()
            .filter(|e| !self.by_id(e.second).state().is_terminal())
            .filter_map(|e| e.window(self.by_id(e.first)))
            .flat_map(|(lo, hi)| [lo, hi])
            .filter(|&d| d > time)
            .min()
            .unwrap_or(Time::INFINITY);
        own.min(edges)
    }

    // ── Sequence recursion ────────────────────────────────────────────────

    /// Generate the successor of a sequence activity, if its counter allows.
    ///
    /// `<prefix>_<k>` produces `<prefix>_<k+1>`: a fresh copy linked to it by
    /// every precedence template, with the counter decremented (an
    /// unbounded counter of `-1` stays unbounded).
    pub fn expand_recursion(&mut self, id: ActivityId, time: Time) -> DecisionResult<Option<ActivityId>> {
        let entry = &self.entries[id.index()];
        let Some(internal) = entry.activity.params().get(INTERNAL_PARAMS) else {
            return Ok(None);
        };
        let internal = internal.to_map()?;
        let counter = internal.get("recNumber").ok_or_else(|| {
            DecisionError::Internal(format!("activity {:?} has no recursion counter", entry.name))
        })?;
        let counter = counter.to_integer()?;
        if !(counter > 1 || counter == -1) {
            return Ok(None);
        }

        let next_name = successor_name(&entry.name)?;
        let templates = match internal.get("precedences") {
            Some(set) => set
                .to_set()?
                .iter()
                .map(read_template)
                .collect::<DecisionResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        let mut next = entry.activity.fresh_copy();
        let mut bag: BTreeMap<String, Value> = internal.clone();
        bag.insert(
            "recNumber".to_owned(),
            Value::Integer(if counter == -1 { -1 } else { counter - 1 }),
        );
        next.params_mut().insert(INTERNAL_PARAMS.to_owned(), Value::Map(bag));

        let next_id = self.add(next_name, next).map_err(|err| match err {
            DecisionError::DuplicateActivity(name) => DecisionError::Internal(format!(
                "sequence successor {name:?} already exists"
            )),
            other => other,
        })?;
        self.entries[next_id.index()].created_at = time;
        for (kind, min, max) in templates {
            self.link(id, next_id, kind, min, max)?;
        }
        debug!(
            from = %self.name(id),
            to = %self.name(next_id),
            remaining = if counter == -1 { -1 } else { counter - 1 },
            "sequence activity generated"
        );
        Ok(Some(next_id))
    }

    /// An unbounded sequence activity failing by rules or deadline at its
    /// own creation date would generate a successor that fails the same
    /// way, forever, within one evaluation.  Its expansion waits for the
    /// next date.
    fn defers_expansion(&self, id: ActivityId, change: Change, time: Time) -> bool {
        let entry = &self.entries[id.index()];
        let unbounded = entry
            .activity
            .params()
            .get(INTERNAL_PARAMS)
            .and_then(|bag| bag.get("recNumber").ok())
            .and_then(Value::as_integer)
            == Some(-1);
        matches!(change, Change::Fail(_)) && unbounded && entry.created_at >= time
    }
}

fn triggers_recursion(change: Change) -> bool {
    matches!(
        change,
        Change::Done | Change::Fail(FailureCause::Rules | FailureCause::Deadline)
    )
}

/// `"<prefix>_<k>"` → `"<prefix>_<k+1>"`.
fn successor_name(name: &str) -> DecisionResult<String> {
    let not_generated = || {
        DecisionError::Internal(format!("activity {name:?} is not generated from a sequence"))
    };
    let (prefix, index) = name.rsplit_once('_').ok_or_else(not_generated)?;
    let index: i64 = index.parse().map_err(|_| not_generated())?;
    Ok(format!("{prefix}_{}", index + 1))
}

fn read_template(value: &Value) -> DecisionResult<(PrecedenceType, Time, Time)> {
    let map = value.to_map()?;
    let kind = map
        .get("type")
        .ok_or_else(|| DecisionError::Internal("precedence template has no type".to_owned()))?
        .to_str()?
        .parse::<PrecedenceType>()
        .map_err(|err| DecisionError::Internal(err.to_string()))?;
    let lag = |key: &str| -> DecisionResult<Time> {
        match map.get(key) {
            Some(v) => Ok(Time::new(v.to_double()?)),
            None => Err(DecisionError::Internal(format!("precedence template has no {key}"))),
        }
    };
    Ok((kind, lag("mintimelag")?, lag("maxtimelag")?))
}
