//! Precedence constraints between activities.
//!
//! An edge `first → second` of kind SS, FS or FF anchors a window on a
//! milestone of `first`:
//!
//! | Kind | Milestone of `first` | Gates on `second` |
//! |------|----------------------|-------------------|
//! | SS   | started date         | start             |
//! | FS   | done date            | start             |
//! | FF   | done date            | finish            |
//!
//! The window is `[milestone + mintimelag, milestone + maxtimelag]`.  Before
//! it the edge says *wait*, inside it *valid*, after it *failed*.  A
//! predecessor that failed without reaching its milestone fails the edge.

use std::fmt;
use std::str::FromStr;

use devs_core::{ActivityId, Time};

use crate::{Activity, ActivityState, DecisionError, DecisionResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrecedenceType {
    StartToStart,
    FinishToStart,
    FinishToFinish,
}

impl PrecedenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            PrecedenceType::StartToStart => "SS",
            PrecedenceType::FinishToStart => "FS",
            PrecedenceType::FinishToFinish => "FF",
        }
    }

    /// SS and FS edges gate the start of `second`; FF gates its finish.
    pub fn gates_start(self) -> bool {
        !matches!(self, PrecedenceType::FinishToFinish)
    }
}

impl FromStr for PrecedenceType {
    type Err = DecisionError;

    fn from_str(s: &str) -> DecisionResult<Self> {
        match s {
            "SS" => Ok(PrecedenceType::StartToStart),
            "FS" => Ok(PrecedenceType::FinishToStart),
            "FF" => Ok(PrecedenceType::FinishToFinish),
            other => Err(DecisionError::UnknownPrecedenceType(other.to_owned())),
        }
    }
}

impl fmt::Display for PrecedenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrecedenceStatus {
    Valid,
    Wait,
    Failed,
}

impl PrecedenceStatus {
    /// Combine edge statuses: AND when `waitall`, OR otherwise.  No edges
    /// at all is valid.
    pub fn combine(statuses: impl IntoIterator<Item = PrecedenceStatus>, waitall: bool) -> Self {
        let mut any = false;
        let mut any_valid = false;
        let mut any_failed = false;
        let mut all_valid = true;
        let mut all_failed = true;
        for s in statuses {
            any = true;
            any_valid |= s == PrecedenceStatus::Valid;
            any_failed |= s == PrecedenceStatus::Failed;
            all_valid &= s == PrecedenceStatus::Valid;
            all_failed &= s == PrecedenceStatus::Failed;
        }
        if !any {
            return PrecedenceStatus::Valid;
        }
        match waitall {
            true if any_failed => PrecedenceStatus::Failed,
            true if all_valid => PrecedenceStatus::Valid,
            false if any_valid => PrecedenceStatus::Valid,
            false if all_failed => PrecedenceStatus::Failed,
            _ => PrecedenceStatus::Wait,
        }
    }
}

/// A validated precedence edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrecedenceConstraint {
    pub first:      ActivityId,
    pub second:     ActivityId,
    pub kind:       PrecedenceType,
    pub mintimelag: Time,
    pub maxtimelag: Time,
}

impl PrecedenceConstraint {
    /// Rejects `mintimelag < 0` and `mintimelag > maxtimelag`.
    pub fn new(
        first:      ActivityId,
        second:     ActivityId,
        kind:       PrecedenceType,
        mintimelag: Time,
        maxtimelag: Time,
    ) -> DecisionResult<Self> {
        if mintimelag < Time::ZERO || mintimelag > maxtimelag {
            return Err(DecisionError::InvalidTimeLag {
                min: mintimelag.value(),
                max: maxtimelag.value(),
            });
        }
        Ok(Self { first, second, kind, mintimelag, maxtimelag })
    }

    /// Date of the predecessor's milestone, once reached.
    pub fn milestone(&self, first: &Activity) -> Option<Time> {
        match self.kind {
            PrecedenceType::StartToStart => {
                (first.state() != ActivityState::Wait && !first.started_date().is_negative_infinity())
                    .then(|| first.started_date())
            }
            PrecedenceType::FinishToStart | PrecedenceType::FinishToFinish => {
                first.is_done().then(|| first.done_date())
            }
        }
    }

    /// `[milestone + min, milestone + max]`, once the milestone is reached.
    pub fn window(&self, first: &Activity) -> Option<(Time, Time)> {
        self.milestone(first)
            .map(|m| (m + self.mintimelag, m + self.maxtimelag))
    }

    pub fn status(&self, first: &Activity, time: Time) -> PrecedenceStatus {
        match self.window(first) {
            Some((lo, _)) if time < lo => PrecedenceStatus::Wait,
            Some((_, hi)) if time > hi => PrecedenceStatus::Failed,
            Some(_) => PrecedenceStatus::Valid,
            None if first.is_failed() => PrecedenceStatus::Failed,
            None => PrecedenceStatus::Wait,
        }
    }

    /// Status of an FF edge when its second activity completes at `time`.
    /// The second activity may not finish before the first: an unfinished
    /// predecessor fails the edge.  A finished one is judged by its window.
    pub fn finish_status(&self, first: &Activity, time: Time) -> PrecedenceStatus {
        match self.window(first) {
            Some(_) => self.status(first, time),
            None => PrecedenceStatus::Failed,
        }
    }
}
