//! Simulation time model.
//!
//! # Design
//!
//! DEVS time is continuous: a model may schedule its next internal event at
//! any real date.  `Time` wraps an `f64` and adds the two sentinels the
//! formalism relies on:
//!
//! - `Time::INFINITY` — "no event scheduled" (a passive model's time advance),
//!   and the open upper bound of unconstrained windows;
//! - `Time::NEGATIVE_INFINITY` — "has not happened yet" for recorded dates,
//!   and the open lower bound of unconstrained windows.
//!
//! `Time` is totally ordered (`Ord`) so it can key the event calendar.  NaN is
//! never constructed: the only arithmetic that could produce it
//! (`∞ - ∞`) is defined to yield `Time::ZERO`.  `-0.0` is normalised to `0.0`
//! so equality and hashing agree with the ordering.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::{DevsError, DevsResult};

// ── Time ──────────────────────────────────────────────────────────────────────

/// A simulation date or duration.
#[derive(Copy, Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Time(f64);

impl Time {
    pub const ZERO: Time = Time(0.0);
    pub const INFINITY: Time = Time(f64::INFINITY);
    pub const NEGATIVE_INFINITY: Time = Time(f64::NEG_INFINITY);

    /// Wrap a raw value.
    ///
    /// # Panics
    /// Panics in debug mode if `value` is NaN.
    #[inline]
    pub fn new(value: f64) -> Time {
        debug_assert!(!value.is_nan(), "simulation time cannot be NaN");
        if value == 0.0 || value.is_nan() { Time(0.0) } else { Time(value) }
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_infinity(self) -> bool {
        self.0 == f64::INFINITY
    }

    #[inline]
    pub fn is_negative_infinity(self) -> bool {
        self.0 == f64::NEG_INFINITY
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for Time {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for Time {
    #[inline]
    fn from(value: f64) -> Time {
        Time::new(value)
    }
}

impl std::ops::Add for Time {
    type Output = Time;
    #[inline]
    fn add(self, rhs: Time) -> Time {
        let sum = self.0 + rhs.0;
        // ∞ + (-∞): opposite sentinels cancel.
        if sum.is_nan() { Time::ZERO } else { Time::new(sum) }
    }
}

impl std::ops::Add<f64> for Time {
    type Output = Time;
    #[inline]
    fn add(self, rhs: f64) -> Time {
        self + Time::new(rhs)
    }
}

impl std::ops::Sub for Time {
    type Output = Time;
    #[inline]
    fn sub(self, rhs: Time) -> Time {
        let diff = self.0 - rhs.0;
        if diff.is_nan() { Time::ZERO } else { Time::new(diff) }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinity() {
            f.write_str("+inf")
        } else if self.is_negative_infinity() {
            f.write_str("-inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for Time {
    type Err = DevsError;

    /// Accepts plain reals plus `inf`, `+inf`, `infinity` and `-inf`.
    fn from_str(s: &str) -> DevsResult<Time> {
        match s.trim() {
            "inf" | "+inf" | "infinity" | "+infinity" => Ok(Time::INFINITY),
            "-inf" | "-infinity" => Ok(Time::NEGATIVE_INFINITY),
            other => other
                .parse::<f64>()
                .ok()
                .filter(|v| !v.is_nan())
                .map(Time::new)
                .ok_or_else(|| DevsError::Parse(format!("invalid time {other:?}"))),
        }
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// The current date of a run.  Only moves forward.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Date the run started at.
    pub begin: Time,
    /// Date of the last processed cycle.
    pub current: Time,
}

impl SimClock {
    pub fn new(begin: Time) -> Self {
        Self { begin, current: begin }
    }

    /// Move the clock to `time`.
    ///
    /// # Panics
    /// Panics in debug mode if `time` is earlier than the current date.
    #[inline]
    pub fn advance_to(&mut self, time: Time) {
        debug_assert!(time >= self.current, "clock cannot move backwards");
        self.current = time;
    }

    /// Simulated time elapsed since `begin`.
    #[inline]
    pub fn elapsed(&self) -> Time {
        self.current - self.begin
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={} (elapsed {})", self.current, self.elapsed())
    }
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Top-level run configuration.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Date of the first cycle; every model's `init` receives it.
    pub begin: Time,

    /// Length of the run.  Events dated `begin + duration` are still processed.
    pub duration: Time,

    /// Master seed.  The same seed always produces identical results.
    pub seed: u64,

    /// Worker thread count for parallel replicas.  `None` uses all logical
    /// cores.
    pub num_threads: Option<usize>,
}

impl SimConfig {
    pub fn new(begin: impl Into<Time>, duration: impl Into<Time>) -> Self {
        Self {
            begin:       begin.into(),
            duration:    duration.into(),
            seed:        0,
            num_threads: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The date at which the run ends (inclusive).
    #[inline]
    pub fn end(&self) -> Time {
        self.begin + self.duration
    }

    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.begin)
    }
}
