//! Plain data rows handed to output backends.

use devs_core::{Time, Value};

/// One observation sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub view:  String,
    pub time:  Time,
    /// Full model path, e.g. `"top:agent"`.
    pub model: String,
    pub port:  String,
    /// `None` when the model did not answer for this port.
    pub value: Option<Value>,
}

/// Per-cycle counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleSummaryRow {
    pub time:     Time,
    pub imminent: u64,
    pub touched:  u64,
}
