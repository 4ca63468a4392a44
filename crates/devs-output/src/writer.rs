//! The `OutputWriter` trait implemented by all backend writers.

use crate::{CycleSummaryRow, ObservationRow, OutputResult};

/// Trait implemented by the CSV and in-memory writers.
///
/// Errors never reach the coordinator: [`SimOutputObserver`][crate::SimOutputObserver]
/// keeps the first one for [`take_error`][crate::SimOutputObserver::take_error].
pub trait OutputWriter {
    fn write_observation(&mut self, row: &ObservationRow) -> OutputResult<()>;

    fn write_cycle_summary(&mut self, row: &CycleSummaryRow) -> OutputResult<()>;

    /// Flush and close all underlying handles.
    ///
    /// Idempotent.
    fn finish(&mut self) -> OutputResult<()>;
}
