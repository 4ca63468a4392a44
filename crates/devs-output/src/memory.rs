//! In-memory backend, for tests and for callers that post-process results
//! without touching the filesystem.

use devs_core::{Time, Value};

use crate::writer::OutputWriter;
use crate::{CycleSummaryRow, ObservationRow, OutputResult};

#[derive(Debug, Default)]
pub struct MemoryWriter {
    pub observations: Vec<ObservationRow>,
    pub summaries:    Vec<CycleSummaryRow>,
    pub finished:     bool,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of `view` for (`model`, `port`), in recording order.
    pub fn series<'a>(
        &'a self,
        view:  &'a str,
        model: &'a str,
        port:  &'a str,
    ) -> impl Iterator<Item = &'a ObservationRow> + 'a {
        self.observations
            .iter()
            .filter(move |r| r.view == view && r.model == model && r.port == port)
    }

    /// Last value recorded at `time` for (`model`, `port`) in any view.
    pub fn value_at(&self, model: &str, port: &str, time: Time) -> Option<&Value> {
        self.observations
            .iter()
            .rev()
            .find(|r| r.model == model && r.port == port && r.time == time)
            .and_then(|r| r.value.as_ref())
    }
}

impl OutputWriter for MemoryWriter {
    fn write_observation(&mut self, row: &ObservationRow) -> OutputResult<()> {
        self.observations.push(row.clone());
        Ok(())
    }

    fn write_cycle_summary(&mut self, row: &CycleSummaryRow) -> OutputResult<()> {
        self.summaries.push(*row);
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.finished = true;
        Ok(())
    }
}
