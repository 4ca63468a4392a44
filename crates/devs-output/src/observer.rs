//! `SimOutputObserver<W>` — bridges `SimObserver` to an `OutputWriter`.

use devs_core::Time;
use devs_kernel::{Observation, SimObserver};

use crate::writer::OutputWriter;
use crate::{CycleSummaryRow, ObservationRow, OutputError, OutputResult};

/// A [`SimObserver`] that forwards every observation sample, and optionally
/// one summary row per cycle, to an [`OutputWriter`].
///
/// Writer errors are stored because `SimObserver` methods return nothing.
/// After `sim.run()` returns, check with [`take_error`][Self::take_error].
pub struct SimOutputObserver<W: OutputWriter> {
    writer:     W,
    summaries:  bool,
    first_error: Option<OutputError>,
}

impl<W: OutputWriter> SimOutputObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, summaries: false, first_error: None }
    }

    /// Also write one [`CycleSummaryRow`] per cycle.
    pub fn with_cycle_summaries(mut self) -> Self {
        self.summaries = true;
        self
    }

    /// Take the first write error, if any.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.first_error.take()
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn keep_first(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            if self.first_error.is_none() {
                self.first_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> SimObserver for SimOutputObserver<W> {
    fn on_cycle_end(&mut self, time: Time, imminent: usize, touched: usize) {
        if !self.summaries {
            return;
        }
        let row = CycleSummaryRow { time, imminent: imminent as u64, touched: touched as u64 };
        let result = self.writer.write_cycle_summary(&row);
        self.keep_first(result);
    }

    fn on_observation(&mut self, obs: &Observation<'_>) {
        let row = ObservationRow {
            view:  obs.view.to_owned(),
            time:  obs.time,
            model: obs.model_name.to_owned(),
            port:  obs.port.to_owned(),
            value: obs.value.clone(),
        };
        let result = self.writer.write_observation(&row);
        self.keep_first(result);
    }

    fn on_sim_end(&mut self, _final_time: Time) {
        let result = self.writer.finish();
        self.keep_first(result);
    }
}
