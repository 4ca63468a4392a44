//! CSV output backend.
//!
//! Creates two files in the output directory:
//! - `observations.csv` — `view,time,model,port,value`
//! - `summary.csv` — `time,imminent,touched`
//!
//! A missing value is written as an empty field.

use std::fs::{self, File};
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{CycleSummaryRow, ObservationRow, OutputResult};

pub struct CsvWriter {
    observations: Writer<File>,
    summaries:    Writer<File>,
    finished:     bool,
}

impl CsvWriter {
    /// Create `dir` if needed, open both files and write their headers.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        fs::create_dir_all(dir)?;

        let mut observations = Writer::from_path(dir.join("observations.csv"))?;
        observations.write_record(["view", "time", "model", "port", "value"])?;

        let mut summaries = Writer::from_path(dir.join("summary.csv"))?;
        summaries.write_record(["time", "imminent", "touched"])?;

        Ok(Self { observations, summaries, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_observation(&mut self, row: &ObservationRow) -> OutputResult<()> {
        let time = row.time.to_string();
        let value = row.value.as_ref().map(ToString::to_string).unwrap_or_default();
        self.observations.write_record([
            row.view.as_str(),
            time.as_str(),
            row.model.as_str(),
            row.port.as_str(),
            value.as_str(),
        ])?;
        Ok(())
    }

    fn write_cycle_summary(&mut self, row: &CycleSummaryRow) -> OutputResult<()> {
        self.summaries.write_record(&[
            row.time.to_string(),
            row.imminent.to_string(),
            row.touched.to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.observations.flush()?;
        self.summaries.flush()?;
        Ok(())
    }
}
