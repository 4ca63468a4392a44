//! `devs-output` — observation writers for the rust_devs framework.
//!
//! | Backend        | Files created                        |
//! |----------------|--------------------------------------|
//! | [`CsvWriter`]  | `observations.csv`, `summary.csv`    |
//! | [`MemoryWriter`] | none; rows stay in memory          |
//!
//! Both implement [`OutputWriter`] and are driven by [`SimOutputObserver`],
//! which implements `devs_kernel::SimObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use devs_output::{CsvWriter, SimOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut obs = SimOutputObserver::new(writer).with_cycle_summaries();
//! sim.run(&mut obs)?;
//! if let Some(e) = obs.take_error() {
//!     eprintln!("output error: {e}");
//! }
//! ```

pub mod csv;
pub mod error;
pub mod memory;
pub mod observer;
pub mod row;
pub mod writer;


pub use self::csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use memory::MemoryWriter;
pub use observer::SimOutputObserver;
pub use row::{CycleSummaryRow, ObservationRow};
pub use writer::OutputWriter;
