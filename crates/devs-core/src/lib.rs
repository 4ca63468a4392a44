//! `devs-core` — foundational types for the `rust_devs` simulation framework.
//!
//! This crate is a dependency of every other `devs-*` crate.  It has no
//! `devs-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `ModelId`, `ActivityId`                               |
//! | [`time`]        | `Time` (with ±∞ sentinels), `SimClock`, `SimConfig`   |
//! | [`value`]       | `Value` — event attributes, facts, observations       |
//! | [`rng`]         | `ModelRng` (per-model), `SimRng` (run-level)          |
//! | [`error`]       | `DevsError`, `DevsResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod ids;
pub mod rng;
pub mod time;
pub mod value;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{DevsError, DevsResult};
pub use ids::{ActivityId, ModelId};
pub use rng::{ModelRng, SimRng};
pub use time::{SimClock, SimConfig, Time};
pub use value::Value;
