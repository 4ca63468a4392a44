//! `devs-kernel` — DEVS root coordinator for the rust_devs framework.
//!
//! # Event loop
//!
//! ```text
//! init every atomic model at config.begin (ascending ModelId)
//! while tn = earliest pending event <= config.end():
//!   ① Timed views   — take every sample dated before tn.
//!   ② Output        — each imminent model emits; events are copied along
//!                     the flattened couplings into per-model bags.
//!   ③ Transitions   — ascending ModelId: confluent | internal | external;
//!                     next event = tn + time_advance().
//!   ④ Event views   — sample each transitioned model.
//! timed views up to end, finish views, Dynamics::finish
//! ```
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`dynamics`]    | `Dynamics` trait, `DynamicsInit`, `Passive`           |
//! | [`event`]       | `ExternalEvent`, `EventList`                          |
//! | [`graph`]       | `AtomicModel`, `CoupledModel`, flattening and routing |
//! | [`calendar`]    | `EventCalendar` — next-event dates per model          |
//! | [`coordinator`] | `RootCoordinator`, `RunSummary`                       |
//! | [`builder`]     | `SimBuilder`                                          |
//! | [`observer`]    | `SimObserver`, `Observation`, `ViewKind`              |
//! | [`manager`]     | `run_replicas` — one run per seed                     |
//! | [`error`]       | `SimError`, `ModelError`, `ErrorRecord`               |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | Runs replicas on Rayon's thread pool.                  |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use devs_core::SimConfig;
//! use devs_kernel::{AtomicModel, CoupledModel, NoopObserver, SimBuilder};
//!
//! let root = CoupledModel::new("top")
//!     .add(AtomicModel::from_dynamics("clock", Ticker::new(1.0)));
//! let mut sim = SimBuilder::new(SimConfig::new(0.0, 100.0), root).build()?;
//! let summary = sim.run(&mut NoopObserver)?;
//! ```

pub mod builder;
pub mod calendar;
pub mod coordinator;
pub mod dynamics;
pub mod error;
pub mod event;
pub mod graph;
pub mod manager;
pub mod observer;


pub use builder::SimBuilder;
pub use calendar::EventCalendar;
pub use coordinator::{RootCoordinator, RunSummary};
pub use dynamics::{Dynamics, DynamicsInit, Passive};
pub use error::{ErrorRecord, ModelError, ModelResult, SimError, SimResult};
pub use event::{EventList, ExternalEvent};
pub use graph::{AtomicModel, Connection, CoupledModel, Endpoint, ModelNode};
pub use manager::{ReplicaOutcome, run_replicas};
pub use observer::{NoopObserver, Observation, SimObserver, ViewKind};
