//! `devs-decision` — decision agents for the rust_devs framework.
//!
//! A decision agent owns a [`KnowledgeBase`]: named predicates and callbacks,
//! a bag of facts, and a [`Plan`] of activities linked by precedence
//! constraints.  Each time the agent is woken up it re-evaluates every
//! activity against the facts and the current date.
//!
//! # What lives here
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`rule`]        | `Facts`, `Predicate`, `Rule`, `Rules`                      |
//! | [`registry`]    | callback traits, `Registry`, `Registries`                  |
//! | [`activity`]    | `Activity`, `ActivityState`, `Temporal`, `DateType`        |
//! | [`precedence`]  | `PrecedenceType`, `PrecedenceStatus`, `PrecedenceConstraint` |
//! | [`activities`]  | `Activities` — arena, precedence graph, evaluation, recursion |
//! | [`parser`]      | block-structured plan text → `Block`                       |
//! | [`plan`]        | `Plan` — plan loading and the programmatic plan API        |
//! | [`knowledge`]   | `KnowledgeBase`                                            |
//! | [`agent`]       | `Agent` — the knowledge base as a `Dynamics` model         |
//! | [`error`]       | `DecisionError`, `DecisionResult`                          |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! let mut kb = KnowledgeBase::new();
//! kb.add_predicate("late", |_: &Facts, t: Time| t >= Time::new(5.0));
//! kb.load_plan(r#"
//!     rules { rule { id = "r"; predicates = "late"; } }
//!     activities { activity { id = "A"; rules = "r"; } }
//! "#)?;
//! let agent = AtomicModel::from_dynamics("agent", Agent::new(kb));
//! ```

pub mod activities;
pub mod activity;
pub mod agent;
pub mod error;
pub mod knowledge;
pub mod parser;
pub mod plan;
pub mod precedence;
pub mod registry;
pub mod rule;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use activities::Activities;
pub use activity::{Activity, ActivityState, DateType, INTERNAL_PARAMS, Temporal};
pub use agent::{ACK_PORT, Agent};
pub use error::{DecisionError, DecisionResult};
pub use knowledge::KnowledgeBase;
pub use parser::{Block, parse};
pub use plan::Plan;
pub use precedence::{PrecedenceConstraint, PrecedenceStatus, PrecedenceType};
pub use registry::{Acknowledger, FactHandler, Outputter, Registries, Registry, Updater};
pub use rule::{Facts, Predicate, Rule, Rules};
