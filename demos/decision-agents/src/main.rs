//! decision-agents — small runs of the decision extension.
//!
//! Three agents carry a single activity `A` in `[0,10]` that is validated
//! and failed by predicates on the date.  A fourth adds `B`, bound to `A`
//! by a finish-to-finish precedence and acknowledged from outside while
//! `A` is still running.  A last agent walks a recursive sequence of
//! activities, each acknowledged by its own output.  Activity
//! states are sampled every time unit and written under `./output/<run>/`.
//!
//! `RUST_LOG=devs_decision=debug` shows every state change.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use devs_core::{SimConfig, Time, Value};
use devs_decision::{Activity, Agent, Facts, KnowledgeBase};
use devs_kernel::{
    AtomicModel, CoupledModel, Dynamics, EventList, ExternalEvent, ModelResult, SimBuilder,
    ViewKind,
};
use devs_output::{CsvWriter, SimOutputObserver};

// ── Constants ─────────────────────────────────────────────────────────────────

const OUTPUT_DIR: &str = "./output";
const FACT_PERIOD: f64 = 1.0;

const FAILED_PLAN: &str = r#"
rules {
    rule { id = "validA"; predicates = "validateA"; }
    rule { id = "failA"; predicates = "failA"; }
}
activities {
    activity {
        id = "A"; rules = "validA"; rules-fail = "failA";
        temporal { start = 0; finish = 10; }
    }
}
"#;

const FINISH_TO_FINISH_PLAN: &str = r#"
rules {
    rule { id = "validA"; predicates = "validateA"; }
    rule { id = "failA"; predicates = "failA"; }
    rule { id = "validB"; predicates = "validateB"; }
}
activities {
    activity {
        id = "A"; rules = "validA"; rules-fail = "failA";
        temporal { start = 0; finish = 10; }
    }
    activity { id = "B"; rules = "validB"; temporal { start = 0; finish = 10; } }
}
precedences {
    precedence { type = "FF"; first = "A"; second = "B"; }
}
"#;

const SEQUENCE_PLAN: &str = r#"
rules { rule { id = "odd"; predicates = "odd"; } }
activities {
    sequence-activity {
        id-prefix = "id"; number = 4; output = "out";
        temporal { start = 1; finish = 30; }
        temporal-sequence {
            precedence { type = "FS"; mintimelag = 1; }
            precedence { type = "FF"; maxtimelag = 3; }
        }
    }
}
"#;

// ── Fact source ───────────────────────────────────────────────────────────────

/// Sends a `true` fact on `out` every `period`.
struct Ticker {
    period: f64,
}

impl Dynamics for Ticker {
    fn init(&mut self, _time: Time) -> ModelResult<Time> {
        Ok(Time::ZERO)
    }

    fn time_advance(&self) -> Time {
        Time::new(self.period)
    }

    fn output(&self, _time: Time, output: &mut EventList) {
        output.push(ExternalEvent::new("out").with("value", true));
    }
}

/// Sends one `done` acknowledgement for `activity` at `date`.
struct Acknowledger {
    activity: &'static str,
    date:     f64,
    sent:     bool,
}

impl Dynamics for Acknowledger {
    fn init(&mut self, time: Time) -> ModelResult<Time> {
        Ok(Time::new(self.date) - time)
    }

    fn time_advance(&self) -> Time {
        if self.sent { Time::INFINITY } else { Time::new(self.date) }
    }

    fn output(&self, _time: Time, output: &mut EventList) {
        output.push(ExternalEvent::new("out").with("name", self.activity).with("value", "done"));
    }

    fn internal_transition(&mut self, _time: Time) -> ModelResult<()> {
        self.sent = true;
        Ok(())
    }
}

// ── Agents ────────────────────────────────────────────────────────────────────

fn on(date: f64) -> impl Fn(&Facts, Time) -> bool {
    move |_: &Facts, t: Time| t == Time::new(date)
}

fn failed_activity_agent(validate: f64, fail: f64) -> Result<Agent> {
    let mut kb = KnowledgeBase::new();
    kb.add_predicate("validateA", on(validate));
    kb.add_predicate("failA", on(fail));
    kb.add_fact("fact", |facts: &mut Facts, value: &Value| facts.set("fact", value.clone()));
    kb.load_plan(FAILED_PLAN).context("loading the failed-activity plan")?;
    Ok(Agent::new(kb))
}

fn finish_to_finish_agent() -> Result<Agent> {
    let mut kb = KnowledgeBase::new();
    kb.add_predicate("validateA", on(1.0));
    kb.add_predicate("failA", on(6.0));
    kb.add_predicate("validateB", on(1.0));
    kb.add_fact("fact", |facts: &mut Facts, value: &Value| facts.set("fact", value.clone()));
    kb.load_plan(FINISH_TO_FINISH_PLAN).context("loading the finish-to-finish plan")?;
    Ok(Agent::new(kb))
}

fn sequence_agent() -> Result<Agent> {
    let mut kb = KnowledgeBase::new();
    kb.add_predicate("odd", |_: &Facts, t: Time| t.value() as i64 % 2 == 0);
    kb.add_fact("fact", |_: &mut Facts, _: &Value| {});
    kb.add_output_function("out", |name: &str, a: &Activity, out: &mut EventList| {
        if a.is_started() {
            out.push(ExternalEvent::new("ack").with("name", name).with("value", "done"));
        }
    });
    kb.load_plan(SEQUENCE_PLAN).context("loading the sequence plan")?;
    Ok(Agent::new(kb))
}

// ── Runs ──────────────────────────────────────────────────────────────────────

/// Fact ticker feeding `agent`, whose acknowledgements loop back to it.
fn agent_model(agent: Agent) -> CoupledModel {
    CoupledModel::new("top")
        .add(AtomicModel::from_dynamics("facts", Ticker { period: FACT_PERIOD }))
        .add(AtomicModel::from_dynamics("agent", agent))
        .connect("facts", "out", "agent", "fact")
        .connect("agent", "ack", "agent", "ack")
}

fn run(name: &str, root: CoupledModel, ports: &[&str], duration: f64) -> Result<()> {

    let mut builder = SimBuilder::new(SimConfig::new(0.0, duration), root)
        .view("timed", ViewKind::Timed(Time::new(1.0)))
        .view("end", ViewKind::Finish);
    for port in ports {
        builder = builder.observe("top:agent", *port, "timed").observe("top:agent", *port, "end");
    }
    let mut sim = builder.build().with_context(|| format!("building run {name}"))?;

    let dir = Path::new(OUTPUT_DIR).join(name);
    let writer = CsvWriter::new(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut obs = SimOutputObserver::new(writer).with_cycle_summaries();

    let summary = sim.run(&mut obs).with_context(|| format!("running {name}"))?;
    if let Some(e) = obs.take_error() {
        warn!(run = name, error = %e, "output error");
    }
    info!(
        run = name,
        end = %summary.end_time,
        cycles = summary.cycles,
        output = %dir.display(),
        "run finished"
    );
    Ok(())
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // (run, validation date, failure date)
    let failed = [("agent1", 1.0, 5.0), ("agent2", 5.0, 1.0), ("agent3", 1.0, 1.0)];
    for (name, validate, fail) in failed {
        run(name, agent_model(failed_activity_agent(validate, fail)?), &["A"], 10.0)?;
    }

    let acknowledger = Acknowledger { activity: "B", date: 5.0, sent: false };
    let agent4 = agent_model(finish_to_finish_agent()?)
        .add(AtomicModel::from_dynamics("ack", acknowledger))
        .connect("ack", "out", "agent", "ack");
    run("agent4", agent4, &["A", "B"], 10.0)?;

    let ports = ["id_1", "id_2", "id_3", "id_4", "id_5"];
    run("sequence", agent_model(sequence_agent()?), &ports, 10.0)?;
    Ok(())
}
