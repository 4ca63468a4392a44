//! `Plan` — rules, activities and precedences loaded from plan text or
//! assembled programmatically.
//!
//! Loading is fail-fast: every referenced rule, predicate and callback must
//! already exist, and every time lag and temporal constraint is validated
//! before the plan is used.  A failed load leaves the plan unchanged.
//!
//! # Plan text
//!
//! ```text
//! rules {
//!     rule { id = "r1"; predicates = "p1", "p2"; }
//! }
//! activities {
//!     activity {
//!         id = "A"; rules = "r1"; rules-fail = "r2";
//!         ack = "ack"; output = "out"; update = "upd";
//!         temporal { start = 0; finish = 10; }
//!     }
//!     sequence-activity {
//!         id-prefix = "S"; number = 4;
//!         temporal-sequence {
//!             precedence { type = "FS"; mintimelag = 1; }
//!         }
//!     }
//! }
//! precedences {
//!     precedence { type = "FS"; first = "A"; second = "S_1"; }
//! }
//! ```

use std::collections::BTreeMap;

use tracing::info;

use devs_core::{ActivityId, Time, Value};

use crate::activity::INTERNAL_PARAMS;
use crate::parser::{parse, Block};
use crate::{
    Activities, Activity, DecisionError, DecisionResult, PrecedenceType, Registries, Rule, Rules,
    Temporal,
};

#[derive(Default)]
pub struct Plan {
    rules:      Rules,
    activities: Activities,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn activities(&self) -> &Activities {
        &self.activities
    }

    pub fn activities_mut(&mut self) -> &mut Activities {
        &mut self.activities
    }

    // ── Loading ───────────────────────────────────────────────────────────

    /// Parse `text` and add its rules, activities and precedences.
    pub fn fill(&mut self, registries: &Registries, text: &str) -> DecisionResult<()> {
        let root = parse(text)?;
        let mut staged = Staged {
            rules:      self.rules.clone(),
            activities: Vec::new(),
            edges:      Vec::new(),
        };
        for block in root.blocks_named("rules") {
            for rule in block.blocks_named("rule") {
                staged.rule(registries, rule)?;
            }
        }
        for block in root.blocks_named("activities") {
            for activity in block.blocks_named("activity") {
                staged.activity(registries, activity)?;
            }
            for sequence in block.blocks_named("sequence-activity") {
                staged.sequence(registries, sequence)?;
            }
        }
        for block in root.blocks_named("precedences") {
            for precedence in block.blocks_named("precedence") {
                staged.edges.push(read_precedence(precedence)?);
            }
        }
        self.commit(staged)
    }

    /// Apply a validated load.  Name and edge checks run against a scratch
    /// copy first.
    fn commit(&mut self, staged: Staged) -> DecisionResult<()> {
        let Staged { rules, activities, edges } = staged;
        let (n_activities, n_edges) = (activities.len(), edges.len());

        let mut names: Vec<&str> = self.activities.iter().map(|(_, n, _)| n).collect();
        for (name, _) in &activities {
            if names.contains(&name.as_str()) {
                return Err(DecisionError::DuplicateActivity(name.clone()));
            }
            names.push(name);
        }
        for edge in &edges {
            for endpoint in [&edge.first, &edge.second] {
                if !names.contains(&endpoint.as_str()) {
                    return Err(DecisionError::UnknownActivity(endpoint.clone()));
                }
            }
        }

        self.rules = rules;
        for (name, activity) in activities {
            self.activities.add(name, activity)?;
        }
        for edge in edges {
            self.activities
                .add_constraint(&edge.first, &edge.second, edge.kind, edge.min, edge.max)?;
        }
        info!(
            rules = self.rules.len(),
            activities = n_activities,
            precedences = n_edges,
            "plan loaded"
        );
        Ok(())
    }

    // ── Programmatic API ──────────────────────────────────────────────────

    /// Define rule `name` as the conjunction of registered predicates.
    pub fn add_rule(&mut self, registries: &Registries, name: &str, predicates: &[&str]) -> DecisionResult<()> {
        let mut rule = Rule::new();
        for p in predicates {
            rule.add(*p, registries.predicates.require(p)?);
        }
        self.rules.add(name, rule);
        Ok(())
    }

    pub fn add_activity(&mut self, name: impl Into<String>, activity: Activity) -> DecisionResult<ActivityId> {
        self.activities.add(name, activity)
    }

    /// Attach the plan rule `rule` to `activity` as a normal rule.
    pub fn attach_rule(&mut self, activity: &str, rule: &str) -> DecisionResult<()> {
        let r = self.lookup_rule(rule)?;
        self.activity_mut(activity)?.add_rule(rule, r);
        Ok(())
    }

    /// Attach the plan rule `rule` to `activity` as a failure rule.
    pub fn attach_failure_rule(&mut self, activity: &str, rule: &str) -> DecisionResult<()> {
        let r = self.lookup_rule(rule)?;
        self.activity_mut(activity)?.add_failure_rule(rule, r);
        Ok(())
    }

    pub fn add_precedence(
        &mut self,
        kind:   PrecedenceType,
        first:  &str,
        second: &str,
        min:    Time,
        max:    Time,
    ) -> DecisionResult<()> {
        self.activities.add_constraint(first, second, kind, min, max)
    }

    fn lookup_rule(&self, name: &str) -> DecisionResult<Rule> {
        self.rules
            .get(name)
            .cloned()
            .ok_or_else(|| DecisionError::UnknownRule(name.to_owned()))
    }

    fn activity_mut(&mut self, name: &str) -> DecisionResult<&mut Activity> {
        self.activities
            .get_mut(name)
            .ok_or_else(|| DecisionError::UnknownActivity(name.to_owned()))
    }
}

// ── Loading helpers ───────────────────────────────────────────────────────────

struct EdgeSpec {
    first:  String,
    second: String,
    kind:   PrecedenceType,
    min:    Time,
    max:    Time,
}

/// A load in progress.
struct Staged {
    rules:      Rules,
    activities: Vec<(String, Activity)>,
    edges:      Vec<EdgeSpec>,
}

impl Staged {
    fn rule(&mut self, registries: &Registries, block: &Block) -> DecisionResult<()> {
        let id = block.string("id").ok_or(DecisionError::MissingId("rule"))?;
        let mut rule = Rule::new();
        for p in block.strings_of("predicates") {
            rule.add(p, registries.predicates.require(p)?);
        }
        self.rules.add(id, rule);
        Ok(())
    }

    fn activity(&mut self, registries: &Registries, block: &Block) -> DecisionResult<()> {
        let id = block.string("id").ok_or(DecisionError::MissingId("activity"))?;
        let activity = self.common(registries, id, block)?;
        self.activities.push((id.to_owned(), activity));
        Ok(())
    }

    fn sequence(&mut self, registries: &Registries, block: &Block) -> DecisionResult<()> {
        let prefix = block
            .string("id-prefix")
            .ok_or(DecisionError::MissingId("sequence-activity"))?;
        let name = format!("{prefix}_1");
        let mut activity = self.common(registries, &name, block)?;

        let counter = block.real("number").map_or(-1, |n| n as i64);
        let mut templates = Vec::new();
        for sequence in block.blocks_named("temporal-sequence") {
            for precedence in sequence.blocks_named("precedence") {
                templates.push(read_template(precedence)?);
            }
        }
        let mut internal = BTreeMap::new();
        internal.insert("recNumber".to_owned(), Value::Integer(counter));
        if !templates.is_empty() {
            internal.insert("precedences".to_owned(), Value::Set(templates));
        }
        activity
            .params_mut()
            .insert(INTERNAL_PARAMS.to_owned(), Value::Map(internal));

        self.activities.push((name, activity));
        Ok(())
    }

    /// Keys shared by `activity` and `sequence-activity`.
    fn common(&self, registries: &Registries, name: &str, block: &Block) -> DecisionResult<Activity> {
        let mut activity = Activity::new();
        for r in block.strings_of("rules") {
            activity.add_rule(r, self.lookup(r)?);
        }
        for r in block.strings_of("rules-fail") {
            activity.add_failure_rule(r, self.lookup(r)?);
        }
        if let Some(ack) = block.string("ack") {
            activity.set_acknowledger(registries.acknowledgers.require(ack)?);
        }
        if let Some(out) = block.string("output") {
            activity.set_outputter(registries.outputters.require(out)?);
        }
        if let Some(upd) = block.string("update") {
            activity.set_updater(registries.updaters.require(upd)?);
        }
        for temporal in block.blocks_named("temporal") {
            activity
                .set_temporal(read_temporal(temporal))
                .map_err(|message| DecisionError::InvalidTemporal {
                    activity: name.to_owned(),
                    message:  message.to_owned(),
                })?;
        }
        Ok(activity)
    }

    fn lookup(&self, rule: &str) -> DecisionResult<Rule> {
        self.rules
            .get(rule)
            .cloned()
            .ok_or_else(|| DecisionError::UnknownRule(rule.to_owned()))
    }
}

/// Temporal block resolution.  A missing finish range defaults to
/// `[0, +inf]`; a missing start range to `[-inf, +inf]`.
fn read_temporal(block: &Block) -> Temporal {
    let time = |key: &str| block.real(key).map(Time::new);
    let finish_range = || {
        (
            time("minfinish").unwrap_or(Time::ZERO),
            time("maxfinish").unwrap_or(Time::INFINITY),
        )
    };
    match (time("start"), time("finish")) {
        (Some(start), Some(finish)) => Temporal::StartTimeFinishTime { start, finish },
        (Some(start), None) => {
            let (minfinish, maxfinish) = finish_range();
            Temporal::StartTimeFinishRange { start, minfinish, maxfinish }
        }
        (None, finish) => {
            let minstart = time("minstart").unwrap_or(Time::NEGATIVE_INFINITY);
            let maxstart = time("maxstart").unwrap_or(Time::INFINITY);
            match finish {
                Some(finish) => Temporal::StartRangeFinishTime { minstart, maxstart, finish },
                None => {
                    let (minfinish, maxfinish) = finish_range();
                    Temporal::StartRangeFinishRange { minstart, maxstart, minfinish, maxfinish }
                }
            }
        }
    }
}

/// `(type, mintimelag, maxtimelag)` with defaults `FS`, `0`, `+inf`.
fn read_lags(block: &Block, default_kind: Option<&str>) -> DecisionResult<(PrecedenceType, Time, Time)> {
    let min = block.real("mintimelag").map_or(Time::ZERO, Time::new);
    let max = block.real("maxtimelag").map_or(Time::INFINITY, Time::new);
    let kind = block
        .string("type")
        .or(default_kind)
        .ok_or(DecisionError::MissingPrecedenceType)?
        .parse::<PrecedenceType>()?;
    if min < Time::ZERO || min > max {
        return Err(DecisionError::InvalidTimeLag { min: min.value(), max: max.value() });
    }
    Ok((kind, min, max))
}

/// A `temporal-sequence` precedence, stored as a parameter-bag template.
fn read_template(block: &Block) -> DecisionResult<Value> {
    let (kind, min, max) = read_lags(block, Some("FS"))?;
    let mut template = BTreeMap::new();
    template.insert("type".to_owned(), Value::from(kind.as_str()));
    template.insert("mintimelag".to_owned(), Value::Double(min.value()));
    template.insert("maxtimelag".to_owned(), Value::Double(max.value()));
    Ok(Value::Map(template))
}

fn read_precedence(block: &Block) -> DecisionResult<EdgeSpec> {
    let (kind, min, max) = read_lags(block, None)?;
    let first = block.string("first").ok_or(DecisionError::MissingEndpoint("first"))?;
    let second = block.string("second").ok_or(DecisionError::MissingEndpoint("second"))?;
    Ok(EdgeSpec { first: first.to_owned(), second: second.to_owned(), kind, min, max })
}
