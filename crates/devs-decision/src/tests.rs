//! Unit and scenario tests for devs-decision.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;

    use devs_core::{Time, Value};
    use devs_kernel::{Dynamics, EventList, ExternalEvent, ModelResult, Observation, SimObserver};

    use crate::{Facts, Predicate};

    /// Predicate reading the boolean fact `name`.
    pub fn flag(name: &'static str) -> Arc<dyn Predicate> {
        Arc::new(move |facts: &Facts, _time: Time| facts.flag(name))
    }

    /// Fact source: emits `{value: true}` on "out" at its begin date and
    /// then every `period`.
    pub struct FactSource {
        pub period: f64,
    }

    impl Dynamics for FactSource {
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

    /// Keeps every sample as `(port, time, state string)`.
    #[derive(Default, Debug)]
    pub struct States {
        pub samples: Vec<(String, f64, Option<String>)>,
    }

    impl SimObserver for States {
        fn on_observation(&mut self, obs: &Observation<'_>) {
            let state = obs.value.as_ref().and_then(Value::as_str).map(str::to_owned);
            self.samples.push((obs.port.to_owned(), obs.time.value(), state));
        }
    }

    impl States {
        pub fn trace(&self, port: &str) -> Vec<(f64, Option<String>)> {
            self.samples
                .iter()
                .filter(|(p, _, _)| p == port)
                .map(|(_, t, s)| (*t, s.clone()))
                .collect()
        }

        /// State at each sampled date, `"-"` when the activity did not exist.
        pub fn states(&self, port: &str) -> Vec<String> {
            self.trace(port)
                .into_iter()
                .map(|(_, s)| s.unwrap_or_else(|| "-".to_owned()))
                .collect()
        }
    }
}

#[cfg(test)]
mod rules {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use devs_core::Time;

    use super::helpers::flag;
    use crate::{Facts, Rule, Rules};

    #[test]
    fn rules_are_a_disjunction_of_conjunctions() {
        let mut rules = Rules::new();
        rules.add("r1", Rule::new().with("p1", flag("p1")).with("p2", flag("p2")));
        rules.add("r2", Rule::new().with("p3", flag("p3")));

        for bits in 0..8u8 {
            let (p1, p2, p3) = (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            let mut facts = Facts::new();
            facts.set("p1", p1);
            facts.set("p2", p2);
            facts.set("p3", p3);
            assert_eq!(
                rules.is_valid(&facts, Time::ZERO),
                (p1 && p2) || p3,
                "p1={p1} p2={p2} p3={p3}"
            );
        }
    }

    #[test]
    fn every_predicate_is_evaluated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let rule = Rule::new()
            .with("never", Arc::new(|_: &Facts, _: Time| false))
            .with(
                "counted",
                Arc::new(move |_: &Facts, _: Time| {
                    counted.fetch_add(1, Ordering::SeqCst);
                    true
                }),
            );
        assert!(!rule.is_valid(&Facts::new(), Time::ZERO));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_sets() {
        assert!(Rule::new().is_valid(&Facts::new(), Time::ZERO));
        assert!(!Rules::new().is_valid(&Facts::new(), Time::ZERO));
    }

    #[test]
    fn adding_a_rule_twice_replaces_it() {
        let mut rules = Rules::new();
        rules.add("r", Rule::new().with("p1", flag("p1")));
        rules.add("r", Rule::new());
        assert_eq!(rules.len(), 1);
        assert!(rules.get("r").unwrap().is_empty());
    }
}

#[cfg(test)]
mod activity {
    use devs_core::Time;

    use crate::{Activity, ActivityState, DateType, Temporal};

    fn t(v: f64) -> Time {
        Time::new(v)
    }

    #[test]
    fn inconsistent_temporal_constraints_rejected() {
        let mut a = Activity::new();
        assert!(a.init_start_time_finish_time(t(5.0), t(2.0)).is_err());
        assert!(a.init_start_range_finish_range(t(3.0), t(1.0), t(0.0), t(9.0)).is_err());
        assert!(a.init_start_time_finish_range(t(0.0), t(8.0), t(4.0)).is_err());
        assert_eq!(*a.temporal(), Temporal::default());
    }

    #[test]
    fn windows_follow_constraint_shape() {
        let mut a = Activity::new();
        a.init_start_time_finish_range(t(1.0), t(4.0), t(9.0)).unwrap();
        assert_eq!((a.earliest_start(), a.latest_start()), (t(1.0), t(9.0)));
        assert_eq!((a.earliest_finish(), a.latest_finish()), (t(4.0), t(9.0)));
        assert!(a.date().contains(DateType::START | DateType::MINF));
        assert!(!a.date().contains(DateType::FINISH));

        a.init_start_range_finish_time(t(2.0), t(3.0), t(7.0)).unwrap();
        assert_eq!((a.earliest_start(), a.latest_start()), (t(2.0), t(3.0)));
        assert!(a.earliest_finish().is_negative_infinity());
        assert!(a.is_valid_time_constraint(t(2.0)) && a.is_valid_time_constraint(t(7.0)));
        assert!(a.is_before_time_constraint(t(1.5)));
        assert!(a.is_after_time_constraint(t(7.5)));
    }

    #[test]
    fn next_time_is_strictly_later_and_non_decreasing() {
        let mut a = Activity::new();
        a.init_start_range_finish_range(t(2.0), t(4.0), t(6.0), t(9.0)).unwrap();
        let mut previous = Time::NEGATIVE_INFINITY;
        for step in -2..24 {
            let now = t(step as f64 * 0.5);
            let next = a.next_time(now);
            assert!(next > now);
            assert!(next >= previous);
            previous = next;
        }
        assert_eq!(a.next_time(t(0.0)), t(2.0));
        assert_eq!(a.next_time(t(2.0)), t(4.0));
        assert!(a.next_time(t(4.0)).is_infinity());

        a.mark_started(t(3.0));
        assert_eq!(a.next_time(t(3.0)), t(6.0));
        a.mark_done(t(7.0));
        assert!(a.next_time(t(0.0)).is_infinity());
    }

    #[test]
    fn fresh_copy_is_waiting_with_cleared_dates() {
        let mut a = Activity::new();
        a.init_start_time_finish_time(t(0.0), t(10.0)).unwrap();
        a.mark_started(t(1.0));
        a.mark_ff(t(2.0));
        a.mark_done(t(3.0));

        let b = a.fresh_copy();
        assert_eq!(b.state(), ActivityState::Wait);
        assert!(b.started_date().is_negative_infinity());
        assert!(b.ff_date().is_negative_infinity());
        assert!(b.done_date().is_negative_infinity());
        assert_eq!(b.temporal(), a.temporal());
    }

    #[test]
    fn failing_records_done_date() {
        let mut a = Activity::new();
        a.mark_failed(t(4.0));
        assert!(a.is_failed() && a.state().is_terminal());
        assert_eq!(a.done_date(), t(4.0));
        assert_eq!(a.state().to_string(), "failed");
    }
}

#[cfg(test)]
mod precedence {
    use devs_core::Time;

    use crate::PrecedenceStatus::{self, Failed, Valid, Wait};
    use crate::{Activities, Activity, Facts, PrecedenceType};

    #[test]
    fn combine_and_or() {
        assert_eq!(PrecedenceStatus::combine([] as [PrecedenceStatus; 0], true), Valid);
        assert_eq!(PrecedenceStatus::combine([Valid, Wait], true), Wait);
        assert_eq!(PrecedenceStatus::combine([Valid, Failed], true), Failed);
        assert_eq!(PrecedenceStatus::combine([Valid, Valid], true), Valid);
        assert_eq!(PrecedenceStatus::combine([Wait, Valid], false), Valid);
        assert_eq!(PrecedenceStatus::combine([Wait, Failed], false), Wait);
        assert_eq!(PrecedenceStatus::combine([Failed, Failed], false), Failed);
    }

    #[test]
    fn type_names_parse() {
        assert_eq!("SS".parse::<PrecedenceType>().unwrap(), PrecedenceType::StartToStart);
        assert_eq!("FF".parse::<PrecedenceType>().unwrap().to_string(), "FF");
        assert!("XS".parse::<PrecedenceType>().is_err());
    }

    fn pair() -> Activities {
        let mut acts = Activities::new();
        acts.add("A", Activity::new()).unwrap();
        acts.add("B", Activity::new()).unwrap();
        acts
    }

    #[test]
    fn start_to_start_window() {
        let mut acts = pair();
        acts.add_start_to_start_constraint("A", "B", Time::new(1.0), Time::new(2.0))
            .unwrap();
        let (mut facts, mut changed) = (Facts::new(), Vec::new());

        acts.process(Time::ZERO, &mut facts, &mut changed).unwrap();
        assert!(acts.get("A").unwrap().is_started());
        assert!(acts.get("B").unwrap().is_wait());
        assert_eq!(acts.next_date(Time::ZERO), Time::new(1.0));

        acts.process(Time::new(1.0), &mut facts, &mut changed).unwrap();
        assert_eq!(acts.get("B").unwrap().started_date(), Time::new(1.0));
    }

    #[test]
    fn missed_window_fails_successor() {
        let mut acts = pair();
        acts.add_start_to_start_constraint("A", "B", Time::new(1.0), Time::new(2.0))
            .unwrap();
        let (mut facts, mut changed) = (Facts::new(), Vec::new());
        acts.process(Time::ZERO, &mut facts, &mut changed).unwrap();
        acts.process(Time::new(3.0), &mut facts, &mut changed).unwrap();
        assert!(acts.get("B").unwrap().is_failed());
    }

    #[test]
    fn finish_to_finish_holds_successor_in_ff() {
        let mut acts = pair();
        acts.add_finish_to_finish_constraint("A", "B", Time::new(2.0), Time::INFINITY)
            .unwrap();
        let (mut facts, mut changed) = (Facts::new(), Vec::new());
        acts.process(Time::ZERO, &mut facts, &mut changed).unwrap();

        acts.set_done("A", Time::new(1.0), &mut facts, &mut changed).unwrap();
        assert!(acts.set_done("B", Time::new(2.0), &mut facts, &mut changed).unwrap());
        assert!(acts.get("B").unwrap().is_ff());
        assert_eq!(acts.next_date(Time::new(2.0)), Time::new(3.0));

        acts.process(Time::new(3.0), &mut facts, &mut changed).unwrap();
        let b = acts.get("B").unwrap();
        assert!(b.is_done());
        assert_eq!((b.ff_date(), b.done_date()), (Time::new(2.0), Time::new(3.0)));
    }

    #[test]
    fn finishing_before_finish_to_finish_predecessor_fails() {
        let mut acts = pair();
        acts.add_finish_to_finish_constraint("A", "B", Time::ZERO, Time::INFINITY)
            .unwrap();
        let (mut facts, mut changed) = (Facts::new(), Vec::new());
        acts.process(Time::ZERO, &mut facts, &mut changed).unwrap();

        assert!(acts.set_done("B", Time::new(1.0), &mut facts, &mut changed).unwrap());
        let b = acts.get("B").unwrap();
        assert!(b.is_failed());
        assert_eq!(b.done_date(), Time::new(1.0));
        assert!(acts.get("A").unwrap().is_started());
    }

    #[test]
    fn wait_all_flag_selects_and_or() {
        for (waitall, starts) in [(true, false), (false, true)] {
            let mut acts = pair();
            let mut c = Activity::new();
            c.set_wait_all(waitall);
            acts.add("C", c).unwrap();
            acts.add_start_to_start_constraint("A", "C", Time::ZERO, Time::INFINITY)
                .unwrap();
            acts.add_finish_to_start_constraint("B", "C", Time::ZERO, Time::INFINITY)
                .unwrap();
            let (mut facts, mut changed) = (Facts::new(), Vec::new());
            acts.process(Time::ZERO, &mut facts, &mut changed).unwrap();
            assert_eq!(acts.get("C").unwrap().is_started(), starts, "waitall = {waitall}");
        }
    }

    #[test]
    fn acknowledging_a_waiting_activity_is_ignored() {
        let mut acts = pair();
        let (mut facts, mut changed) = (Facts::new(), Vec::new());
        assert!(!acts.set_done("A", Time::ZERO, &mut facts, &mut changed).unwrap());
        assert!(acts.get("A").unwrap().is_wait());
        assert!(acts.set_done("C", Time::ZERO, &mut facts, &mut changed).is_err());
    }

    #[test]
    fn inverted_lags_rejected() {
        let mut acts = pair();
        let err = acts
            .add_finish_to_start_constraint("A", "B", Time::new(5.0), Time::new(2.0))
            .unwrap_err();
        assert!(err.is_config());
        assert!(acts.precedences().is_empty());
    }
}

#[cfg(test)]
mod parser {
    use crate::{DecisionError, parse};

    #[test]
    fn nested_blocks_and_lists() {
        let root = parse(
            r#"
            # comment
            rules {
                rule { id = "r1"; predicates = "p1", "p2"; }
                rule { id = "r2"; }
            }
            temporal { start = -1.5; finish = 2e1; }
            "#,
        )
        .unwrap();
        let rules = root.blocks_named("rules").next().unwrap();
        let first = rules.blocks_named("rule").next().unwrap();
        assert_eq!(first.string("id"), Some("r1"));
        assert_eq!(first.strings_of("predicates").collect::<Vec<_>>(), ["p1", "p2"]);
        assert_eq!(first.string("predicates"), Some("p1"));
        assert_eq!(first.string("missing"), None);
        assert_eq!(rules.blocks_named("rule").count(), 2);

        let temporal = root.blocks_named("temporal").next().unwrap();
        assert_eq!(temporal.real("start"), Some(-1.5));
        assert_eq!(temporal.real("finish"), Some(20.0));
    }

    #[test]
    fn syntax_errors_carry_position() {
        match parse("rules {\n  rule { id = ; }\n}") {
            Err(DecisionError::Syntax { line, column, .. }) => assert_eq!((line, column), (2, 15)),
            other => panic!("expected syntax error, got {other:?}"),
        }
        assert!(matches!(parse("a { b = \"x\", 1; }"), Err(DecisionError::Syntax { .. })));
        assert!(matches!(parse("a { b = \"x\"; "), Err(DecisionError::Syntax { .. })));
        assert!(matches!(parse("a { b = \"x }"), Err(DecisionError::Syntax { .. })));
    }
}

#[cfg(test)]
mod plan {
    use devs_core::Time;
    use devs_kernel::{EventList, ExternalEvent};

    use crate::{Activity, DecisionError, Facts, KnowledgeBase, Temporal};

    fn kb() -> KnowledgeBase {
        let mut kb = KnowledgeBase::new();
        kb.add_predicate("yes", |_: &Facts, _: Time| true);
        kb.add_output_function("out", |name: &str, a: &Activity, out: &mut EventList| {
            if a.is_started() {
                out.push(ExternalEvent::new("ack").with("name", name).with("value", "done"));
            }
        });
        kb
    }

    fn load(text: &str) -> Result<KnowledgeBase, DecisionError> {
        let mut kb = kb();
        kb.load_plan(text).map(|()| kb)
    }

    #[test]
    fn configuration_errors() {
        let cases = [
            (
                r#"activities { activity { id = "A"; } activity { id = "B"; } }
                   precedences { precedence { type = "FS"; first = "A"; second = "B";
                                              mintimelag = 5; maxtimelag = 2; } }"#,
                "InvalidTimeLag",
            ),
            (r#"activities { activity { id = "A"; rules = "nope"; } }"#, "UnknownRule"),
            (r#"rules { rule { id = "r"; predicates = "nope"; } }"#, "UnknownPredicate"),
            (r#"activities { activity { id = "A"; update = "nope"; } }"#, "UnknownCallback"),
            (r#"activities { activity { rules = "r"; } }"#, "MissingId"),
            (r#"activities { sequence-activity { number = 2; } }"#, "MissingId"),
            (
                r#"activities { activity { id = "A"; } }
                   precedences { precedence { type = "XX"; first = "A"; second = "A"; } }"#,
                "UnknownPrecedenceType",
            ),
            (
                r#"activities { activity { id = "A"; } }
                   precedences { precedence { first = "A"; second = "A"; } }"#,
                "MissingPrecedenceType",
            ),
            (
                r#"activities { activity { id = "A"; } }
                   precedences { precedence { type = "SS"; first = "A"; second = "Z"; } }"#,
                "UnknownActivity",
            ),
            (r#"activities { activity { id = "A"; temporal { start = 5; finish = 1; } } }"#, "InvalidTemporal"),
        ];
        for (text, expected) in cases {
            let err = load(text).err().expect(expected);
            assert!(err.is_config(), "{err}");
            assert!(format!("{err:?}").starts_with(expected), "{expected}: {err:?}");
        }
    }

    #[test]
    fn failed_load_leaves_plan_untouched() {
        let mut kb = kb();
        let err = kb.load_plan(
            r#"activities { activity { id = "A"; } activity { id = "B"; ack = "missing"; } }"#,
        );
        assert!(err.is_err());
        assert!(kb.plan().activities().is_empty());
    }

    #[test]
    fn temporal_defaults() {
        let kb = load(
            r#"activities {
                activity { id = "fixed";  temporal { start = 1; finish = 3; } }
                activity { id = "start";  temporal { start = 2; } }
                activity { id = "ranges"; temporal { maxstart = 4; maxfinish = 9; } }
                activity { id = "finish"; temporal { minstart = 1; finish = 8; } }
                activity { id = "free"; }
            }"#,
        )
        .unwrap();
        let temporal = |name: &str| *kb.activity(name).unwrap().temporal();
        let t = Time::new;
        assert_eq!(temporal("fixed"), Temporal::StartTimeFinishTime { start: t(1.0), finish: t(3.0) });
        assert_eq!(
            temporal("start"),
            Temporal::StartTimeFinishRange { start: t(2.0), minfinish: Time::ZERO, maxfinish: Time::INFINITY }
        );
        assert_eq!(
            temporal("ranges"),
            Temporal::StartRangeFinishRange {
                minstart:  Time::NEGATIVE_INFINITY,
                maxstart:  t(4.0),
                minfinish: Time::ZERO,
                maxfinish: t(9.0),
            }
        );
        assert_eq!(
            temporal("finish"),
            Temporal::StartRangeFinishTime { minstart: t(1.0), maxstart: Time::INFINITY, finish: t(8.0) }
        );
        assert_eq!(temporal("free"), Temporal::default());
    }

    #[test]
    fn precedences_and_rules_are_wired() {
        let kb = load(
            r#"rules { rule { id = "r"; predicates = "yes"; } }
               activities {
                   activity { id = "A"; rules = "r"; output = "out"; }
                   activity { id = "B"; rules-fail = "r"; }
               }
               precedences { precedence { type = "FF"; first = "A"; second = "B"; maxtimelag = 4; } }"#,
        )
        .unwrap();
        let acts = kb.plan().activities();
        assert_eq!(acts.len(), 2);
        let edge = acts.precedences()[0];
        assert_eq!((acts.name(edge.first), acts.name(edge.second)), ("A", "B"));
        assert_eq!((edge.mintimelag, edge.maxtimelag), (Time::ZERO, Time::new(4.0)));
        assert_eq!(kb.activity("A").unwrap().rules().len(), 1);
        assert_eq!(kb.activity("B").unwrap().rules_failure().len(), 1);
    }

    #[test]
    fn programmatic_plan() {
        let mut kb = kb();
        kb.add_rule("r", &["yes"]).unwrap();
        assert!(kb.add_rule("bad", &["nope"]).is_err());
        let plan = kb.plan_mut();
        plan.add_activity("A", Activity::new()).unwrap();
        plan.attach_rule("A", "r").unwrap();
        assert!(plan.attach_rule("A", "missing").is_err());
        assert!(plan.add_activity("A", Activity::new()).is_err());

        kb.process(Time::ZERO).unwrap();
        assert!(kb.activity("A").unwrap().is_started());
        assert_eq!(kb.take_changed().len(), 1);
        assert!(!kb.has_changes());
    }

    #[test]
    fn acknowledge_and_update_callbacks() {
        let bump = |key: &'static str| {
            move |_: &str, _: &Activity, facts: &mut Facts| {
                let n = facts.integer(key).unwrap_or(0);
                facts.set(key, n + 1);
            }
        };
        let mut kb = kb();
        kb.add_acknowledge_function("count", bump("acks"));
        kb.add_update_function("tick", bump("ticks"));
        kb.load_plan(
            r#"activities {
                   activity { id = "A"; ack = "count"; update = "tick";
                              temporal { start = 0; finish = 10; } }
               }"#,
        )
        .unwrap();

        kb.process(Time::ZERO).unwrap();
        kb.process(Time::new(1.0)).unwrap();
        assert_eq!(kb.facts().integer("acks"), Some(1));
        assert_eq!(kb.facts().integer("ticks"), Some(2));

        assert!(kb.set_activity_done("A", Time::new(2.0)).unwrap());
        kb.process(Time::new(2.0)).unwrap();
        assert_eq!(kb.facts().integer("acks"), Some(2));
        assert_eq!(kb.facts().integer("ticks"), Some(2));
        assert_eq!(kb.activities_in(crate::ActivityState::Done), ["A"]);
    }
}

#[cfg(test)]
mod recursion {
    use devs_core::{Time, Value};

    use crate::{ActivityState, DecisionError, KnowledgeBase, INTERNAL_PARAMS};

    const CAP: usize = 64;

    fn sequence(number: Option<i64>) -> KnowledgeBase {
        let number = number.map(|n| format!("number = {n};")).unwrap_or_default();
        let mut kb = KnowledgeBase::new();
        kb.load_plan(&format!(
            r#"activities {{
                sequence-activity {{
                    id-prefix = "S"; {number}
                    temporal-sequence {{ precedence {{ type = "FS"; mintimelag = 1; }} }}
                }}
            }}"#
        ))
        .unwrap();
        kb
    }

    /// Start and complete the newest activity at dates 1, 2, … `steps`.
    fn drive(kb: &mut KnowledgeBase, steps: usize) {
        for step in 1..=steps {
            let now = Time::new(step as f64);
            kb.process(now).unwrap();
            let running = kb.activities_in(ActivityState::Started);
            let running: Vec<String> = running.into_iter().map(str::to_owned).collect();
            for name in running {
                kb.set_activity_done(&name, now).unwrap();
            }
            assert!(kb.plan().activities().len() <= CAP);
        }
    }

    #[test]
    fn bounded_sequence_generates_exactly_number_activities() {
        let mut kb = sequence(Some(3));
        drive(&mut kb, 10);
        let names: Vec<&str> = kb.plan().activities().iter().map(|(_, n, _)| n).collect();
        assert_eq!(names, ["S_1", "S_2", "S_3"]);
        assert!(names.iter().all(|n| kb.activity_state(n) == Some(ActivityState::Done)));
        let done: Vec<f64> = names
            .iter()
            .map(|n| kb.activity(n).unwrap().done_date().value())
            .collect();
        assert_eq!(done, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn unbounded_sequence_keeps_generating() {
        let mut kb = sequence(None);
        drive(&mut kb, 12);
        let acts = kb.plan().activities();
        assert!(acts.len() >= 10);
        assert_eq!(acts.len(), 13);
        assert!(kb.activity("S_13").unwrap().is_wait());
        let counter = kb.activity("S_13").unwrap().params()[INTERNAL_PARAMS]
            .get("recNumber")
            .unwrap()
            .clone();
        assert_eq!(counter, Value::Integer(-1));
    }

    #[test]
    fn generated_activity_is_linked_to_its_predecessor() {
        let mut kb = sequence(Some(2));
        drive(&mut kb, 1);
        let acts = kb.plan().activities();
        let s2 = acts.id("S_2").unwrap();
        let edges: Vec<_> = acts.incoming(s2).collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(acts.name(edges[0].first), "S_1");
        assert_eq!(edges[0].mintimelag, Time::new(1.0));
        assert!(edges[0].maxtimelag.is_infinity());
    }

    #[test]
    fn bounded_sequence_completes_within_one_instant() {
        let mut kb = KnowledgeBase::new();
        kb.load_plan(r#"activities { sequence-activity { id-prefix = "S"; number = 3; } }"#)
            .unwrap();
        for _ in 0..5 {
            kb.process(Time::ZERO).unwrap();
            let running: Vec<String> = kb
                .activities_in(ActivityState::Started)
                .into_iter()
                .map(str::to_owned)
                .collect();
            for name in running {
                kb.set_activity_done(&name, Time::ZERO).unwrap();
            }
        }
        let names: Vec<&str> = kb.plan().activities().iter().map(|(_, n, _)| n).collect();
        assert_eq!(names, ["S_1", "S_2", "S_3"]);
        for name in names {
            let activity = kb.activity(name).unwrap();
            assert!(activity.is_done(), "{name}");
            assert_eq!(activity.done_date(), Time::ZERO);
        }
    }

    #[test]
    fn unbounded_failing_sequence_expands_once_per_date() {
        let mut kb = KnowledgeBase::new();
        kb.add_predicate("always", |_: &crate::Facts, _: Time| true);
        kb.load_plan(
            r#"rules { rule { id = "always"; predicates = "always"; } }
               activities { sequence-activity { id-prefix = "S"; rules-fail = "always"; } }"#,
        )
        .unwrap();
        kb.process(Time::ZERO).unwrap();
        assert_eq!(kb.plan().activities().len(), 2);
        assert!(kb.activity("S_2").unwrap().is_failed());

        for step in 1..=3 {
            kb.process(Time::new(step as f64)).unwrap();
            assert_eq!(kb.plan().activities().len(), step + 2);
        }
        assert!(kb.activity("S_5").unwrap().is_failed());
    }

    #[test]
    fn malformed_generated_name_is_an_internal_error() {
        let mut kb = KnowledgeBase::new();
        kb.load_plan(r#"activities { sequence-activity { id-prefix = "S"; number = 3; } }"#)
            .unwrap();
        // Re-register the generated activity under a name without an index.
        let seed = kb.activity("S_1").unwrap().clone();
        kb.plan_mut().add_activity("broken", seed).unwrap();

        kb.process(Time::ZERO).unwrap();
        let err = kb.set_activity_done("broken", Time::new(1.0)).unwrap_err();
        assert!(matches!(err, DecisionError::Internal(_)));
        assert!(err.is_internal());
    }
}

#[cfg(test)]
mod scenarios {
    use devs_core::{SimConfig, Time, Value};
    use devs_kernel::{
        AtomicModel, CoupledModel, Dynamics, EventList, ExternalEvent, SimBuilder, ViewKind,
    };

    use super::helpers::{FactSource, States};
    use crate::{Activity, Agent, Facts, KnowledgeBase};

    fn at(date: f64) -> impl Fn(&Facts, Time) -> bool {
        move |_: &Facts, t: Time| t == Time::new(date)
    }

    /// One activity `A` in `[0,10]`, started by `validateA`, failed by `failA`.
    fn failed_activity_agent(validate: f64, fail: f64) -> Agent {
        let mut kb = KnowledgeBase::new();
        kb.add_predicate("validateA", at(validate));
        kb.add_predicate("failA", at(fail));
        kb.add_fact("fact", |facts: &mut Facts, value: &Value| facts.set("fact", value.clone()));
        kb.load_plan(
            r#"rules {
                   rule { id = "validA"; predicates = "validateA"; }
                   rule { id = "failA"; predicates = "failA"; }
               }
               activities {
                   activity {
                       id = "A"; rules = "validA"; rules-fail = "failA";
                       temporal { start = 0; finish = 10; }
                   }
               }"#,
        )
        .unwrap();
        Agent::new(kb)
    }

    fn run(agent: Agent, ports: &[&str], duration: f64) -> States {
        let root = CoupledModel::new("top")
            .add(AtomicModel::from_dynamics("facts", FactSource { period: 1.0 }))
            .add(AtomicModel::from_dynamics("agent", agent))
            .connect("facts", "out", "agent", "fact")
            .connect("agent", "ack", "agent", "ack");
        let mut builder = SimBuilder::new(SimConfig::new(0.0, duration), root)
            .view("timed", ViewKind::Timed(Time::new(1.0)));
        for port in ports {
            builder = builder.observe("top:agent", *port, "timed");
        }
        let mut sim = builder.build().unwrap();
        let mut states = States::default();
        sim.run(&mut states).unwrap();
        states
    }

    fn expected(spans: &[(&str, usize)]) -> Vec<String> {
        spans
            .iter()
            .flat_map(|&(s, n)| std::iter::repeat_n(s.to_owned(), n))
            .collect()
    }

    #[test]
    fn started_then_failed_by_failure_rule() {
        let states = run(failed_activity_agent(1.0, 5.0), &["A"], 10.0);
        assert_eq!(states.states("A"), expected(&[("wait", 1), ("started", 4), ("failed", 6)]));
    }

    #[test]
    fn failure_rule_before_validation_fails_immediately() {
        let states = run(failed_activity_agent(5.0, 1.0), &["A"], 10.0);
        assert_eq!(states.states("A"), expected(&[("wait", 1), ("failed", 10)]));
    }

    #[test]
    fn simultaneous_validation_and_failure_fails() {
        let states = run(failed_activity_agent(1.0, 1.0), &["A"], 10.0);
        assert_eq!(states.states("A"), expected(&[("wait", 1), ("failed", 10)]));
    }

    /// Sequence of four activities, each started on an even date and
    /// completed immediately through its own acknowledgement.
    fn sequence_agent() -> Agent {
        let mut kb = KnowledgeBase::new();
        kb.add_predicate("even", |_: &Facts, t: Time| t.value() as i64 % 2 == 0);
        kb.add_fact("fact", |_: &mut Facts, _: &Value| {});
        kb.add_output_function("out", |name: &str, a: &Activity, out: &mut EventList| {
            if a.is_started() {
                out.push(ExternalEvent::new("ack").with("name", name).with("value", "done"));
            }
        });
        kb.load_plan(
            r#"rules { rule { id = "even"; predicates = "even"; } }
               activities {
                   sequence-activity {
                       id-prefix = "id"; number = 4; rules = "even"; output = "out";
                       temporal { start = 1; finish = 30; }
                       temporal-sequence {
                           precedence { type = "FS"; mintimelag = 1; }
                           precedence { type = "FF"; maxtimelag = 3; }
                       }
                   }
               }"#,
        )
        .unwrap();
        Agent::new(kb)
    }

    #[test]
    fn sequence_completes_on_even_dates() {
        let ports = ["id_1", "id_2", "id_3", "id_4", "id_5"];
        let states = run(sequence_agent(), &ports, 10.0);

        assert_eq!(states.states("id_1"), expected(&[("wait", 2), ("done", 9)]));
        assert_eq!(states.states("id_2"), expected(&[("-", 2), ("wait", 2), ("done", 7)]));
        assert_eq!(states.states("id_3"), expected(&[("-", 4), ("wait", 2), ("done", 5)]));
        assert_eq!(states.states("id_4"), expected(&[("-", 6), ("wait", 2), ("done", 3)]));
        assert_eq!(states.states("id_5"), expected(&[("-", 11)]));
    }

    /// Plan of the reference sequence: no start rules, completion through
    /// the `out` acknowledgement as soon as an activity starts.
    fn immediate_sequence_agent() -> Agent {
        let mut kb = KnowledgeBase::new();
        kb.add_predicate("odd", |_: &Facts, t: Time| t.value() as i64 % 2 == 0);
        kb.add_fact("fact", |_: &mut Facts, _: &Value| {});
        kb.add_output_function("out", |name: &str, a: &Activity, out: &mut EventList| {
            if a.is_started() {
                out.push(ExternalEvent::new("ack").with("name", name).with("value", "done"));
            }
        });
        kb.load_plan(
            r#"rules { rule { id = "odd"; predicates = "odd"; } }
               activities {
                   sequence-activity {
                       id-prefix = "id"; number = 4; output = "out";
                       temporal { start = 1; finish = 30; }
                       temporal-sequence {
                           precedence { type = "FS"; mintimelag = 1; }
                           precedence { type = "FF"; maxtimelag = 3; }
                       }
                   }
               }"#,
        )
        .unwrap();
        Agent::new(kb)
    }

    #[test]
    fn sequence_without_rules_completes_one_activity_per_date() {
        let ports = ["id_1", "id_2", "id_3", "id_4", "id_5"];
        let states = run(immediate_sequence_agent(), &ports, 10.0);

        assert_eq!(states.states("id_1"), expected(&[("wait", 1), ("done", 10)]));
        assert_eq!(states.states("id_2"), expected(&[("-", 1), ("wait", 1), ("done", 9)]));
        assert_eq!(states.states("id_3"), expected(&[("-", 2), ("wait", 1), ("done", 8)]));
        assert_eq!(states.states("id_4"), expected(&[("-", 3), ("wait", 1), ("done", 7)]));
        assert_eq!(states.states("id_5"), expected(&[("-", 11)]));
    }

    /// Sends one `done` acknowledgement for `activity` at `date`.
    struct AckAt {
        activity: &'static str,
        date:     f64,
        sent:     bool,
    }

    impl Dynamics for AckAt {
        fn init(&mut self, time: Time) -> devs_kernel::ModelResult<Time> {
            Ok(Time::new(self.date) - time)
        }

        fn time_advance(&self) -> Time {
            if self.sent { Time::INFINITY } else { Time::new(self.date) }
        }

        fn output(&self, _time: Time, output: &mut EventList) {
            output.push(ExternalEvent::new("out").with("name", self.activity).with("value", "done"));
        }

        fn internal_transition(&mut self, _time: Time) -> devs_kernel::ModelResult<()> {
            self.sent = true;
            Ok(())
        }
    }

    #[test]
    fn acknowledged_before_finish_to_finish_predecessor_fails() {
        let mut kb = KnowledgeBase::new();
        kb.add_predicate("validateA", at(1.0));
        kb.add_predicate("failA", at(6.0));
        kb.add_predicate("validateB", at(1.0));
        kb.add_fact("fact", |_: &mut Facts, _: &Value| {});
        kb.load_plan(
            r#"rules {
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
               precedences { precedence { type = "FF"; first = "A"; second = "B"; } }"#,
        )
        .unwrap();

        let root = CoupledModel::new("top")
            .add(AtomicModel::from_dynamics("facts", FactSource { period: 1.0 }))
            .add(AtomicModel::from_dynamics("agent", Agent::new(kb)))
            .add(AtomicModel::from_dynamics("ack", AckAt { activity: "B", date: 5.0, sent: false }))
            .connect("facts", "out", "agent", "fact")
            .connect("ack", "out", "agent", "ack");
        let mut sim = SimBuilder::new(SimConfig::new(0.0, 10.0), root)
            .view("timed", ViewKind::Timed(Time::new(1.0)))
            .observe("top:agent", "A", "timed")
            .observe("top:agent", "B", "timed")
            .build()
            .unwrap();
        let mut states = States::default();
        sim.run(&mut states).unwrap();

        assert_eq!(states.states("A"), expected(&[("wait", 1), ("started", 5), ("failed", 5)]));
        assert_eq!(states.states("B"), expected(&[("wait", 1), ("started", 4), ("failed", 6)]));
    }

    #[test]
    fn invalid_acknowledgement_is_a_model_error() {
        let mut agent = sequence_agent();
        agent.init(Time::ZERO).unwrap();
        let bad = ExternalEvent::new("ack").with("name", "id_1").with("value", "maybe");
        let err = agent.external_transition(&[bad], Time::new(2.0)).unwrap_err();
        assert!(err.to_string().contains("invalid acknowledgement"));

        let unnamed = ExternalEvent::new("ack").with("value", "done");
        assert!(agent.external_transition(&[unnamed], Time::new(2.0)).is_err());

        let numbered = ExternalEvent::new("ack").with("name", 1.0).with("value", "done");
        let err = agent.external_transition(&[numbered], Time::new(2.0)).unwrap_err();
        assert!(err.to_string().contains("invalid acknowledgement"), "{err}");
    }

    #[test]
    fn unknown_fact_port_is_a_model_error() {
        let mut agent = sequence_agent();
        agent.init(Time::ZERO).unwrap();
        let event = ExternalEvent::new("weather").with("value", 1.0);
        assert!(agent.external_transition(&[event], Time::ZERO).is_err());
    }

    #[test]
    fn agent_sleeps_until_next_window_bound() {
        let mut agent = sequence_agent();
        assert_eq!(agent.init(Time::ZERO).unwrap(), Time::new(1.0));
        assert_eq!(agent.observation("id_1", Time::ZERO), Some(Value::from("wait")));
        assert_eq!(agent.observation("id_2", Time::ZERO), None);
    }
}
