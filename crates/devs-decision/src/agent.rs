//! `Agent` — a decision knowledge base wrapped as an atomic model.
//!
//! # Ports
//!
//! | Port     | Direction | Meaning                                                    |
//! |----------|-----------|------------------------------------------------------------|
//! | `ack`    | in        | `name` = activity, `value` = `"done"` or `"fail"`          |
//! | other    | in        | fact update: the fact handler named after the port runs on the `value` attribute |
//! | any      | out       | whatever the activities' output functions emit             |
//!
//! Observing port `P` returns the state of activity `P` as a string, or
//! nothing when no such activity exists (yet).
//!
//! After any evaluation that changed an activity the agent schedules itself
//! immediately, so the output functions of the changed activities run at
//! the same date.  Otherwise it sleeps until the plan's next date.

use tracing::debug;

use devs_core::{ActivityId, Time, Value};
use devs_kernel::{Dynamics, EventList, ExternalEvent, ModelResult};

use crate::{DecisionError, KnowledgeBase};

pub const ACK_PORT: &str = "ack";

pub struct Agent {
    kb:      KnowledgeBase,
    /// Date of the last transition.
    current: Time,
    /// Changed activities whose output functions have not run yet.
    pending: Vec<ActivityId>,
}

impl Agent {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self { kb, current: Time::ZERO, pending: Vec::new() }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn knowledge_mut(&mut self) -> &mut KnowledgeBase {
        &mut self.kb
    }

    fn evaluate(&mut self, time: Time) -> ModelResult<()> {
        self.current = time;
        self.kb.process(time)?;
        for id in self.kb.take_changed() {
            if !self.pending.contains(&id) {
                self.pending.push(id);
            }
        }
        Ok(())
    }

    fn acknowledge(&mut self, event: &ExternalEvent, time: Time) -> ModelResult<()> {
        let name = event
            .attribute("name")
            .ok_or_else(|| DecisionError::InvalidAck("missing activity name".to_owned()))?;
        let name = name
            .as_str()
            .ok_or_else(|| DecisionError::InvalidAck(format!("activity name {name:?} is not a string")))?
            .to_owned();
        let value = event.attribute("value").and_then(Value::as_str);
        debug!(activity = %name, value, %time, "acknowledgement");
        match value {
            Some("done") => self.kb.set_activity_done(&name, time)?,
            Some("fail") => self.kb.set_activity_failed(&name, time)?,
            other => {
                let msg = format!("activity {name:?}: expected \"done\" or \"fail\", got {other:?}");
                return Err(DecisionError::InvalidAck(msg).into());
            }
        };
        Ok(())
    }
}

impl Dynamics for Agent {
    fn init(&mut self, time: Time) -> ModelResult<Time> {
        self.evaluate(time)?;
        Ok(self.time_advance())
    }

    fn time_advance(&self) -> Time {
        if !self.pending.is_empty() {
            return Time::ZERO;
        }
        let next = self.kb.next_date(self.current);
        if next.is_infinity() { Time::INFINITY } else { next - self.current }
    }

    fn output(&self, _time: Time, output: &mut EventList) {
        let activities = self.kb.plan().activities();
        for &id in &self.pending {
            activities.by_id(id).output(activities.name(id), output);
        }
    }

    fn internal_transition(&mut self, time: Time) -> ModelResult<()> {
        self.pending.clear();
        self.evaluate(time)
    }

    fn external_transition(&mut self, events: &[ExternalEvent], time: Time) -> ModelResult<()> {
        for event in events {
            if event.on_port(ACK_PORT) {
                self.acknowledge(event, time)?;
            } else {
                let value = event.attribute("value").cloned().unwrap_or(Value::Null);
                self.kb.apply_fact(event.port(), &value)?;
            }
        }
        self.evaluate(time)
    }

    fn observation(&self, port: &str, _time: Time) -> Option<Value> {
        self.kb
            .activity_state(port)
            .map(|state| Value::String(state.as_str().to_owned()))
    }
}
