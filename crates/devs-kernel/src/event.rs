//! External events — what one model's output port sends to another's input.

use std::collections::BTreeMap;

use devs_core::Value;

/// An event emitted on an output port, or received on an input port.
///
/// Attributes are free-form; the kernel never inspects them.  When the
/// coordinator routes an event it rewrites only the port name, so the
/// receiver sees the port it was coupled on.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalEvent {
    port:       String,
    attributes: BTreeMap<String, Value>,
}

impl ExternalEvent {
    pub fn new(port: impl Into<String>) -> Self {
        Self { port: port.into(), attributes: BTreeMap::new() }
    }

    /// Builder-style attribute insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn put_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    #[inline]
    pub fn on_port(&self, port: &str) -> bool {
        self.port == port
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Copy of `self` delivered on `port`.
    pub(crate) fn retargeted(&self, port: &str) -> ExternalEvent {
        ExternalEvent { port: port.to_owned(), attributes: self.attributes.clone() }
    }
}

/// Events produced by one `Dynamics::output` call.
pub type EventList = Vec<ExternalEvent>;
