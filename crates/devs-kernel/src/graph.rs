//! Model hierarchy description and its flattening into routing tables.
//!
//! A simulation is described as a tree of [`ModelNode`]s.  Atomic leaves
//! carry a factory for their [`Dynamics`]; coupled nodes carry children and
//! connections.  Before the run starts the tree is flattened once:
//!
//! - atomic models get `ModelId`s in depth-first declaration order,
//! - their full names are the `:`-joined path from the root,
//! - every `(atomic, output port)` pair gets the list of
//!   `(atomic, input port)` destinations reached through any chain of
//!   internal, input and output couplings.
//!
//! Routing during the run is then a single hash lookup per event.

use rustc_hash::FxHashMap;
use tracing::debug;

use devs_core::{ModelId, ModelRng, SimConfig};

use crate::{Dynamics, DynamicsInit, SimError, SimResult};

/// Deepest chain of boundary hops resolved before giving up.
const MAX_COUPLING_DEPTH: usize = 256;

type DynamicsFactory = Box<dyn FnOnce(DynamicsInit) -> Box<dyn Dynamics>>;

// ── Description types ─────────────────────────────────────────────────────────

pub enum ModelNode {
    Atomic(AtomicModel),
    Coupled(CoupledModel),
}

impl ModelNode {
    pub fn name(&self) -> &str {
        match self {
            ModelNode::Atomic(a) => &a.name,
            ModelNode::Coupled(c) => &c.name,
        }
    }
}

impl From<AtomicModel> for ModelNode {
    fn from(a: AtomicModel) -> Self {
        ModelNode::Atomic(a)
    }
}

impl From<CoupledModel> for ModelNode {
    fn from(c: CoupledModel) -> Self {
        ModelNode::Coupled(c)
    }
}

/// A leaf of the hierarchy.  Its dynamics are built lazily so they can
/// receive their id, full name and RNG.
pub struct AtomicModel {
    name:    String,
    factory: DynamicsFactory,
}

impl AtomicModel {
    pub fn new<D, F>(name: impl Into<String>, factory: F) -> Self
    where
        D: Dynamics,
        F: FnOnce(DynamicsInit) -> D + 'static,
    {
        Self {
            name:    name.into(),
            factory: Box::new(move |init| Box::new(factory(init)) as Box<dyn Dynamics>),
        }
    }

    /// Atomic model with ready-made dynamics.
    pub fn from_dynamics<D: Dynamics>(name: impl Into<String>, dynamics: D) -> Self {
        Self::new(name, move |_| dynamics)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One end of a connection.  `model: None` is the boundary of the coupled
/// model that declares the connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub model: Option<String>,
    pub port:  String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub from: Endpoint,
    pub to:   Endpoint,
}

pub struct CoupledModel {
    name:        String,
    children:    Vec<ModelNode>,
    connections: Vec<Connection>,
}

impl CoupledModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), children: Vec::new(), connections: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a child.  Children keep declaration order.
    pub fn add(mut self, child: impl Into<ModelNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Internal coupling: `from.from_port → to.to_port`.  `from` and `to`
    /// may be the same child.
    pub fn connect(
        mut self,
        from:      &str,
        from_port: &str,
        to:        &str,
        to_port:   &str,
    ) -> Self {
        self.connections.push(Connection {
            from: Endpoint { model: Some(from.to_owned()), port: from_port.to_owned() },
            to:   Endpoint { model: Some(to.to_owned()), port: to_port.to_owned() },
        });
        self
    }

    /// Input coupling: this model's input `port → to.to_port`.
    pub fn input(mut self, port: &str, to: &str, to_port: &str) -> Self {
        self.connections.push(Connection {
            from: Endpoint { model: None, port: port.to_owned() },
            to:   Endpoint { model: Some(to.to_owned()), port: to_port.to_owned() },
        });
        self
    }

    /// Output coupling: `from.from_port →` this model's output `port`.
    pub fn output(mut self, from: &str, from_port: &str, port: &str) -> Self {
        self.connections.push(Connection {
            from: Endpoint { model: Some(from.to_owned()), port: from_port.to_owned() },
            to:   Endpoint { model: None, port: port.to_owned() },
        });
        self
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }
}

// ── Flattened form ────────────────────────────────────────────────────────────

pub(crate) struct FlatModel {
    pub name:     String,
    pub dynamics: Box<dyn Dynamics>,
}

/// Destinations of one output port.
pub(crate) type Routes = FxHashMap<String, Vec<(ModelId, String)>>;

pub(crate) struct FlatGraph {
    pub models: Vec<FlatModel>,
    /// Indexed by source `ModelId`.
    pub routes: Vec<Routes>,
}

#[derive(Clone, Copy)]
enum NodeRef {
    Atomic(ModelId),
    Coupled(usize),
}

struct CoupledInfo {
    name:        String,
    path:        String,
    parent:      Option<usize>,
    children:    FxHashMap<String, NodeRef>,
    connections: Vec<Connection>,
}

struct Flattener {
    seed:    u64,
    models:  Vec<FlatModel>,
    coupled: Vec<CoupledInfo>,
}

/// Flatten `root` into dynamics indexed by `ModelId` and a route table.
pub(crate) fn flatten(config: &SimConfig, root: CoupledModel) -> SimResult<FlatGraph> {
    let mut f = Flattener {
        seed:    config.seed,
        models:  Vec::new(),
        coupled: Vec::new(),
    };
    let root_path = root.name.clone();
    f.visit_coupled(root, root_path, None)?;

    let mut routes: Vec<Routes> = (0..f.models.len()).map(|_| Routes::default()).collect();
    for c in 0..f.coupled.len() {
        f.check_connections(c)?;
        for conn in &f.coupled[c].connections {
            let Some(from) = &conn.from.model else { continue };
            let NodeRef::Atomic(source) = f.coupled[c].children[from] else { continue };
            let mut targets = Vec::new();
            f.resolve(c, &conn.to, 0, &mut targets)?;
            routes[source.index()]
                .entry(conn.from.port.clone())
                .or_default()
                .extend(targets);
        }
    }

    debug!(models = f.models.len(), coupled = f.coupled.len(), "model hierarchy flattened");
    Ok(FlatGraph { models: f.models, routes })
}

impl Flattener {
    fn visit_coupled(
        &mut self,
        model:  CoupledModel,
        path:   String,
        parent: Option<usize>,
    ) -> SimResult<usize> {
        let index = self.coupled.len();
        self.coupled.push(CoupledInfo {
            name: model.name,
            path: path.clone(),
            parent,
            children: FxHashMap::default(),
            connections: model.connections,
        });

        for child in model.children {
            let name = child.name().to_owned();
            if self.coupled[index].children.contains_key(&name) {
                return Err(SimError::DuplicateModel { coupled: path, name });
            }
            let child_path = format!("{path}:{name}");
            let node = match child {
                ModelNode::Atomic(atomic) => {
                    let id = ModelId::from_index(self.models.len());
                    let init = DynamicsInit {
                        id,
                        name: child_path.clone(),
                        rng:  ModelRng::new(self.seed, id),
                    };
                    let dynamics = (atomic.factory)(init);
                    self.models.push(FlatModel { name: child_path, dynamics });
                    NodeRef::Atomic(id)
                }
                ModelNode::Coupled(coupled) => {
                    NodeRef::Coupled(self.visit_coupled(coupled, child_path, Some(index))?)
                }
            };
            self.coupled[index].children.insert(name, node);
        }
        Ok(index)
    }

    fn check_connections(&self, c: usize) -> SimResult<()> {
        let info = &self.coupled[c];
        for conn in &info.connections {
            for model in [&conn.from.model, &conn.to.model].into_iter().flatten() {
                if !info.children.contains_key(model) {
                    return Err(SimError::UnknownModel {
                        coupled: info.path.clone(),
                        model:   model.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Collect the atomic input ports reached from `endpoint`, seen from
    /// inside coupled model `c`.
    fn resolve(
        &self,
        c:        usize,
        endpoint: &Endpoint,
        depth:    usize,
        out:      &mut Vec<(ModelId, String)>,
    ) -> SimResult<()> {
        if depth > MAX_COUPLING_DEPTH {
            return Err(SimError::CouplingLoop(self.coupled[c].path.clone()));
        }
        let info = &self.coupled[c];
        match &endpoint.model {
            Some(child) => match info.children[child] {
                NodeRef::Atomic(id) => out.push((id, endpoint.port.clone())),
                NodeRef::Coupled(k) => {
                    // Down through the child's input couplings.
                    for conn in &self.coupled[k].connections {
                        if conn.from.model.is_none() && conn.from.port == endpoint.port {
                            self.resolve(k, &conn.to, depth + 1, out)?;
                        }
                    }
                }
            },
            None => {
                // Up through the parent's couplings leaving this model.
                let Some(p) = info.parent else { return Ok(()) };
                for conn in &self.coupled[p].connections {
                    if conn.from.model.as_deref() == Some(info.name.as_str())
                        && conn.from.port == endpoint.port
                    {
                        self.resolve(p, &conn.to, depth + 1, out)?;
                    }
                }
            }
        }
        Ok(())
    }
}
