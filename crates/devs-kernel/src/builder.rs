//! Fluent builder for constructing a [`RootCoordinator`].

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use devs_core::{ModelId, SimConfig, Time};

use crate::graph::flatten;
use crate::observer::View;
use crate::{CoupledModel, RootCoordinator, SimError, SimResult, ViewKind};

/// Fluent builder for [`RootCoordinator`].
///
/// # Required inputs
///
/// - [`SimConfig`] — begin date, duration, seed
/// - the root [`CoupledModel`] of the hierarchy
///
/// # Optional inputs
///
/// | Method              | Default                    |
/// |---------------------|----------------------------|
/// | `.view(name, kind)` | No views                   |
/// | `.observe(..)`      | Nothing observed           |
/// | `.stop_flag(flag)`  | The run cannot be stopped  |
///
/// # Example
///
/// ```rust,ignore
/// let root = CoupledModel::new("top")
///     .add(AtomicModel::from_dynamics("gen", Generator::new(1.0)))
///     .add(AtomicModel::from_dynamics("sink", Passive))
///     .connect("gen", "out", "sink", "in");
/// let mut sim = SimBuilder::new(SimConfig::new(0.0, 10.0), root)
///     .view("states", ViewKind::Timed(Time::new(1.0)))
///     .observe("top:gen", "count", "states")
///     .build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder {
    config:      SimConfig,
    root:        CoupledModel,
    views:       Vec<(String, ViewKind)>,
    observables: Vec<(String, String, String)>,
    stop:        Option<Arc<AtomicBool>>,
}

impl SimBuilder {
    pub fn new(config: SimConfig, root: CoupledModel) -> Self {
        Self {
            config,
            root,
            views:       Vec::new(),
            observables: Vec::new(),
            stop:        None,
        }
    }

    /// Declare a view.  Timed views need a strictly positive, finite step.
    pub fn view(mut self, name: impl Into<String>, kind: ViewKind) -> Self {
        self.views.push((name.into(), kind));
        self
    }

    /// Attach `port` of the atomic model at `model_path` to `view`.
    pub fn observe(
        mut self,
        model_path: impl Into<String>,
        port:       impl Into<String>,
        view:       impl Into<String>,
    ) -> Self {
        self.observables.push((model_path.into(), port.into(), view.into()));
        self
    }

    /// Flag checked between cycles; raising it stops the run early.
    pub fn stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    /// Validate the configuration, flatten the hierarchy and instantiate
    /// every atomic model.
    pub fn build(self) -> SimResult<RootCoordinator> {
        let SimBuilder { config, root, views, observables, stop } = self;

        if !config.begin.is_finite() {
            return Err(SimError::Config(format!("begin date must be finite, got {}", config.begin)));
        }
        if config.duration < Time::ZERO {
            return Err(SimError::Config(format!("duration must be non-negative, got {}", config.duration)));
        }

        let mut built: Vec<View> = Vec::with_capacity(views.len());
        for (name, kind) in views {
            let bad_step = match kind {
                ViewKind::Timed(step) => !(step.is_finite() && step > Time::ZERO),
                _ => false,
            };
            if bad_step {
                return Err(SimError::Config(format!("view {name:?} has invalid time step")));
            }
            if built.iter().any(|v| v.name == name) {
                return Err(SimError::Config(format!("duplicate view {name:?}")));
            }
            built.push(View { name, kind, next_sample: config.begin, observables: Vec::new() });
        }

        let graph = flatten(&config, root)?;

        for (path, port, view) in observables {
            let id = graph
                .models
                .iter()
                .position(|m| m.name == path)
                .map(ModelId::from_index)
                .ok_or_else(|| SimError::UnknownObservable(path.clone()))?;
            let target = built
                .iter_mut()
                .find(|v| v.name == view)
                .ok_or(SimError::UnknownView(view))?;
            target.observables.push((id, port));
        }

        Ok(RootCoordinator::new(config, graph.models, graph.routes, built, stop))
    }
}
