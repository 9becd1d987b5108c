//! Simulation Contract
//! ===================
//!
//! A simulation is a value implementing [`Simulation`]: it declares its
//! controls, produces an initial state, advances that state, and paints it.
//!
//! ```text
//! Constructed ──controls()──► Ready ──init()──► Running ◄──► Suspended
//!                                                 │
//!                                                 └── error ──► Failed ──retry──► Running
//! ```
//!
//! State is owned by the runtime and moved through `update`: the simulation
//! receives the previous state by value and returns the next one, so `render`
//! only ever sees a state produced by one complete `update` call.

use crate::controls::{ControlRegistry, ControlValues};
use crate::draw::DrawingEngine;
use crate::error::SimError;
use explorable_env::InstanceId;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

/// Title and description shown alongside a mounted simulation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimulationInfo {
    pub title: String,
    pub description: String,
}

impl SimulationInfo {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Inputs to one update tick.
#[derive(Debug, Clone, Copy)]
pub struct UpdateContext<'a> {
    /// Simulation time (seconds) of the incoming state
    pub t: f64,
    /// Wall-clock seconds since the previous update tick
    pub dt: f64,
    /// Live control values
    pub controls: &'a ControlValues,
}

/// Inputs to one render tick.
#[derive(Debug)]
pub struct RenderContext<'a, St> {
    /// Simulation time (seconds) of `state`
    pub t: f64,
    pub controls: &'a ControlValues,
    /// Latest state, read-only
    pub state: &'a St,
}

/// A user-authored simulation.
pub trait Simulation: 'static {
    /// Opaque per-simulation state, unknown to the runtime.
    type State;

    fn info(&self) -> SimulationInfo;

    /// Registers controls. Called once, before `init`.
    fn controls(&mut self, registry: &mut ControlRegistry);

    /// Produces the initial state. Called once per mount.
    fn init(&mut self) -> Self::State;

    /// Consumes the current state and returns the next one.
    fn update(&mut self, ctx: &UpdateContext<'_>, state: Self::State)
        -> Result<Self::State, SimError>;

    /// Paints the current state.
    fn render(
        &self,
        ctx: &RenderContext<'_, Self::State>,
        engine: &mut DrawingEngine<'_>,
    ) -> Result<(), SimError>;
}

/// Lifecycle of one simulation instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Ready,
    Running,
    Suspended,
    Failed,
}

/// One simulation together with its controls and its current state.
pub struct SimulationInstance<S: Simulation> {
    id: InstanceId,
    sim: S,
    registry: ControlRegistry,
    state: Option<S::State>,
    lifecycle: Lifecycle,
    /// Accumulated simulation time
    t: f64,
    updates: u64,
    renders: u64,
}

impl<S: Simulation> SimulationInstance<S> {
    /// Wraps a simulation and registers its controls.
    pub fn new(sim: S) -> Self {
        Self::with_id(InstanceId::new(), sim)
    }

    pub fn with_id(id: InstanceId, mut sim: S) -> Self {
        let mut registry = ControlRegistry::new();
        sim.controls(&mut registry);
        debug!(instance = %id, controls = registry.len(), "Simulation constructed");
        Self {
            id,
            sim,
            registry,
            state: None,
            lifecycle: Lifecycle::Ready,
            t: 0.0,
            updates: 0,
            renders: 0,
        }
    }

    /// Starts (or restarts) from a fresh initial state.
    ///
    /// Live control values are kept.
    pub fn init(&mut self) {
        self.state = Some(self.sim.init());
        self.t = 0.0;
        self.updates = 0;
        self.renders = 0;
        self.lifecycle = Lifecycle::Running;
        debug!(instance = %self.id, "Simulation initialized");
    }

    /// Advances the state by `dt` seconds.
    ///
    /// On failure the state is dropped and the instance is marked failed.
    pub fn update(&mut self, dt: f64) -> Result<(), SimError> {
        self.ensure_running("update")?;
        let state = self
            .state
            .take()
            .ok_or_else(|| SimError::lifecycle("update without state"))?;

        let ctx = UpdateContext {
            t: self.t,
            dt,
            controls: self.registry.values(),
        };
        let sim = &mut self.sim;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| sim.update(&ctx, state)))
            .unwrap_or_else(|payload| Err(panicked("update", payload)));
        match outcome {
            Ok(next) => {
                self.state = Some(next);
                self.t += dt;
                self.updates += 1;
                Ok(())
            }
            Err(e) => {
                self.lifecycle = Lifecycle::Failed;
                Err(e)
            }
        }
    }

    /// Paints the latest state.
    pub fn render(&mut self, engine: &mut DrawingEngine<'_>) -> Result<(), SimError> {
        self.ensure_running("render")?;
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| SimError::lifecycle("render without state"))?;

        let ctx = RenderContext {
            t: self.t,
            controls: self.registry.values(),
            state,
        };
        let sim = &self.sim;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| sim.render(&ctx, engine)))
            .unwrap_or_else(|payload| Err(panicked("render", payload)));
        match outcome {
            Ok(()) => {
                self.renders += 1;
                Ok(())
            }
            Err(e) => {
                self.lifecycle = Lifecycle::Failed;
                Err(e)
            }
        }
    }

    /// Running -> Suspended. No-op in any other state.
    pub fn suspend(&mut self) {
        if self.lifecycle == Lifecycle::Running {
            self.lifecycle = Lifecycle::Suspended;
        }
    }

    /// Suspended -> Running. No-op in any other state.
    pub fn resume(&mut self) {
        if self.lifecycle == Lifecycle::Suspended {
            self.lifecycle = Lifecycle::Running;
        }
    }

    /// Marks the instance failed and drops its state.
    pub fn fail(&mut self) {
        self.state = None;
        self.lifecycle = Lifecycle::Failed;
    }

    fn ensure_running(&self, call: &str) -> Result<(), SimError> {
        match self.lifecycle {
            Lifecycle::Running => Ok(()),
            other => Err(SimError::lifecycle(format!("{call} while {other:?}"))),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn info(&self) -> SimulationInfo {
        self.sim.info()
    }

    pub fn simulation(&self) -> &S {
        &self.sim
    }

    pub fn controls(&self) -> &ControlRegistry {
        &self.registry
    }

    pub fn state(&self) -> Option<&S::State> {
        self.state.as_ref()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn update_count(&self) -> u64 {
        self.updates
    }

    pub fn render_count(&self) -> u64 {
        self.renders
    }
}

/// Turns a panic payload from simulation code into a logic error.
///
/// The instance is marked failed and its state dropped, so nothing observes
/// the half-updated value after unwinding.
fn panicked(phase: &str, payload: Box<dyn Any + Send>) -> SimError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    SimError::logic(format!("{phase} panicked: {message}"))
}
