//! Scheduler/Host
//! ==============
//!
//! Mounts one [`SimulationInstance`] on one surface and runs it from
//! animation frames.
//!
//! # Frame chain
//!
//! ```text
//! visible(true) ─► reset clocks ─► request_frame ─► on_frame ─┬─ update? ─► render? ─► request_frame ...
//!                                                             └─ error ─► boundary tripped, chain ends
//! visible(false) ─► cancel_frame (no background ticking)
//! ```
//!
//! The chain is only armed while the container is visible. Visibility
//! entries arrive through an inbox filled by the [`VisibilityObserver`] and
//! are applied by [`SimulationHost::dispatch_events`] before frames run.

use crate::boundary::{ErrorBoundary, FailurePhase, FallbackPanel};
use crate::controls::{ControlRegistry, ControlView};
use crate::draw::{DrawingEngine, RasterSurface, RecordingSurface, SurfaceContext};
use crate::error::SimError;
use crate::scheduler::{DualClock, SchedulerConfig};
use crate::simulation::{Lifecycle, Simulation, SimulationInstance};
use crate::visibility::VisibilityObserver;
use explorable_env::{EnvError, FrameHandle, HostContext, InstanceId, IntersectionSource};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, error, info, trace};

/// The container a simulation is mounted into.
pub trait MountTarget {
    type Surface: RasterSurface + 'static;

    /// Rendered size in CSS pixels.
    fn css_size(&self) -> (f64, f64);

    /// Acquires the raster surface, if the container can provide one.
    fn raster_surface(&mut self) -> Option<Self::Surface>;
}

/// Off-screen container backed by a [`RecordingSurface`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessContainer {
    pub css_width: f64,
    pub css_height: f64,
    /// Whether a raster surface can be acquired
    pub has_surface: bool,
}

impl HeadlessContainer {
    pub fn new(css_width: f64, css_height: f64) -> Self {
        Self {
            css_width,
            css_height,
            has_surface: true,
        }
    }

    /// A container whose surface cannot be acquired.
    pub fn without_surface(css_width: f64, css_height: f64) -> Self {
        Self {
            has_surface: false,
            ..Self::new(css_width, css_height)
        }
    }
}

impl MountTarget for HeadlessContainer {
    type Surface = RecordingSurface;

    fn css_size(&self) -> (f64, f64) {
        (self.css_width, self.css_height)
    }

    fn raster_surface(&mut self) -> Option<RecordingSurface> {
        self.has_surface.then(|| RecordingSurface::new(0, 0))
    }
}

/// Mount-time options supplied by the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountOptions {
    /// Overrides the simulation's own title
    pub title: Option<String>,
    /// Overrides the simulation's own description
    pub description: Option<String>,
    pub scheduler: SchedulerConfig,
    /// Fixed instance id (random if unset)
    pub instance_id: Option<InstanceId>,
}

/// Result of handling one animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Not this host's outstanding request
    Stale,
    /// Hidden or halted; nothing ran and the chain is not re-armed
    Idle,
    Ticked { updated: bool, rendered: bool },
    /// Update or render failed; the chain is halted
    Failed,
}

/// Serializable snapshot of a mounted simulation: surface, controls, description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountedView {
    pub instance: InstanceId,
    pub title: String,
    pub description: String,
    pub lifecycle: Lifecycle,
    pub visible: bool,
    pub css_width: f64,
    pub css_height: f64,
    pub surface: SurfaceContext,
    pub controls: Vec<ControlView>,
    /// Present while the error boundary is tripped
    pub fallback: Option<FallbackPanel>,
    pub sim_time: f64,
    pub updates: u64,
    pub renders: u64,
}

impl MountedView {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One mounted simulation with its surface, clocks and error boundary.
pub struct SimulationHost<S: Simulation, T: MountTarget, H: HostContext> {
    host: Rc<H>,
    target: T,
    surface: T::Surface,
    surface_context: SurfaceContext,
    instance: SimulationInstance<S>,
    title: String,
    description: String,
    clock: DualClock,
    boundary: ErrorBoundary,
    visible: bool,
    observer: Option<VisibilityObserver>,
    inbox: Rc<RefCell<VecDeque<bool>>>,
}

impl<S: Simulation, T: MountTarget, H: HostContext> SimulationHost<S, T, H> {
    /// Mounts `sim` into `target`.
    ///
    /// Sizes the surface to `css × device_pixel_ratio` and runs `init()`.
    /// The frame chain stays unarmed until the container becomes visible.
    pub fn mount(
        host: Rc<H>,
        mut target: T,
        sim: S,
        options: MountOptions,
    ) -> Result<Self, SimError> {
        let id = options.instance_id.unwrap_or_default();
        let Some(surface) = target.raster_surface() else {
            error!(instance = %id, "No raster surface available at mount");
            return Err(EnvError::surface_unavailable("container has no raster surface").into());
        };

        let mut instance = SimulationInstance::with_id(id, sim);
        instance.init();
        // Hidden until the first visibility entry
        instance.suspend();

        let info = instance.info();
        let mut mounted = Self {
            host,
            target,
            surface,
            surface_context: SurfaceContext::new(0, 0, 1.0),
            title: options.title.unwrap_or(info.title),
            description: options.description.unwrap_or(info.description),
            clock: DualClock::new(&options.scheduler),
            boundary: ErrorBoundary::new(),
            visible: false,
            observer: None,
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            instance,
        };
        mounted.size_surface();

        info!(
            instance = %id,
            title = %mounted.title,
            width = mounted.surface_context.pixel_width,
            height = mounted.surface_context.pixel_height,
            dpr = mounted.surface_context.device_pixel_ratio,
            "Simulation mounted"
        );
        Ok(mounted)
    }

    fn size_surface(&mut self) {
        let (css_width, css_height) = self.target.css_size();
        self.surface_context =
            SurfaceContext::for_container(css_width, css_height, self.host.device_pixel_ratio());
        self.surface
            .resize(self.surface_context.pixel_width, self.surface_context.pixel_height);
    }

    /// Subscribes to the container's visibility. Replaces any earlier subscription.
    pub fn attach_visibility(&mut self, source: &dyn IntersectionSource) {
        let inbox = Rc::clone(&self.inbox);
        self.observer = Some(VisibilityObserver::attach(source, move |visible| {
            inbox.borrow_mut().push_back(visible);
        }));
    }

    pub fn detach_visibility(&mut self) {
        self.observer = None;
    }

    /// Applies queued visibility transitions in arrival order.
    pub fn dispatch_events(&mut self) {
        let pending: Vec<bool> = self.inbox.borrow_mut().drain(..).collect();
        for visible in pending {
            self.set_visible(visible);
        }
    }

    /// Starts or stops the frame chain.
    pub fn set_visible(&mut self, visible: bool) {
        if visible == self.visible {
            return;
        }
        self.visible = visible;
        debug!(instance = %self.instance.id(), visible, "Visibility changed");

        if visible {
            self.instance.resume();
            self.start_loop();
        } else {
            self.stop_loop();
            self.instance.suspend();
        }
    }

    fn start_loop(&mut self) {
        if self.boundary.is_tripped() || self.clock.is_armed() {
            return;
        }
        self.clock.reset(self.host.now());
        self.arm();
    }

    fn stop_loop(&mut self) {
        if let Some(handle) = self.clock.disarm() {
            self.host.cancel_frame(handle);
            debug!(instance = %self.instance.id(), %handle, "Frame request cancelled");
        }
    }

    fn arm(&mut self) {
        let handle = self.host.request_frame();
        self.clock.arm(handle);
    }

    /// Handles one due animation frame.
    pub fn on_frame(&mut self, handle: FrameHandle) -> FrameOutcome {
        if self.clock.state().animation_handle != Some(handle) {
            return FrameOutcome::Stale;
        }
        self.clock.disarm();
        if self.boundary.is_tripped() || !self.visible {
            return FrameOutcome::Idle;
        }

        let decision = self.clock.poll(self.host.now());
        trace!(
            instance = %self.instance.id(),
            gap = ?decision.frame_gap,
            update_dt = ?decision.update_dt,
            render = decision.render,
            "Frame"
        );

        let updated = match decision.update_dt {
            Some(dt) => match self.instance.update(dt) {
                Ok(()) => true,
                Err(e) => {
                    self.halt(FailurePhase::Update, &e);
                    return FrameOutcome::Failed;
                }
            },
            None => false,
        };

        if decision.render {
            let rendered = {
                let mut engine = DrawingEngine::new(&mut self.surface, self.surface_context);
                self.instance.render(&mut engine)
            };
            if let Err(e) = rendered {
                self.halt(FailurePhase::Render, &e);
                return FrameOutcome::Failed;
            }
        }

        self.arm();
        FrameOutcome::Ticked {
            updated,
            rendered: decision.render,
        }
    }

    fn halt(&mut self, phase: FailurePhase, err: &SimError) {
        self.boundary
            .capture(self.instance.id(), phase, err, self.instance.time());
        self.instance.fail();
        self.stop_loop();
    }

    /// Remounts from `init()` after a failure.
    ///
    /// Re-reads the container size. Returns false if there was nothing to retry.
    pub fn retry(&mut self) -> bool {
        let Some(failure) = self.boundary.reset() else {
            return false;
        };
        info!(
            instance = %self.instance.id(),
            phase = ?failure.phase,
            retries = self.boundary.retries(),
            "Retrying simulation"
        );

        self.size_surface();
        self.instance.init();
        if self.visible {
            self.start_loop();
        } else {
            self.instance.suspend();
        }
        true
    }

    pub fn view(&self) -> MountedView {
        let (css_width, css_height) = self.target.css_size();
        MountedView {
            instance: self.instance.id(),
            title: self.title.clone(),
            description: self.description.clone(),
            lifecycle: self.instance.lifecycle(),
            visible: self.visible,
            css_width,
            css_height,
            surface: self.surface_context,
            controls: self.instance.controls().views(),
            fallback: self.boundary.fallback(&self.title),
            sim_time: self.instance.time(),
            updates: self.instance.update_count(),
            renders: self.instance.render_count(),
        }
    }

    /// Tears the mount down: cancels the pending frame and detaches the observer.
    pub fn unmount(self) {
        info!(instance = %self.instance.id(), "Simulation unmounted");
    }

    pub fn id(&self) -> InstanceId {
        self.instance.id()
    }

    pub fn instance(&self) -> &SimulationInstance<S> {
        &self.instance
    }

    pub fn controls(&self) -> &ControlRegistry {
        self.instance.controls()
    }

    pub fn surface(&self) -> &T::Surface {
        &self.surface
    }

    pub fn surface_context(&self) -> &SurfaceContext {
        &self.surface_context
    }

    pub fn boundary(&self) -> &ErrorBoundary {
        &self.boundary
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.clock.state().animation_handle
    }
}

impl<S: Simulation, T: MountTarget, H: HostContext> Drop for SimulationHost<S, T, H> {
    fn drop(&mut self) {
        self.stop_loop();
        self.observer = None;
    }
}
