//! Explorable Simulation Runtime
//!
//! This crate is the core that small, time-stepped 2D simulations plug into:
//! declare controls, produce and advance a state, paint it with normalized
//! shapes, and let the host drive it from animation frames.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      SimulationHost                           │
//! │  ┌─────────────────┐   ┌──────────────┐   ┌────────────────┐  │
//! │  │ VisibilityObs.  │──►│  DualClock   │──►│ ErrorBoundary  │  │
//! │  │ (enter / exit)  │   │ update/render│   │ fallback+retry │  │
//! │  └─────────────────┘   └──────┬───────┘   └────────────────┘  │
//! │                               │                               │
//! │  ┌────────────────────────────▼────────────────────────────┐  │
//! │  │ SimulationInstance<S: Simulation>                       │  │
//! │  │   ControlRegistry ── live values ──► update(state) ──►  │  │
//! │  │                                     render(engine)      │  │
//! │  └────────────────────────────┬────────────────────────────┘  │
//! │                               │                               │
//! │                    DrawingEngine ──► RasterSurface            │
//! └───────────────────────────────────────────────────────────────┘
//!            ▲ frames                       ▲ visibility
//!       FrameDriver ◄──── HostContext ──── IntersectionSource
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use explorable_env::{ManualHost, ManualIntersection};
//! use explorable_simlib::{FrameDriver, HeadlessContainer, MountOptions, SimulationHost};
//!
//! let host = ManualHost::shared();
//! let viewport = ManualIntersection::new();
//! let mut mounted = SimulationHost::mount(
//!     host.clone(),
//!     HeadlessContainer::new(640.0, 360.0),
//!     MySim::default(),
//!     MountOptions::default(),
//! )?;
//! mounted.attach_visibility(&viewport);
//! viewport.set_intersecting(true);
//!
//! let mut driver = FrameDriver::new(host);
//! driver.run(&mut [&mut mounted], 120).await;
//! ```

pub mod boundary;
pub mod controls;
pub mod draw;
pub mod driver;
pub mod error;
pub mod host;
pub mod scheduler;
pub mod simulation;
pub mod visibility;

pub use boundary::{ErrorBoundary, Failure, FailurePhase, FallbackPanel, RETRY_LABEL};
pub use controls::{
    CheckboxHandle, ControlDescriptor, ControlKind, ControlRegistry, ControlValue, ControlValues,
    ControlView, SliderHandle, SliderSpec,
};
pub use draw::{Color, DrawingEngine, RasterSurface, RecordingSurface, ShapeBuilder, SurfaceContext};
pub use driver::{DriverStats, FrameDriver, FrameTarget};
pub use error::{DrawError, SimError};
pub use host::{
    FrameOutcome, HeadlessContainer, MountOptions, MountTarget, MountedView, SimulationHost,
};
pub use scheduler::{ClockState, DualClock, FrameDecision, SchedulerConfig};
pub use simulation::{
    Lifecycle, RenderContext, Simulation, SimulationInfo, SimulationInstance, UpdateContext,
};
pub use visibility::VisibilityObserver;
