//! Frame driver: runs mounted hosts from one host context's vsync.
//!
//! ```text
//! loop:
//!   vsync().await
//!   every target: dispatch_events()      (visibility first)
//!   take_due_frames()
//!   every due handle -> owning target.on_frame(handle)
//! ```
//!
//! All targets share one per-frame budget: a slow `update` or `render` in one
//! delays every other target on the same driver.

use crate::host::{FrameOutcome, MountTarget, SimulationHost};
use crate::simulation::Simulation;
use explorable_env::{FrameHandle, HostContext};
use std::rc::Rc;
use tracing::{debug, trace};

/// Anything that can be driven from animation frames.
pub trait FrameTarget {
    /// Applies queued external events (visibility) before frames run.
    fn dispatch_events(&mut self);

    /// The outstanding frame request, if any.
    fn pending_frame(&self) -> Option<FrameHandle>;

    fn on_frame(&mut self, handle: FrameHandle) -> FrameOutcome;
}

impl<S: Simulation, T: MountTarget, H: HostContext> FrameTarget for SimulationHost<S, T, H> {
    fn dispatch_events(&mut self) {
        SimulationHost::dispatch_events(self);
    }

    fn pending_frame(&self) -> Option<FrameHandle> {
        SimulationHost::pending_frame(self)
    }

    fn on_frame(&mut self, handle: FrameHandle) -> FrameOutcome {
        SimulationHost::on_frame(self, handle)
    }
}

/// Counters accumulated over driven vsyncs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub vsyncs: u64,
    /// Due frames delivered to a target
    pub frames: u64,
    pub updates: u64,
    pub renders: u64,
    pub failures: u64,
}

impl DriverStats {
    fn record(&mut self, outcome: FrameOutcome) {
        self.frames += 1;
        match outcome {
            FrameOutcome::Ticked { updated, rendered } => {
                self.updates += updated as u64;
                self.renders += rendered as u64;
            }
            FrameOutcome::Failed => self.failures += 1,
            FrameOutcome::Stale | FrameOutcome::Idle => {}
        }
    }

    fn merge(&mut self, other: DriverStats) {
        self.vsyncs += other.vsyncs;
        self.frames += other.frames;
        self.updates += other.updates;
        self.renders += other.renders;
        self.failures += other.failures;
    }
}

pub struct FrameDriver<H: HostContext> {
    host: Rc<H>,
    stats: DriverStats,
}

impl<H: HostContext> FrameDriver<H> {
    pub fn new(host: Rc<H>) -> Self {
        Self {
            host,
            stats: DriverStats::default(),
        }
    }

    /// Waits for one vsync and runs every due frame.
    pub async fn step(&mut self, targets: &mut [&mut dyn FrameTarget]) -> DriverStats {
        self.host.vsync().await;

        let mut step = DriverStats {
            vsyncs: 1,
            ..Default::default()
        };
        for target in targets.iter_mut() {
            target.dispatch_events();
        }

        let due = self.host.take_due_frames();
        trace!(due = due.len(), "vsync");
        for handle in due {
            if let Some(target) = targets
                .iter_mut()
                .find(|t| t.pending_frame() == Some(handle))
            {
                step.record(target.on_frame(handle));
            }
        }

        self.stats.merge(step);
        step
    }

    /// Runs `vsyncs` frames.
    pub async fn run(&mut self, targets: &mut [&mut dyn FrameTarget], vsyncs: u64) -> DriverStats {
        let mut total = DriverStats::default();
        for _ in 0..vsyncs {
            total.merge(self.step(targets).await);
        }
        debug!(
            vsyncs = total.vsyncs,
            updates = total.updates,
            renders = total.renders,
            failures = total.failures,
            "Driver run finished"
        );
        total
    }

    /// Totals since construction.
    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    pub fn host(&self) -> &Rc<H> {
        &self.host
    }
}
