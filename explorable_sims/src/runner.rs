//! Headless runner - mounts a catalog simulation off-screen and drives it.
//!
//! The default host is a [`ManualHost`], so a run is a pure function of its
//! [`RunConfig`]: same seed, same frames, same recorded paint ops. With
//! `realtime` set the same loop runs against a [`TokioHost`] and real vsync
//! sleeps instead.

use crate::catalog::SimulationId;
use crate::exporter::{FrameRecord, RunExport};
use crate::ising::Ising;
use crate::kuramoto::Kuramoto;
use crate::vicsek::Vicsek;

use explorable_env::{EnvError, HostContext, InstanceId, ManualHost, ManualIntersection, TokioHost};
use explorable_simlib::{
    ControlValue, DriverStats, FrameDriver, FrameTarget, HeadlessContainer, MountOptions,
    MountedView, SchedulerConfig, SimError, Simulation, SimulationHost,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from a headless run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Env(#[from] EnvError),

    /// Override names a control the simulation does not declare
    #[error("{simulation} has no control named {id:?}")]
    UnknownControl { simulation: String, id: String },

    /// Override could not be parsed or has the wrong kind
    #[error("Invalid control override: {0}")]
    InvalidOverride(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A control value set before the first frame, written as `id=value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlOverride {
    pub id: String,
    pub value: ControlValue,
}

impl std::str::FromStr for ControlOverride {
    type Err = RunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, raw) = s
            .split_once('=')
            .ok_or_else(|| RunError::InvalidOverride(format!("expected id=value, got {s:?}")))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(RunError::InvalidOverride(format!("missing control id in {s:?}")));
        }

        let raw = raw.trim();
        let value = match raw {
            "true" | "on" => ControlValue::Flag(true),
            "false" | "off" => ControlValue::Flag(false),
            _ => raw.parse::<f64>().map(ControlValue::Number).map_err(|_| {
                RunError::InvalidOverride(format!("{raw:?} is not a number or a boolean"))
            })?,
        };
        Ok(Self {
            id: id.to_string(),
            value,
        })
    }
}

/// Configuration for one headless run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub simulation: SimulationId,

    /// Seed for the simulation's RNG and the instance id
    pub seed: u64,

    /// Number of vsyncs to drive
    pub frames: u64,

    /// Container size in CSS pixels
    pub css_width: f64,
    pub css_height: f64,

    pub device_pixel_ratio: f64,

    /// Host refresh rate (Hz)
    pub refresh_hz: f64,

    pub scheduler: SchedulerConfig,

    /// Applied in order before the first frame
    pub overrides: Vec<ControlOverride>,

    /// Frame at which the container leaves the viewport
    pub hide_at: Option<u64>,

    /// Frame at which the container re-enters the viewport
    pub show_at: Option<u64>,

    /// Drive from the wall clock instead of a virtual one
    pub realtime: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationId::Ising,
            seed: 42,
            frames: 300,
            css_width: 640.0,
            css_height: 360.0,
            device_pixel_ratio: 1.0,
            refresh_hz: 60.0,
            scheduler: SchedulerConfig::default(),
            overrides: Vec::new(),
            hide_at: None,
            show_at: None,
            realtime: false,
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub export: RunExport,

    /// Last rendered frame as an SVG document
    pub svg: String,

    pub view: MountedView,

    pub stats: DriverStats,
}

impl RunOutcome {
    /// True if the error boundary never tripped.
    pub fn passed(&self) -> bool {
        self.export.passed
    }

    pub fn write_export(&self, path: impl AsRef<Path>) -> Result<(), RunError> {
        self.export.write_to_file(path)?;
        Ok(())
    }

    pub fn write_svg(&self, path: impl AsRef<Path>) -> Result<(), RunError> {
        std::fs::write(path, &self.svg)?;
        Ok(())
    }
}

/// Runs catalog simulations without a display.
pub struct HeadlessRunner {
    config: RunConfig,
}

impl HeadlessRunner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Mounts the configured simulation and drives it for `frames` vsyncs.
    pub async fn run(&self) -> Result<RunOutcome, RunError> {
        let config = &self.config;
        info!(
            simulation = %config.simulation,
            seed = config.seed,
            frames = config.frames,
            realtime = config.realtime,
            "Starting run"
        );

        if config.realtime {
            let host = TokioHost::with_refresh_rate(config.refresh_hz)?
                .with_pixel_ratio(config.device_pixel_ratio);
            self.dispatch(Rc::new(host)).await
        } else {
            let host = ManualHost::with_refresh_rate(config.refresh_hz)?
                .with_pixel_ratio(config.device_pixel_ratio);
            self.dispatch(Rc::new(host)).await
        }
    }

    async fn dispatch<H: HostContext>(&self, host: Rc<H>) -> Result<RunOutcome, RunError> {
        let seed = self.config.seed;
        match self.config.simulation {
            SimulationId::Ising => self.drive(host, Ising::new(seed)).await,
            SimulationId::Fireflies => self.drive(host, Kuramoto::new(seed)).await,
            SimulationId::Fish => self.drive(host, Vicsek::new(seed)).await,
        }
    }

    async fn drive<S: Simulation, H: HostContext>(
        &self,
        host: Rc<H>,
        sim: S,
    ) -> Result<RunOutcome, RunError> {
        let config = &self.config;
        let options = MountOptions {
            scheduler: config.scheduler,
            instance_id: Some(InstanceId::from_seed(config.seed)),
            ..Default::default()
        };
        let container = HeadlessContainer::new(config.css_width, config.css_height);
        let mut mounted = SimulationHost::mount(Rc::clone(&host), container, sim, options)?;

        for o in &config.overrides {
            let descriptor = mounted.controls().descriptor(&o.id).ok_or_else(|| {
                RunError::UnknownControl {
                    simulation: config.simulation.to_string(),
                    id: o.id.clone(),
                }
            })?;
            if !descriptor.kind().accepts(&o.value) {
                return Err(RunError::InvalidOverride(format!(
                    "{} is a {}",
                    o.id,
                    descriptor.kind().name()
                )));
            }
            descriptor.on_change(o.value);
            info!(control = %o.id, value = ?o.value, "Control override applied");
        }

        let viewport = ManualIntersection::new();
        mounted.attach_visibility(&viewport);
        viewport.set_intersecting(true);

        let mut export = RunExport::new(config.simulation.name(), config.seed);
        let mut driver = FrameDriver::new(Rc::clone(&host));

        for frame in 1..=config.frames {
            if config.hide_at == Some(frame) {
                debug!(frame, "Scrolling out of view");
                viewport.set_intersecting(false);
            }
            if config.show_at == Some(frame) {
                debug!(frame, "Scrolling back into view");
                viewport.set_intersecting(true);
            }

            let step = driver
                .step(&mut [&mut mounted as &mut dyn FrameTarget])
                .await;

            if step.renders > 0 {
                let instance = mounted.instance();
                export.add_frame(FrameRecord {
                    frame,
                    wall_time: host.now().as_secs_f64(),
                    sim_time: instance.time(),
                    updates: instance.update_count(),
                    renders: instance.render_count(),
                    ops: mounted.surface().ops().len(),
                    visible: mounted.is_visible(),
                    controls: mounted.controls().values().snapshot(),
                });
            }

            if mounted.boundary().is_tripped() {
                warn!(frame, "Run stopped by the error boundary");
                break;
            }
        }

        let view = mounted.view();
        let failure = mounted.boundary().failure().cloned();
        let svg = mounted.surface().to_svg();
        let stats = driver.stats();
        export.finalize(view.clone(), failure);
        mounted.unmount();

        info!(
            simulation = %config.simulation,
            vsyncs = stats.vsyncs,
            updates = stats.updates,
            renders = stats.renders,
            recorded = export.frames.len(),
            passed = export.passed,
            "Run finished"
        );
        Ok(RunOutcome {
            export,
            svg,
            view,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ising;
    use crate::vicsek;

    fn config(simulation: SimulationId, frames: u64) -> RunConfig {
        RunConfig {
            simulation,
            frames,
            css_width: 120.0,
            css_height: 80.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_override() {
        let o: ControlOverride = "noise=0.25".parse().unwrap();
        assert_eq!(o.id, "noise");
        assert_eq!(o.value, ControlValue::Number(0.25));

        let o: ControlOverride = " show_order = true ".parse().unwrap();
        assert_eq!(o.id, "show_order");
        assert_eq!(o.value, ControlValue::Flag(true));

        assert!("noise".parse::<ControlOverride>().is_err());
        assert!("=1".parse::<ControlOverride>().is_err());
        assert!("noise=loud".parse::<ControlOverride>().is_err());
    }

    #[tokio::test]
    async fn test_run_records_rendered_frames() {
        let outcome = HeadlessRunner::new(config(SimulationId::Ising, 10))
            .run()
            .await
            .unwrap();

        assert!(outcome.passed());
        // Frame 1 only arms the loop; every later vsync renders at 60 Hz
        assert_eq!(outcome.export.frames.len(), 9);
        assert_eq!(outcome.stats.renders, 9);
        assert_eq!(outcome.stats.vsyncs, 10);
        assert_eq!(outcome.view.title, "Ising model");
        assert_eq!(outcome.export.title, "Ising model");
        assert!(outcome.svg.contains("viewBox=\"0 0 120 80\""));
    }

    #[tokio::test]
    async fn test_overrides_reach_the_live_values() {
        let mut cfg = config(SimulationId::Fish, 5);
        cfg.overrides = vec!["noise=0".parse().unwrap(), "radius=0.1".parse().unwrap()];

        let outcome = HeadlessRunner::new(cfg).run().await.unwrap();
        let last = outcome.export.frames.last().unwrap();
        assert_eq!(last.controls[vicsek::NOISE], ControlValue::Number(0.0));
        assert_eq!(last.controls[vicsek::RADIUS], ControlValue::Number(0.1));
    }

    #[tokio::test]
    async fn test_unknown_control_is_rejected() {
        let mut cfg = config(SimulationId::Ising, 5);
        cfg.overrides = vec!["coupling=1".parse().unwrap()];

        let err = HeadlessRunner::new(cfg).run().await.unwrap_err();
        assert!(matches!(err, RunError::UnknownControl { ref id, .. } if id == "coupling"));
    }

    #[tokio::test]
    async fn test_wrong_kind_override_is_rejected() {
        let mut cfg = config(SimulationId::Ising, 5);
        cfg.overrides = vec![ControlOverride {
            id: ising::SHOW_MAGNETIZATION.to_string(),
            value: ControlValue::Number(0.5),
        }];

        let err = HeadlessRunner::new(cfg).run().await.unwrap_err();
        assert!(matches!(err, RunError::InvalidOverride(_)));
    }

    #[tokio::test]
    async fn test_hidden_frames_are_not_recorded() {
        let mut cfg = config(SimulationId::Fireflies, 30);
        cfg.hide_at = Some(10);
        cfg.show_at = Some(20);

        let outcome = HeadlessRunner::new(cfg).run().await.unwrap();
        let frames: Vec<u64> = outcome.export.frames.iter().map(|f| f.frame).collect();

        assert!(frames.iter().all(|&f| !(10..=20).contains(&f)), "{frames:?}");
        assert!(frames.iter().any(|&f| f > 20));
        assert!(outcome.export.frames.iter().all(|f| f.visible));
        assert!(outcome.view.visible);
    }

    #[tokio::test]
    async fn test_same_seed_same_picture() {
        let a = HeadlessRunner::new(config(SimulationId::Fish, 20)).run().await.unwrap();
        let b = HeadlessRunner::new(config(SimulationId::Fish, 20)).run().await.unwrap();
        assert_eq!(a.svg, b.svg);
        assert_eq!(a.export.frames, b.export.frames);

        let mut other = config(SimulationId::Fish, 20);
        other.seed = 43;
        let c = HeadlessRunner::new(other).run().await.unwrap();
        assert_ne!(a.svg, c.svg);
    }

    #[tokio::test]
    async fn test_dpr_scales_the_surface() {
        let mut cfg = config(SimulationId::Fireflies, 3);
        cfg.device_pixel_ratio = 2.0;

        let outcome = HeadlessRunner::new(cfg).run().await.unwrap();
        assert_eq!(outcome.view.surface.pixel_width, 240);
        assert_eq!(outcome.view.surface.pixel_height, 160);
    }

    #[tokio::test]
    async fn test_invalid_refresh_rate_is_an_env_error() {
        let mut cfg = config(SimulationId::Ising, 3);
        cfg.refresh_hz = 0.0;

        let err = HeadlessRunner::new(cfg).run().await.unwrap_err();
        assert!(matches!(err, RunError::Env(_)));
    }

    #[tokio::test]
    async fn test_realtime_run() {
        let mut cfg = config(SimulationId::Fish, 4);
        cfg.realtime = true;
        cfg.refresh_hz = 240.0;

        let outcome = HeadlessRunner::new(cfg).run().await.unwrap();
        assert!(outcome.passed());
        assert_eq!(outcome.stats.vsyncs, 4);
    }
}
