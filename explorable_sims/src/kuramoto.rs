//! Kuramoto fireflies.
//!
//! Each firefly is a phase oscillator with its own natural frequency and
//! flashes when its phase passes zero. Mean-field coupling pulls every phase
//! toward the population's mean phase:
//!
//! ```text
//! r·e^{iψ} = (1/N) Σ_j e^{iθ_j}
//! dθ_i/dt  = ω_i + K·r·sin(ψ − θ_i)
//! ```
//!
//! Integrated with explicit Euler steps of the measured `dt`.

use explorable_simlib::{
    Color, ControlRegistry, DrawingEngine, RenderContext, SimError, Simulation, SimulationInfo,
    SliderSpec, UpdateContext,
};
use nalgebra::Vector2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use std::f64::consts::TAU;

pub const COUPLING: &str = "coupling";
pub const SHOW_ORDER: &str = "show_order";

/// Mean natural frequency (Hz).
const MEAN_FREQUENCY_HZ: f64 = 1.0;

/// Spread of natural frequencies (Hz).
const FREQUENCY_SPREAD_HZ: f64 = 0.1;

const NIGHT: Color = Color::rgb(12, 14, 32);

/// One firefly.
#[derive(Debug, Clone, PartialEq)]
pub struct Firefly {
    /// Normalized position on the surface
    pub position: Vector2<f64>,
    /// Phase in `[0, 2π)`
    pub phase: f64,
    /// Natural angular frequency (rad/s)
    pub omega: f64,
}

impl Firefly {
    /// Flash intensity in `[0, 1]`, peaking at phase 0.
    pub fn brightness(&self) -> f64 {
        ((1.0 + self.phase.cos()) / 2.0).powi(4)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Swarm {
    pub fireflies: Vec<Firefly>,
}

/// Kuramoto order parameter `(r, ψ)` of a set of phases.
///
/// `r` is 1 when all phases agree and near 0 when they are spread evenly.
pub fn order_parameter(phases: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut re, mut im, mut n) = (0.0, 0.0, 0usize);
    for theta in phases {
        re += theta.cos();
        im += theta.sin();
        n += 1;
    }
    if n == 0 {
        return (0.0, 0.0);
    }
    let (re, im) = (re / n as f64, im / n as f64);
    (re.hypot(im), im.atan2(re))
}

impl Swarm {
    pub fn order(&self) -> (f64, f64) {
        order_parameter(self.fireflies.iter().map(|f| f.phase))
    }
}

/// Firefly synchronization simulation.
pub struct Kuramoto {
    seed: u64,
    count: usize,
}

impl Kuramoto {
    pub fn new(seed: u64) -> Self {
        Self::with_count(seed, 64)
    }

    pub fn with_count(seed: u64, count: usize) -> Self {
        Self { seed, count }
    }
}

impl Simulation for Kuramoto {
    type State = Swarm;

    fn info(&self) -> SimulationInfo {
        SimulationInfo::new(
            "Fireflies",
            "Every firefly blinks at its own pace but nudges its timing toward the others. \
             Raise the coupling and the whole swarm starts flashing together.",
        )
    }

    fn controls(&mut self, registry: &mut ControlRegistry) {
        registry.add_slider(COUPLING, SliderSpec::new(1.0, 0.0, 5.0, 0.05), "Coupling");
        registry.add_checkbox(SHOW_ORDER, false, "Show order parameter");
    }

    fn init(&mut self) -> Swarm {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let fireflies = (0..self.count)
            .map(|_| {
                let z: f64 = rng.sample(StandardNormal);
                Firefly {
                    position: Vector2::new(rng.gen_range(0.05..0.95), rng.gen_range(0.05..0.95)),
                    phase: rng.gen_range(0.0..TAU),
                    omega: TAU * (MEAN_FREQUENCY_HZ + FREQUENCY_SPREAD_HZ * z),
                }
            })
            .collect();
        Swarm { fireflies }
    }

    fn update(&mut self, ctx: &UpdateContext<'_>, mut swarm: Swarm) -> Result<Swarm, SimError> {
        let coupling = ctx.controls.number(COUPLING).unwrap_or(1.0);
        let (r, psi) = swarm.order();

        for firefly in swarm.fireflies.iter_mut() {
            let dtheta = firefly.omega + coupling * r * (psi - firefly.phase).sin();
            firefly.phase = (firefly.phase + dtheta * ctx.dt).rem_euclid(TAU);
        }
        if swarm.fireflies.iter().any(|f| !f.phase.is_finite()) {
            return Err(SimError::logic("phase diverged"));
        }
        Ok(swarm)
    }

    fn render(
        &self,
        ctx: &RenderContext<'_, Swarm>,
        engine: &mut DrawingEngine<'_>,
    ) -> Result<(), SimError> {
        engine.clear(Some(NIGHT))?;

        for firefly in &ctx.state.fireflies {
            let glow = firefly.brightness();
            engine
                .circle(0.008 + 0.012 * glow)
                .translate(firefly.position.x, firefly.position.y)
                .fill(Color::hsl(55.0, 1.0, 0.15 + 0.7 * glow))
                .filter(format!("blur({:.1}px)", 4.0 * glow))
                .draw()?;
        }

        if ctx.controls.flag(SHOW_ORDER).unwrap_or(false) {
            let (r, psi) = ctx.state.order();
            let tip = (0.5 + 0.3 * r * psi.cos(), 0.5 + 0.3 * r * psi.sin());
            engine
                .arc(0.0, TAU, 0.3)
                .translate(0.5, 0.5)
                .stroke(Color::WHITE.with_alpha(0.3), 1.0)
                .draw()?;
            engine
                .vector((0.5, 0.5), tip, 0.03)
                .stroke(Color::WHITE, 2.0)
                .draw()?;
        }
        Ok(())
    }
}
