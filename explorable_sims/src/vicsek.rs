//! Vicsek fish school.
//!
//! Self-propelled particles on the unit torus. Every update each fish turns
//! to the mean heading of the fish within the interaction radius (itself
//! included), plus uniform angular noise of amplitude `η·π`, then swims
//! `speed·dt` along its new heading. Headings are computed from the previous
//! positions for every fish before any fish moves.

use explorable_simlib::{
    Color, ControlRegistry, DrawingEngine, RenderContext, SimError, Simulation, SimulationInfo,
    SliderSpec, UpdateContext,
};
use nalgebra::Vector2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};
use std::f64::consts::PI;

pub const NOISE: &str = "noise";
pub const SPEED: &str = "speed";
pub const RADIUS: &str = "radius";

const WATER: Color = Color::rgb(226, 240, 251);

/// Drawn body length of one fish (normalized units).
const BODY: f64 = 0.012;

#[derive(Debug, Clone, PartialEq)]
pub struct Fish {
    /// Position on the unit torus
    pub position: Vector2<f64>,
    /// Heading angle (radians)
    pub heading: f64,
}

impl Fish {
    pub fn direction(&self) -> Vector2<f64> {
        Vector2::new(self.heading.cos(), self.heading.sin())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct School {
    pub fish: Vec<Fish>,
}

impl School {
    /// Polarization `|⟨e^{iθ}⟩|`: 1 when every fish swims the same way.
    pub fn polarization(&self) -> f64 {
        if self.fish.is_empty() {
            return 0.0;
        }
        let sum: Vector2<f64> = self.fish.iter().map(Fish::direction).sum();
        sum.norm() / self.fish.len() as f64
    }
}

/// Shortest displacement from `a` to `b` on the unit torus.
pub fn torus_delta(a: &Vector2<f64>, b: &Vector2<f64>) -> Vector2<f64> {
    (b - a).map(|d| d - d.round())
}

/// Wraps a position back into `[0, 1)²`.
pub fn wrap(p: Vector2<f64>) -> Vector2<f64> {
    p.map(|c| {
        let w = c.rem_euclid(1.0);
        // rem_euclid rounds tiny negatives up to exactly 1.0
        if w >= 1.0 {
            0.0
        } else {
            w
        }
    })
}

/// Fish schooling simulation.
pub struct Vicsek {
    seed: u64,
    count: usize,
    rng: ChaCha8Rng,
}

impl Vicsek {
    pub fn new(seed: u64) -> Self {
        Self::with_count(seed, 150)
    }

    pub fn with_count(seed: u64, count: usize) -> Self {
        Self {
            seed,
            count,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Simulation for Vicsek {
    type State = School;

    fn info(&self) -> SimulationInfo {
        SimulationInfo::new(
            "Fish school",
            "Each fish only copies the direction of its close neighbours. \
             With little noise the whole school ends up swimming one way.",
        )
    }

    fn controls(&mut self, registry: &mut ControlRegistry) {
        registry.add_slider(NOISE, SliderSpec::new(0.3, 0.0, 1.0, 0.01), "Noise");
        registry.add_slider(SPEED, SliderSpec::new(0.1, 0.01, 0.5, 0.01), "Speed");
        registry.add_slider(RADIUS, SliderSpec::new(0.05, 0.01, 0.2, 0.005), "Interaction radius");
    }

    fn init(&mut self) -> School {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        let rng = &mut self.rng;
        let fish = (0..self.count)
            .map(|_| Fish {
                position: Vector2::new(rng.gen::<f64>(), rng.gen::<f64>()),
                heading: rng.gen_range(-PI..PI),
            })
            .collect();
        School { fish }
    }

    fn update(&mut self, ctx: &UpdateContext<'_>, school: School) -> Result<School, SimError> {
        let noise = ctx.controls.number(NOISE).unwrap_or(0.3).clamp(0.0, 1.0);
        let speed = ctx.controls.number(SPEED).unwrap_or(0.1);
        let radius = ctx.controls.number(RADIUS).unwrap_or(0.05);
        let r2 = radius * radius;

        let kick = Uniform::new_inclusive(-PI, PI);
        let fish = school
            .fish
            .iter()
            .map(|me| {
                let mean: Vector2<f64> = school
                    .fish
                    .iter()
                    .filter(|other| torus_delta(&me.position, &other.position).norm_squared() <= r2)
                    .map(Fish::direction)
                    .sum();
                let heading = mean.y.atan2(mean.x) + noise * kick.sample(&mut self.rng);
                let direction = Vector2::new(heading.cos(), heading.sin());
                Fish {
                    position: wrap(me.position + direction * speed * ctx.dt),
                    heading,
                }
            })
            .collect::<Vec<_>>();

        if fish.iter().any(|f| !(f.position.x.is_finite() && f.position.y.is_finite())) {
            return Err(SimError::logic("fish left the tank"));
        }
        Ok(School { fish })
    }

    fn render(
        &self,
        ctx: &RenderContext<'_, School>,
        engine: &mut DrawingEngine<'_>,
    ) -> Result<(), SimError> {
        engine.clear(Some(WATER))?;
        for fish in &ctx.state.fish {
            let d = fish.direction() * BODY;
            let (from, to) = (fish.position - d, fish.position + d);
            // Hue follows heading so aligned groups share a color
            let hue = fish.heading.to_degrees().rem_euclid(360.0);
            engine
                .vector((from.x, from.y), (to.x, to.y), 0.008)
                .stroke(Color::hsl(hue, 0.7, 0.4), 1.5)
                .draw()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn setup(seed: u64, count: usize) -> (Vicsek, ControlRegistry) {
        let mut sim = Vicsek::with_count(seed, count);
        let mut registry = ControlRegistry::new();
        sim.controls(&mut registry);
        (sim, registry)
    }

    fn advance(
        sim: &mut Vicsek,
        registry: &ControlRegistry,
        mut school: School,
        steps: usize,
    ) -> School {
        for i in 0..steps {
            let ctx = UpdateContext {
                t: i as f64 * 0.05,
                dt: 0.05,
                controls: registry.values(),
            };
            school = sim.update(&ctx, school).unwrap();
        }
        school
    }

    #[test]
    fn test_torus_delta_takes_short_way() {
        let a = Vector2::new(0.95, 0.5);
        let b = Vector2::new(0.05, 0.5);
        let d = torus_delta(&a, &b);
        assert!((d.x - 0.1).abs() < 1e-12);
        assert_eq!(d.y, 0.0);
    }

    #[test]
    fn test_polarization_of_aligned_school() {
        let school = School {
            fish: (0..10)
                .map(|i| Fish {
                    position: Vector2::new(i as f64 / 10.0, 0.5),
                    heading: 0.3,
                })
                .collect(),
        };
        assert!((school.polarization() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_noiseless_school_aligns() {
        let (mut sim, registry) = setup(21, 100);
        registry.descriptor(NOISE).unwrap().on_change(0.0);
        registry.descriptor(RADIUS).unwrap().on_change(0.2);
        registry.descriptor(SPEED).unwrap().on_change(0.3);

        let school = sim.init();
        let before = school.polarization();
        let school = advance(&mut sim, &registry, school, 400);
        assert!(before < 0.5);
        assert!(school.polarization() > 0.9);
    }

    #[test]
    fn test_full_noise_stays_disordered() {
        let (mut sim, registry) = setup(8, 200);
        registry.descriptor(NOISE).unwrap().on_change(1.0);
        registry.descriptor(RADIUS).unwrap().on_change(0.02);

        let school = sim.init();
        let school = advance(&mut sim, &registry, school, 100);
        assert!(school.polarization() < 0.5);
    }

    #[test]
    fn test_retry_replays_the_same_run() {
        let (mut sim, registry) = setup(5, 50);
        let first = sim.init();
        let a = advance(&mut sim, &registry, first, 20);
        let second = sim.init();
        let b = advance(&mut sim, &registry, second, 20);
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_positions_stay_on_torus(seed in 0u64..1000, dt in 0.0f64..2.0) {
            let (mut sim, registry) = setup(seed, 20);
            registry.descriptor(SPEED).unwrap().on_change(0.5);
            let school = sim.init();
            let ctx = UpdateContext { t: 0.0, dt, controls: registry.values() };
            let school = sim.update(&ctx, school).unwrap();
            for fish in &school.fish {
                prop_assert!((0.0..1.0).contains(&fish.position.x));
                prop_assert!((0.0..1.0).contains(&fish.position.y));
            }
        }
    }
}
