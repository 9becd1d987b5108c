//! 2D Ising model on a periodic square lattice.
//!
//! Single-spin Metropolis updates: flipping spin `s` at a site with neighbor
//! sum `n` costs `ΔE = 2s(Jn + h)`, and is accepted if `ΔE <= 0` or with
//! probability `exp(-ΔE / T)`. The number of attempted flips per update is
//! proportional to `dt`, so the lattice relaxes at the same wall-clock pace
//! regardless of frame rate.

use explorable_simlib::{
    Color, ControlRegistry, DrawingEngine, RenderContext, SimError, Simulation, SimulationInfo,
    SliderSpec, UpdateContext,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

pub const TEMPERATURE: &str = "temperature";
pub const FIELD: &str = "field";
pub const SHOW_MAGNETIZATION: &str = "show_magnetization";

/// Onsager critical temperature (J = 1, k_B = 1).
pub const CRITICAL_TEMPERATURE: f64 = 2.269_185;

/// Lattice sweeps per second of wall-clock time.
const SWEEPS_PER_SECOND: f64 = 20.0;

/// Cap on sweeps per update so a long stall does not freeze the page.
const MAX_SWEEPS_PER_UPDATE: f64 = 2.0;

const SPIN_UP: Color = Color::rgb(33, 37, 41);
const SPIN_DOWN: Color = Color::rgb(248, 249, 250);

/// Lattice state.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    /// Side length
    pub size: usize,
    /// Row-major spins, each +1 or -1
    pub spins: Vec<i8>,
}

impl Lattice {
    /// Random lattice (infinite-temperature start).
    pub fn random(size: usize, rng: &mut impl Rng) -> Self {
        let spins = (0..size * size)
            .map(|_| if rng.gen::<bool>() { 1 } else { -1 })
            .collect();
        Self { size, spins }
    }

    /// All spins up.
    pub fn ordered(size: usize) -> Self {
        Self {
            size,
            spins: vec![1; size * size],
        }
    }

    pub fn spin(&self, x: usize, y: usize) -> i8 {
        self.spins[y * self.size + x]
    }

    /// Sum of the four periodic neighbors of `(x, y)`.
    pub fn neighbor_sum(&self, x: usize, y: usize) -> i32 {
        let n = self.size;
        let left = (x + n - 1) % n;
        let right = (x + 1) % n;
        let up = (y + n - 1) % n;
        let down = (y + 1) % n;
        [
            self.spin(left, y),
            self.spin(right, y),
            self.spin(x, up),
            self.spin(x, down),
        ]
        .iter()
        .map(|&s| s as i32)
        .sum()
    }

    /// Energy change from flipping the spin at `(x, y)`.
    pub fn flip_cost(&self, x: usize, y: usize, field: f64) -> f64 {
        let s = self.spin(x, y) as f64;
        2.0 * s * (self.neighbor_sum(x, y) as f64 + field)
    }

    /// Mean spin in `[-1, 1]`.
    pub fn magnetization(&self) -> f64 {
        if self.spins.is_empty() {
            return 0.0;
        }
        self.spins.iter().map(|&s| s as f64).sum::<f64>() / self.spins.len() as f64
    }

    /// One Metropolis step at a random site. Returns true if the spin flipped.
    pub fn metropolis_step(&mut self, temperature: f64, field: f64, rng: &mut impl Rng) -> bool {
        let x = rng.gen_range(0..self.size);
        let y = rng.gen_range(0..self.size);
        let cost = self.flip_cost(x, y, field);

        let accept = cost <= 0.0 || rng.gen::<f64>() < (-cost / temperature.max(1e-6)).exp();
        if accept {
            let i = y * self.size + x;
            self.spins[i] = -self.spins[i];
        }
        accept
    }
}

/// Ising simulation.
pub struct Ising {
    seed: u64,
    size: usize,
    rng: ChaCha8Rng,
    /// Fractional flips carried over between updates
    carry: f64,
}

impl Ising {
    pub fn new(seed: u64) -> Self {
        Self::with_size(seed, 48)
    }

    pub fn with_size(seed: u64, size: usize) -> Self {
        Self {
            seed,
            size: size.max(2),
            rng: ChaCha8Rng::seed_from_u64(seed),
            carry: 0.0,
        }
    }
}

impl Simulation for Ising {
    type State = Lattice;

    fn info(&self) -> SimulationInfo {
        SimulationInfo::new(
            "Ising model",
            "Each cell is a magnetic spin that wants to agree with its neighbours. \
             Heat scrambles them; below the critical temperature large aligned domains form.",
        )
    }

    fn controls(&mut self, registry: &mut ControlRegistry) {
        let temperature = SliderSpec::new(CRITICAL_TEMPERATURE, 0.5, 5.0, 0.01);
        registry.add_slider(TEMPERATURE, temperature, "Temperature");
        registry.add_slider(FIELD, SliderSpec::new(0.0, -1.0, 1.0, 0.01), "External field");
        registry.add_checkbox(SHOW_MAGNETIZATION, true, "Show magnetization");
    }

    fn init(&mut self) -> Lattice {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.carry = 0.0;
        Lattice::random(self.size, &mut self.rng)
    }

    fn update(
        &mut self,
        ctx: &UpdateContext<'_>,
        mut lattice: Lattice,
    ) -> Result<Lattice, SimError> {
        let temperature = ctx.controls.number(TEMPERATURE).unwrap_or(CRITICAL_TEMPERATURE);
        let field = ctx.controls.number(FIELD).unwrap_or(0.0);
        if !(temperature.is_finite() && field.is_finite()) {
            return Err(SimError::logic(format!(
                "non-finite parameters: T={temperature}, h={field}"
            )));
        }

        let sites = (lattice.size * lattice.size) as f64;
        let sweeps = (ctx.dt * SWEEPS_PER_SECOND).min(MAX_SWEEPS_PER_UPDATE);
        let attempts = sweeps * sites + self.carry;
        self.carry = attempts.fract();

        let mut flips = 0u64;
        for _ in 0..attempts as u64 {
            flips += lattice.metropolis_step(temperature, field, &mut self.rng) as u64;
        }
        debug!(t = ctx.t, attempts = attempts as u64, flips, "Ising update");
        Ok(lattice)
    }

    fn render(
        &self,
        ctx: &RenderContext<'_, Lattice>,
        engine: &mut DrawingEngine<'_>,
    ) -> Result<(), SimError> {
        let lattice = ctx.state;
        let n = lattice.size as f64;
        let half = 0.5 / n;

        engine.clear(Some(SPIN_DOWN))?;
        for y in 0..lattice.size {
            for x in 0..lattice.size {
                if lattice.spin(x, y) > 0 {
                    engine
                        .rectangle(half, half)
                        .translate((x as f64 + 0.5) / n, (y as f64 + 0.5) / n)
                        .fill(SPIN_UP)
                        .draw()?;
                }
            }
        }

        if ctx.controls.flag(SHOW_MAGNETIZATION).unwrap_or(false) {
            let m = lattice.magnetization();
            // Bar grows right for +, left for -, from the middle
            let color = if m >= 0.0 {
                Color::hsl(210.0, 0.8, 0.5)
            } else {
                Color::hsl(10.0, 0.8, 0.5)
            };
            engine
                .rectangle(0.5, 0.02)
                .translate(0.5, 0.97)
                .fill(Color::WHITE.with_alpha(0.8))
                .draw()?;
            if m != 0.0 {
                engine
                    .rectangle(m.abs() * 0.25, 0.015)
                    .translate(0.5 + m * 0.25, 0.97)
                    .fill(color)
                    .draw()?;
            }
        }
        Ok(())
    }
}
