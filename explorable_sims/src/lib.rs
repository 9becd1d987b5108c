//! Explorable Simulations
//!
//! Ready-made simulations for the explorable runtime, plus a headless runner
//! that drives any of them off-screen and exports what it drew.
//!
//! # Catalog
//!
//! | id          | model                                  | controls                              |
//! |-------------|----------------------------------------|---------------------------------------|
//! | `ising`     | Metropolis spin lattice                | temperature, field, show magnetization |
//! | `fireflies` | Kuramoto mean-field phase oscillators  | coupling, show order parameter        |
//! | `fish`      | Vicsek self-propelled particles        | noise, speed, interaction radius      |
//!
//! Every simulation is seeded from one `u64` through `ChaCha8Rng`, and
//! `init()` restarts the stream, so "Try again" replays the same run.
//!
//! # Usage
//!
//! ```ignore
//! use explorable_sims::{HeadlessRunner, RunConfig, SimulationId};
//!
//! let config = RunConfig {
//!     simulation: SimulationId::Fish,
//!     seed: 7,
//!     frames: 600,
//!     overrides: vec!["noise=0.05".parse()?],
//!     ..Default::default()
//! };
//! let outcome = HeadlessRunner::new(config).run().await?;
//! outcome.write_svg("fish.svg")?;
//! ```

pub mod catalog;
mod exporter;
pub mod ising;
pub mod kuramoto;
mod runner;
pub mod vicsek;

pub use catalog::SimulationId;
pub use exporter::{FrameRecord, RunExport};
pub use ising::Ising;
pub use kuramoto::Kuramoto;
pub use runner::{ControlOverride, HeadlessRunner, RunConfig, RunError, RunOutcome};
pub use vicsek::Vicsek;
