//! Catalog of the bundled simulations.

use serde::{Deserialize, Serialize};

/// Simulation identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationId {
    /// Metropolis spin lattice with temperature and external field
    Ising,

    /// Kuramoto phase oscillators drawn as flashing fireflies
    Fireflies,

    /// Vicsek self-propelled particles drawn as a school of fish
    Fish,
}

impl SimulationId {
    /// Returns a list of all simulations.
    pub fn all() -> Vec<SimulationId> {
        vec![
            SimulationId::Ising,
            SimulationId::Fireflies,
            SimulationId::Fish,
        ]
    }

    /// Returns the simulation name.
    pub fn name(&self) -> &'static str {
        match self {
            SimulationId::Ising => "ising",
            SimulationId::Fireflies => "fireflies",
            SimulationId::Fish => "fish",
        }
    }

    /// Returns a description of the simulation.
    pub fn description(&self) -> &'static str {
        match self {
            SimulationId::Ising => "2D Ising model: spins align below the critical temperature",
            SimulationId::Fireflies => "Kuramoto fireflies: coupled oscillators fall into step",
            SimulationId::Fish => "Vicsek fish: local alignment turns noise into a school",
        }
    }
}

impl std::fmt::Display for SimulationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for SimulationId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ising" | "spins" => Ok(SimulationId::Ising),
            "fireflies" | "kuramoto" => Ok(SimulationId::Fireflies),
            "fish" | "vicsek" | "school" => Ok(SimulationId::Fish),
            _ => Err(format!("Unknown simulation: {}", s)),
        }
    }
}
