//! Error types for the simulation runtime.

use explorable_env::EnvError;
use thiserror::Error;

/// Errors raised by the raster surface or the drawing engine.
///
/// The engine trusts its inputs: these surface at `draw()` time, never while
/// a shape is being built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DrawError {
    /// SVG path data could not be parsed
    #[error("Invalid path data {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A color string could not be parsed
    #[error("Invalid color: {0:?}")]
    InvalidColor(String),

    /// Geometry or transform contained NaN or infinity
    #[error("Non-finite geometry in {0}")]
    NonFinite(&'static str),

    /// `restore()` without a matching `save()`
    #[error("Unbalanced restore (save depth is zero)")]
    UnbalancedRestore,
}

/// Errors raised while mounting or ticking a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Drawing failed during render
    #[error("Draw error: {0}")]
    Draw(#[from] DrawError),

    /// Host environment failure (e.g. no raster surface at mount time)
    #[error("Environment error: {0}")]
    Env(#[from] EnvError),

    /// The simulation's own logic reported a failure
    #[error("Simulation error: {0}")]
    Logic(String),

    /// Lifecycle call made in the wrong state (e.g. update before init)
    #[error("Invalid lifecycle transition: {0}")]
    Lifecycle(String),
}

impl SimError {
    /// Creates a simulation logic error.
    pub fn logic(msg: impl Into<String>) -> Self {
        Self::Logic(msg.into())
    }

    /// Creates a lifecycle error.
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }
}
