//! Per-instance error isolation.
//!
//! A failure from update or render trips the boundary: the loop halts,
//! the failure is reported as a structured `tracing` error event, and a
//! fallback panel with a "Try again" action replaces the surface until the
//! user retries.

use crate::error::SimError;
use explorable_env::InstanceId;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Label of the fallback panel's retry action.
pub const RETRY_LABEL: &str = "Try again";

/// Where in the lifecycle a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePhase {
    Update,
    Render,
}

/// A captured failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub instance: InstanceId,
    pub phase: FailurePhase,
    pub message: String,
    /// Simulation time when the failure happened
    pub sim_time: f64,
}

/// What the host shows instead of a failed simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackPanel {
    pub title: String,
    pub message: String,
    pub action: String,
}

#[derive(Debug, Default)]
pub struct ErrorBoundary {
    failure: Option<Failure>,
    retries: u32,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure and reports it. The first failure wins until reset.
    pub fn capture(
        &mut self,
        instance: InstanceId,
        phase: FailurePhase,
        err: &SimError,
        sim_time: f64,
    ) {
        error!(
            instance = %instance,
            phase = ?phase,
            sim_time,
            error = %err,
            "Simulation failed"
        );
        if self.failure.is_none() {
            self.failure = Some(Failure {
                instance,
                phase,
                message: err.to_string(),
                sim_time,
            });
        }
    }

    pub fn is_tripped(&self) -> bool {
        self.failure.is_some()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// The panel to show while tripped.
    pub fn fallback(&self, title: &str) -> Option<FallbackPanel> {
        self.failure.as_ref().map(|failure| FallbackPanel {
            title: format!("{title} stopped"),
            message: failure.message.clone(),
            action: RETRY_LABEL.to_string(),
        })
    }

    /// Clears the failure for a retry and returns it.
    pub fn reset(&mut self) -> Option<Failure> {
        let failure = self.failure.take();
        if failure.is_some() {
            self.retries += 1;
        }
        failure
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }
}
