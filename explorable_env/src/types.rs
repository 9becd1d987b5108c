//! Common types for the host environment abstraction.

use crate::error::EnvError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Default display refresh rate in Hz.
pub const DEFAULT_REFRESH_HZ: f64 = 60.0;

/// Handle to one pending animation-frame request.
///
/// Handles are issued in increasing order by a host and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameHandle(pub u64);

impl std::fmt::Display for FrameHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Unique identifier for one mounted simulation instance.
///
/// Uses UUID v4 for uniqueness without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    /// Creates a new random InstanceId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic InstanceId from a seed (for reproducible runs).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Converts a refresh rate into the interval between two vsyncs.
pub(crate) fn refresh_interval(refresh_hz: f64) -> Result<Duration, EnvError> {
    if !refresh_hz.is_finite() || refresh_hz <= 0.0 {
        return Err(EnvError::context(format!(
            "refresh rate must be positive, got {refresh_hz}"
        )));
    }
    Ok(Duration::from_nanos((1e9 / refresh_hz) as u64))
}

/// Clamps a reported device pixel ratio to something usable.
pub(crate) fn sanitize_pixel_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_from_seed_is_deterministic() {
        assert_eq!(InstanceId::from_seed(7), InstanceId::from_seed(7));
        assert_ne!(InstanceId::from_seed(7), InstanceId::from_seed(8));
    }

    #[test]
    fn test_instance_id_display_is_short() {
        let id = InstanceId::from_seed(42);
        assert_eq!(id.to_string().len(), 8);
    }

    #[test]
    fn test_refresh_interval() {
        assert_eq!(refresh_interval(2.0).unwrap(), Duration::from_millis(500));
        assert_eq!(refresh_interval(60.0).unwrap(), Duration::from_nanos(16_666_666));
        assert!(refresh_interval(0.0).is_err());
        assert!(refresh_interval(f64::NAN).is_err());
    }

    #[test]
    fn test_sanitize_pixel_ratio() {
        assert_eq!(sanitize_pixel_ratio(2.0), 2.0);
        assert_eq!(sanitize_pixel_ratio(0.0), 1.0);
        assert_eq!(sanitize_pixel_ratio(f64::INFINITY), 1.0);
    }
}
