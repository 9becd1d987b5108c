//! Production implementation of HostContext using Tokio.

use crate::error::EnvError;
use crate::frames::FrameQueue;
use crate::types::{refresh_interval, sanitize_pixel_ratio, FrameHandle, DEFAULT_REFRESH_HZ};
use crate::HostContext;
use async_trait::async_trait;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Production host backed by the system clock and tokio timers.
///
/// This is the "real" implementation used by the headless runner in
/// real-time mode. Time comes from the monotonic system clock; vsync is a
/// tokio sleep of one refresh interval.
pub struct TokioHost {
    /// Start time for monotonic duration calculations
    start: Instant,

    /// Interval between two display refreshes
    frame_interval: Duration,

    /// Device pixel ratio reported to mounted surfaces
    pixel_ratio: f64,

    /// Pending animation-frame requests
    frames: FrameQueue,
}

impl TokioHost {
    /// Creates a new TokioHost at the default 60 Hz refresh rate.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frame_interval: Duration::from_nanos((1e9 / DEFAULT_REFRESH_HZ) as u64),
            pixel_ratio: 1.0,
            frames: FrameQueue::new(),
        }
    }

    /// Creates a host refreshing at `refresh_hz`.
    pub fn with_refresh_rate(refresh_hz: f64) -> Result<Self, EnvError> {
        Ok(Self {
            frame_interval: refresh_interval(refresh_hz)?,
            ..Self::new()
        })
    }

    /// Sets the reported device pixel ratio.
    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = sanitize_pixel_ratio(ratio);
        self
    }

    /// Creates an Rc-wrapped host for sharing between mounted instances.
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Returns the interval between two vsyncs.
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }
}

impl Default for TokioHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl HostContext for TokioHost {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn request_frame(&self) -> FrameHandle {
        self.frames.request()
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.frames.cancel(handle);
    }

    fn take_due_frames(&self) -> Vec<FrameHandle> {
        self.frames.take_due()
    }

    async fn vsync(&self) {
        tokio::time::sleep(self.frame_interval).await;
        self.frames.fire();
    }
}
