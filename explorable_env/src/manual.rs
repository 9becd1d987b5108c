//! Manual host implementing HostContext for deterministic stepping.

use crate::error::EnvError;
use crate::frames::FrameQueue;
use crate::types::{refresh_interval, sanitize_pixel_ratio, FrameHandle, DEFAULT_REFRESH_HZ};
use crate::HostContext;
use async_trait::async_trait;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Host backed by a virtual clock.
///
/// This implements `HostContext` using:
/// - A virtual clock that only moves when advanced (by hand or by `vsync()`)
/// - The shared `FrameQueue` for animation-frame requests
///
/// Nothing here touches the wall clock, so runs driven by a `ManualHost`
/// produce the same ticks on every machine.
pub struct ManualHost {
    /// Current virtual time (nanoseconds since host creation)
    virtual_time_ns: Cell<u64>,

    /// Interval between two display refreshes
    frame_interval: Duration,

    /// Device pixel ratio reported to mounted surfaces
    pixel_ratio: f64,

    /// Pending animation-frame requests
    frames: FrameQueue,
}

impl ManualHost {
    /// Creates a new ManualHost at the default 60 Hz refresh rate.
    pub fn new() -> Self {
        Self {
            virtual_time_ns: Cell::new(0),
            frame_interval: Duration::from_nanos((1e9 / DEFAULT_REFRESH_HZ) as u64),
            pixel_ratio: 1.0,
            frames: FrameQueue::new(),
        }
    }

    /// Creates a host whose vsync advances time by `1 / refresh_hz` seconds.
    pub fn with_refresh_rate(refresh_hz: f64) -> Result<Self, EnvError> {
        Ok(Self::with_frame_interval(refresh_interval(refresh_hz)?))
    }

    /// Creates a host whose vsync advances time by exactly `interval`.
    pub fn with_frame_interval(interval: Duration) -> Self {
        Self {
            frame_interval: interval,
            ..Self::new()
        }
    }

    /// Sets the reported device pixel ratio.
    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = sanitize_pixel_ratio(ratio);
        self
    }

    /// Creates an Rc-wrapped host for sharing.
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        let time = self.virtual_time_ns.get();
        self.virtual_time_ns.set(time + duration.as_nanos() as u64);
    }

    /// Sets the virtual time to a specific value.
    pub fn set_time(&self, time_ns: u64) {
        self.virtual_time_ns.set(time_ns);
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        self.virtual_time_ns.get()
    }

    /// Returns the interval one vsync advances the clock by.
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Returns the number of frame requests waiting for a vsync.
    pub fn pending_frames(&self) -> usize {
        self.frames.pending_count()
    }

    /// Returns true if the handle has been requested and not yet taken or cancelled.
    pub fn is_outstanding(&self, handle: FrameHandle) -> bool {
        self.frames.is_outstanding(handle)
    }

    /// Performs one vsync synchronously.
    pub fn step(&self) {
        self.advance_time(self.frame_interval);
        self.frames.fire();
    }
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl HostContext for ManualHost {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.virtual_time_ns.get())
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
        // Virtual vsync: no waiting, the clock jumps one refresh interval
        self.step();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_host_time() {
        let host = ManualHost::new();
        assert_eq!(host.now(), Duration::ZERO);

        host.advance_time(Duration::from_secs(1));
        assert_eq!(host.now(), Duration::from_secs(1));

        host.advance_time(Duration::from_millis(500));
        assert_eq!(host.now(), Duration::from_millis(1500));

        host.set_time(0);
        assert_eq!(host.now(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_manual_vsync_advances_one_interval() {
        let host = ManualHost::with_frame_interval(Duration::from_millis(500));
        let handle = host.request_frame();

        host.vsync().await;

        assert_eq!(host.now(), Duration::from_millis(500));
        assert_eq!(host.take_due_frames(), vec![handle]);
        assert!(!host.is_outstanding(handle));
    }

    #[test]
    fn test_manual_cancel_before_vsync() {
        let host = ManualHost::new();
        let handle = host.request_frame();
        assert_eq!(host.pending_frames(), 1);

        host.cancel_frame(handle);
        host.step();

        assert!(host.take_due_frames().is_empty());
    }

    #[test]
    fn test_manual_refresh_rate() {
        let host = ManualHost::with_refresh_rate(4.0).unwrap();
        assert_eq!(host.frame_interval(), Duration::from_millis(250));
        assert!(ManualHost::with_refresh_rate(-60.0).is_err());
    }
}
