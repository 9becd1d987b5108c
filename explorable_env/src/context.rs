//! Core host context trait for mounted simulations.

use crate::types::FrameHandle;
use async_trait::async_trait;
use std::time::Duration;

/// The central interface for host interaction.
///
/// This trait abstracts the display host so that the scheduler can run
/// against a real clock (tokio) or a virtual one (manual stepping).
///
/// # Implementations
///
/// - **Production**: `TokioHost` - wraps `std::time::Instant` and `tokio::time`
/// - **Manual**: `ManualHost` - virtual clock advanced by `vsync()` or by hand
///
/// # Threading
///
/// Hosts are single-threaded. Frame bookkeeping uses interior mutability and
/// is never shared across threads, so the trait carries no `Send` bound.
#[async_trait(?Send)]
pub trait HostContext: 'static {
    /// Returns the current monotonic time since host creation.
    fn now(&self) -> Duration;

    /// Returns the display's device pixel ratio.
    ///
    /// Backing surfaces are sized to `css size × device_pixel_ratio`.
    fn device_pixel_ratio(&self) -> f64;

    /// Requests a callback at the next display refresh.
    ///
    /// Equivalent of `requestAnimationFrame`: the returned handle becomes due
    /// exactly once, at the next vsync, unless cancelled first.
    fn request_frame(&self) -> FrameHandle;

    /// Cancels a pending frame request. Unknown handles are ignored.
    fn cancel_frame(&self, handle: FrameHandle);

    /// Drains the frame requests that became due at the last vsync.
    fn take_due_frames(&self) -> Vec<FrameHandle>;

    /// Suspends until the next display refresh.
    ///
    /// In production: sleeps one refresh interval on tokio
    /// In manual mode: advances the virtual clock by one refresh interval
    async fn vsync(&self);
}
