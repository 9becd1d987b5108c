//! Explorable Host Environment Abstraction
//!
//! This crate provides the "Sans-IO" layer that lets the simulation runtime
//! run against a real host (tokio wall clock) or a manual host (virtual clock)
//! without knowing which one it is talking to.
//!
//! # Core Concept: The Frame Loop
//!
//! A browser-like host gives a simulation three things:
//! - Time (`now()`, `vsync()`)
//! - Animation frames (`request_frame()`, `cancel_frame()`, `take_due_frames()`)
//! - Visibility (an [`IntersectionSource`] reporting enter/exit of the viewport)
//!
//! Everything runs on one thread. Frame requests behave like
//! `requestAnimationFrame`: a request made before a vsync becomes due exactly
//! once at that vsync, and a cancelled request never fires.
//!
//! # Example
//!
//! ```ignore
//! use explorable_env::{HostContext, ManualHost};
//!
//! let host = ManualHost::new();
//! let handle = host.request_frame();
//! host.vsync().await;
//! assert_eq!(host.take_due_frames(), vec![handle]);
//! ```

mod context;
mod error;
mod frames;
mod intersection;
mod manual;
mod tokio_impl;
mod types;

pub use context::HostContext;
pub use error::EnvError;
pub use frames::FrameQueue;
pub use intersection::{
    IntersectionCallback, IntersectionSource, ManualIntersection, ObserverRegistration,
};
pub use manual::ManualHost;
pub use tokio_impl::TokioHost;
pub use types::{FrameHandle, InstanceId, DEFAULT_REFRESH_HZ};
