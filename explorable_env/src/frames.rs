//! Animation-frame request bookkeeping shared by host implementations.

use crate::types::FrameHandle;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

/// Pending animation-frame requests of one host.
///
/// Mirrors `requestAnimationFrame` semantics:
/// - every request gets a fresh, increasing handle
/// - a cancelled request never becomes due
/// - at a vsync, every pending request becomes due exactly once
#[derive(Debug, Default)]
pub struct FrameQueue {
    /// Next handle id to issue
    next_id: Cell<u64>,

    /// Requests waiting for the next vsync
    pending: RefCell<BTreeSet<FrameHandle>>,

    /// Requests that fired at the last vsync and were not yet taken
    due: RefCell<Vec<FrameHandle>>,
}

impl FrameQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new request and returns its handle.
    pub fn request(&self) -> FrameHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let handle = FrameHandle(id);
        self.pending.borrow_mut().insert(handle);
        handle
    }

    /// Cancels a request, whether it is still pending or already due.
    pub fn cancel(&self, handle: FrameHandle) {
        self.pending.borrow_mut().remove(&handle);
        self.due.borrow_mut().retain(|h| *h != handle);
    }

    /// Moves every pending request to the due list (one vsync).
    pub fn fire(&self) {
        let fired = std::mem::take(&mut *self.pending.borrow_mut());
        self.due.borrow_mut().extend(fired);
    }

    /// Drains due requests in request order.
    pub fn take_due(&self) -> Vec<FrameHandle> {
        std::mem::take(&mut *self.due.borrow_mut())
    }

    /// Returns the number of requests waiting for a vsync.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Returns true if the handle is pending or due.
    pub fn is_outstanding(&self, handle: FrameHandle) -> bool {
        self.pending.borrow().contains(&handle) || self.due.borrow().contains(&handle)
    }
}
