//! Intersection (viewport visibility) abstraction for a surface container.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Callback receiving the raw "is intersecting" flag of an observed container.
pub type IntersectionCallback = Box<dyn FnMut(bool)>;

/// Source of intersection entries for one surface container.
///
/// # Implementations
///
/// - **Browser-like hosts**: wrap an `IntersectionObserver` on the container element
/// - **Manual**: `ManualIntersection`, driven by tests and the headless runner
///
/// # Entry Flow
///
/// ```text
/// Container            Source                 Observer
///   |                    |                       |
///   |-- scrolls in ----->|                       |
///   |                    |-- callback(true) ---->|
///   |-- scrolls out ---->|                       |
///   |                    |-- callback(false) --->|
/// ```
///
/// Sources may report the same flag several times in a row; de-duplication
/// into enter/exit transitions is the observer's job.
pub trait IntersectionSource {
    /// Starts observing and delivers entries to `callback` until disconnected.
    fn observe(&self, callback: IntersectionCallback) -> Box<dyn ObserverRegistration>;
}

/// A live observation that can be torn down.
pub trait ObserverRegistration {
    /// Stops delivering entries. Calling twice is a no-op.
    fn disconnect(&mut self);
}

struct Subscriber {
    id: u64,
    callback: IntersectionCallback,
}

#[derive(Default)]
struct ManualState {
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<Subscriber>>,
}

/// Intersection source whose entries are pushed by hand.
///
/// Cloning shares the same container: entries pushed through any clone reach
/// every live observer.
#[derive(Clone, Default)]
pub struct ManualIntersection {
    state: Rc<ManualState>,
}

impl ManualIntersection {
    /// Creates a source with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers an intersection entry to every live observer.
    pub fn set_intersecting(&self, intersecting: bool) {
        // Callbacks only enqueue work for their owners; no re-entrant observe()
        for subscriber in self.state.subscribers.borrow_mut().iter_mut() {
            (subscriber.callback)(intersecting);
        }
    }

    /// Returns the number of live observers.
    pub fn observer_count(&self) -> usize {
        self.state.subscribers.borrow().len()
    }
}

impl IntersectionSource for ManualIntersection {
    fn observe(&self, callback: IntersectionCallback) -> Box<dyn ObserverRegistration> {
        let id = self.state.next_id.get();
        self.state.next_id.set(id + 1);
        self.state
            .subscribers
            .borrow_mut()
            .push(Subscriber { id, callback });

        tracing::debug!(observer = id, "intersection observer attached");
        Box::new(ManualRegistration {
            id,
            state: Rc::downgrade(&self.state),
        })
    }
}

struct ManualRegistration {
    id: u64,
    state: std::rc::Weak<ManualState>,
}

impl ObserverRegistration for ManualRegistration {
    fn disconnect(&mut self) {
        if let Some(state) = self.state.upgrade() {
            let before = state.subscribers.borrow().len();
            state.subscribers.borrow_mut().retain(|s| s.id != self.id);
            if state.subscribers.borrow().len() != before {
                tracing::debug!(observer = self.id, "intersection observer detached");
            }
        }
        self.state = std::rc::Weak::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_reach_observers() {
        let source = ManualIntersection::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let _registration = source.observe(Box::new(move |v| sink.borrow_mut().push(v)));

        source.set_intersecting(true);
        source.set_intersecting(true);
        source.set_intersecting(false);

        // Raw entries, duplicates included
        assert_eq!(*seen.borrow(), vec![true, true, false]);
    }

    #[test]
    fn test_disconnect_stops_delivery() {
        let source = ManualIntersection::new();
        let count = Rc::new(Cell::new(0));

        let sink = Rc::clone(&count);
        let mut registration = source.observe(Box::new(move |_| sink.set(sink.get() + 1)));
        assert_eq!(source.observer_count(), 1);

        registration.disconnect();
        registration.disconnect();
        source.set_intersecting(true);

        assert_eq!(source.observer_count(), 0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_clones_share_container() {
        let source = ManualIntersection::new();
        let other = source.clone();
        let count = Rc::new(Cell::new(0));

        let sink = Rc::clone(&count);
        let _registration = source.observe(Box::new(move |_| sink.set(sink.get() + 1)));
        other.set_intersecting(true);

        assert_eq!(count.get(), 1);
    }
}
