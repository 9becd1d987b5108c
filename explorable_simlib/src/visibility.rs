//! Visibility Observer: turns raw intersection entries into enter/exit transitions.

use explorable_env::{IntersectionSource, ObserverRegistration};
use tracing::debug;

/// Scoped subscription to a container's visibility.
///
/// The callback runs once per transition, never twice in a row with the same
/// value. The subscription is disconnected on [`detach`](Self::detach) or drop.
pub struct VisibilityObserver {
    registration: Option<Box<dyn ObserverRegistration>>,
}

impl VisibilityObserver {
    pub fn attach(
        source: &dyn IntersectionSource,
        mut callback: impl FnMut(bool) + 'static,
    ) -> Self {
        let mut last: Option<bool> = None;
        let registration = source.observe(Box::new(move |visible| {
            if last != Some(visible) {
                last = Some(visible);
                callback(visible);
            }
        }));
        Self {
            registration: Some(registration),
        }
    }

    pub fn detach(&mut self) {
        if let Some(mut registration) = self.registration.take() {
            registration.disconnect();
            debug!("Visibility observer detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.registration.is_some()
    }
}

impl Drop for VisibilityObserver {
    fn drop(&mut self) {
        self.detach();
    }
}
