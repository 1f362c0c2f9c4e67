//! Navigation boundary invoked after auth transitions.

use std::sync::{Mutex, PoisonError};

/// Route changer provided by the embedding front end.
pub trait Navigator: Send + Sync {
    fn go_to(&self, route: &str);
}

/// Headless navigator: remembers the current route and logs each change.
#[derive(Debug, Default)]
pub struct RouteTracker {
    current: Mutex<Option<String>>,
}

impl RouteTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route of the most recent navigation, if any.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Navigator for RouteTracker {
    fn go_to(&self, route: &str) {
        tracing::info!(route, "navigate");
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(route.to_owned());
    }
}
