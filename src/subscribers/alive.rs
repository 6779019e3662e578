//! # AliveTracker – track currently running services
//!
//! Maintains an in-memory set of **alive** service names by listening to
//! [`EventKind::ServiceStarting`], [`EventKind::ServiceStopped`] and
//! [`EventKind::ServiceFailed`].
//!
//! The orchestrator asks it which services are still running when the shutdown
//! grace period runs out.
//!
//! ## Internal scheme
//! ```text
//! on_event(ev):
//!   ├─ ServiceStarting              => insert(name)
//!   ├─ ServiceStopped | ServiceFailed => remove(name)
//!   └─ otherwise: ignore
//!
//! snapshot() -> Vec<String>  (sorted copy of the current set)
//! ```

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Tracks the set of currently running service names.
pub struct AliveTracker {
    inner: RwLock<HashSet<String>>,
}

impl AliveTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashSet::new()),
        }
    }

    /// Returns a sorted snapshot of currently alive service names.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        let g = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut v: Vec<String> = g.iter().cloned().collect();
        v.sort_unstable();
        v
    }

    /// Applies one event; returns `true` if the alive set changed.
    pub fn update(&self, ev: &Event) -> bool {
        let Some(name) = ev.service.as_deref() else {
            return false;
        };
        let mut g = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match ev.kind {
            EventKind::ServiceStarting => g.insert(name.to_owned()),
            EventKind::ServiceStopped | EventKind::ServiceFailed => g.remove(name),
            _ => false,
        }
    }
}

#[async_trait]
impl Subscribe for AliveTracker {
    async fn on_event(&self, ev: &Event) {
        self.update(ev);
    }

    fn name(&self) -> &'static str {
        "AliveTracker"
    }
}

impl Default for AliveTracker {
    fn default() -> Self {
        Self::new()
    }
}
