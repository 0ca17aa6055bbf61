//! Subscriber registry.
//!
//! Maps event type names to listeners in registration order. Listeners
//! are compared by identity (`Arc::ptr_eq`), so unsubscribing requires the
//! same handle that was registered.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::protocol::BroadcastEvent;

// ============================================================================
// Types
// ============================================================================

/// Subscriber callback.
pub type Listener = Arc<dyn Fn(&BroadcastEvent) + Send + Sync>;

/// Wraps a closure as a [`Listener`].
#[inline]
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&BroadcastEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

// ============================================================================
// SubscriberRegistry
// ============================================================================

/// Event name → ordered listeners.
#[derive(Default)]
pub struct SubscriberRegistry {
    entries: FxHashMap<String, Vec<Listener>>,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `listener` to `event`'s list, creating it if absent.
    pub fn subscribe(&mut self, event: impl Into<String>, listener: Listener) {
        self.entries.entry(event.into()).or_default().push(listener);
    }

    /// Removes the first registration of `listener` under `event`.
    ///
    /// Returns `true` if something was removed.
    pub fn unsubscribe(&mut self, event: &str, listener: &Listener) -> bool {
        let Some(list) = self.entries.get_mut(event) else {
            return false;
        };
        let Some(index) = list.iter().position(|l| Arc::ptr_eq(l, listener)) else {
            return false;
        };

        list.remove(index);
        if list.is_empty() {
            self.entries.remove(event);
        }
        true
    }

    /// Removes every listener for `event`.
    pub fn unsubscribe_all(&mut self, event: &str) {
        self.entries.remove(event);
    }

    /// Returns `event`'s listeners in registration order.
    #[must_use]
    pub fn listeners(&self, event: &str) -> Vec<Listener> {
        self.entries.get(event).cloned().unwrap_or_default()
    }

    /// Returns event names that have at least one listener, sorted.
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Returns the total number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for name in self.event_names() {
            map.entry(&name, &self.entries[&name].len());
        }
        map.finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
