//! Observer types for the observable graph.
//!
//! An Observer is a callback registered on an observable. Every registration
//! gets a unique [`ObserverId`], so two registrations of the same closure are
//! independent and must be released independently.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

/// Unique identifier for an observer registration.
///
/// Each call to `add_observer` gets a fresh ID. The ID is what
/// `remove_observer` matches on, since closures have no identity of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

/// An observer callback.
///
/// Called with the current value and the changed path. The path is empty when
/// the whole value changed, and on the replay call made at registration.
pub type Observer<T> = Arc<dyn Fn(&T, &str) + Send + Sync>;

/// Ordered set of observer registrations.
///
/// Iteration order is registration order. Removal keeps the order of the
/// remaining entries.
pub struct ObserverList<T> {
    entries: IndexMap<ObserverId, Observer<T>>,
}

impl<T> ObserverList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Append an observer and return its registration ID.
    pub fn insert(&mut self, observer: Observer<T>) -> ObserverId {
        let id = ObserverId::new();
        self.entries.insert(id, observer);
        id
    }

    /// Remove a registration. Returns `false` if it was not present.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        self.entries.shift_remove(&id).is_some()
    }

    /// Whether `id` is still registered.
    pub fn contains(&self, id: ObserverId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy out the current registrations so they can be called without
    /// holding the lock that guards this list.
    pub fn snapshot(&self) -> Vec<(ObserverId, Observer<T>)> {
        self.entries
            .iter()
            .map(|(id, observer)| (*id, Arc::clone(observer)))
            .collect()
    }
}

impl<T> Default for ObserverList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by `add_observer`.
///
/// Calling [`unsubscribe`](Subscription::unsubscribe) removes exactly the
/// registration that produced this handle. It is idempotent: the second and
/// later calls do nothing. Dropping a `Subscription` does *not* unsubscribe.
pub struct Subscription {
    id: Option<ObserverId>,
    release: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    /// Create a handle that runs `release` on the first `unsubscribe`.
    pub fn new<F>(id: ObserverId, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: Some(id),
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// A subscription with nothing to release, returned when observing a
    /// plain value.
    pub fn noop() -> Self {
        Self {
            id: None,
            release: Mutex::new(None),
        }
    }

    /// The registration this handle releases, if any.
    pub fn id(&self) -> Option<ObserverId> {
        self.id
    }

    /// Whether `unsubscribe` still has something to release.
    pub fn is_active(&self) -> bool {
        self.release.lock().is_some()
    }

    /// Remove the registration. Later calls do nothing.
    pub fn unsubscribe(&self) {
        // Take the closure out first so it runs without the lock held.
        let release = self.release.lock().take();
        if let Some(release) = release {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
