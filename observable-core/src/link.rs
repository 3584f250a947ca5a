//! Upstream link shared by derived observables.
//!
//! A derived observable is either `Detached` (cold: no observers, no upstream
//! subscription, no cached value) or `Attached` (hot: at least one observer,
//! subscribed upstream, cached value kept current). The transition to
//! `Attached` happens when the first observer registers, the transition back
//! when the last one leaves.
//!
//! No lock in this module is held while an observer or an upstream
//! subscription runs, so observers may re-enter the graph freely.

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::equality::Equality;
use crate::observer::{Observer, ObserverId, ObserverList, Subscription};

/// Subscriptions a derived observable holds on its parents.
pub type Upstream = SmallVec<[Subscription; 4]>;

/// Subscription state of a derived observable.
#[derive(Default)]
pub(crate) enum Link {
    #[default]
    Detached,
    Attached(Upstream),
}

impl Link {
    pub(crate) fn is_attached(&self) -> bool {
        matches!(self, Link::Attached(_))
    }

    /// Move to `Detached`, handing back the upstream subscriptions.
    fn take(&mut self) -> Option<Upstream> {
        match std::mem::take(self) {
            Link::Attached(upstream) => Some(upstream),
            Link::Detached => None,
        }
    }
}

/// Observer list, cached value and link of a derived observable.
pub(crate) struct DerivedState<U> {
    kind: &'static str,
    observers: RwLock<ObserverList<U>>,
    cache: RwLock<Option<U>>,
    link: Mutex<Link>,
    equality: Equality<U>,
}

impl<U> DerivedState<U>
where
    U: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(kind: &'static str, equality: Equality<U>) -> Self {
        Self {
            kind,
            observers: RwLock::new(ObserverList::new()),
            cache: RwLock::new(None),
            link: Mutex::new(Link::Detached),
            equality,
        }
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.link.lock().is_attached()
    }

    pub(crate) fn cached(&self) -> Option<U> {
        self.cache.read().clone()
    }

    /// Replace the cached value. Returns whether it differs from the previous
    /// one; a missing previous value counts as a change.
    pub(crate) fn store(&self, value: U) -> bool {
        let mut cache = self.cache.write();
        let changed = match cache.as_ref() {
            Some(old) => self.equality.changed(old, &value),
            None => true,
        };
        *cache = Some(value);
        changed
    }

    /// Call every registered observer in registration order.
    ///
    /// Observers removed by an earlier observer in the same pass are skipped.
    pub(crate) fn notify(&self, value: &U, path: &str) {
        let observers = self.observers.read().snapshot();
        trace!(kind = self.kind, path, count = observers.len(), "notifying observers");
        for (id, observer) in observers {
            if self.observers.read().contains(id) {
                observer(value, path);
            }
        }
    }

    pub(crate) fn register(&self, observer: Observer<U>) -> ObserverId {
        self.observers.write().insert(observer)
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Subscribe upstream with `connect` unless already attached.
    ///
    /// Returns `true` if this call performed the transition.
    pub(crate) fn attach<F>(&self, connect: F) -> bool
    where
        F: FnOnce() -> Upstream,
    {
        if self.is_attached() {
            return false;
        }

        let upstream = connect();

        let mut link = self.link.lock();
        if link.is_attached() {
            // A re-entrant call attached while `connect` ran.
            drop(link);
            release(upstream);
            return false;
        }
        *link = Link::Attached(upstream);
        debug!(kind = self.kind, "derived observable attached");
        true
    }

    /// Remove a registration. Returns `true` if it was the last one and the
    /// observable went cold.
    pub(crate) fn release(&self, id: ObserverId) -> bool {
        let now_empty = {
            let mut observers = self.observers.write();
            observers.remove(id) && observers.is_empty()
        };
        if !now_empty {
            return false;
        }

        let upstream = self.link.lock().take();
        *self.cache.write() = None;
        match upstream {
            Some(upstream) => {
                release(upstream);
                debug!(kind = self.kind, "derived observable detached");
                true
            }
            None => false,
        }
    }
}

fn release(upstream: Upstream) {
    for subscription in upstream {
        subscription.unsubscribe();
    }
}
