//! Path-scoped views.
//!
//! A [`PropObservable`] exposes the field at a fixed path inside a parent's
//! structured value. Upstream notifications are filtered by path ancestry:
//!
//! - a change to an unrelated path is ignored without recomputing;
//! - a change at exactly the bound path notifies only if the field differs
//!   from the cached one;
//! - a change above the bound path, including a whole-value write, always
//!   notifies with an empty path;
//! - a change below the bound path always notifies, forwarding the remainder
//!   of the changed path relative to the view.
//!
//! This is what makes fanning many views out over one large state value
//! cheap: each write only reaches the views whose subtree it touched.

use std::fmt::{self, Debug};
use std::sync::Arc;

use smallvec::smallvec;
use tracing::trace;

use crate::equality::Equality;
use crate::error::Result;
use crate::link::DerivedState;
use crate::observable::{Observable, PathObservable, PathObservableRef};
use crate::observer::{Observer, ObserverId, Subscription};
use crate::path::{self, Ancestry, PathValue};

struct PropInner<T> {
    parent: PathObservableRef<T>,
    path: String,
    state: DerivedState<T>,
}

impl<T: PathValue> PropInner<T> {
    fn read(&self) -> T {
        self.parent.get_path(&self.path).unwrap_or_default()
    }

    fn refresh(&self, parent_value: &T, changed: &str) {
        let ancestry = path::classify(&self.path, changed);
        if ancestry == Ancestry::Unrelated {
            trace!(bound = %self.path, changed, "ignoring unrelated change");
            return;
        }

        let next = parent_value.path_get(&self.path).unwrap_or_default();
        let differs = self.state.store(next.clone());

        match ancestry {
            Ancestry::Ancestor => self.state.notify(&next, path::relative(&self.path, changed)),
            Ancestry::Child if differs || changed != self.path => self.state.notify(&next, ""),
            _ => {}
        }
    }

    fn attach(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.state.attach(move || {
            let parent = Arc::clone(&inner.parent);
            let upstream = parent.add_observer(Arc::new(move |value: &T, changed: &str| {
                inner.refresh(value, changed);
            }));
            smallvec![upstream]
        });
    }
}

/// A view of the field at one path inside a parent observable.
///
/// Missing fields read as `T::default()`. Writes go to the parent at the
/// bound path, so every other view of the same parent sees them.
pub struct PropObservable<T> {
    inner: Arc<PropInner<T>>,
}

impl<T: PathValue> PropObservable<T> {
    /// Create a view of `path` inside `parent`.
    pub fn new(parent: PathObservableRef<T>, path: impl Into<String>) -> Self {
        Self::with_equality(parent, path, Equality::partial_eq())
    }

    /// Create a view with a custom change predicate.
    pub fn with_equality(
        parent: PathObservableRef<T>,
        path: impl Into<String>,
        equality: Equality<T>,
    ) -> Self {
        Self {
            inner: Arc::new(PropInner {
                parent,
                path: path.into(),
                state: DerivedState::new("prop", equality),
            }),
        }
    }

    /// The bound path.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Whether the view is hot.
    pub fn is_attached(&self) -> bool {
        self.inner.state.is_attached()
    }
}

impl<T: PathValue> Observable<T> for PropObservable<T> {
    fn get(&self) -> T {
        if self.inner.state.is_attached() {
            if let Some(value) = self.inner.state.cached() {
                return value;
            }
        }
        self.inner.read()
    }

    fn set(&self, value: T) -> Result<bool> {
        self.inner.parent.set_path(&self.inner.path, value)
    }

    fn add_observer(&self, observer: Observer<T>) -> Subscription {
        self.inner.attach();
        let id = self.inner.state.register(Arc::clone(&observer));
        observer(&self.get(), "");

        let inner = Arc::clone(&self.inner);
        Subscription::new(id, move || {
            inner.state.release(id);
        })
    }

    fn remove_observer(&self, id: ObserverId) {
        self.inner.state.release(id);
    }

    fn observer_count(&self) -> usize {
        self.inner.state.observer_count()
    }
}

impl<T: PathValue> PathObservable<T> for PropObservable<T> {
    fn get_path(&self, sub: &str) -> Option<T> {
        self.get().path_get(sub)
    }

    fn set_path(&self, sub: &str, value: T) -> Result<bool> {
        self.inner
            .parent
            .set_path(&path::join(&self.inner.path, sub), value)
    }
}

impl<T> Clone for PropObservable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for PropObservable<T>
where
    T: PathValue + Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropObservable")
            .field("path", &self.inner.path)
            .field("attached", &self.is_attached())
            .field("cached", &self.inner.state.cached())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
