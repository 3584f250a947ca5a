//! Transform observables.
//!
//! A [`TransformObservable`] maps a parent's value through a [`Transformer`].
//! A `ReadWrite` transformer also carries the inverse, so writes to the view
//! are mapped back and written to the parent. Writes through a `ReadOnly`
//! transformer, and path writes through any transformer, are rejected.

use std::fmt::{self, Debug};
use std::sync::Arc;

use smallvec::smallvec;

use crate::equality::Equality;
use crate::error::{ObservableError, Result};
use crate::link::DerivedState;
use crate::observable::{Observable, ObservableRef, PathObservable};
use crate::observer::{Observer, ObserverId, Subscription};
use crate::path::PathValue;

type Forward<T, U> = Arc<dyn Fn(&T) -> U + Send + Sync>;
type Backward<T, U> = Arc<dyn Fn(&U) -> T + Send + Sync>;

/// The function pair behind a transform.
pub enum Transformer<T, U> {
    /// Forward only.
    ReadOnly(Forward<T, U>),
    /// Forward and inverse.
    ReadWrite(Forward<T, U>, Backward<T, U>),
}

impl<T, U> Transformer<T, U> {
    /// A one-way transformer.
    pub fn read_only<F>(get: F) -> Self
    where
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        Transformer::ReadOnly(Arc::new(get))
    }

    /// A two-way transformer with `set` as the inverse of `get`.
    pub fn read_write<F, G>(get: F, set: G) -> Self
    where
        F: Fn(&T) -> U + Send + Sync + 'static,
        G: Fn(&U) -> T + Send + Sync + 'static,
    {
        Transformer::ReadWrite(Arc::new(get), Arc::new(set))
    }

    /// Map a parent value to the view's type.
    pub fn apply(&self, value: &T) -> U {
        match self {
            Transformer::ReadOnly(get) | Transformer::ReadWrite(get, _) => get(value),
        }
    }

    /// Map a view value back to the parent's type, if an inverse exists.
    pub fn invert(&self, value: &U) -> Option<T> {
        match self {
            Transformer::ReadOnly(_) => None,
            Transformer::ReadWrite(_, set) => Some(set(value)),
        }
    }

    /// Whether the transformer carries an inverse.
    pub fn is_invertible(&self) -> bool {
        matches!(self, Transformer::ReadWrite(..))
    }
}

impl<T, U> Clone for Transformer<T, U> {
    fn clone(&self) -> Self {
        match self {
            Transformer::ReadOnly(get) => Transformer::ReadOnly(Arc::clone(get)),
            Transformer::ReadWrite(get, set) => {
                Transformer::ReadWrite(Arc::clone(get), Arc::clone(set))
            }
        }
    }
}

struct TransformInner<T, U> {
    parent: ObservableRef<T>,
    transformer: Transformer<T, U>,
    state: DerivedState<U>,
}

impl<T, U> TransformInner<T, U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    fn refresh(&self, value: &T) {
        let next = self.transformer.apply(value);
        if self.state.store(next.clone()) {
            self.state.notify(&next, "");
        }
    }

    /// Subscribe to the parent. The upstream observer owns `self`, so the
    /// view stays alive for as long as it is hot.
    fn attach(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.state.attach(move || {
            let parent = Arc::clone(&inner.parent);
            let upstream = parent.add_observer(Arc::new(move |value: &T, _: &str| {
                inner.refresh(value);
            }));
            smallvec![upstream]
        });
    }
}

/// A view of a parent observable mapped through a [`Transformer`].
///
/// While cold, every `get` recomputes from the parent. While hot, the mapped
/// value is cached and observers are only told when it changes.
pub struct TransformObservable<T, U> {
    inner: Arc<TransformInner<T, U>>,
}

impl<T, U> TransformObservable<T, U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    /// Create a transform whose results are compared with `PartialEq`.
    pub fn new(parent: ObservableRef<T>, transformer: Transformer<T, U>) -> Self
    where
        U: PartialEq,
    {
        Self::with_equality(parent, transformer, Equality::partial_eq())
    }

    /// Create a transform with a custom change predicate.
    pub fn with_equality(
        parent: ObservableRef<T>,
        transformer: Transformer<T, U>,
        equality: Equality<U>,
    ) -> Self {
        Self {
            inner: Arc::new(TransformInner {
                parent,
                transformer,
                state: DerivedState::new("transform", equality),
            }),
        }
    }

    /// The transformer this view maps through.
    pub fn transformer(&self) -> &Transformer<T, U> {
        &self.inner.transformer
    }

    /// Whether the view is hot.
    pub fn is_attached(&self) -> bool {
        self.inner.state.is_attached()
    }
}

impl<T, U> Observable<U> for TransformObservable<T, U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    fn get(&self) -> U {
        if self.inner.state.is_attached() {
            if let Some(value) = self.inner.state.cached() {
                return value;
            }
        }
        self.inner.transformer.apply(&self.inner.parent.get())
    }

    fn set(&self, value: U) -> Result<bool> {
        match self.inner.transformer.invert(&value) {
            Some(parent_value) => self.inner.parent.set(parent_value),
            None => Err(ObservableError::MissingInverse),
        }
    }

    fn add_observer(&self, observer: Observer<U>) -> Subscription {
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

impl<T, U> PathObservable<U> for TransformObservable<T, U>
where
    T: Clone + Send + Sync + 'static,
    U: PathValue,
{
    fn get_path(&self, path: &str) -> Option<U> {
        self.get().path_get(path)
    }

    fn set_path(&self, path: &str, _value: U) -> Result<bool> {
        Err(ObservableError::TransformPath {
            path: path.to_owned(),
        })
    }
}

impl<T, U> Clone for TransformObservable<T, U> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, U> Debug for TransformObservable<T, U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformObservable")
            .field("invertible", &self.inner.transformer.is_invertible())
            .field("attached", &self.is_attached())
            .field("cached", &self.inner.state.cached())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
