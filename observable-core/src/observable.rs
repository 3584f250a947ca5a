//! Observable values.
//!
//! [`Observable`] is the contract every node of the graph implements: read the
//! current value, write it, and register observers that are told about
//! changes. [`PathObservable`] adds reads and writes addressed by path for
//! structured values.
//!
//! [`Var`] is the source node: it owns its value. Every other node is derived
//! from one or more observables and is created through the helpers on
//! [`ObservableExt`] or the constructors in [`crate::maybe`].
//!
//! # Notification
//!
//! A write that changes the value calls every observer synchronously, in
//! registration order, before returning. Observers receive the new value and
//! the path that changed (empty for a whole-value write). Observers may write
//! back into the graph; the change propagates depth first. Nothing detects
//! cycles, so a cyclic graph recurses until the stack runs out.
//!
//! # Replay
//!
//! Registering an observer calls it once, immediately, with the current value
//! and an empty path.

use std::fmt::{self, Debug};
use std::ops::{Add, Div, Mul, Rem, Sub};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;

use crate::dependent::{all, any, DependentObservable};
use crate::equality::Equality;
use crate::error::Result;
use crate::maybe::MaybeObservable;
use crate::observer::{Observer, ObserverId, ObserverList, Subscription};
use crate::path::PathValue;
use crate::prop::PropObservable;
use crate::transform::{Transformer, TransformObservable};
use crate::truthy::{Nullable, Truthy};

/// A node of the observable graph.
pub trait Observable<T>: Send + Sync {
    /// The current value. Cold derived observables compute it on demand.
    fn get(&self) -> T;

    /// Replace the value. Returns whether it changed.
    ///
    /// Read-only observables return an error instead.
    fn set(&self, value: T) -> Result<bool>;

    /// Register an observer and replay the current value to it.
    fn add_observer(&self, observer: Observer<T>) -> Subscription;

    /// Remove a registration. Unknown IDs are ignored.
    fn remove_observer(&self, id: ObserverId);

    /// Number of registered observers.
    fn observer_count(&self) -> usize;
}

/// Observables over structured values, addressable by path.
pub trait PathObservable<T: PathValue>: Observable<T> {
    /// Read the field at `path`, `None` if any segment is missing.
    fn get_path(&self, path: &str) -> Option<T>;

    /// Write the field at `path` and notify observers with that path if
    /// anything changed.
    fn set_path(&self, path: &str, value: T) -> Result<bool>;
}

/// Shared handle to any observable.
pub type ObservableRef<T> = Arc<dyn Observable<T>>;

/// Shared handle to any path-addressable observable.
pub type PathObservableRef<T> = Arc<dyn PathObservable<T>>;

impl<T, O> Observable<T> for Arc<O>
where
    O: Observable<T> + ?Sized,
{
    fn get(&self) -> T {
        (**self).get()
    }

    fn set(&self, value: T) -> Result<bool> {
        (**self).set(value)
    }

    fn add_observer(&self, observer: Observer<T>) -> Subscription {
        (**self).add_observer(observer)
    }

    fn remove_observer(&self, id: ObserverId) {
        (**self).remove_observer(id)
    }

    fn observer_count(&self) -> usize {
        (**self).observer_count()
    }
}

impl<T, O> PathObservable<T> for Arc<O>
where
    T: PathValue,
    O: PathObservable<T> + ?Sized,
{
    fn get_path(&self, path: &str) -> Option<T> {
        (**self).get_path(path)
    }

    fn set_path(&self, path: &str, value: T) -> Result<bool> {
        (**self).set_path(path, value)
    }
}

/// Derivations available on every observable handle.
///
/// None of these mutate the receiver except the arithmetic helpers, which are
/// a read followed by a `set`.
pub trait ObservableExt<T>: Observable<T> + Clone + Sized + 'static
where
    T: Clone + Send + Sync + 'static,
{
    /// Register a closure as an observer.
    fn observe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T, &str) + Send + Sync + 'static,
    {
        self.add_observer(Arc::new(observer))
    }

    /// A shared trait-object handle to this observable.
    fn boxed(&self) -> ObservableRef<T> {
        Arc::new(self.clone())
    }

    /// A read-only view of the value mapped through `get`.
    fn transform<U, F>(&self, get: F) -> TransformObservable<T, U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        TransformObservable::new(self.boxed(), Transformer::read_only(get))
    }

    /// A view through an explicit transformer, which may be two-way.
    fn transform_with<U>(&self, transformer: Transformer<T, U>) -> TransformObservable<T, U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
    {
        TransformObservable::new(self.boxed(), transformer)
    }

    /// A view of the field at `path`.
    fn prop(&self, path: impl Into<String>) -> PropObservable<T>
    where
        T: PathValue,
        Self: PathObservable<T>,
    {
        PropObservable::new(Arc::new(self.clone()), path)
    }

    /// A transform applied to the field at `path`.
    fn transform_path<U>(
        &self,
        path: impl Into<String>,
        transformer: Transformer<T, U>,
    ) -> TransformObservable<T, U>
    where
        T: PathValue,
        Self: PathObservable<T>,
        U: Clone + PartialEq + Send + Sync + 'static,
    {
        self.prop(path).transform_with(transformer)
    }

    /// True while the value is greater than `other`.
    fn gt(&self, other: T) -> TransformObservable<T, bool>
    where
        T: PartialOrd,
    {
        self.transform(move |value| *value > other)
    }

    /// True while the value is less than `other`.
    fn lt(&self, other: T) -> TransformObservable<T, bool>
    where
        T: PartialOrd,
    {
        self.transform(move |value| *value < other)
    }

    /// True while the value is at least `other`.
    fn ge(&self, other: T) -> TransformObservable<T, bool>
    where
        T: PartialOrd,
    {
        self.transform(move |value| *value >= other)
    }

    /// True while the value is at most `other`.
    fn le(&self, other: T) -> TransformObservable<T, bool>
    where
        T: PartialOrd,
    {
        self.transform(move |value| *value <= other)
    }

    /// True while the value equals `other`.
    fn equals(&self, other: T) -> TransformObservable<T, bool>
    where
        T: PartialEq,
    {
        self.transform(move |value| *value == other)
    }

    /// True while the value is null.
    fn is_null(&self) -> TransformObservable<T, bool>
    where
        T: Nullable,
    {
        self.transform(|value| value.is_null())
    }

    /// True while the value is not null.
    fn is_not_null(&self) -> TransformObservable<T, bool>
    where
        T: Nullable,
    {
        self.transform(|value| !value.is_null())
    }

    /// True while the value is absent.
    fn is_undefined(&self) -> TransformObservable<T, bool>
    where
        T: Nullable,
    {
        self.transform(|value| value.is_undefined())
    }

    /// True while the value is present.
    fn is_defined(&self) -> TransformObservable<T, bool>
    where
        T: Nullable,
    {
        self.transform(|value| !value.is_undefined())
    }

    /// Strictly `true`, not merely truthy.
    fn is_true(&self) -> TransformObservable<T, bool>
    where
        T: PartialEq<bool>,
    {
        self.transform(|value| *value == true)
    }

    /// Strictly `false`, not merely falsy.
    fn is_false(&self) -> TransformObservable<T, bool>
    where
        T: PartialEq<bool>,
    {
        self.transform(|value| *value == false)
    }

    /// True while this or any of `others` is truthy.
    fn or(
        &self,
        others: Vec<MaybeObservable<T>>,
    ) -> DependentObservable<Vec<MaybeObservable<T>>, bool>
    where
        T: Truthy,
    {
        any(self.with_others(others))
    }

    /// True while this and all of `others` are truthy.
    fn and(
        &self,
        others: Vec<MaybeObservable<T>>,
    ) -> DependentObservable<Vec<MaybeObservable<T>>, bool>
    where
        T: Truthy,
    {
        all(self.with_others(others))
    }

    #[doc(hidden)]
    fn with_others(&self, others: Vec<MaybeObservable<T>>) -> Vec<MaybeObservable<T>> {
        let mut deps = Vec::with_capacity(others.len() + 1);
        deps.push(MaybeObservable::Observable(self.boxed()));
        deps.extend(others);
        deps
    }

    // Arithmetic. No type guard beyond the operator bound; integer division
    // by zero panics as it would anywhere else.

    /// Add `rhs` to the value.
    fn add(&self, rhs: T) -> Result<bool>
    where
        T: Add<Output = T>,
    {
        self.set(self.get() + rhs)
    }

    /// Subtract `rhs` from the value.
    fn sub(&self, rhs: T) -> Result<bool>
    where
        T: Sub<Output = T>,
    {
        self.set(self.get() - rhs)
    }

    /// Multiply the value by `rhs`.
    fn mul(&self, rhs: T) -> Result<bool>
    where
        T: Mul<Output = T>,
    {
        self.set(self.get() * rhs)
    }

    /// Divide the value by `rhs`.
    fn div(&self, rhs: T) -> Result<bool>
    where
        T: Div<Output = T>,
    {
        self.set(self.get() / rhs)
    }

    /// Replace the value with its remainder modulo `rhs`.
    fn rem(&self, rhs: T) -> Result<bool>
    where
        T: Rem<Output = T>,
    {
        self.set(self.get() % rhs)
    }
}

impl<T, O> ObservableExt<T> for O
where
    T: Clone + Send + Sync + 'static,
    O: Observable<T> + Clone + 'static,
{
}

// ----------------------------------------------------------------------------
// Var
// ----------------------------------------------------------------------------

struct VarInner<T> {
    value: RwLock<T>,
    observers: RwLock<ObserverList<T>>,
    equality: Equality<T>,
}

/// A source observable that owns its value.
///
/// Cloning a `Var` gives another handle to the same value and observers.
///
/// # Example
///
/// ```rust
/// use observable_core::{Observable, ObservableExt, Var};
///
/// let count = Var::new(1);
/// let doubled = count.transform(|n| n * 2);
///
/// let _sub = doubled.observe(|value, _| println!("doubled: {value}"));
/// count.set(5); // prints "doubled: 10"
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Var<T> {
    inner: Arc<VarInner<T>>,
}

impl<T> Var<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a var whose writes are compared with `PartialEq`.
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::with_equality(value, Equality::partial_eq())
    }

    /// Create a var with a custom change predicate.
    pub fn with_equality(value: T, equality: Equality<T>) -> Self {
        Self {
            inner: Arc::new(VarInner {
                value: RwLock::new(value),
                observers: RwLock::new(ObserverList::new()),
                equality,
            }),
        }
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Read the value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Replace the value. Returns whether it changed; observers are only
    /// called if it did.
    pub fn set(&self, value: T) -> bool {
        let changed = {
            let mut guard = self.inner.value.write();
            let changed = self.inner.equality.changed(&guard, &value);
            *guard = value;
            changed
        };

        if changed {
            self.notify("");
        }
        changed
    }

    /// Replace the value with `f(current)`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = self.with(f);
        self.set(next)
    }

    /// Mutate the value in place and notify observers with `path`
    /// unconditionally.
    pub fn modify<R>(&self, path: &str, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.inner.value.write());
        self.notify(path);
        result
    }

    fn notify(&self, path: &str) {
        let value = self.get();
        let observers = self.inner.observers.read().snapshot();
        trace!(path, count = observers.len(), "var changed");
        for (id, observer) in observers {
            if self.inner.observers.read().contains(id) {
                observer(&value, path);
            }
        }
    }

    fn release_handle(&self, id: ObserverId) -> impl FnOnce() + Send + 'static {
        let weak: Weak<VarInner<T>> = Arc::downgrade(&self.inner);
        move || {
            if let Some(inner) = weak.upgrade() {
                inner.observers.write().remove(id);
            }
        }
    }
}

impl<T> Observable<T> for Var<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> T {
        Var::get(self)
    }

    fn set(&self, value: T) -> Result<bool> {
        Ok(Var::set(self, value))
    }

    fn add_observer(&self, observer: Observer<T>) -> Subscription {
        let id = self.inner.observers.write().insert(Arc::clone(&observer));
        observer(&Var::get(self), "");
        Subscription::new(id, self.release_handle(id))
    }

    fn remove_observer(&self, id: ObserverId) {
        self.inner.observers.write().remove(id);
    }

    fn observer_count(&self) -> usize {
        self.inner.observers.read().len()
    }
}

impl<T> PathObservable<T> for Var<T>
where
    T: PathValue,
{
    fn get_path(&self, path: &str) -> Option<T> {
        self.inner.value.read().path_get(path)
    }

    fn set_path(&self, path: &str, value: T) -> Result<bool> {
        let changed = self.inner.value.write().path_set(path, value)?;
        if changed {
            self.notify(path);
        }
        Ok(changed)
    }
}

// ----------------------------------------------------------------------------
// Sequence operations
// ----------------------------------------------------------------------------

/// In-place list operations. Each one notifies with the index or range that
/// moved, then with `"length"` when the length changed.
impl<E> Var<Vec<E>>
where
    E: Clone + Send + Sync + 'static,
{
    /// Append an item. Returns the new length.
    pub fn push(&self, item: E) -> usize {
        let len = {
            let mut items = self.inner.value.write();
            items.push(item);
            items.len()
        };
        self.notify(&(len - 1).to_string());
        self.notify("length");
        len
    }

    /// Remove the last item.
    pub fn pop(&self) -> Option<E> {
        let (item, len) = {
            let mut items = self.inner.value.write();
            let item = items.pop();
            (item, items.len())
        };
        self.notify(&len.to_string());
        self.notify("length");
        item
    }

    /// Remove the first item.
    pub fn shift(&self) -> Option<E> {
        let item = {
            let mut items = self.inner.value.write();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        self.notify("");
        self.notify("length");
        item
    }

    /// Insert an item at the front. Returns the new length.
    pub fn unshift(&self, item: E) -> usize {
        let len = {
            let mut items = self.inner.value.write();
            items.insert(0, item);
            items.len()
        };
        self.notify("");
        self.notify("length");
        len
    }

    /// Sort the items in place with `compare`.
    pub fn sort_by<F>(&self, compare: F)
    where
        F: FnMut(&E, &E) -> std::cmp::Ordering,
    {
        self.modify("", |items| items.sort_by(compare));
    }

    /// Reverse the items in place.
    pub fn reverse(&self) {
        self.modify("", |items| items.reverse());
    }

    /// Remove `delete_count` items starting at `start` and insert `items` in
    /// their place. Out of range arguments are clamped. Returns the removed
    /// items.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<E>) -> Vec<E> {
        let removed = {
            let mut current = self.inner.value.write();
            let start = start.min(current.len());
            let end = start.saturating_add(delete_count).min(current.len());
            current.splice(start..end, items).collect()
        };
        self.notify("");
        self.notify("length");
        removed
    }

    /// A read-only view with `f` applied to every item.
    pub fn map<R, F>(&self, f: F) -> TransformObservable<Vec<E>, Vec<R>>
    where
        R: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&E) -> R + Send + Sync + 'static,
    {
        self.transform(move |items: &Vec<E>| items.iter().map(&f).collect())
    }

    /// A read-only view of the items matching `predicate`.
    pub fn filter<F>(&self, predicate: F) -> TransformObservable<Vec<E>, Vec<E>>
    where
        E: PartialEq,
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.transform(move |items: &Vec<E>| {
            items
                .iter()
                .filter(|&item| predicate(item))
                .cloned()
                .collect()
        })
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.inner.value.read().len()
    }

    /// Whether the list has no items.
    pub fn is_empty(&self) -> bool {
        self.inner.value.read().is_empty()
    }
}

impl<T> Clone for Var<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Var<T>
where
    T: Clone + Default + PartialEq + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Debug for Var<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Var")
            .field("value", &*self.inner.value.read())
            .field("observer_count", &self.inner.observers.read().len())
            .finish()
    }
}

impl<T> Serialize for Var<T>
where
    T: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.inner.value.read().serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Var<T>
where
    T: Deserialize<'de> + Clone + PartialEq + Send + Sync + 'static,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        T::deserialize(deserializer).map(Var::new)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
