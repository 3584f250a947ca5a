//! Observables computed from several dependencies.
//!
//! A [`DependentObservable`] combines an ordered set of dependencies, each a
//! plain value or an observable, with a function over their resolved values.
//! The dependency set is typed: a tuple of [`MaybeObservable`]s gives the
//! combiner a tuple of values with matching types, a `Vec` gives it a slice of
//! one type.
//!
//! # Hot and cold
//!
//! Cold, every `get` resolves all dependencies and calls the combiner. Going
//! hot subscribes to every observable dependency and keeps a per-position
//! cache of resolved values; each dependency notification updates its slot,
//! recombines once and notifies downstream if the result changed. The replay
//! calls made while subscribing are absorbed, so attaching costs exactly one
//! combination.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::equality::Equality;
use crate::error::{ObservableError, Result};
use crate::link::DerivedState;
use crate::maybe::MaybeObservable;
use crate::observable::{Observable, PathObservable};
use crate::observer::{Observer, ObserverId, Subscription};
use crate::path::PathValue;
use crate::truthy::Truthy;

pub use crate::link::Upstream;

/// Per-position resolved values, `None` while cold.
pub type Resolved<V> = Arc<RwLock<Option<V>>>;

/// Callback a dependency runs after updating its resolved slot.
pub type UpdateFn = Arc<dyn Fn() + Send + Sync>;

/// An ordered, typed set of dependencies.
pub trait Dependencies: Send + Sync + 'static {
    /// The resolved values handed to the combiner.
    type Values: Clone + Send + Sync + 'static;

    /// Read every dependency now.
    fn resolve(&self) -> Self::Values;

    /// Subscribe to every observable dependency. Each subscription writes its
    /// value into its own position of `resolved` and then calls `on_update`.
    fn attach(&self, resolved: &Resolved<Self::Values>, on_update: &UpdateFn) -> Upstream;
}

fn watch<A, F>(dep: &MaybeObservable<A>, on_update: &UpdateFn, write: F) -> Option<Subscription>
where
    A: Clone + Send + Sync + 'static,
    F: Fn(&A) + Send + Sync + 'static,
{
    let source = dep.as_observable()?;
    let on_update = Arc::clone(on_update);
    Some(source.add_observer(Arc::new(move |value: &A, _: &str| {
        write(value);
        on_update();
    })))
}

impl<A> Dependencies for Vec<MaybeObservable<A>>
where
    A: Clone + Send + Sync + 'static,
{
    type Values = Vec<A>;

    fn resolve(&self) -> Vec<A> {
        self.iter().map(MaybeObservable::get).collect()
    }

    fn attach(&self, resolved: &Resolved<Vec<A>>, on_update: &UpdateFn) -> Upstream {
        self.iter()
            .enumerate()
            .filter_map(|(index, dep)| {
                let resolved = Arc::clone(resolved);
                watch(dep, on_update, move |value: &A| {
                    if let Some(values) = resolved.write().as_mut() {
                        values[index] = value.clone();
                    }
                })
            })
            .collect()
    }
}

macro_rules! impl_dependencies_for_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name),+> Dependencies for ($(MaybeObservable<$name>,)+)
        where
            $($name: Clone + Send + Sync + 'static,)+
        {
            type Values = ($($name,)+);

            fn resolve(&self) -> Self::Values {
                ($(self.$idx.get(),)+)
            }

            fn attach(&self, resolved: &Resolved<Self::Values>, on_update: &UpdateFn) -> Upstream {
                let mut upstream = Upstream::new();
                $(
                    let slot = Arc::clone(resolved);
                    let watched = watch(&self.$idx, on_update, move |value: &$name| {
                        if let Some(values) = slot.write().as_mut() {
                            values.$idx = value.clone();
                        }
                    });
                    upstream.extend(watched);
                )+
                upstream
            }
        }
    };
}

impl_dependencies_for_tuple!(A: 0);
impl_dependencies_for_tuple!(A: 0, B: 1);
impl_dependencies_for_tuple!(A: 0, B: 1, C: 2);
impl_dependencies_for_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_dependencies_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_dependencies_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

type Combiner<V, T> = Arc<dyn Fn(&V) -> T + Send + Sync>;

struct DependentInner<D: Dependencies, T> {
    deps: D,
    combine: Combiner<D::Values, T>,
    resolved: Resolved<D::Values>,
    ignore_updates: AtomicBool,
    state: DerivedState<T>,
}

impl<D, T> DependentInner<D, T>
where
    D: Dependencies,
    T: Clone + Send + Sync + 'static,
{
    fn compute(&self) -> T {
        let cached = self.resolved.read().clone();
        let values = cached.unwrap_or_else(|| self.deps.resolve());
        (self.combine)(&values)
    }

    fn refresh(&self) {
        if self.ignore_updates.load(Ordering::Acquire) {
            return;
        }
        let next = self.compute();
        if self.state.store(next.clone()) {
            self.state.notify(&next, "");
        }
    }

    fn attach(self: &Arc<Self>) {
        let attached = self.state.attach(|| {
            self.ignore_updates.store(true, Ordering::Release);
            *self.resolved.write() = Some(self.deps.resolve());

            let inner = Arc::clone(self);
            let on_update: UpdateFn = Arc::new(move || inner.refresh());
            let upstream = self.deps.attach(&self.resolved, &on_update);

            self.ignore_updates.store(false, Ordering::Release);
            upstream
        });

        if attached {
            self.refresh();
        }
    }

    fn release(&self, id: ObserverId) {
        if self.state.release(id) {
            *self.resolved.write() = None;
        }
    }
}

/// A read-only observable combining several dependencies.
///
/// # Example
///
/// ```rust
/// use observable_core::{combine, MaybeObservable, Observable, Var};
///
/// let width = Var::new(3);
/// let height = Var::new(4);
/// let area = combine(
///     (MaybeObservable::from(width.clone()), MaybeObservable::from(height)),
///     |(w, h): &(i32, i32)| w * h,
/// );
///
/// assert_eq!(area.get(), 12);
/// width.set(5);
/// assert_eq!(area.get(), 20);
/// ```
pub struct DependentObservable<D: Dependencies, T> {
    inner: Arc<DependentInner<D, T>>,
}

impl<D, T> DependentObservable<D, T>
where
    D: Dependencies,
    T: Clone + Send + Sync + 'static,
{
    /// Create a dependent observable whose results are compared with `PartialEq`.
    pub fn new<F>(deps: D, combine: F) -> Self
    where
        T: PartialEq,
        F: Fn(&D::Values) -> T + Send + Sync + 'static,
    {
        Self::with_equality(deps, combine, Equality::partial_eq())
    }

    /// Create a dependent observable with a custom change predicate.
    pub fn with_equality<F>(deps: D, combine: F, equality: Equality<T>) -> Self
    where
        F: Fn(&D::Values) -> T + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(DependentInner {
                deps,
                combine: Arc::new(combine),
                resolved: Arc::new(RwLock::new(None)),
                ignore_updates: AtomicBool::new(false),
                state: DerivedState::new("dependent", equality),
            }),
        }
    }

    /// Whether the observable is hot.
    pub fn is_attached(&self) -> bool {
        self.inner.state.is_attached()
    }
}

impl<D, T> Observable<T> for DependentObservable<D, T>
where
    D: Dependencies,
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> T {
        if self.inner.state.is_attached() {
            if let Some(value) = self.inner.state.cached() {
                return value;
            }
        }
        (self.inner.combine)(&self.inner.deps.resolve())
    }

    fn set(&self, _value: T) -> Result<bool> {
        Err(ObservableError::ReadOnly)
    }

    fn add_observer(&self, observer: Observer<T>) -> Subscription {
        self.inner.attach();
        let id = self.inner.state.register(Arc::clone(&observer));
        observer(&self.get(), "");

        let inner = Arc::clone(&self.inner);
        Subscription::new(id, move || {
            inner.release(id);
        })
    }

    fn remove_observer(&self, id: ObserverId) {
        self.inner.release(id);
    }

    fn observer_count(&self) -> usize {
        self.inner.state.observer_count()
    }
}

impl<D, T> PathObservable<T> for DependentObservable<D, T>
where
    D: Dependencies,
    T: PathValue,
{
    fn get_path(&self, path: &str) -> Option<T> {
        self.get().path_get(path)
    }

    fn set_path(&self, _path: &str, _value: T) -> Result<bool> {
        Err(ObservableError::ReadOnly)
    }
}

impl<D: Dependencies, T> Clone for DependentObservable<D, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D, T> Debug for DependentObservable<D, T>
where
    D: Dependencies,
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependentObservable")
            .field("attached", &self.is_attached())
            .field("cached", &self.inner.state.cached())
            .finish()
    }
}

/// True while any dependency is truthy.
pub fn any<T>(deps: Vec<MaybeObservable<T>>) -> DependentObservable<Vec<MaybeObservable<T>>, bool>
where
    T: Truthy + Clone + Send + Sync + 'static,
{
    DependentObservable::new(deps, |values: &Vec<T>| {
        for value in values {
            if value.is_truthy() {
                return true;
            }
        }
        false
    })
}

/// True while every dependency is truthy.
pub fn all<T>(deps: Vec<MaybeObservable<T>>) -> DependentObservable<Vec<MaybeObservable<T>>, bool>
where
    T: Truthy + Clone + Send + Sync + 'static,
{
    DependentObservable::new(deps, |values: &Vec<T>| {
        for value in values {
            if !value.is_truthy() {
                return false;
            }
        }
        true
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::{ObservableExt, Var};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::AtomicI32;

    fn observed(var: &Var<bool>) -> MaybeObservable<bool> {
        MaybeObservable::from(var.clone())
    }

    #[test]
    fn all_combines_and_notifies_once() {
        let a = Var::new(true);
        let b = Var::new(false);
        let both = all(vec![observed(&a), observed(&b)]);

        assert!(!both.get());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        both.observe(move |value: &bool, _| seen_clone.lock().push(*value));
        seen.lock().clear();

        b.set(true);
        assert_eq!(*seen.lock(), vec![true]);
    }

    #[test]
    fn any_is_true_if_one_is_true() {
        let a = Var::new(false);
        let b = Var::new(false);
        let either = any(vec![observed(&a), observed(&b), MaybeObservable::Value(false)]);

        assert!(!either.get());
        b.set(true);
        assert!(either.get());
    }

    #[test]
    fn attach_combines_exactly_once() {
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();
        let a = Var::new(1);
        let b = Var::new(2);
        let c = Var::new(3);
        let sum = DependentObservable::new(
            vec![
                MaybeObservable::from(a.clone()),
                MaybeObservable::from(b.clone()),
                MaybeObservable::from(c.clone()),
            ],
            move |values: &Vec<i32>| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                values.iter().sum::<i32>()
            },
        );

        sum.observe(|_, _| {});
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        b.set(20);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sum.get(), 24);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cold_get_recomputes() {
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();
        let a = Var::new(2);
        let squared = DependentObservable::new(
            (MaybeObservable::from(a.clone()),),
            move |(n,): &(i32,)| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                n * n
            },
        );

        assert_eq!(squared.get(), 4);
        a.set(3);
        assert_eq!(squared.get(), 9);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn mixed_typed_dependencies() {
        let name = Var::new(String::from("Ada"));
        let age = Var::new(36u32);
        let label = DependentObservable::new(
            (
                MaybeObservable::from(name.clone()),
                MaybeObservable::from(age.clone()),
                MaybeObservable::Value('!'),
            ),
            |(name, age, mark): &(String, u32, char)| format!("{name} ({age}){mark}"),
        );

        let latest = Arc::new(Mutex::new(String::new()));
        let latest_clone = latest.clone();
        label.observe(move |value: &String, _| *latest_clone.lock() = value.clone());

        age.set(37);
        assert_eq!(*latest.lock(), "Ada (37)!");
        name.set("Grace".into());
        assert_eq!(*latest.lock(), "Grace (37)!");
    }

    #[test]
    fn unchanged_result_does_not_notify() {
        let a = Var::new(1);
        let b = Var::new(2);
        let max = DependentObservable::new(
            (MaybeObservable::from(a.clone()), MaybeObservable::from(b.clone())),
            |(a, b): &(i32, i32)| (*a).max(*b),
        );

        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();
        max.observe(move |_, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        a.set(0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        a.set(5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn set_is_rejected() {
        let a = Var::new(true);
        let only = all(vec![observed(&a)]);

        assert_eq!(only.set(false), Err(ObservableError::ReadOnly));
    }

    #[test]
    fn set_path_is_rejected() {
        let a = Var::new(json!({"x": 1}));
        let copy = DependentObservable::new(
            (MaybeObservable::from(a.clone()),),
            |(v,): &(serde_json::Value,)| v.clone(),
        );

        assert_eq!(copy.set_path("x", json!(2)), Err(ObservableError::ReadOnly));
        assert_eq!(copy.get_path("x"), Some(json!(1)));
    }

    #[test]
    fn going_cold_releases_every_dependency() {
        let a = Var::new(true);
        let b = Var::new(true);
        let both = all(vec![observed(&a), observed(&b)]);

        let sub = both.observe(|_, _| {});
        assert_eq!((a.observer_count(), b.observer_count()), (1, 1));

        sub.unsubscribe();
        assert_eq!((a.observer_count(), b.observer_count()), (0, 0));
        assert!(!both.is_attached());

        b.set(false);
        assert!(!both.get());
    }
}
