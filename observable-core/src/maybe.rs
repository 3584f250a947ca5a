//! Values that may or may not be observable.
//!
//! Callers that accept "either a value or something that produces one" take a
//! [`MaybeObservable`] and use the free functions here to treat both cases the
//! same way: read it with [`unwrap`], subscribe with [`observe`], lift it into
//! the graph with [`wrap`].

use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::dependent::{Dependencies, DependentObservable};
use crate::observable::{Observable, ObservableRef, Var};
use crate::observer::Subscription;
use crate::path::PathValue;
use crate::prop::PropObservable;
use crate::transform::TransformObservable;

/// A plain value or an observable of one.
pub enum MaybeObservable<T> {
    Value(T),
    Observable(ObservableRef<T>),
}

impl<T> MaybeObservable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The current value.
    pub fn get(&self) -> T {
        match self {
            MaybeObservable::Value(value) => value.clone(),
            MaybeObservable::Observable(observable) => observable.get(),
        }
    }

    /// Whether this holds an observable rather than a plain value.
    pub fn is_observable(&self) -> bool {
        matches!(self, MaybeObservable::Observable(_))
    }

    /// The observable, if this holds one.
    pub fn as_observable(&self) -> Option<&ObservableRef<T>> {
        match self {
            MaybeObservable::Value(_) => None,
            MaybeObservable::Observable(observable) => Some(observable),
        }
    }

    /// Subscribe to the observable, or call `observer` once with the plain
    /// value and return an inert subscription.
    pub fn observe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T, &str) + Send + Sync + 'static,
    {
        match self {
            MaybeObservable::Value(value) => {
                observer(value, "");
                Subscription::noop()
            }
            MaybeObservable::Observable(observable) => observable.add_observer(Arc::new(observer)),
        }
    }

    /// The observable itself, or a fresh [`Var`] holding the plain value.
    pub fn into_observable(self) -> ObservableRef<T>
    where
        T: PartialEq,
    {
        match self {
            MaybeObservable::Value(value) => Arc::new(Var::new(value)),
            MaybeObservable::Observable(observable) => observable,
        }
    }
}

impl<T> Clone for MaybeObservable<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        match self {
            MaybeObservable::Value(value) => MaybeObservable::Value(value.clone()),
            MaybeObservable::Observable(observable) => {
                MaybeObservable::Observable(Arc::clone(observable))
            }
        }
    }
}

impl<T> Debug for MaybeObservable<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaybeObservable::Value(value) => f.debug_tuple("Value").field(value).finish(),
            MaybeObservable::Observable(observable) => f
                .debug_struct("Observable")
                .field("observer_count", &observable.observer_count())
                .finish(),
        }
    }
}

impl<T> From<ObservableRef<T>> for MaybeObservable<T> {
    fn from(observable: ObservableRef<T>) -> Self {
        MaybeObservable::Observable(observable)
    }
}

impl<T> From<Var<T>> for MaybeObservable<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from(var: Var<T>) -> Self {
        MaybeObservable::Observable(Arc::new(var))
    }
}

impl<T> From<PropObservable<T>> for MaybeObservable<T>
where
    T: PathValue,
{
    fn from(prop: PropObservable<T>) -> Self {
        MaybeObservable::Observable(Arc::new(prop))
    }
}

impl<T, U> From<TransformObservable<T, U>> for MaybeObservable<U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    fn from(transform: TransformObservable<T, U>) -> Self {
        MaybeObservable::Observable(Arc::new(transform))
    }
}

impl<D, T> From<DependentObservable<D, T>> for MaybeObservable<T>
where
    D: Dependencies,
    T: Clone + Send + Sync + 'static,
{
    fn from(dependent: DependentObservable<D, T>) -> Self {
        MaybeObservable::Observable(Arc::new(dependent))
    }
}

/// Lift a value into the graph. Observables pass through unchanged.
pub fn wrap<T>(value: impl Into<MaybeObservable<T>>) -> ObservableRef<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    value.into().into_observable()
}

/// Combine several dependencies into one read-only observable.
pub fn combine<D, T, F>(deps: D, f: F) -> DependentObservable<D, T>
where
    D: Dependencies,
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&D::Values) -> T + Send + Sync + 'static,
{
    DependentObservable::new(deps, f)
}

/// The current value, whether or not it is observable.
pub fn unwrap<T>(value: &MaybeObservable<T>) -> T
where
    T: Clone + Send + Sync + 'static,
{
    value.get()
}

/// Subscribe uniformly to a value or an observable.
///
/// A plain value is passed to `observer` once and the returned subscription
/// does nothing.
pub fn observe<T, F>(value: &MaybeObservable<T>, observer: F) -> Subscription
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&T, &str) + Send + Sync + 'static,
{
    value.observe(observer)
}

/// Whether `value` is backed by an observable.
pub fn is_observable<T>(value: &MaybeObservable<T>) -> bool
where
    T: Clone + Send + Sync + 'static,
{
    value.is_observable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::ObservableExt;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn wrap_plain_value_creates_var() {
        let wrapped: ObservableRef<i32> = wrap(MaybeObservable::Value(5));

        assert_eq!(wrapped.get(), 5);
        assert_eq!(wrapped.set(6), Ok(true));
        assert_eq!(wrapped.get(), 6);
    }

    #[test]
    fn wrap_observable_passes_through() {
        let var = Var::new(1);
        let wrapped: ObservableRef<i32> = wrap(var.clone());

        wrapped.set(2).unwrap();
        assert_eq!(var.get(), 2);
    }

    #[test]
    fn unwrap_reads_either_kind() {
        let var = Var::new("live".to_string());
        let live = MaybeObservable::from(var.clone());
        let fixed = MaybeObservable::Value("fixed".to_string());

        assert_eq!(unwrap(&live), "live");
        assert_eq!(unwrap(&fixed), "fixed");
        var.set("changed".into());
        assert_eq!(unwrap(&live), "changed");
    }

    #[test]
    fn observe_plain_value_calls_once() {
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();
        let sub = observe(&MaybeObservable::Value(3), move |value: &i32, path: &str| {
            assert_eq!((*value, path), (3, ""));
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!sub.is_active());
        sub.unsubscribe();
    }

    #[test]
    fn observe_observable_subscribes() {
        let var = Var::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let sub = observe(&MaybeObservable::from(var.clone()), move |value: &i32, _: &str| {
            seen_clone.lock().push(*value);
        });

        var.set(1);
        sub.unsubscribe();
        var.set(2);
        assert_eq!(*seen.lock(), vec![0, 1]);
    }

    #[test]
    fn is_observable_distinguishes() {
        let var = Var::new(true);
        assert!(is_observable(&MaybeObservable::from(var.is_true())));
        assert!(!is_observable(&MaybeObservable::Value(true)));
    }

    #[test]
    fn combine_mixes_values_and_observables() {
        let price = Var::new(10);
        let total = combine(
            (MaybeObservable::from(price.clone()), MaybeObservable::Value(3)),
            |(price, quantity): &(i32, i32)| price * quantity,
        );

        assert_eq!(total.get(), 30);
        price.set(11);
        assert_eq!(total.get(), 33);
    }
}
