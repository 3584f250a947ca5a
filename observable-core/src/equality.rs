//! Change predicates.
//!
//! Every observable decides whether a write or a recomputation "changed"
//! anything through an [`Equality`]. The default is `PartialEq`.

use std::fmt;
use std::sync::Arc;

/// Equality predicate used to gate notifications.
pub struct Equality<T> {
    eq: Arc<dyn Fn(&T, &T) -> bool + Send + Sync>,
}

impl<T: 'static> Equality<T> {
    /// Build from an arbitrary predicate. It must return `true` when the two
    /// values should be treated as the same.
    pub fn new<F>(eq: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self { eq: Arc::new(eq) }
    }

    /// Treat every write as a change.
    pub fn never() -> Self {
        Self::new(|_, _| false)
    }

    /// Whether `a` and `b` count as the same value.
    pub fn same(&self, a: &T, b: &T) -> bool {
        (self.eq)(a, b)
    }

    /// Whether going from `old` to `new` is a change.
    pub fn changed(&self, old: &T, new: &T) -> bool {
        !self.same(old, new)
    }
}

impl<T: PartialEq + 'static> Equality<T> {
    /// Compare with `PartialEq`.
    pub fn partial_eq() -> Self {
        Self::new(|a: &T, b: &T| a == b)
    }
}

impl<X: ?Sized + Send + Sync + 'static> Equality<Arc<X>> {
    /// Reference identity for shared values.
    pub fn by_ptr() -> Self {
        Self::new(|a: &Arc<X>, b: &Arc<X>| Arc::ptr_eq(a, b))
    }
}

impl<T: PartialEq + 'static> Default for Equality<T> {
    fn default() -> Self {
        Self::partial_eq()
    }
}

impl<T> Clone for Equality<T> {
    fn clone(&self) -> Self {
        Self {
            eq: Arc::clone(&self.eq),
        }
    }
}

impl<T> fmt::Debug for Equality<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Equality")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_eq_compares_structurally() {
        let eq = Equality::<Vec<i32>>::partial_eq();
        assert!(eq.same(&vec![1, 2], &vec![1, 2]));
        assert!(eq.changed(&vec![1, 2], &vec![2, 1]));
    }

    #[test]
    fn by_ptr_compares_identity() {
        let eq: Equality<Arc<String>> = Equality::by_ptr();
        let a = Arc::new(String::from("x"));
        let b = Arc::new(String::from("x"));

        assert!(eq.same(&a, &a.clone()));
        assert!(eq.changed(&a, &b));
    }

    #[test]
    fn never_always_reports_change() {
        let eq = Equality::<i32>::never();
        assert!(eq.changed(&1, &1));
    }
}
