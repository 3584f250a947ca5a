//! Integration Tests for the Observable Graph
//!
//! These tests verify that sources, path views, transforms and dependents work
//! together correctly.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use observable_core::{
    all, combine, observe, wrap, MaybeObservable, Observable, ObservableError, ObservableExt,
    ObservableRef, PathObservable, Transformer, Var,
};

type Log<T> = Arc<Mutex<Vec<(T, String)>>>;

fn record<T, O>(observable: &O) -> Log<T>
where
    T: Clone + Send + Sync + 'static,
    O: ObservableExt<T>,
{
    let log: Log<T> = Arc::new(Mutex::new(Vec::new()));
    let log_clone = log.clone();
    observable.observe(move |value: &T, path: &str| {
        log_clone.lock().push((value.clone(), path.to_owned()));
    });
    log
}

/// Test that registering an observer replays the current value exactly once.
#[test]
fn add_observer_replays_once() {
    let var = Var::new(7);
    let log = record(&var);

    assert_eq!(*log.lock(), vec![(7, String::new())]);

    let doubled = var.transform(|n: &i32| n * 2);
    let doubled_log = record(&doubled);
    assert_eq!(*doubled_log.lock(), vec![(14, String::new())]);
}

/// Test that setting an equal value reports no change and notifies nobody.
#[test]
fn set_is_gated_by_equality() {
    let var = Var::new(String::from("same"));
    let log = record(&var);
    log.lock().clear();

    assert!(!var.set("same".into()));
    assert!(log.lock().is_empty());

    assert!(var.set("different".into()));
    assert_eq!(log.lock().len(), 1);
}

/// Test that path views are only told about their own subtree.
#[test]
fn path_views_are_isolated() {
    let parent = Var::new(json!({"a": {"b": 1}, "c": 2}));
    let c = parent.prop("c");
    let b = parent.prop("a.b");
    let c_log = record(&c);
    let b_log = record(&b);
    c_log.lock().clear();
    b_log.lock().clear();

    parent.set_path("a.b", json!(2)).unwrap();

    assert!(c_log.lock().is_empty());
    assert_eq!(*b_log.lock(), vec![(json!(2), String::new())]);
}

/// Test that replacing the whole parent reaches a nested view even when its
/// field is unchanged.
#[test]
fn whole_value_write_reaches_nested_view() {
    let parent = Var::new(json!({"a": {"b": 1}, "c": 2}));
    let b = parent.prop("a.b");
    let log = record(&b);
    log.lock().clear();

    parent.set(json!({"a": {"b": 1}, "c": 3}));

    assert_eq!(*log.lock(), vec![(json!(1), String::new())]);
}

/// Test that a change below a view is forwarded with the relative path.
#[test]
fn change_below_view_forwards_relative_path() {
    let parent = Var::new(json!({"todos": [{"done": false}, {"done": false}]}));
    let todos = parent.prop("todos");
    let log = record(&todos);
    log.lock().clear();

    parent.set_path("todos.1.done", json!(true)).unwrap();

    let log = log.lock();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].1, "1.done");
    assert_eq!(log[0].0, json!([{"done": false}, {"done": true}]));
}

/// Test that a cold transform never serves a stale value.
#[test]
fn transform_is_lazy_while_cold() {
    let source = Var::new(1);
    let calls = Arc::new(AtomicI32::new(0));
    let calls_clone = calls.clone();
    let tripled = source.transform(move |n: &i32| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        n * 3
    });

    assert_eq!(tripled.get(), 3);
    assert_eq!(tripled.get(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let sub = tripled.observe(|_, _| {});
    sub.unsubscribe();
    source.set(4);

    assert_eq!(tripled.get(), 12);
}

/// Test the boolean conjunction of two sources.
#[test]
fn and_notifies_exactly_once() {
    let a = Var::new(true);
    let b = Var::new(false);
    let both = a.and(vec![MaybeObservable::from(b.clone())]);

    assert!(!both.get());
    let log = record(&both);
    log.lock().clear();

    b.set(true);
    assert_eq!(*log.lock(), vec![(true, String::new())]);
}

/// Test that read-only nodes refuse writes instead of ignoring them.
#[test]
fn read_only_nodes_reject_writes() {
    let a = Var::new(true);
    let only = all(vec![MaybeObservable::from(a.clone())]);
    assert_eq!(only.set(false), Err(ObservableError::ReadOnly));

    let doc = Var::new(json!({"x": 1}));
    let two_way = doc.transform_with(Transformer::read_write(
        |v: &Value| v.clone(),
        |v: &Value| v.clone(),
    ));
    assert!(matches!(
        two_way.set_path("x", json!(2)),
        Err(ObservableError::TransformPath { .. })
    ));

    let one_way = doc.transform(|v: &Value| v.clone());
    assert_eq!(one_way.set(json!({})), Err(ObservableError::MissingInverse));
    assert_eq!(doc.get(), json!({"x": 1}));
}

/// Test that unsubscribing twice removes only one registration.
#[test]
fn unsubscribe_is_idempotent() {
    let var = Var::new(0);
    let first = var.observe(|_, _| {});
    let _second = var.observe(|_, _| {});

    first.unsubscribe();
    first.unsubscribe();
    assert_eq!(var.observer_count(), 1);
}

/// Test a chain of views over one document: prop -> transform -> dependent.
#[test]
fn views_compose_across_kinds() {
    let doc = Var::new(json!({"cart": {"items": [{"price": 3}, {"price": 4}]}, "tax": 0}));
    let items = doc.prop("cart.items");
    let subtotal = items.transform(|items: &Value| {
        items
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i["price"].as_i64())
                    .sum::<i64>()
            })
            .unwrap_or(0)
    });
    let tax = doc
        .prop("tax")
        .transform(|t: &Value| t.as_i64().unwrap_or(0));
    let total = combine(
        (MaybeObservable::from(subtotal.clone()), MaybeObservable::from(tax)),
        |(subtotal, tax): &(i64, i64)| subtotal + tax,
    );

    let log = record(&total);
    assert_eq!(total.get(), 7);

    doc.set_path("cart.items.2", json!({"price": 5})).unwrap();
    doc.set_path("tax", json!(1)).unwrap();

    let values: Vec<i64> = log.lock().iter().map(|(v, _)| *v).collect();
    assert_eq!(values, vec![7, 12, 13]);

    // Writes to unrelated paths reach the source but do not recompute.
    doc.set_path("note", json!("hi")).unwrap();
    assert_eq!(log.lock().len(), 3);
}

/// Test that observers may write back into the graph while being notified.
#[test]
fn observer_can_write_back() {
    let celsius = Var::new(0.0_f64);
    let fahrenheit = Var::new(32.0_f64);

    let f = fahrenheit.clone();
    celsius.observe(move |c: &f64, _| {
        f.set(c * 9.0 / 5.0 + 32.0);
    });

    celsius.set(100.0);
    assert_eq!(fahrenheit.get(), 212.0);
}

/// Test that wrap and observe treat plain values and observables alike.
#[test]
fn maybe_observable_helpers() {
    let calls = Arc::new(AtomicI32::new(0));
    let calls_clone = calls.clone();
    let plain = MaybeObservable::Value(5);
    let sub = observe(&plain, move |_: &i32, _: &str| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });
    sub.unsubscribe();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let lifted: ObservableRef<i32> = wrap(plain);
    let log = record(&lifted);
    lifted.set(6).unwrap();
    assert_eq!(log.lock().last().map(|(v, _)| *v), Some(6));
}

/// Test that an observer registered on a temporary view keeps receiving
/// updates and that unsubscribing releases the parent.
#[test]
fn temporary_views_stay_alive_while_observed() {
    let source = Var::new(1);
    let calls = Arc::new(AtomicI32::new(0));
    let calls_clone = calls.clone();
    let sub = source.transform(|n: &i32| n * 2).observe(move |_, _| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    source.set(5);
    source.set(6);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(source.observer_count(), 1);

    sub.unsubscribe();
    assert_eq!(source.observer_count(), 0);
    source.set(7);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

/// Test that temporary prop and dependent views behave like named ones.
#[test]
fn temporary_prop_and_dependent_views() {
    let doc = Var::new(json!({"a": 1}));
    let prop_log = record(&doc.prop("a"));
    doc.set_path("a", json!(2)).unwrap();
    assert_eq!(prop_log.lock().len(), 2);

    let flag = Var::new(false);
    let any_log = record(&flag.or(vec![MaybeObservable::Value(false)]));
    flag.set(true);
    assert_eq!(
        *any_log.lock(),
        vec![(false, String::new()), (true, String::new())]
    );
}

/// Test that a chain of temporary views goes cold all the way up.
#[test]
fn unsubscribing_a_chain_releases_every_level() {
    let doc = Var::new(json!({"n": 3}));
    let sub = doc
        .prop("n")
        .transform(|n: &Value| n.as_i64().unwrap_or(0))
        .observe(|_, _| {});
    assert_eq!(doc.observer_count(), 1);

    sub.unsubscribe();
    sub.unsubscribe();
    assert_eq!(doc.observer_count(), 0);
}
