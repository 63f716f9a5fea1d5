// Test code uses unwrap/expect for clarity - panics provide good test failure messages
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end tests driving realistic test helpers against the double.
//!
//! These exercise the crate the way downstream code uses it: helpers are
//! written against `&dyn TestContext`, a `TestDouble` is handed to them, and
//! the enclosing test asserts on the recorded state afterwards.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mocktest::{isolate, TestContext, TestDouble};
use pretty_assertions::assert_eq;

/// An assertion-library style helper: non-terminal failure.
fn require_equal(t: &dyn TestContext, want: &str, got: &str) {
    t.helper();
    if want != got {
        t.errorf(format_args!("want {want:?}, got {got:?}"));
    }
}

/// A terminal helper: missing preconditions end the test on the spot.
fn require_var<'a>(t: &dyn TestContext, vars: &'a [(&str, &str)], key: &str) -> &'a str {
    t.helper();
    match vars.iter().find(|(k, _)| *k == key) {
        Some((_, v)) => *v,
        None => {
            t.fatalf(format_args!("required variable {key} is not set"));
            ""
        }
    }
}

/// A fixture-style helper: acquires a resource and registers its release.
fn with_counter(t: &dyn TestContext, counter: &Arc<AtomicUsize>) {
    t.helper();
    counter.fetch_add(1, Ordering::SeqCst);

    let counter = Arc::clone(counter);
    t.cleanup(Box::new(move || {
        counter.fetch_sub(1, Ordering::SeqCst);
    }));
}

/// A table-driven helper: runs each case as a named sub-test.
fn check_all_positive(t: &dyn TestContext, cases: &[(&str, i64)]) {
    t.helper();
    for (name, n) in cases {
        t.run(
            name,
            Box::new(move |case: &dyn TestContext| {
                if *n <= 0 {
                    case.errorf(format_args!("expected positive, got {n}"));
                }
            }),
        );
    }
}

#[test]
fn passing_helper_leaves_the_double_clean() {
    let t = TestDouble::new("require_equal passes");

    require_equal(&t, "same", "same");

    assert!(!t.failed());
    assert!(t.output().is_empty());
    assert_eq!(t.helper_names().len(), 1);
}

#[test]
fn failing_helper_records_message_and_failure() {
    let t = TestDouble::new("require_equal fails");

    require_equal(&t, "want", "got");

    assert!(t.failed());
    assert_eq!(t.failed_count(), 1);
    assert_eq!(*t.output(), vec!["want \"want\", got \"got\"\n".to_string()]);
}

#[test]
fn terminal_helper_stops_the_code_under_test() {
    let t = TestDouble::new("require_var missing");

    let vars = [("PRESENT", "1")];
    isolate(|| {
        let value = require_var(&t, &vars, "MISSING");
        // Never reached: the helper's fatal aborted this thread.
        t.log(value);
    });

    assert!(t.failed());
    assert!(t.aborted());
    assert_eq!(
        *t.output(),
        vec!["required variable MISSING is not set\n".to_string()]
    );
}

#[test]
fn terminal_helper_passes_through_when_var_exists() {
    let t = TestDouble::new("require_var present");

    let vars = [("PRESENT", "1")];
    let value = require_var(&t, &vars, "PRESENT");

    assert_eq!(value, "1");
    assert!(!t.failed());
    assert!(!t.aborted());
}

#[test]
fn fixture_helper_registers_cleanup_for_the_harness() {
    let t = TestDouble::new("with_counter");
    let counter = Arc::new(AtomicUsize::new(0));

    with_counter(&t, &counter);
    with_counter(&t, &counter);

    // The double records cleanups but never runs them.
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(t.cleanup_funcs().len(), 2);
    assert_eq!(t.cleanup_names().len(), 2);

    // The harness (this test) is responsible for invoking them.
    for f in t.cleanup_funcs().iter() {
        f();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn table_driven_helper_fans_out_into_subtests() {
    let t = TestDouble::new("positives");

    check_all_positive(&t, &[("one", 1), ("zero", 0), ("neg", -3), ("two", 2)]);

    assert!(t.failed());
    assert_eq!(t.failed_count(), 2); // one increment per failed case

    let subs = t.subtests();
    let names: Vec<&str> = subs.iter().map(|s| s.name()).collect();
    assert_eq!(
        names,
        vec!["positives/one", "positives/zero", "positives/neg", "positives/two"]
    );
    assert!(!subs[0].failed());
    assert!(subs[1].failed());
    assert!(subs[2].failed());
    assert!(!subs[3].failed());
    assert_eq!(
        *subs[2].output(),
        vec!["expected positive, got -3\n".to_string()]
    );
}

#[test]
fn parallel_intent_is_observable() {
    fn parallel_helper(t: &dyn TestContext) {
        t.parallel();
    }

    let t = TestDouble::new("parallel");
    parallel_helper(&t);

    assert!(t.paralleled());
}

#[test]
fn env_helper_assignments_are_observable() {
    fn configure_env(t: &dyn TestContext) {
        t.set_env("APP_MODE", "test");
        t.set_env("APP_DEBUG", "1");
    }

    let t = TestDouble::new("env");
    configure_env(&t);

    let env = t.env();
    assert_eq!(env.get("APP_MODE").map(String::as_str), Some("test"));
    assert_eq!(env.get("APP_DEBUG").map(String::as_str), Some("1"));
}
