//! Integration Tests for Circuits
//!
//! These tests wire props and events together through the public API and
//! check what is observable before and after the deferred work runs.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use circuit_core::{Circuit, CircuitError, NodeKind, Value};
use serde_json::json;

type Calls<T> = Rc<RefCell<Vec<Vec<T>>>>;

/// A compute function that records its arguments and returns the default.
fn spy<T: Clone + Default + 'static>() -> (Calls<T>, impl Fn(&[T]) -> T) {
    let calls: Calls<T> = Rc::new(RefCell::new(Vec::new()));
    let log = calls.clone();
    let compute = move |inputs: &[T]| {
        log.borrow_mut().push(inputs.to_vec());
        T::default()
    };
    (calls, compute)
}

/// A counter bumped by event listeners.
fn counter() -> Rc<Cell<usize>> {
    Rc::new(Cell::new(0))
}

// ============================================================================
// Props
// ============================================================================

/// Test that a prop is a getter and a setter.
#[test]
fn data_getter_and_setter() {
    let circuit: Circuit = Circuit::new();
    let a = circuit.data(Value::Null);
    assert_eq!(a.get(), Value::Null);

    a.set(json!({ "name": "circuit" }));
    assert_eq!(a.get(), json!({ "name": "circuit" }));
}

/// Test that `data` and `prop` create the same kind of node.
#[test]
fn data_is_an_alias_of_prop() {
    let circuit: Circuit<i32> = Circuit::new();
    let a = circuit.data(1);
    let b = circuit.prop(1);

    assert_eq!(circuit.node_info(&a).unwrap().kind, NodeKind::Prop);
    assert_eq!(circuit.node_info(&b).unwrap().kind, NodeKind::Prop);
}

/// Test that a write to a derived prop goes through its compute function.
#[test]
fn write_calls_compute_function_with_value() {
    let circuit: Circuit<i32> = Circuit::new();
    let (calls, compute) = spy();
    let a = circuit.computed(compute);

    a.set(1);
    assert_eq!(*calls.borrow(), vec![vec![1]]);
}

/// Test that a derived prop computes its initial value exactly once.
#[test]
fn computed_initializes_once() {
    let circuit: Circuit<i32> = Circuit::new();
    let calls = counter();
    let calls_clone = calls.clone();
    let a = circuit.computed(move |_| {
        calls_clone.set(calls_clone.get() + 1);
        0
    });

    assert_eq!(a.get(), 0);
    assert_eq!(calls.get(), 1);

    circuit.run_until_idle().unwrap();
    assert_eq!(a.get(), 0);
    assert_eq!(calls.get(), 1);
}

// ============================================================================
// Events
// ============================================================================

/// Test that emitting an event calls its listener.
#[test]
fn event_calls_listener() {
    let circuit: Circuit = Circuit::new();
    let count = counter();
    let count_clone = count.clone();
    let a = circuit.event_with(move |_| count_clone.set(count_clone.get() + 1));

    a.emit();
    assert_eq!(count.get(), 1);
}

/// Test that an event without a listener can be emitted.
#[test]
fn event_without_listener() {
    let circuit: Circuit = Circuit::new();
    let a = circuit.event();

    a.emit();
    circuit.run_until_idle().unwrap();
}

// ============================================================================
// Binding props
// ============================================================================

/// Test that a value travels down a chain of props.
#[test]
fn bind_data_chain() {
    let circuit: Circuit = Circuit::new();
    let a = circuit.data(json!({ "v": 0 }));
    let b = circuit.data(Value::Null);
    let c = circuit.data(Value::Null);
    let d = circuit.data(Value::Null);
    circuit.bind(&a, &b).unwrap();
    circuit.bind(&b, &c).unwrap();
    circuit.bind(&c, &d).unwrap();

    assert_eq!(d.get(), json!({ "v": 0 }));

    a.set(json!({ "v": 1 }));
    assert_eq!(d.get(), json!({ "v": 1 }));
}

/// Test that props and events cannot be connected.
#[test]
fn bind_different_kinds_fails() {
    let circuit: Circuit = Circuit::new();
    let a = circuit.data(Value::Null);
    let b = circuit.event();

    assert_eq!(
        circuit.bind(&a, &b),
        Err(CircuitError::TypeMismatch {
            from: NodeKind::Prop,
            to: NodeKind::Event
        })
    );
    assert_eq!(
        circuit.bind(&b, &a),
        Err(CircuitError::TypeMismatch {
            from: NodeKind::Event,
            to: NodeKind::Prop
        })
    );
}

/// Test that a plain prop bound to itself keeps what was written.
#[test]
fn bind_same_data() {
    let circuit: Circuit<i32> = Circuit::new();
    let a = circuit.data(0);
    circuit.bind(&a, &a).unwrap();

    a.set(1);
    assert_eq!(a.get(), 1);

    circuit.run_until_idle().unwrap();
    assert_eq!(a.get(), 1);
}

/// Test that a derived prop bound to itself advances once per tick.
#[test]
fn bind_same_data_with_function() {
    let circuit: Circuit<i32> = Circuit::new();
    let a = circuit.computed(|xs| xs[0] + 1);
    circuit.bind(&a, &a).unwrap();

    a.set(1);
    assert_eq!(a.get(), 2);

    circuit.tick().unwrap();
    assert_eq!(a.get(), 3);

    circuit.tick().unwrap();
    assert_eq!(a.get(), 4);
}

/// Test that targets are not recomputed synchronously by a write.
#[test]
fn binding_is_not_updated_immediately() {
    let circuit: Circuit<i32> = Circuit::new();
    let a = circuit.data(1);
    let (calls, compute) = spy();
    let b = circuit.computed(compute);
    circuit.bind(&a, &b).unwrap();

    a.set(2);
    assert!(calls.borrow().is_empty());
    assert!(b.is_dirty());
}

/// Test that targets are recomputed once the deferred flush runs.
#[test]
fn binding_is_updated_after_tick() {
    let circuit: Circuit<i32> = Circuit::new();
    let a = circuit.data(1);
    let (calls, compute) = spy();
    let b = circuit.computed(compute);
    circuit.bind(&a, &b).unwrap();

    a.set(2);
    circuit.tick().unwrap();
    assert_eq!(*calls.borrow(), vec![vec![2]]);
}

/// Test that a written value passes through the writer's compute function
/// before it reaches the targets.
#[test]
fn bind_data_with_setting_function() {
    let circuit: Circuit = Circuit::new();
    let a = circuit.computed(|xs: &[Value]| xs.first().cloned().unwrap_or_default());
    let b = circuit.data(Value::Null);
    circuit.bind(&a, &b).unwrap();

    a.set(json!([1, 2, 3]));
    assert_eq!(b.get(), json!([1, 2, 3]));
}

/// Test that a compute function writing another prop reaches that prop's
/// targets within the same run of deferred work.
#[test]
fn setting_function_updates_other_targets() {
    let circuit: Circuit<i32> = Circuit::new();
    let a = circuit.data(0);
    let c = circuit.data(0);
    let c_handle = c.clone();
    let b = circuit.computed(move |xs| {
        c_handle.set(xs[0]);
        0
    });
    let (calls, compute) = spy();
    let d = circuit.computed(compute);
    circuit.bind(&a, &b).unwrap();
    circuit.bind(&c, &d).unwrap();
    circuit.run_until_idle().unwrap();

    a.set(1);
    circuit.run_until_idle().unwrap();
    assert_eq!(calls.borrow().last(), Some(&vec![1]));
}

/// Test that a compute function receives one argument per source.
#[test]
fn bind_data_more_than_once() {
    let circuit: Circuit<i32> = Circuit::new();
    let a = circuit.data(0);
    let b = circuit.data(1);
    let c = circuit.computed(|xs| xs[0] + xs[1]);
    circuit.bind(&a, &c).unwrap();
    circuit.bind(&b, &c).unwrap();

    a.set(1);
    assert_eq!(c.get(), 2);
}

/// Test that binding the same pair twice delivers the value twice.
#[test]
fn bind_same_data_more_than_once() {
    let circuit: Circuit<i32> = Circuit::new();
    let a = circuit.data(1);
    let (calls, compute) = spy();
    let b = circuit.computed(compute);
    circuit.bind(&a, &b).unwrap();
    circuit.bind(&a, &b).unwrap();

    b.get();
    assert_eq!(*calls.borrow(), vec![vec![1, 1]]);
}

/// Test that several writes in one turn cause a single recompute.
#[test]
fn simultaneous_updates_compute_once() {
    let circuit: Circuit<i32> = Circuit::new();
    let a = circuit.data(1);
    let b = circuit.data(1);
    let (calls, compute) = spy();
    let c = circuit.computed(compute);
    circuit.bind(&a, &c).unwrap();
    circuit.bind(&b, &c).unwrap();

    a.set(2);
    b.set(2);
    c.get();
    assert_eq!(*calls.borrow(), vec![vec![2, 2]]);

    circuit.run_until_idle().unwrap();
    assert_eq!(calls.borrow().len(), 1);
}

/// Test that two props bound to each other follow each other's writes.
#[test]
fn bind_data_each_other() {
    let circuit: Circuit<i32> = Circuit::new();
    let a = circuit.data(0);
    let b = circuit.data(0);
    circuit.bind(&a, &b).unwrap();
    circuit.bind(&b, &a).unwrap();

    b.set(1);
    assert_eq!(a.get(), 1);

    a.set(2);
    assert_eq!(b.get(), 2);
}

/// Test that a mutual binding feeding a third prop recomputes it once per
/// change.
#[test]
fn bind_data_each_other_and_another() {
    let circuit: Circuit<i32> = Circuit::new();
    let a = circuit.data(0);
    let b = circuit.data(0);
    let (calls, compute) = spy();
    let c = circuit.computed(compute);
    circuit.bind(&a, &c).unwrap();
    circuit.bind(&b, &a).unwrap();
    circuit.bind(&a, &b).unwrap();

    a.set(1);
    circuit.tick().unwrap();

    b.set(2);
    circuit.tick().unwrap();

    assert_eq!(calls.borrow().len(), 2);
}

/// Test that a cycle of three props converges on the written value.
#[test]
fn bind_data_in_circle_chain() {
    let circuit: Circuit<i32> = Circuit::new();
    let a = circuit.data(0);
    let b = circuit.data(1);
    let c = circuit.data(2);
    circuit.bind(&a, &b).unwrap();
    circuit.bind(&b, &c).unwrap();
    circuit.bind(&c, &a).unwrap();

    a.set(1);
    assert_eq!(a.get(), 1);
    assert_eq!(b.get(), 1);
    assert_eq!(c.get(), 1);
}

/// Test that closing a cycle pulls the current value into the new target.
#[test]
fn circle_chain_updates_target() {
    let circuit: Circuit<Option<i32>> = Circuit::new();
    let a = circuit.data(None);
    let b = circuit.data(None);
    circuit.bind(&a, &b).unwrap();

    b.set(Some(0));
    circuit.bind(&b, &a).unwrap();
    assert_eq!(a.get(), Some(0));
}

// ============================================================================
// Binding events
// ============================================================================

/// Test that an event relays to its targets on the next tick.
#[test]
fn bind_event() {
    let circuit: Circuit = Circuit::new();
    let fa = counter();
    let fa_clone = fa.clone();
    let a = circuit.event_with(move |_| fa_clone.set(fa_clone.get() + 1));
    let fb = counter();
    let fb_clone = fb.clone();
    let b = circuit.event_with(move |_| fb_clone.set(fb_clone.get() + 1));
    circuit.bind(&a, &b).unwrap();

    circuit.run_until_idle().unwrap();
    assert_eq!(fa.get(), 0);

    a.emit();
    assert_eq!(fb.get(), 0);

    circuit.tick().unwrap();
    assert_eq!(fb.get(), 1);
}

/// Test that canceling suppresses the relay.
#[test]
fn cancel_event() {
    let circuit: Circuit = Circuit::new();
    let a = circuit.event_with(|event| event.cancel());
    let count = counter();
    let count_clone = count.clone();
    let b = circuit.event_with(move |_| count_clone.set(count_clone.get() + 1));
    circuit.bind(&a, &b).unwrap();

    a.emit();
    circuit.run_until_idle().unwrap();
    assert_eq!(count.get(), 0);
}

/// Test that an explicit dispatch relays after a cancel.
#[test]
fn dispatch_event_after_cancel() {
    let circuit: Circuit = Circuit::new();
    let a = circuit.event_with(|event| {
        event.cancel();
        event.dispatch();
    });
    let count = counter();
    let count_clone = count.clone();
    let b = circuit.event_with(move |_| count_clone.set(count_clone.get() + 1));
    circuit.bind(&a, &b).unwrap();

    a.emit();
    circuit.run_until_idle().unwrap();
    assert_eq!(count.get(), 1);
}

/// Test that an explicit dispatch relays the context as it is at that point.
#[test]
fn dispatch_relays_current_context() {
    let circuit: Circuit = Circuit::new();
    let a = circuit.event_with(|event| {
        event.cancel();
        event.set_context(json!(1));
        event.dispatch();
        event.set_context(json!(2));
    });
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    let b = circuit.event_with(move |event| seen_clone.borrow_mut().push(event.context().clone()));
    circuit.bind(&a, &b).unwrap();

    a.emit();
    circuit.run_until_idle().unwrap();
    assert_eq!(*seen.borrow(), vec![json!(1)]);
}

/// Test that a listener can rewrite the context it relays.
#[test]
fn event_context() {
    let circuit: Circuit<i64> = Circuit::new();
    let a = circuit.event_with(|event| {
        assert_eq!(*event.context(), 1);
        *event.context_mut() += 1;
    });
    let seen = Rc::new(Cell::new(0));
    let seen_clone = seen.clone();
    let b = circuit.event_with(move |event| seen_clone.set(*event.context()));
    circuit.bind(&a, &b).unwrap();

    a.emit_with(1);
    circuit.tick().unwrap();
    assert_eq!(seen.get(), 2);
}

/// Test that an event emitted without a context carries null.
#[test]
fn default_event_context_is_null() {
    let circuit: Circuit = Circuit::new();
    let seen = Rc::new(RefCell::new(json!("unset")));
    let seen_clone = seen.clone();
    let a = circuit.event_with(move |event| *seen_clone.borrow_mut() = event.context().clone());

    a.emit();
    assert_eq!(*seen.borrow(), Value::Null);
}

// ============================================================================
// Unbinding
// ============================================================================

/// Test that an unbound prop no longer follows its former source.
#[test]
fn unbind_data() {
    let circuit: Circuit<Option<i32>> = Circuit::new();
    let a = circuit.data(None);
    let b = circuit.data(None);
    circuit.bind(&a, &b).unwrap();
    circuit.unbind(&a, &b).unwrap();

    a.set(Some(7));
    assert_ne!(b.get(), Some(7));
    circuit.run_until_idle().unwrap();
    assert_ne!(b.get(), Some(7));
}

/// Test that an unbound event no longer relays to its former target.
#[test]
fn unbind_event() {
    let circuit: Circuit = Circuit::new();
    let a = circuit.event();
    let count = counter();
    let count_clone = count.clone();
    let b = circuit.event_with(move |_| count_clone.set(count_clone.get() + 1));
    circuit.bind(&a, &b).unwrap();
    circuit.unbind(&a, &b).unwrap();

    a.emit();
    circuit.run_until_idle().unwrap();
    assert_eq!(count.get(), 0);
}

/// Test that the same edge cannot be removed twice.
#[test]
fn unbind_same_pair_twice_fails() {
    let circuit: Circuit = Circuit::new();
    let a = circuit.data(Value::Null);
    let b = circuit.data(Value::Null);
    circuit.bind(&a, &b).unwrap();
    circuit.unbind(&a, &b).unwrap();

    assert_eq!(
        circuit.unbind(&a, &b),
        Err(CircuitError::NotConnected {
            from: a.id(),
            to: b.id()
        })
    );
}

/// Test that unbinding delivers a write that was still pending.
#[test]
fn unbind_updates_data_cache() {
    let circuit: Circuit<i32> = Circuit::new();
    let a = circuit.data(0);
    let b = circuit.data(0);
    circuit.bind(&a, &b).unwrap();

    a.set(1);
    circuit.unbind(&a, &b).unwrap();
    assert!(!b.is_dirty());
    assert_eq!(b.get(), 1);
}
