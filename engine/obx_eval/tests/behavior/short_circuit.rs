//! Short-circuit nodes materialize only the branches they take.

use std::sync::Arc;

use obx_eval::{BinaryOp, EvalErrorKind, LambdaBuilder, Registry, Value};
use obx_value::ObservableRecord;
use pretty_assertions::assert_eq;

use crate::common::{arg, init_tracing, person};

fn switch(active: bool) -> Arc<ObservableRecord> {
    Arc::new(
        ObservableRecord::new("Switch")
            .with("active", active)
            .with("nick", Value::Null),
    )
}

#[test]
fn and_skips_right_operand_while_left_is_false() {
    init_tracing();
    let registry = Registry::default();
    let s = switch(false);
    let ann = person("Ann");

    // `|s, q| s.active && q.name.len > 2`
    let mut b = LambdaBuilder::new();
    let sp = b.param("s");
    let q = b.param("q");
    let active = b.member(sp, "active");
    let name = b.member(q, "name");
    let len = b.member(name, "len");
    let two = b.constant(2);
    let long = b.binary(BinaryOp::Gt, len, two);
    let both = b.and_also(active, long);
    let observation = registry.observe(&b.build(both), &[arg(&s), arg(&ann)]).unwrap();

    assert_eq!(observation.value(), Some(Value::Bool(false)));
    assert_eq!(ann.read_count("name"), 0);
    assert_eq!(ann.subscriber_count(), 0);

    s.set_value("active", true).unwrap();
    assert_eq!(observation.value(), Some(Value::Bool(true)));
    assert_eq!(ann.read_count("name"), 1);
    assert_eq!(ann.subscriber_count(), 1);

    ann.set_value("name", "Al").unwrap();
    assert_eq!(observation.value(), Some(Value::Bool(false)));

    s.set_value("active", false).unwrap();
    assert_eq!(observation.value(), Some(Value::Bool(false)));
    assert_eq!(ann.subscriber_count(), 0);

    observation.dispose().unwrap();
    assert_eq!(registry.cached_observations(), 0);
}

#[test]
fn or_skips_right_operand_while_left_is_true() {
    init_tracing();
    let registry = Registry::default();
    let s = switch(true);
    let t = switch(false);

    // `|s, t| s.active || t.active`
    let mut b = LambdaBuilder::new();
    let sp = b.param("s");
    let tp = b.param("t");
    let left = b.member(sp, "active");
    let right = b.member(tp, "active");
    let either = b.or_else(left, right);
    let observation = registry.observe(&b.build(either), &[arg(&s), arg(&t)]).unwrap();

    assert_eq!(observation.value(), Some(Value::Bool(true)));
    assert_eq!(t.read_count("active"), 0);

    s.set_value("active", false).unwrap();
    assert_eq!(observation.value(), Some(Value::Bool(false)));
    assert_eq!(t.subscriber_count(), 1);

    t.set_value("active", true).unwrap();
    assert_eq!(observation.value(), Some(Value::Bool(true)));
}

#[test]
fn non_boolean_test_faults() {
    init_tracing();
    let registry = Registry::default();
    let ann = person("Ann");

    // `|p| p.name && true`
    let mut b = LambdaBuilder::new();
    let p = b.param("p");
    let name = b.member(p, "name");
    let yes = b.constant(true);
    let both = b.and_also(name, yes);
    let observation = registry.observe(&b.build(both), &[arg(&ann)]).unwrap();

    let fault = observation.fault().unwrap();
    assert!(matches!(fault.kind, EvalErrorKind::TypeMismatch { .. }));
}

#[test]
fn conditional_switches_branches() {
    init_tracing();
    let registry = Registry::default();
    let s = switch(true);
    let ann = person("Ann");
    let bob = person("Bob");

    // `|s, a, b| s.active ? a.name : b.name`
    let mut b = LambdaBuilder::new();
    let sp = b.param("s");
    let a = b.param("a");
    let bp = b.param("b");
    let test = b.member(sp, "active");
    let a_name = b.member(a, "name");
    let b_name = b.member(bp, "name");
    let pick = b.conditional(test, a_name, b_name);
    let observation = registry
        .observe(&b.build(pick), &[arg(&s), arg(&ann), arg(&bob)])
        .unwrap();

    assert_eq!(observation.value(), Some(Value::string("Ann")));
    assert_eq!(ann.subscriber_count(), 1);
    assert_eq!(bob.subscriber_count(), 0);

    s.set_value("active", false).unwrap();
    assert_eq!(observation.value(), Some(Value::string("Bob")));
    assert_eq!(ann.subscriber_count(), 0);
    assert_eq!(bob.subscriber_count(), 1);

    // The released branch no longer reacts.
    ann.set_value("name", "Annabel").unwrap();
    assert_eq!(ann.read_count("name"), 1);
    assert_eq!(observation.value(), Some(Value::string("Bob")));
}

#[test]
fn node_shared_by_both_branches_survives_a_switch() {
    init_tracing();
    let registry = Registry::default();
    let s = switch(true);
    let ann = person("Ann");

    // `|s, q| s.active ? q.name : q.name.to_upper()`
    let mut b = LambdaBuilder::new();
    let sp = b.param("s");
    let q = b.param("q");
    let test = b.member(sp, "active");
    let plain = b.member(q, "name");
    let shared = b.member(q, "name");
    let upper = b.call(shared, "to_upper", &[]);
    let pick = b.conditional(test, plain, upper);
    let observation = registry.observe(&b.build(pick), &[arg(&s), arg(&ann)]).unwrap();
    assert_eq!(observation.value(), Some(Value::string("Ann")));

    s.set_value("active", false).unwrap();

    assert_eq!(observation.value(), Some(Value::string("ANN")));
    assert_eq!(ann.read_count("name"), 1);
    assert_eq!(ann.subscriber_count(), 1);
}

#[test]
fn coalesce_reads_fallback_only_for_null() {
    init_tracing();
    let registry = Registry::default();
    let s = switch(true);
    let ann = person("Ann");

    // `|s, q| s.nick ?? q.name`
    let mut b = LambdaBuilder::new();
    let sp = b.param("s");
    let q = b.param("q");
    let nick = b.member(sp, "nick");
    let name = b.member(q, "name");
    let either = b.coalesce(nick, name);
    let observation = registry.observe(&b.build(either), &[arg(&s), arg(&ann)]).unwrap();

    assert_eq!(observation.value(), Some(Value::string("Ann")));
    assert_eq!(ann.subscriber_count(), 1);

    s.set_value("nick", "Al").unwrap();
    assert_eq!(observation.value(), Some(Value::string("Al")));
    assert_eq!(ann.subscriber_count(), 0);

    ann.set_value("name", "Annabel").unwrap();
    assert_eq!(ann.read_count("name"), 1);
}
