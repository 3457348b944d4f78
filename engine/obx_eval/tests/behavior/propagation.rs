//! Change propagation through shared nodes.

use std::sync::Arc;

use obx_eval::{
    BinaryOp, ConstantFolding, EvalErrorKind, Lambda, LambdaBuilder, Object, Options, QualifiedName,
    Registry, Value,
};
use obx_value::ObservableRecord;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::common::{arg, init_tracing, person, record_events};

/// `|a, b| a.name.len + b.name.len`
fn name_lengths(first: &str, second: &str) -> Lambda {
    let mut b = LambdaBuilder::new();
    let x = b.param(first);
    let y = b.param(second);
    let x_name = b.member(x, "name");
    let x_len = b.member(x_name, "len");
    let y_name = b.member(y, "name");
    let y_len = b.member(y_name, "len");
    let sum = b.binary(BinaryOp::Add, x_len, y_len);
    b.build(sum)
}

/// `|p| p.friend.name.len`
fn friend_name_len() -> Lambda {
    let mut b = LambdaBuilder::new();
    let p = b.param("p");
    let friend = b.member(p, "friend");
    let name = b.member(friend, "name");
    let len = b.member(name, "len");
    b.build(len)
}

#[test]
fn sum_follows_both_operands() {
    init_tracing();
    let registry = Registry::default();
    let ann = person("Ann");
    let bob = person("Bob");
    let observation = registry
        .observe(&name_lengths("a", "b"), &[arg(&ann), arg(&bob)])
        .unwrap();
    let events = record_events(&observation);
    assert_eq!(observation.value(), Some(Value::int(6)));

    ann.set_value("name", "Annabel").unwrap();
    assert_eq!(observation.value(), Some(Value::int(10)));

    bob.set_value("name", "Roberta").unwrap();
    assert_eq!(observation.value(), Some(Value::int(14)));

    let events = events.lock();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].previous.value(), Some(&Value::int(6)));
    assert_eq!(events[1].current.value(), Some(&Value::int(14)));
}

#[test]
fn scripted_edits_emit_the_exact_sum_sequence() {
    init_tracing();
    let registry = Registry::default();
    let john = person("John");
    let emily = person("Emily");
    let observation = registry
        .observe(&name_lengths("p1", "p2"), &[arg(&john), arg(&emily)])
        .unwrap();
    let events = record_events(&observation);
    assert_eq!(observation.value(), Some(Value::int(9)));

    john.set_value("name", "J").unwrap();
    // same length: no event
    john.set_value("name", "K").unwrap();
    emily.set_value("name", "E").unwrap();
    john.set_value("name", "Jack").unwrap();
    john.set_value("name", "J").unwrap();
    emily.set_value("name", "Emily").unwrap();
    emily.set_value("name", "E").unwrap();

    let events = events.lock();
    let sums: Vec<i64> = events
        .iter()
        .filter_map(|event| event.current.value().and_then(Value::as_int))
        .collect();
    assert_eq!(sums, vec![6, 2, 5, 2, 6, 2]);

    let previous: Vec<i64> = events
        .iter()
        .filter_map(|event| event.previous.value().and_then(Value::as_int))
        .collect();
    assert_eq!(previous, vec![9, 6, 2, 5, 2, 6]);
}

#[test]
fn equal_result_stops_propagation() {
    init_tracing();
    let registry = Registry::default();
    let ann = person("Ann");
    let bob = person("Bob");
    let observation = registry
        .observe(&name_lengths("a", "b"), &[arg(&ann), arg(&bob)])
        .unwrap();
    let events = record_events(&observation);

    // Same length: the length node settles and the sum is never recomputed.
    ann.set_value("name", "Amy").unwrap();
    assert_eq!(ann.read_count("name"), 2);
    assert!(events.lock().is_empty());
    assert_eq!(observation.value(), Some(Value::int(6)));
}

#[test]
fn faults_propagate_and_recover() {
    init_tracing();
    let registry = Registry::default();
    let ann = Arc::new(
        ObservableRecord::new("Person")
            .with("name", "Ann")
            .with("friend", Value::Null),
    );
    let bob = person("Bob");
    let observation = registry.observe(&friend_name_len(), &[arg(&ann)]).unwrap();

    let fault = observation.fault().unwrap();
    assert!(matches!(&fault.kind, EvalErrorKind::NullReference { member } if member == "name"));
    assert_eq!(ann.subscriber_count(), 1);

    ann.set_value("friend", arg(&bob)).unwrap();
    assert_eq!(observation.value(), Some(Value::int(3)));
    assert_eq!(bob.subscriber_count(), 1);

    bob.set_value("name", "Bobby").unwrap();
    assert_eq!(observation.value(), Some(Value::int(5)));

    ann.set_value("friend", Value::Null).unwrap();
    assert!(observation.fault().is_some());
    assert_eq!(bob.subscriber_count(), 0);
}

#[test]
fn unchanged_fault_is_not_reported_again() {
    init_tracing();
    let registry = Registry::default();
    let ann = Arc::new(ObservableRecord::new("Person").with("friend", Value::Null));
    let observation = registry.observe(&friend_name_len(), &[arg(&ann)]).unwrap();
    let events = record_events(&observation);
    let before = observation.fault().unwrap();

    ann.touch("friend").unwrap();

    assert!(events.lock().is_empty());
    assert!(Arc::ptr_eq(&before, &observation.fault().unwrap()));
}

#[test]
fn renamed_parameters_share_nodes() {
    init_tracing();
    let registry = Registry::default();
    let ann = person("Ann");
    let bob = person("Bob");
    let first = registry
        .observe(&name_lengths("a", "b"), &[arg(&ann), arg(&bob)])
        .unwrap();
    let cached = registry.cached_observations();
    let second = registry
        .observe(&name_lengths("x", "y"), &[arg(&ann), arg(&bob)])
        .unwrap();

    assert_eq!(registry.cached_observations(), cached);
    assert_eq!(ann.read_count("name"), 1);
    assert_eq!(first.value(), second.value());

    first.dispose().unwrap();
    ann.set_value("name", "Annabel").unwrap();
    assert_eq!(second.value(), Some(Value::int(10)));
    second.dispose().unwrap();
    assert_eq!(registry.cached_observations(), 0);
}

#[test]
fn shared_subexpressions_are_evaluated_once() {
    init_tracing();
    let registry = Registry::default();
    let ann = person("Ann");
    let bob = person("Bob");
    // Both observations contain `a.name.len`.
    let sum = registry
        .observe(&name_lengths("a", "b"), &[arg(&ann), arg(&bob)])
        .unwrap();
    let mut b = LambdaBuilder::new();
    let p = b.param("p");
    let name = b.member(p, "name");
    let len = b.member(name, "len");
    let only = registry.observe(&b.build(len), &[arg(&ann)]).unwrap();

    ann.set_value("name", "Annabel").unwrap();

    assert_eq!(ann.read_count("name"), 2);
    assert_eq!(ann.subscriber_count(), 1);
    assert_eq!(sum.value(), Some(Value::int(10)));
    assert_eq!(only.value(), Some(Value::int(7)));
}

/// Reads `x` and, as a side effect, writes `y` on its target.
struct Relay {
    target: Arc<ObservableRecord>,
}

impl Object for Relay {
    fn type_name(&self) -> QualifiedName {
        QualifiedName::new("Relay")
    }

    fn get(&self, member: &str) -> obx_eval::EvalResult {
        match member {
            "x" => {
                self.target.set_value("y", 10)?;
                Ok(Value::int(5))
            }
            _ => Err(obx_value::no_such_member(member, &self.type_name())),
        }
    }
}

#[test]
fn changes_raised_during_evaluation_are_applied_afterwards() {
    init_tracing();
    let registry = Registry::default();
    let target = Arc::new(ObservableRecord::new("Target").with("y", 1));
    let relay = Arc::new(Relay {
        target: Arc::clone(&target),
    });

    // `|t, r| t.y + r.x`: `t.y` is subscribed by the time `r.x` writes it.
    let mut b = LambdaBuilder::new();
    let t = b.param("t");
    let r = b.param("r");
    let y = b.member(t, "y");
    let x = b.member(r, "x");
    let sum = b.binary(BinaryOp::Add, y, x);
    let observation = registry.observe(&b.build(sum), &[arg(&target), arg(&relay)]).unwrap();

    assert_eq!(observation.value(), Some(Value::int(15)));
    assert_eq!(target.read_count("y"), 2);
}

#[test]
fn optimizer_runs_before_binding() {
    init_tracing();
    let registry = Registry::new(Options::builder().optimizer(ConstantFolding).build().unwrap());
    let ann = person("Ann");

    // `|p| p.name.len + (1 + 2)`
    let mut b = LambdaBuilder::new();
    let p = b.param("p");
    let name = b.member(p, "name");
    let len = b.member(name, "len");
    let one = b.constant(1);
    let two = b.constant(2);
    let three = b.binary(BinaryOp::Add, one, two);
    let sum = b.binary(BinaryOp::Add, len, three);
    let observation = registry.observe(&b.build(sum), &[arg(&ann)]).unwrap();

    assert_eq!(observation.expression(), "|p| p.name.len + 3");
    assert_eq!(observation.value(), Some(Value::int(6)));
    // argument, p.name, p.name.len, 3, sum
    assert_eq!(registry.cached_observations(), 5);
}

#[test]
fn mixed_expression_kinds_stay_live() {
    init_tracing();
    let registry = Registry::default();
    let ann = person("Ann");

    // `|p| (p is Person) ? p.name.to_upper() : ""`
    let mut b = LambdaBuilder::new();
    let p = b.param("p");
    let is_person = b.type_is(p, "Person");
    let name = b.member(p, "name");
    let upper = b.call(name, "to_upper", &[]);
    let empty = b.constant("");
    let test = b.conditional(is_person, upper, empty);
    let observation = registry.observe(&b.build(test), &[arg(&ann)]).unwrap();
    assert_eq!(observation.value(), Some(Value::string("ANN")));

    ann.set_value("name", "Annabel").unwrap();
    assert_eq!(observation.value(), Some(Value::string("ANNABEL")));
    assert_eq!(observation.to_string(), r#"|p| (p is Person) ? p.name.to_upper() : "" = "ANNABEL""#);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn observed_sum_tracks_updates(
        updates in prop::collection::vec((any::<bool>(), "[a-z]{0,8}"), 1..16)
    ) {
        let registry = Registry::default();
        let ann = person("Ann");
        let bob = person("Bob");
        let observation = registry
            .observe(&name_lengths("a", "b"), &[arg(&ann), arg(&bob)])
            .unwrap();

        let mut lengths = (3_i64, 3_i64);
        for (first, name) in &updates {
            let len = i64::try_from(name.len()).unwrap();
            if *first {
                ann.set_value("name", name.as_str()).unwrap();
                lengths.0 = len;
            } else {
                bob.set_value("name", name.as_str()).unwrap();
                lengths.1 = len;
            }
            prop_assert_eq!(observation.value(), Some(Value::int(lengths.0 + lengths.1)));
        }

        observation.dispose().unwrap();
        prop_assert_eq!(registry.cached_observations(), 0);
        prop_assert_eq!(ann.subscriber_count(), 0);
        prop_assert_eq!(bob.subscriber_count(), 0);
    }
}
