//! Indexers, collection hosts and ignored properties.

use std::sync::Arc;

use obx_eval::{EvalErrorKind, LambdaBuilder, Options, Registry, Value};
use obx_value::{ObservableList, ObservableRecord};
use pretty_assertions::assert_eq;

use crate::common::{arg, init_tracing, person, record_events, CountingMap};

#[test]
fn dictionary_index_reacts_only_to_its_key() {
    init_tracing();
    let registry = Registry::default();
    let map = Arc::new(CountingMap::default());
    map.inner.insert("a", 1).unwrap();

    // `|m| m["a"]`
    let mut b = LambdaBuilder::new();
    let m = b.param("m");
    let key = b.constant("a");
    let read = b.index(m, &[key]);
    let observation = registry.observe(&b.build(read), &[arg(&map)]).unwrap();
    assert_eq!(observation.value(), Some(Value::int(1)));
    assert_eq!(map.reads(), 1);

    map.inner.insert("b", 2).unwrap();
    assert_eq!(map.reads(), 1);

    map.inner.insert("a", 3).unwrap();
    assert_eq!(map.reads(), 2);
    assert_eq!(observation.value(), Some(Value::int(3)));

    map.inner.remove("a").unwrap();
    let fault = observation.fault().unwrap();
    assert!(matches!(fault.kind, EvalErrorKind::KeyNotFound { .. }));

    map.inner.insert("a", 4).unwrap();
    assert_eq!(observation.value(), Some(Value::int(4)));

    observation.dispose().unwrap();
    assert_eq!(map.inner.subscriber_count(), 0);
}

#[test]
fn dictionary_reset_rereads_every_index() {
    init_tracing();
    let registry = Registry::default();
    let map = Arc::new(CountingMap::default());
    map.inner.insert("a", 1).unwrap();

    let mut b = LambdaBuilder::new();
    let m = b.param("m");
    let key = b.constant("a");
    let read = b.index(m, &[key]);
    let observation = registry.observe(&b.build(read), &[arg(&map)]).unwrap();

    map.inner.clear().unwrap();
    assert_eq!(map.reads(), 2);
    assert!(observation.fault().is_some());
}

#[test]
fn list_index_follows_collection_changes() {
    init_tracing();
    let registry = Registry::default();
    let list = Arc::new(ObservableList::new(vec![Value::string("x"), Value::string("y")]));

    // `|xs| xs[1]`
    let mut b = LambdaBuilder::new();
    let xs = b.param("xs");
    let one = b.constant(1);
    let read = b.index(xs, &[one]);
    let observation = registry.observe(&b.build(read), &[arg(&list)]).unwrap();
    assert_eq!(observation.value(), Some(Value::string("y")));

    list.replace(1, "z").unwrap();
    assert_eq!(observation.value(), Some(Value::string("z")));

    list.insert(0, "w").unwrap();
    assert_eq!(observation.value(), Some(Value::string("x")));

    list.clear().unwrap();
    let fault = observation.fault().unwrap();
    assert!(matches!(fault.kind, EvalErrorKind::IndexOutOfBounds { .. }));
}

#[test]
fn method_calls_follow_any_change() {
    init_tracing();
    let registry = Registry::default();
    let list = Arc::new(ObservableList::new(vec![Value::int(1), Value::int(2)]));

    // `|xs| xs.contains(3)`
    let mut b = LambdaBuilder::new();
    let xs = b.param("xs");
    let three = b.constant(3);
    let call = b.call(xs, "contains", &[three]);
    let observation = registry.observe(&b.build(call), &[arg(&list)]).unwrap();
    let events = record_events(&observation);
    assert_eq!(observation.value(), Some(Value::Bool(false)));

    list.push(3).unwrap();
    assert_eq!(observation.value(), Some(Value::Bool(true)));
    assert_eq!(events.lock().len(), 1);

    list.remove(2).unwrap();
    assert_eq!(observation.value(), Some(Value::Bool(false)));
}

#[test]
fn ignored_member_is_read_once_and_never_watched() {
    init_tracing();
    let options = Options::builder()
        .ignore_property("Person", "last_seen")
        .build()
        .unwrap();
    let registry = Registry::new(options);
    let ann = Arc::new(
        ObservableRecord::new("Person")
            .with("name", "Ann")
            .with("last_seen", 10),
    );

    // `|p| p.last_seen`
    let mut b = LambdaBuilder::new();
    let p = b.param("p");
    let last_seen = b.member(p, "last_seen");
    let observation = registry.observe(&b.build(last_seen), &[arg(&ann)]).unwrap();
    assert_eq!(ann.subscriber_count(), 0);

    ann.set_value("last_seen", 20).unwrap();
    assert_eq!(observation.value(), Some(Value::int(10)));
    assert_eq!(ann.read_count("last_seen"), 1);
}

#[test]
fn ignored_property_is_filtered_for_other_interests() {
    init_tracing();
    let options = Options::builder()
        .ignore_property("Person", "last_seen")
        .build()
        .unwrap();
    let registry = Registry::new(options);
    let ann = Arc::new(
        ObservableRecord::new("Person")
            .with("name", "Ann")
            .with("last_seen", 10),
    );

    // `|p| p.describe()`: a method call reacts to any change, and records
    // have no methods, so every refresh raises a fresh fault.
    let mut b = LambdaBuilder::new();
    let p = b.param("p");
    let call = b.call(p, "describe", &[]);
    let observation = registry.observe(&b.build(call), &[arg(&ann)]).unwrap();
    let events = record_events(&observation);
    assert!(observation.fault().is_some());

    ann.set_value("last_seen", 20).unwrap();
    assert!(events.lock().is_empty());

    ann.set_value("name", "Annabel").unwrap();
    assert_eq!(events.lock().len(), 1);
}

#[test]
fn ignored_property_applies_to_its_type_only() {
    init_tracing();
    let options = Options::builder()
        .ignore_property("Robot", "name")
        .build()
        .unwrap();
    let registry = Registry::new(options);
    let ann = person("Ann");

    let mut b = LambdaBuilder::new();
    let p = b.param("p");
    let name = b.member(p, "name");
    let observation = registry.observe(&b.build(name), &[arg(&ann)]).unwrap();

    ann.set_value("name", "Annabel").unwrap();
    assert_eq!(observation.value(), Some(Value::string("Annabel")));
}

#[test]
fn long_list_literals_keep_every_item() {
    const ITEMS: usize = 70_000;
    init_tracing();
    let registry = Registry::default();

    let mut b = LambdaBuilder::new();
    let items: Vec<_> = (0..ITEMS).map(|_| b.constant(7)).collect();
    let list = b.new_list(&items);
    let observation = registry.observe(&b.build(list), &[]).unwrap();

    let value = observation.value().unwrap();
    assert_eq!(value.as_list().map(<[Value]>::len), Some(ITEMS));
    // list literal plus the one shared constant
    assert_eq!(registry.cached_observations(), 2);

    observation.dispose().unwrap();
    assert_eq!(registry.cached_observations(), 0);
}
