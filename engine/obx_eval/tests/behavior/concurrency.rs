//! Changes and observations from several threads.

use std::sync::Arc;
use std::thread;

use obx_eval::{BinaryOp, Lambda, LambdaBuilder, Registry, Value};
use pretty_assertions::assert_eq;

use crate::common::{arg, init_tracing, person};

const WRITERS: usize = 4;
const ROUNDS: usize = 50;

/// `|p0, p1, ..| p0.name.len + p1.name.len + ..`
fn total_name_length(arity: usize) -> Lambda {
    let mut b = LambdaBuilder::new();
    let params: Vec<_> = (0..arity).map(|i| b.param(&format!("p{i}"))).collect();
    let mut total = None;
    for param in params {
        let name = b.member(param, "name");
        let len = b.member(name, "len");
        total = Some(match total {
            Some(sum) => b.binary(BinaryOp::Add, sum, len),
            None => len,
        });
    }
    let body = total.unwrap_or_else(|| b.constant(0));
    b.build(body)
}

#[test]
fn concurrent_writers_settle_on_the_final_value() {
    init_tracing();
    let registry = Registry::default();
    let people: Vec<_> = (0..WRITERS).map(|_| person("")).collect();
    let args: Vec<Value> = people.iter().map(arg).collect();
    let observation = registry.observe(&total_name_length(WRITERS), &args).unwrap();
    assert_eq!(observation.value(), Some(Value::int(0)));

    let writers: Vec<_> = people
        .iter()
        .map(|record| {
            let record = Arc::clone(record);
            thread::spawn(move || {
                for round in 1..=ROUNDS {
                    record.set_value("name", "x".repeat(round).as_str()).unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let expected = i64::try_from(WRITERS * ROUNDS).unwrap();
    assert_eq!(observation.value(), Some(Value::int(expected)));

    observation.dispose().unwrap();
    assert_eq!(registry.cached_observations(), 0);
    for record in &people {
        assert_eq!(record.subscriber_count(), 0);
    }
}

#[test]
fn concurrent_observers_balance_the_cache() {
    init_tracing();
    let registry = Registry::default();
    let ann = person("Ann");
    let lambda = Arc::new(total_name_length(1));

    let observers: Vec<_> = (0..WRITERS)
        .map(|_| {
            let registry = registry.clone();
            let lambda = Arc::clone(&lambda);
            let args = vec![arg(&ann)];
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let observation = registry.observe(&lambda, &args).unwrap();
                    assert_eq!(observation.value(), Some(Value::int(3)));
                    observation.dispose().unwrap();
                }
            })
        })
        .collect();
    for observer in observers {
        observer.join().unwrap();
    }

    assert_eq!(registry.cached_observations(), 0);
    assert_eq!(ann.subscriber_count(), 0);
}

#[test]
fn observations_move_between_threads() {
    init_tracing();
    let registry = Registry::default();
    let ann = person("Ann");
    let observation = registry.observe(&total_name_length(1), &[arg(&ann)]).unwrap();

    let writer = {
        let ann = Arc::clone(&ann);
        thread::spawn(move || ann.set_value("name", "Annabel").unwrap())
    };
    writer.join().unwrap();

    let reader = thread::spawn(move || observation.value());
    assert_eq!(reader.join().unwrap(), Some(Value::int(7)));
}
