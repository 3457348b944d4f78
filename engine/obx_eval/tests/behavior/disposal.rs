//! Values the engine produces are disposed exactly once.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use obx_eval::{
    Constructor, DisposalError, EvalError, EvalErrorKind, Function, Lambda, LambdaBuilder,
    ObjectRef, Options, Registry, Value,
};
use obx_value::{ObservableList, ObservableRecord};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use crate::common::{arg, init_tracing, Release, Resource};

type Opened = Arc<Mutex<Vec<Arc<Resource>>>>;

/// `open(id)`: a fresh [`Resource`] per call.
fn opener(release: Release) -> (Function, Opened) {
    let opened: Opened = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&opened);
    let open = Function::new("open", 1, move |args| {
        let id = args[0].as_int().unwrap_or_default();
        let resource = Resource::new(id, release);
        log.lock().push(Arc::clone(&resource));
        Ok(Value::from_object(resource as ObjectRef))
    });
    (open, opened)
}

/// `|p| open(p.version)`
fn open_version(open: Function) -> Lambda {
    let mut b = LambdaBuilder::new();
    let p = b.param("p");
    let version = b.member(p, "version");
    let call = b.static_call(open, &[version]);
    b.build(call)
}

fn versioned() -> Arc<ObservableRecord> {
    Arc::new(ObservableRecord::new("Config").with("version", 1))
}

fn disposals(opened: &Opened) -> Vec<usize> {
    opened.lock().iter().map(|resource| resource.disposals()).collect()
}

#[test]
fn replaced_and_released_results_are_disposed_once() {
    init_tracing();
    let registry = Registry::default();
    let (open, opened) = opener(Release::Sync);
    let config = versioned();
    let observation = registry.observe(&open_version(open), &[arg(&config)]).unwrap();
    assert_eq!(disposals(&opened), vec![0]);

    config.set_value("version", 2).unwrap();
    assert_eq!(disposals(&opened), vec![1, 0]);

    observation.dispose().unwrap();
    observation.dispose().unwrap();
    assert_eq!(disposals(&opened), vec![1, 1]);
}

#[test]
fn returning_the_same_object_disposes_nothing() {
    init_tracing();
    let registry = Registry::default();
    let keep = Resource::new(7, Release::Sync);
    let held = Arc::clone(&keep);
    let cached = Function::new("cached", 1, move |_| Ok(Value::from_object(Arc::clone(&held) as ObjectRef)));
    let config = versioned();
    let observation = registry.observe(&open_version(cached), &[arg(&config)]).unwrap();

    config.set_value("version", 2).unwrap();
    assert_eq!(keep.disposals(), 0);

    drop(observation);
    assert_eq!(keep.disposals(), 1);
}

#[test]
fn shared_node_is_disposed_by_its_last_holder() {
    init_tracing();
    let registry = Registry::default();
    let (open, opened) = opener(Release::Sync);
    let config = versioned();
    let lambda = open_version(open);
    let first = registry.observe(&lambda, &[arg(&config)]).unwrap();
    let second = registry.observe(&lambda, &[arg(&config)]).unwrap();
    assert_eq!(opened.lock().len(), 1);

    first.dispose().unwrap();
    assert_eq!(disposals(&opened), vec![0]);
    second.dispose().unwrap();
    assert_eq!(disposals(&opened), vec![1]);
}

#[test]
fn switch_off_keeps_static_call_results() {
    init_tracing();
    let options = Options::builder().dispose_static_call_results(false).build().unwrap();
    let registry = Registry::new(options);
    let (open, opened) = opener(Release::Sync);
    let config = versioned();
    let observation = registry.observe(&open_version(open), &[arg(&config)]).unwrap();

    config.set_value("version", 2).unwrap();
    observation.dispose().unwrap();
    assert_eq!(disposals(&opened), vec![0, 0]);
}

#[test]
fn failed_disposal_is_reported() {
    init_tracing();
    let registry = Registry::default();
    let (open, _opened) = opener(Release::Failing);
    let config = versioned();
    let observation = registry.observe(&open_version(open), &[arg(&config)]).unwrap();

    let err = config.set_value("version", 2).unwrap_err();
    assert!(matches!(
        &err.kind,
        EvalErrorKind::DisposalFailed { type_name, reason }
            if type_name == "Resource" && reason == "already closed"
    ));
    // The replacement still took effect.
    let current = observation.value().unwrap();
    assert_eq!(current.as_object().map(|object| object.type_name().to_string()).as_deref(), Some("Resource"));

    let err = observation.dispose().unwrap_err();
    assert!(matches!(&err, DisposalError::Failed { type_name, .. } if type_name == "Resource"));
    assert_eq!(registry.cached_observations(), 0);
}

#[test]
fn arguments_are_never_disposed() {
    init_tracing();
    let options = Options::builder()
        .dispose_result_type("Resource", false)
        .build()
        .unwrap();
    let registry = Registry::new(options);
    let resource = Resource::new(1, Release::Sync);

    let mut b = LambdaBuilder::new();
    let r = b.param("r");
    let observation = registry.observe(&b.build(r), &[arg(&resource)]).unwrap();
    observation.dispose().unwrap();

    assert_eq!(resource.disposals(), 0);
}

#[test]
fn member_rule_disposes_replaced_reads() {
    init_tracing();
    let options = Options::builder()
        .dispose_member("Host", "socket")
        .build()
        .unwrap();
    let registry = Registry::new(options);
    let first = Resource::new(1, Release::Sync);
    let second = Resource::new(2, Release::Sync);
    let host = Arc::new(ObservableRecord::new("Host").with("socket", arg(&first)));

    let mut b = LambdaBuilder::new();
    let h = b.param("h");
    let socket = b.member(h, "socket");
    let observation = registry.observe(&b.build(socket), &[arg(&host)]).unwrap();

    host.set_value("socket", arg(&second)).unwrap();
    assert_eq!(first.disposals(), 1);
    assert_eq!(second.disposals(), 0);

    observation.dispose().unwrap();
    assert_eq!(second.disposals(), 1);
}

#[test]
fn member_reads_are_kept_without_a_rule() {
    init_tracing();
    let registry = Registry::default();
    let first = Resource::new(1, Release::Sync);
    let host = Arc::new(ObservableRecord::new("Host").with("socket", arg(&first)));

    let mut b = LambdaBuilder::new();
    let h = b.param("h");
    let socket = b.member(h, "socket");
    let observation = registry.observe(&b.build(socket), &[arg(&host)]).unwrap();
    host.set_value("socket", Value::Null).unwrap();
    observation.dispose().unwrap();

    assert_eq!(first.disposals(), 0);
}

#[test]
fn untaken_branch_is_never_built() {
    init_tracing();
    let registry = Registry::default();
    let (open, opened) = opener(Release::Sync);
    let config = Arc::new(
        ObservableRecord::new("Config")
            .with("enabled", false)
            .with("version", 1),
    );

    // `|c| c.enabled ? open(c.version) : null`
    let mut b = LambdaBuilder::new();
    let c = b.param("c");
    let enabled = b.member(c, "enabled");
    let version = b.member(c, "version");
    let call = b.static_call(open, &[version]);
    let none = b.null();
    let pick = b.conditional(enabled, call, none);
    let observation = registry.observe(&b.build(pick), &[arg(&config)]).unwrap();
    assert!(opened.lock().is_empty());

    config.set_value("enabled", true).unwrap();
    assert_eq!(disposals(&opened), vec![0]);

    // The conditional only passes the value through; the call node owns it.
    config.set_value("enabled", false).unwrap();
    assert_eq!(disposals(&opened), vec![1]);
    assert_eq!(observation.value(), Some(Value::Null));

    observation.dispose().unwrap();
    assert_eq!(disposals(&opened), vec![1]);
}

#[test]
fn discarded_member_init_object_is_disposed() {
    init_tracing();
    let registry = Registry::default();
    let built: Opened = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&built);
    let constructor = Constructor::new("Resource", 0, move |_| {
        let resource = Resource::new(0, Release::Sync);
        log.lock().push(Arc::clone(&resource));
        Ok(Value::from_object(resource as ObjectRef))
    });
    let config = versioned();

    // `|c| new Resource() { tag = c.version }`: `Resource` has no settable members.
    let mut b = LambdaBuilder::new();
    let c = b.param("c");
    let new = b.new_object(constructor, &[]);
    let version = b.member(c, "version");
    let init = b.member_init(new, &[("tag", version)]);
    let observation = registry.observe(&b.build(init), &[arg(&config)]).unwrap();

    assert!(observation.fault().is_some());
    assert_eq!(disposals(&built), vec![1]);

    config.set_value("version", 2).unwrap();
    assert_eq!(disposals(&built), vec![1, 1]);
    observation.dispose().unwrap();
    assert_eq!(disposals(&built), vec![1, 1]);
}

#[test]
fn async_only_objects_are_disposed_asynchronously() {
    init_tracing();
    let registry = Registry::default();
    let (open, opened) = opener(Release::Async);
    let config = versioned();
    let observation = registry.observe(&open_version(open), &[arg(&config)]).unwrap();

    observation.dispose().unwrap();
    let resource = Arc::clone(&opened.lock()[0]);
    assert_eq!(resource.async_disposals(), 1);
    assert_eq!(registry.pending_disposals(), 0);
}

#[test]
fn prefer_async_chooses_the_asynchronous_form() {
    init_tracing();
    let registry = Registry::new(Options::builder().prefer_async_disposal(true).build().unwrap());
    let (open, opened) = opener(Release::Both);
    let config = versioned();
    let observation = registry.observe(&open_version(open), &[arg(&config)]).unwrap();

    observation.dispose().unwrap();
    let resource = Arc::clone(&opened.lock()[0]);
    assert_eq!(resource.async_disposals(), 1);
    assert_eq!(resource.disposals(), 1);
}

#[test]
fn unfinished_async_disposal_is_detached() {
    init_tracing();
    let registry = Registry::default();
    let (open, opened) = opener(Release::AsyncHeld);
    let config = versioned();
    let observation = registry.observe(&open_version(open), &[arg(&config)]).unwrap();

    observation.dispose().unwrap();
    assert_eq!(registry.pending_disposals(), 1);

    let resource = Arc::clone(&opened.lock()[0]);
    resource.finish_async(Err(EvalError::new("socket reset")));
    assert_eq!(registry.pending_disposals(), 0);
}

#[test]
fn blocking_mode_waits_for_async_disposal() {
    init_tracing();
    let registry = Registry::new(Options::builder().block_on_async_disposal(true).build().unwrap());
    let (open, opened) = opener(Release::AsyncHeld);
    let config = versioned();
    let observation = registry.observe(&open_version(open), &[arg(&config)]).unwrap();
    let resource = Arc::clone(&opened.lock()[0]);

    let finisher = {
        let resource = Arc::clone(&resource);
        thread::spawn(move || {
            while resource.async_disposals() == 0 {
                thread::sleep(Duration::from_millis(1));
            }
            resource.finish_async(Ok(()));
        })
    };

    observation.dispose().unwrap();
    finisher.join().unwrap();
    assert_eq!(resource.async_disposals(), 1);
    assert_eq!(registry.pending_disposals(), 0);
}

/// `|l, s| l[s.i]`
fn element_at_state() -> Lambda {
    let mut b = LambdaBuilder::new();
    let l = b.param("l");
    let s = b.param("s");
    let i = b.member(s, "i");
    let read = b.index(l, &[i]);
    b.build(read)
}

#[test]
fn indexer_pattern_leaves_other_index_shapes_alone() {
    init_tracing();
    // `|d, k| d[k]`
    let mut b = LambdaBuilder::new();
    let d = b.param("d");
    let k = b.param("k");
    let read = b.index(d, &[k]);
    let options = Options::builder().dispose_values_of(&b.build(read)).build().unwrap();
    let registry = Registry::new(options);

    let first = Resource::new(1, Release::Sync);
    let second = Resource::new(2, Release::Sync);
    let list = Arc::new(ObservableList::new(vec![arg(&first), arg(&second)]));
    let state = Arc::new(ObservableRecord::new("State").with("i", 0));
    let observation = registry
        .observe(&element_at_state(), &[arg(&list), arg(&state)])
        .unwrap();

    state.set_value("i", 1).unwrap();
    observation.dispose().unwrap();
    assert_eq!(first.disposals(), 0);
    assert_eq!(second.disposals(), 0);
}

#[test]
fn indexer_pattern_disposes_its_exact_shape() {
    init_tracing();
    let mut b = LambdaBuilder::new();
    let d = b.param("d");
    let k = b.param("k");
    let read = b.index(d, &[k]);
    let rule = b.build(read);
    let options = Options::builder().dispose_values_of(&rule).build().unwrap();
    let registry = Registry::new(options);

    let first = Resource::new(1, Release::Sync);
    let list = Arc::new(ObservableList::new(vec![arg(&first)]));
    let mut b = LambdaBuilder::new();
    let l = b.param("l");
    let i = b.param("i");
    let read = b.index(l, &[i]);
    let observation = registry
        .observe(&b.build(read), &[arg(&list), Value::int(0)])
        .unwrap();
    observation.dispose().unwrap();
    assert_eq!(first.disposals(), 1);
}

/// `|h| h.lease` observed over a host of type `ty` holding `first`, then
/// switched to `second`. Returns the disposal counts of both.
fn lease_disposals(options: Options, ty: &str) -> (usize, usize) {
    let registry = Registry::new(options);
    let first = Resource::new(1, Release::Sync);
    let second = Resource::new(2, Release::Sync);
    let host = Arc::new(ObservableRecord::new(ty).with("lease", arg(&first)));

    let mut b = LambdaBuilder::new();
    let h = b.param("h");
    let lease = b.member(h, "lease");
    let observation = registry.observe(&b.build(lease), &[arg(&host)]).unwrap();
    host.set_value("lease", arg(&second)).unwrap();
    observation.dispose().unwrap();
    (first.disposals(), second.disposals())
}

#[test]
fn member_rules_apply_to_their_target_type_only() {
    init_tracing();
    let options = || {
        Options::builder()
            .dispose_member("Pool", "lease")
            .build()
            .unwrap()
    };
    assert_eq!(lease_disposals(options(), "Pool"), (1, 1));
    assert_eq!(lease_disposals(options(), "Library"), (0, 0));
}

#[test]
fn typed_rule_parameters_scope_member_rules() {
    init_tracing();
    let options = || {
        // `|pool: Pool| pool.lease`
        let mut b = LambdaBuilder::new();
        let pool = b.typed_param("pool", "Pool");
        let lease = b.member(pool, "lease");
        Options::builder()
            .dispose_values_of(&b.build(lease))
            .build()
            .unwrap()
    };
    assert_eq!(lease_disposals(options(), "Pool"), (1, 1));
    assert_eq!(lease_disposals(options(), "Library"), (0, 0));
}
