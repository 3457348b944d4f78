//! Shared hosts and helpers for behavior tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use obx_eval::{
    AsyncDispose, DisposalCompleter, DisposalTask, Dispose, EvalError, EvaluationChanged, Object,
    ObjectRef, Observation, QualifiedName, Value,
};
use obx_value::{ChangeNotifier, ObservableMap, ObservableRecord};
use parking_lot::Mutex;

static TRACING_INIT: Once = Once::new();

/// Install a test-writer subscriber when `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_test_writer().with_target(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

pub fn person(name: &str) -> Arc<ObservableRecord> {
    Arc::new(ObservableRecord::new("Person").with("name", name))
}

/// Pass a shared host object as an argument.
pub fn arg<T: Object>(object: &Arc<T>) -> Value {
    Value::from_object(Arc::clone(object) as ObjectRef)
}

/// Collect every event raised on `observation`.
pub fn record_events(observation: &Observation) -> Arc<Mutex<Vec<EvaluationChanged>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    observation.subscribe(move |event| sink.lock().push(event.clone()));
    events
}

/// How a [`Resource`] releases itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    Sync,
    /// Completes its asynchronous disposal immediately.
    Async,
    /// Completes its asynchronous disposal only when told to.
    AsyncHeld,
    /// Supports both forms.
    Both,
    /// Synchronous disposal that fails.
    Failing,
}

/// A disposable host object that counts its disposals.
pub struct Resource {
    id: i64,
    release: Release,
    disposed: AtomicUsize,
    disposed_async: AtomicUsize,
    pending: Mutex<Vec<DisposalCompleter>>,
    notifier: ChangeNotifier,
}

impl Resource {
    pub fn new(id: i64, release: Release) -> Arc<Self> {
        Arc::new(Resource {
            id,
            release,
            disposed: AtomicUsize::new(0),
            disposed_async: AtomicUsize::new(0),
            pending: Mutex::new(Vec::new()),
            notifier: ChangeNotifier::new(),
        })
    }

    pub fn disposals(&self) -> usize {
        self.disposed.load(Ordering::SeqCst) + self.disposed_async.load(Ordering::SeqCst)
    }

    pub fn async_disposals(&self) -> usize {
        self.disposed_async.load(Ordering::SeqCst)
    }

    /// Complete every held asynchronous disposal.
    pub fn finish_async(&self, result: Result<(), EvalError>) {
        for completer in self.pending.lock().drain(..) {
            completer.complete(result.clone());
        }
    }
}

impl Object for Resource {
    fn type_name(&self) -> QualifiedName {
        QualifiedName::new("Resource")
    }

    fn get(&self, member: &str) -> obx_eval::EvalResult {
        match member {
            "id" => Ok(Value::int(self.id)),
            _ => Err(obx_value::no_such_member(member, &self.type_name())),
        }
    }

    fn property_changes(&self) -> Option<&ChangeNotifier> {
        Some(&self.notifier)
    }

    fn as_dispose(&self) -> Option<&dyn Dispose> {
        match self.release {
            Release::Sync | Release::Both | Release::Failing => Some(self as &dyn Dispose),
            Release::Async | Release::AsyncHeld => None,
        }
    }

    fn as_async_dispose(&self) -> Option<&dyn AsyncDispose> {
        match self.release {
            Release::Async | Release::AsyncHeld | Release::Both => Some(self as &dyn AsyncDispose),
            Release::Sync | Release::Failing => None,
        }
    }
}

impl Dispose for Resource {
    fn dispose(&self) -> Result<(), EvalError> {
        self.disposed.fetch_add(1, Ordering::SeqCst);
        if self.release == Release::Failing {
            Err(EvalError::new("already closed"))
        } else {
            Ok(())
        }
    }
}

impl AsyncDispose for Resource {
    fn dispose_async(&self) -> DisposalTask {
        let task = if self.release == Release::AsyncHeld {
            let (completer, task) = DisposalTask::pending();
            self.pending.lock().push(completer);
            task
        } else {
            DisposalTask::completed(Ok(()))
        };
        // Counted last so a waiter that sees the count also finds the completer.
        self.disposed_async.fetch_add(1, Ordering::SeqCst);
        task
    }
}

/// An [`ObservableMap`] that counts indexer reads.
#[derive(Default)]
pub struct CountingMap {
    pub inner: ObservableMap,
    reads: AtomicUsize,
}

impl CountingMap {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl Object for CountingMap {
    fn type_name(&self) -> QualifiedName {
        QualifiedName::new("CountingMap")
    }

    fn index(&self, args: &[Value]) -> obx_eval::EvalResult {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.index(args)
    }

    fn property_changes(&self) -> Option<&ChangeNotifier> {
        self.inner.property_changes()
    }

    fn collection_changes(&self) -> Option<&ChangeNotifier> {
        self.inner.collection_changes()
    }
}
