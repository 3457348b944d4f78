//! Observation handles.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use obx_value::Value;
use parking_lot::Mutex;

use super::{NodeId, Shared};
use crate::errors::DisposalError;
use crate::evaluation::{Evaluation, EvaluationChanged, Fault};

/// Callback receiving the evaluation changes of one observation.
pub type Listener = Arc<dyn Fn(&EvaluationChanged) + Send + Sync>;

/// Identifies a listener on one observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Per-handle state reachable from the root node.
pub(crate) struct HandleShared {
    disposed: AtomicBool,
    current: Mutex<Evaluation>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

impl HandleShared {
    pub(crate) fn new() -> Self {
        HandleShared {
            disposed: AtomicBool::new(false),
            current: Mutex::new(Evaluation::default()),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn is_active(&self) -> bool {
        !self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn set_current(&self, evaluation: Evaluation) {
        *self.current.lock() = evaluation;
    }

    /// Deliver `event` to every listener registered at the time of the call.
    pub(crate) fn emit(&self, event: &EvaluationChanged) {
        if !self.is_active() {
            return;
        }
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }
}

/// A live observation of one expression.
///
/// Reads are lock-free snapshots of the root node's evaluation. Disposing
/// the handle (explicitly or by dropping it) releases its reference on the
/// shared node; no further changes are delivered to it.
pub struct Observation {
    shared: Arc<Shared>,
    root: NodeId,
    handle: Arc<HandleShared>,
    expression: String,
}

impl Observation {
    pub(crate) fn new(
        shared: Arc<Shared>,
        root: NodeId,
        handle: Arc<HandleShared>,
        expression: String,
    ) -> Self {
        Observation {
            shared,
            root,
            handle,
            expression,
        }
    }

    /// Current evaluation of the expression.
    pub fn evaluation(&self) -> Evaluation {
        self.handle.current.lock().clone()
    }

    /// Current value, or `None` if the expression is faulted.
    pub fn value(&self) -> Option<Value> {
        self.evaluation().value().cloned()
    }

    /// Current fault, or `None` if the expression has a value.
    pub fn fault(&self) -> Option<Fault> {
        self.evaluation().fault().cloned()
    }

    /// The observed expression, as displayed.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn is_disposed(&self) -> bool {
        !self.handle.is_active()
    }

    /// Register a listener for evaluation changes.
    pub fn subscribe(&self, listener: impl Fn(&EvaluationChanged) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.handle.next_listener.fetch_add(1, Ordering::Relaxed));
        self.handle.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.handle.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Release this observation. Safe to call more than once; only the
    /// first call releases anything.
    ///
    /// Returns the first error raised by a value disposed as a result.
    #[tracing::instrument(level = "debug", skip_all, fields(expression = %self.expression))]
    pub fn dispose(&self) -> Result<(), DisposalError> {
        if self.handle.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.handle.listeners.lock().clear();
        self.shared.release(self.root, &self.handle)
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            tracing::warn!(expression = %self.expression, %err, "disposal failed while dropping an observation");
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.expression, self.evaluation())
    }
}

impl fmt::Debug for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observation")
            .field("expression", &self.expression)
            .field("evaluation", &self.evaluation())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
