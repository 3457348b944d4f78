//! Change-notification contract between host objects and the engine.
//!
//! A host object owns one [`ChangeNotifier`] per notification channel it
//! exposes and calls [`ChangeNotifier::notify`] after mutating itself. The
//! engine registers handlers through `subscribe` and removes them through
//! `unsubscribe` as the object graph it depends on changes.
//!
//! # Locking
//!
//! `notify` snapshots the handler list and releases its own lock before
//! invoking anything, so handlers may subscribe or unsubscribe re-entrantly.
//! Hosts must not hold their own locks while calling `notify`: a handler may
//! read the object back immediately.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::EvalError;
use crate::value::Value;

/// A single change raised by a host object.
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    /// One named property changed.
    Property(Arc<str>),
    /// Every property may have changed.
    AllProperties,
    /// The object's element sequence changed.
    Collection(CollectionChange),
    /// The object's key/value entries changed.
    Dictionary(DictionaryChange),
}

impl Change {
    /// Shorthand for a named property change.
    pub fn property(name: &str) -> Self {
        Change::Property(Arc::from(name))
    }

    /// True if a handler interested in `member` must react.
    pub fn affects_property(&self, member: &str) -> bool {
        match self {
            Change::Property(name) => &**name == member,
            Change::AllProperties => true,
            Change::Collection(_) | Change::Dictionary(_) => false,
        }
    }
}

/// Sequence mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionChange {
    Reset,
    Inserted { index: usize, count: usize },
    Removed { index: usize, count: usize },
    Replaced { index: usize },
    Moved { from: usize, to: usize },
}

/// Key/value mutation. Carries the affected key.
#[derive(Clone, Debug, PartialEq)]
pub enum DictionaryChange {
    Reset,
    Added(Value),
    Removed(Value),
    Replaced(Value),
}

impl DictionaryChange {
    /// True if an index read with `key` may observe a different result.
    pub fn affects_key(&self, key: &Value) -> bool {
        match self {
            DictionaryChange::Reset => true,
            DictionaryChange::Added(k) | DictionaryChange::Removed(k) | DictionaryChange::Replaced(k) => {
                k.equals(key)
            }
        }
    }
}

/// Handler invoked for every change. An error is reported back to whoever
/// raised the change.
pub type ChangeHandler = Arc<dyn Fn(&Change) -> Result<(), EvalError> + Send + Sync>;

/// Identifies a subscription on one notifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Multicast change event owned by a host object.
#[derive(Default)]
pub struct ChangeNotifier {
    handlers: Mutex<Vec<(HandlerId, ChangeHandler)>>,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler.
    pub fn subscribe(&self, handler: ChangeHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, handler));
        id
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        handlers.len() != before
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Deliver `change` to every handler registered at the time of the call.
    ///
    /// All handlers run even if one fails; the first error is returned.
    pub fn notify(&self, change: &Change) -> Result<(), EvalError> {
        let snapshot: Vec<ChangeHandler> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        tracing::trace!(handlers = snapshot.len(), ?change, "delivering change");

        let mut first_error = None;
        for handler in snapshot {
            if let Err(err) = handler(change) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("handlers", &self.handler_count())
            .finish_non_exhaustive()
    }
}
