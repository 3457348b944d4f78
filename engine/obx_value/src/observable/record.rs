use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::errors::{no_such_member, EvalError, EvalResult};
use crate::notify::{Change, ChangeNotifier};
use crate::object::Object;
use crate::value::{QualifiedName, Value};

/// A named bag of properties raising property-changed notifications.
///
/// Every read through [`Object::get`] is counted per property, which lets
/// callers check that an expression did or did not touch a member.
#[derive(Debug)]
pub struct ObservableRecord {
    ty: QualifiedName,
    fields: Mutex<FxHashMap<String, Value>>,
    reads: Mutex<FxHashMap<String, usize>>,
    total_reads: AtomicUsize,
    notifier: ChangeNotifier,
}

impl ObservableRecord {
    pub fn new(ty: impl Into<QualifiedName>) -> Self {
        ObservableRecord {
            ty: ty.into(),
            fields: Mutex::new(FxHashMap::default()),
            reads: Mutex::new(FxHashMap::default()),
            total_reads: AtomicUsize::new(0),
            notifier: ChangeNotifier::new(),
        }
    }

    /// Builder-style initial field.
    #[must_use]
    pub fn with(self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.lock().insert(name.to_string(), value.into());
        self
    }

    /// Current value of a field, without counting a read.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.fields.lock().get(name).cloned()
    }

    /// Assign a field, raising a change if the value differs.
    ///
    /// Returns whatever the notification handlers reported.
    pub fn set_value(&self, name: &str, value: impl Into<Value>) -> Result<(), EvalError> {
        let value = value.into();
        let changed = {
            let mut fields = self.fields.lock();
            match fields.get(name) {
                Some(current) if current.same(&value) => false,
                _ => {
                    fields.insert(name.to_string(), value);
                    true
                }
            }
        };
        if changed {
            self.notifier.notify(&Change::property(name))?;
        }
        Ok(())
    }

    /// Raise a change for `name` without modifying anything.
    pub fn touch(&self, name: &str) -> Result<(), EvalError> {
        self.notifier.notify(&Change::property(name))
    }

    /// Number of reads of `name` through `Object::get`.
    pub fn read_count(&self, name: &str) -> usize {
        self.reads.lock().get(name).copied().unwrap_or(0)
    }

    /// Number of reads of any member.
    pub fn total_reads(&self) -> usize {
        self.total_reads.load(Ordering::SeqCst)
    }

    /// Number of handlers currently attached.
    pub fn subscriber_count(&self) -> usize {
        self.notifier.handler_count()
    }
}

impl Object for ObservableRecord {
    fn type_name(&self) -> QualifiedName {
        self.ty.clone()
    }

    fn get(&self, member: &str) -> EvalResult {
        *self.reads.lock().entry(member.to_string()).or_insert(0) += 1;
        self.total_reads.fetch_add(1, Ordering::SeqCst);
        self.value(member)
            .ok_or_else(|| no_such_member(member, &self.ty))
    }

    fn set(&self, member: &str, value: Value) -> Result<(), EvalError> {
        self.set_value(member, value)
    }

    fn property_changes(&self) -> Option<&ChangeNotifier> {
        Some(&self.notifier)
    }
}
