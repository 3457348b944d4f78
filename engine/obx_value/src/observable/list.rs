use parking_lot::Mutex;

use super::LEN;
use crate::errors::{
    index_out_of_bounds, no_such_member, no_such_method, type_mismatch, wrong_arg_count,
    EvalError, EvalResult,
};
use crate::notify::{Change, ChangeNotifier, CollectionChange};
use crate::object::Object;
use crate::value::{QualifiedName, Value};

const TYPE_NAME: &str = "ObservableList";

/// A list raising collection-changed notifications, plus a property change
/// for `len` whenever the element count changes.
#[derive(Debug, Default)]
pub struct ObservableList {
    items: Mutex<Vec<Value>>,
    collection: ChangeNotifier,
    properties: ChangeNotifier,
}

impl ObservableList {
    pub fn new(items: Vec<Value>) -> Self {
        ObservableList {
            items: Mutex::new(items),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Copy of the current elements.
    pub fn snapshot(&self) -> Vec<Value> {
        self.items.lock().clone()
    }

    pub fn push(&self, value: impl Into<Value>) -> Result<(), EvalError> {
        let index = {
            let mut items = self.items.lock();
            items.push(value.into());
            items.len() - 1
        };
        self.raise(CollectionChange::Inserted { index, count: 1 }, true)
    }

    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<(), EvalError> {
        {
            let mut items = self.items.lock();
            if index > items.len() {
                return Err(index_out_of_bounds(clamp(index)));
            }
            items.insert(index, value.into());
        }
        self.raise(CollectionChange::Inserted { index, count: 1 }, true)
    }

    pub fn remove(&self, index: usize) -> Result<Value, EvalError> {
        let removed = {
            let mut items = self.items.lock();
            if index >= items.len() {
                return Err(index_out_of_bounds(clamp(index)));
            }
            items.remove(index)
        };
        self.raise(CollectionChange::Removed { index, count: 1 }, true)?;
        Ok(removed)
    }

    /// Replace the element at `index`.
    pub fn replace(&self, index: usize, value: impl Into<Value>) -> Result<(), EvalError> {
        {
            let mut items = self.items.lock();
            let Some(slot) = items.get_mut(index) else {
                return Err(index_out_of_bounds(clamp(index)));
            };
            *slot = value.into();
        }
        self.raise(CollectionChange::Replaced { index }, false)
    }

    pub fn move_item(&self, from: usize, to: usize) -> Result<(), EvalError> {
        {
            let mut items = self.items.lock();
            if from >= items.len() || to >= items.len() {
                return Err(index_out_of_bounds(clamp(from.max(to))));
            }
            let item = items.remove(from);
            items.insert(to, item);
        }
        self.raise(CollectionChange::Moved { from, to }, false)
    }

    pub fn clear(&self) -> Result<(), EvalError> {
        self.items.lock().clear();
        self.raise(CollectionChange::Reset, true)
    }

    /// Number of collection handlers attached.
    pub fn subscriber_count(&self) -> usize {
        self.collection.handler_count() + self.properties.handler_count()
    }

    fn raise(&self, change: CollectionChange, len_changed: bool) -> Result<(), EvalError> {
        let collection = self.collection.notify(&Change::Collection(change));
        let properties = if len_changed {
            self.properties.notify(&Change::property(LEN))
        } else {
            Ok(())
        };
        collection.and(properties)
    }
}

fn clamp(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

impl Object for ObservableList {
    fn type_name(&self) -> QualifiedName {
        QualifiedName::new(TYPE_NAME)
    }

    fn get(&self, member: &str) -> EvalResult {
        match member {
            LEN => Ok(Value::int(clamp(self.len()))),
            _ => Err(no_such_member(member, &self.type_name())),
        }
    }

    fn call(&self, method: &str, args: &[Value]) -> EvalResult {
        match method {
            "contains" => {
                let [needle] = args else {
                    return Err(wrong_arg_count("contains", 1, args.len()));
                };
                Ok(Value::bool(self.items.lock().iter().any(|v| v.equals(needle))))
            }
            _ => Err(no_such_method(method, TYPE_NAME)),
        }
    }

    fn index(&self, args: &[Value]) -> EvalResult {
        let [arg] = args else {
            return Err(wrong_arg_count("index", 1, args.len()));
        };
        let Some(i) = arg.as_int() else {
            return Err(type_mismatch("int", arg.kind_name()));
        };
        let items = self.items.lock();
        usize::try_from(i)
            .ok()
            .and_then(|i| items.get(i).cloned())
            .ok_or_else(|| index_out_of_bounds(i))
    }

    fn property_changes(&self) -> Option<&ChangeNotifier> {
        Some(&self.properties)
    }

    fn collection_changes(&self) -> Option<&ChangeNotifier> {
        Some(&self.collection)
    }
}
