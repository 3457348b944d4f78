use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::LEN;
use crate::errors::{
    key_not_found, no_such_member, no_such_method, type_mismatch, wrong_arg_count, EvalError,
    EvalResult,
};
use crate::notify::{Change, ChangeNotifier, DictionaryChange};
use crate::object::Object;
use crate::value::{QualifiedName, Value};

const TYPE_NAME: &str = "ObservableMap";

/// A string-keyed map raising dictionary-changed notifications.
#[derive(Debug, Default)]
pub struct ObservableMap {
    entries: Mutex<FxHashMap<String, Value>>,
    collection: ChangeNotifier,
    properties: ChangeNotifier,
}

impl ObservableMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn get_entry(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    /// Insert or replace an entry.
    pub fn insert(&self, key: &str, value: impl Into<Value>) -> Result<(), EvalError> {
        let previous = self.entries.lock().insert(key.to_string(), value.into());
        let change = if previous.is_some() {
            DictionaryChange::Replaced(Value::string(key))
        } else {
            DictionaryChange::Added(Value::string(key))
        };
        self.raise(change, previous.is_none())
    }

    pub fn remove(&self, key: &str) -> Result<Option<Value>, EvalError> {
        let removed = self.entries.lock().remove(key);
        if removed.is_some() {
            self.raise(DictionaryChange::Removed(Value::string(key)), true)?;
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<(), EvalError> {
        self.entries.lock().clear();
        self.raise(DictionaryChange::Reset, true)
    }

    pub fn subscriber_count(&self) -> usize {
        self.collection.handler_count() + self.properties.handler_count()
    }

    fn raise(&self, change: DictionaryChange, len_changed: bool) -> Result<(), EvalError> {
        let collection = self.collection.notify(&Change::Dictionary(change));
        let properties = if len_changed {
            self.properties.notify(&Change::property(LEN))
        } else {
            Ok(())
        };
        collection.and(properties)
    }
}

fn key_arg<'a>(what: &str, args: &'a [Value]) -> Result<&'a str, EvalError> {
    let [arg] = args else {
        return Err(wrong_arg_count(what, 1, args.len()));
    };
    arg.as_str().ok_or_else(|| type_mismatch("str", arg.kind_name()))
}

impl Object for ObservableMap {
    fn type_name(&self) -> QualifiedName {
        QualifiedName::new(TYPE_NAME)
    }

    fn get(&self, member: &str) -> EvalResult {
        match member {
            LEN => Ok(Value::int(i64::try_from(self.len()).unwrap_or(i64::MAX))),
            _ => Err(no_such_member(member, &self.type_name())),
        }
    }

    fn call(&self, method: &str, args: &[Value]) -> EvalResult {
        match method {
            "contains_key" => {
                let key = key_arg(method, args)?;
                Ok(Value::bool(self.entries.lock().contains_key(key)))
            }
            _ => Err(no_such_method(method, TYPE_NAME)),
        }
    }

    fn index(&self, args: &[Value]) -> EvalResult {
        let key = key_arg("index", args)?;
        self.get_entry(key).ok_or_else(|| key_not_found(key))
    }

    fn property_changes(&self) -> Option<&ChangeNotifier> {
        Some(&self.properties)
    }

    fn collection_changes(&self) -> Option<&ChangeNotifier> {
        Some(&self.collection)
    }
}
