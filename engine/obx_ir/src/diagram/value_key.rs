//! Hashable identities of runtime values.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use obx_value::{Constructor, Function, Heap, ObjectRef, Value};

/// Identity of a value inside a structural key.
///
/// Primitives and strings are keyed by value (floats by bit pattern).
/// Lists, objects and functions are keyed by identity; the key keeps the
/// allocation alive so its address cannot be reused while the key exists.
#[derive(Clone, Debug)]
pub enum ValueKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Char(char),
    Str(Heap<String>),
    List(Heap<Vec<Value>>),
    Object(ObjectRef),
    Function(Function),
}

impl ValueKey {
    pub fn of(value: &Value) -> ValueKey {
        match value {
            Value::Null => ValueKey::Null,
            Value::Bool(b) => ValueKey::Bool(*b),
            Value::Int(n) => ValueKey::Int(*n),
            Value::Float(x) => ValueKey::Float(x.to_bits()),
            Value::Char(c) => ValueKey::Char(*c),
            Value::Str(s) => ValueKey::Str(s.clone()),
            Value::List(items) => ValueKey::List(items.clone()),
            Value::Object(o) => ValueKey::Object(Arc::clone(o)),
            Value::Function(f) => ValueKey::Function(f.clone()),
        }
    }

    /// The value this key was taken from.
    pub fn value(&self) -> Value {
        match self {
            ValueKey::Null => Value::Null,
            ValueKey::Bool(b) => Value::Bool(*b),
            ValueKey::Int(n) => Value::Int(*n),
            ValueKey::Float(bits) => Value::Float(f64::from_bits(*bits)),
            ValueKey::Char(c) => Value::Char(*c),
            ValueKey::Str(s) => Value::Str(s.clone()),
            ValueKey::List(items) => Value::List(items.clone()),
            ValueKey::Object(o) => Value::Object(Arc::clone(o)),
            ValueKey::Function(f) => Value::Function(f.clone()),
        }
    }

    pub fn function(function: &Function) -> ValueKey {
        ValueKey::Function(function.clone())
    }

    fn object_addr(o: &ObjectRef) -> usize {
        Arc::as_ptr(o).cast::<()>() as usize
    }
}

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueKey::Null, ValueKey::Null) => true,
            (ValueKey::Bool(a), ValueKey::Bool(b)) => a == b,
            (ValueKey::Int(a), ValueKey::Int(b)) => a == b,
            (ValueKey::Float(a), ValueKey::Float(b)) => a == b,
            (ValueKey::Char(a), ValueKey::Char(b)) => a == b,
            (ValueKey::Str(a), ValueKey::Str(b)) => a == b,
            (ValueKey::List(a), ValueKey::List(b)) => a.ptr_eq(b),
            (ValueKey::Object(a), ValueKey::Object(b)) => {
                ValueKey::object_addr(a) == ValueKey::object_addr(b)
            }
            (ValueKey::Function(a), ValueKey::Function(b)) => a.same(b),
            _ => false,
        }
    }
}

impl Eq for ValueKey {}

impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ValueKey::Null => {}
            ValueKey::Bool(b) => b.hash(state),
            ValueKey::Int(n) => n.hash(state),
            ValueKey::Float(bits) => bits.hash(state),
            ValueKey::Char(c) => c.hash(state),
            ValueKey::Str(s) => s.hash(state),
            ValueKey::List(items) => items.addr().hash(state),
            ValueKey::Object(o) => ValueKey::object_addr(o).hash(state),
            ValueKey::Function(f) => f.addr().hash(state),
        }
    }
}

/// Identity of a constructor inside a structural key.
#[derive(Clone, Debug)]
pub struct ConstructorKey(Constructor);

impl ConstructorKey {
    pub fn of(constructor: &Constructor) -> ConstructorKey {
        ConstructorKey(constructor.clone())
    }
}

impl PartialEq for ConstructorKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.same(&other.0)
    }
}

impl Eq for ConstructorKey {}

impl Hash for ConstructorKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.addr().hash(state);
    }
}
