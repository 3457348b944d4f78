//! Runtime values reachable from observable expressions.
//!
//! # Arc Enforcement
//!
//! All heap allocations go through factory methods on `Value`. `Heap<T>`
//! has a private constructor, so external code cannot create heap values
//! directly:
//!
//! ```text
//! let s = Value::string("hello");        // OK
//! let list = Value::list(vec![]);        // OK
//! let s = Value::Str(Heap::new(...));    // ERROR: Heap::new is pub(super)
//! ```
//!
//! # Identity and Equality
//!
//! Two notions of sameness exist. [`Value::same`] is what change detection
//! uses: primitives and strings by value (floats by bit pattern), lists,
//! objects and functions by identity. [`Value::equals`] is structural and
//! backs `PartialEq` and the `==` operator.

mod function;
mod heap;
mod name;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

pub use function::{Constructor, Function, NativeFn};
pub use heap::Heap;
pub use name::QualifiedName;

use crate::object::{Object, ObjectRef};

/// Runtime value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value; member access on it faults.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),

    // Heap Types (use Heap<T> for enforced Arc usage)
    /// String value.
    Str(Heap<String>),
    /// List of values (produced by list-init expressions and host code).
    List(Heap<Vec<Value>>),

    // Host Types
    /// Host object.
    Object(ObjectRef),
    /// First-class host function.
    Function(Function),
}

impl Value {
    // Factory Methods

    #[inline]
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    #[inline]
    pub fn float(f: f64) -> Self {
        Value::Float(f)
    }

    #[inline]
    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    #[inline]
    pub fn char(c: char) -> Self {
        Value::Char(c)
    }

    /// Create a string value.
    #[inline]
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Heap::new(s.into()))
    }

    /// Create a list value.
    #[inline]
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Heap::new(items))
    }

    /// Wrap a host object.
    #[inline]
    pub fn object<T: Object>(object: T) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Wrap an already-shared host object.
    #[inline]
    pub fn from_object(object: ObjectRef) -> Self {
        Value::Object(object)
    }

    #[inline]
    pub fn function(function: Function) -> Self {
        Value::Function(function)
    }

    // Accessors

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    #[inline]
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Downcast-free access to a host object's concrete type name.
    pub fn object_type(&self) -> Option<QualifiedName> {
        self.as_object().map(|o| o.type_name())
    }

    // Type Names

    /// Name of the value's kind, used in diagnostics and primitive type tests.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Full type name: the host type for objects, the kind otherwise.
    pub fn type_name(&self) -> Cow<'static, str> {
        match self {
            Value::Object(o) => Cow::Owned(o.type_name().to_string()),
            _ => Cow::Borrowed(self.kind_name()),
        }
    }

    /// Check whether the value is an instance of `ty`.
    ///
    /// Primitives match their kind name (`int`, `str`, ...). Objects defer to
    /// [`Object::is_instance_of`], and with `include_generic_instances` also
    /// match a generic definition by name.
    pub fn is_instance_of(&self, ty: &QualifiedName, include_generic_instances: bool) -> bool {
        match self {
            Value::Null => false,
            Value::Object(o) => {
                o.is_instance_of(ty)
                    || (include_generic_instances && o.type_name().matches(ty, true))
            }
            _ => !ty.is_generic() && ty.name() == self.kind_name(),
        }
    }

    // Comparison

    /// Identity used by change detection.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a.ptr_eq(b) || a.as_str() == b.as_str(),
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Function(a), Value::Function(b)) => a.same(b),
            _ => false,
        }
    }

    /// Structural equality.
    ///
    /// Lists compare element-wise; objects and functions have no structure
    /// visible to the engine and compare by identity.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.ptr_eq(b)
                    || (a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y)))
            }
            _ => self.same(other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Char(c) => write!(f, "Char({c:?})"),
            Value::Str(s) => write!(f, "Str({:?})", s.as_str()),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Object(o) => write!(f, "Object({})", o.type_name()),
            Value::Function(func) => write!(f, "{func:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Char(c) => write!(f, "'{c}'"),
            Value::Str(s) => write!(f, "\"{}\"", s.as_str()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(o) => write!(f, "<{}>", o.type_name()),
            Value::Function(func) => write!(f, "<function {}>", func.name()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}
