//! Host object capability trait.

use std::fmt;
use std::sync::Arc;

use crate::dispose::{AsyncDispose, Dispose};
use crate::errors::{
    no_such_member, no_such_method, not_indexable, read_only_member, EvalError, EvalResult,
};
use crate::notify::ChangeNotifier;
use crate::value::{QualifiedName, Value};

/// Shared handle to a host object.
pub type ObjectRef = Arc<dyn Object>;

/// Capabilities a host object exposes to expressions.
///
/// Only [`type_name`](Object::type_name) is required. Member reads and
/// method calls must be free of side effects the engine would observe: the
/// engine may re-run them whenever a dependency changes.
///
/// # Notifications
///
/// `property_changes` is consulted by member, index and call nodes whose
/// target is this object. `collection_changes` is consulted by index nodes
/// and carries both collection and dictionary changes.
pub trait Object: Send + Sync + 'static {
    /// Concrete type of the object.
    fn type_name(&self) -> QualifiedName;

    /// Runtime type test used by `is` expressions and type-keyed disposal
    /// rules. Override to expose base types or interfaces.
    fn is_instance_of(&self, ty: &QualifiedName) -> bool {
        self.type_name() == *ty
    }

    /// Read a member.
    fn get(&self, member: &str) -> EvalResult {
        Err(no_such_member(member, &self.type_name()))
    }

    /// Write a member. Used by member-init expressions right after
    /// construction.
    fn set(&self, member: &str, _value: Value) -> Result<(), EvalError> {
        Err(read_only_member(member, &self.type_name()))
    }

    /// Call an instance method.
    fn call(&self, method: &str, _args: &[Value]) -> EvalResult {
        Err(no_such_method(method, &self.type_name().to_string()))
    }

    /// Apply the indexer.
    fn index(&self, _args: &[Value]) -> EvalResult {
        Err(not_indexable(&self.type_name().to_string()))
    }

    /// Notifier raising [`Change::Property`](crate::Change::Property).
    fn property_changes(&self) -> Option<&ChangeNotifier> {
        None
    }

    /// Notifier raising collection and dictionary changes.
    fn collection_changes(&self) -> Option<&ChangeNotifier> {
        None
    }

    fn as_dispose(&self) -> Option<&dyn Dispose> {
        None
    }

    fn as_async_dispose(&self) -> Option<&dyn AsyncDispose> {
        None
    }
}

impl fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.type_name())
    }
}
