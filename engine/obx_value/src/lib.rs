#![allow(
    clippy::result_large_err,
    reason = "EvalError is fundamental; boxing would add complexity across the workspace"
)]
//! Obx Value - runtime values and the host object model.
//!
//! This crate provides:
//! - Runtime value types (`Value`, `Heap`, `Function`, `Constructor`, `QualifiedName`)
//! - Evaluation error types (`EvalError`, `EvalErrorKind`, `EvalResult`)
//! - The `Object` capability trait implemented by host objects
//! - Disposal contracts (`Dispose`, `AsyncDispose`, `DisposalTask`)
//! - The change-notification contract (`Change`, `ChangeNotifier`)
//! - Reference observable objects (`ObservableRecord`, `ObservableList`, `ObservableMap`)
//!
//! # Host Objects
//!
//! There is no runtime reflection, so everything an expression can reach on a
//! host object goes through [`Object`]. Every capability has a default that
//! reports "not supported": an object that only names its type is still a
//! valid operand, it is simply evaluated once and never reacted to.

mod dispose;
mod errors;
mod notify;
mod object;
mod observable;
mod value;

pub use dispose::{AsyncDispose, DisposalCompleter, DisposalTask, Dispose};
pub use errors::{EvalError, EvalErrorKind, EvalResult};
pub use notify::{
    Change, ChangeHandler, ChangeNotifier, CollectionChange, DictionaryChange, HandlerId,
};
pub use object::{Object, ObjectRef};
pub use observable::{ObservableList, ObservableMap, ObservableRecord};
pub use value::{Constructor, Function, Heap, NativeFn, QualifiedName, Value};

// Re-export error constructors for use by other crates
pub use errors::{
    // Function errors
    not_callable,
    wrong_arg_count,
    // Arithmetic errors
    division_by_zero,
    integer_overflow,
    modulo_by_zero,
    // Type and operator errors
    binary_type_mismatch,
    invalid_binary_op_for,
    invalid_conversion,
    invalid_unary_op_for,
    type_mismatch,
    // Access errors
    index_out_of_bounds,
    key_not_found,
    no_such_member,
    no_such_method,
    not_indexable,
    null_reference,
    read_only_member,
    // Lifecycle errors
    disposal_failed,
    object_disposed,
};
