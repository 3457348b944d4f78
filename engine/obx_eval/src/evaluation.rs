//! The result of evaluating one node.

use std::fmt;
use std::sync::Arc;

use obx_value::{EvalError, EvalResult, Value};

/// A captured evaluation error.
///
/// Shared so that a fault propagated unchanged through several ancestors is
/// the same fault everywhere; identity is what change detection compares.
pub type Fault = Arc<EvalError>;

/// Current outcome of a node: a value or a fault, never both.
#[derive(Clone)]
pub enum Evaluation {
    Value(Value),
    Fault(Fault),
}

impl Evaluation {
    /// Capture a fresh result. Errors become new faults.
    pub fn from_result(result: EvalResult) -> Self {
        match result {
            Ok(value) => Evaluation::Value(value),
            Err(err) => Evaluation::Fault(Arc::new(err)),
        }
    }

    #[inline]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Evaluation::Value(value) => Some(value),
            Evaluation::Fault(_) => None,
        }
    }

    #[inline]
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Evaluation::Value(_) => None,
            Evaluation::Fault(fault) => Some(fault),
        }
    }

    #[inline]
    pub fn is_fault(&self) -> bool {
        matches!(self, Evaluation::Fault(_))
    }

    /// True if replacing `self` with `other` is not an observable change.
    ///
    /// Values compare with [`Value::same`]; faults compare by identity.
    pub fn same(&self, other: &Evaluation) -> bool {
        match (self, other) {
            (Evaluation::Value(a), Evaluation::Value(b)) => a.same(b),
            (Evaluation::Fault(a), Evaluation::Fault(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn into_result(self) -> Result<Value, Fault> {
        match self {
            Evaluation::Value(value) => Ok(value),
            Evaluation::Fault(fault) => Err(fault),
        }
    }
}

impl Default for Evaluation {
    fn default() -> Self {
        Evaluation::Value(Value::Null)
    }
}

impl From<Value> for Evaluation {
    fn from(value: Value) -> Self {
        Evaluation::Value(value)
    }
}

impl fmt::Debug for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Value(value) => write!(f, "Value({value:?})"),
            Evaluation::Fault(fault) => write!(f, "Fault({})", fault.message),
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Value(value) => write!(f, "{value}"),
            Evaluation::Fault(fault) => write!(f, "fault: {fault}"),
        }
    }
}

/// Raised to listeners of an observation whose evaluation was replaced.
#[derive(Clone, Debug)]
pub struct EvaluationChanged {
    pub previous: Evaluation,
    pub current: Evaluation,
}
