//! Error types for expression evaluation.
//!
//! Every failure raised while computing a value (host member access,
//! operator application, conversion, null navigation) is an [`EvalError`].
//! The observable engine never unwinds with these: it captures them as the
//! fault of the node that raised them.
//!
//! # Structured Error Categories
//!
//! `EvalErrorKind` provides typed error categories for programmatic matching.
//! Factory functions (e.g., `division_by_zero()`) are the public API; they
//! populate both `kind` and `message`.

use std::fmt;

use crate::value::{QualifiedName, Value};

/// Result of evaluation.
pub type EvalResult = Result<Value, EvalError>;

/// Typed error category for structured diagnostics.
///
/// The `Display` impl produces the same message stored in
/// [`EvalError::message`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    // Arithmetic
    DivisionByZero,
    ModuloByZero,
    IntegerOverflow {
        operation: String,
    },

    // Type/Operator
    TypeMismatch {
        expected: String,
        got: String,
    },
    InvalidBinaryOp {
        type_name: String,
        op: &'static str,
    },
    InvalidUnaryOp {
        type_name: String,
        op: &'static str,
    },
    BinaryTypeMismatch {
        left: String,
        right: String,
    },
    InvalidConversion {
        from: String,
        to: String,
    },

    // Access
    NullReference {
        member: String,
    },
    NoSuchMember {
        member: String,
        type_name: String,
    },
    ReadOnlyMember {
        member: String,
        type_name: String,
    },
    NoSuchMethod {
        method: String,
        type_name: String,
    },
    NotIndexable {
        type_name: String,
    },
    IndexOutOfBounds {
        index: i64,
    },
    KeyNotFound {
        key: String,
    },

    // Function
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    NotCallable {
        type_name: String,
    },

    // Lifecycle
    ObjectDisposed {
        type_name: String,
    },
    DisposalFailed {
        type_name: String,
        reason: String,
    },

    /// Catch-all for host errors without a structured category.
    Custom {
        message: String,
    },
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Arithmetic
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::ModuloByZero => write!(f, "modulo by zero"),
            Self::IntegerOverflow { operation } => {
                write!(f, "integer overflow in {operation}")
            }

            // Type/Operator
            Self::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            Self::InvalidBinaryOp { type_name, op } => {
                write!(f, "operator `{op}` cannot be applied to {type_name}")
            }
            Self::InvalidUnaryOp { type_name, op } => {
                write!(f, "unary operator `{op}` cannot be applied to {type_name}")
            }
            Self::BinaryTypeMismatch { left, right } => {
                write!(f, "cannot apply operator to `{left}` and `{right}`")
            }
            Self::InvalidConversion { from, to } => {
                write!(f, "cannot convert {from} to {to}")
            }

            // Access
            Self::NullReference { member } => {
                write!(f, "null reference while accessing `{member}`")
            }
            Self::NoSuchMember { member, type_name } => {
                write!(f, "no member '{member}' on type {type_name}")
            }
            Self::ReadOnlyMember { member, type_name } => {
                write!(f, "member '{member}' on type {type_name} is read-only")
            }
            Self::NoSuchMethod { method, type_name } => {
                write!(f, "no method '{method}' on type {type_name}")
            }
            Self::NotIndexable { type_name } => write!(f, "type {type_name} is not indexable"),
            Self::IndexOutOfBounds { index } => write!(f, "index {index} out of bounds"),
            Self::KeyNotFound { key } => write!(f, "key not found: {key}"),

            // Function
            Self::ArityMismatch {
                name,
                expected,
                got,
            } => {
                let arg_word = if *expected == 1 {
                    "argument"
                } else {
                    "arguments"
                };
                write!(f, "{name} expects {expected} {arg_word}, got {got}")
            }
            Self::NotCallable { type_name } => write!(f, "{type_name} is not callable"),

            // Lifecycle
            Self::ObjectDisposed { type_name } => {
                write!(f, "cannot use disposed object of type {type_name}")
            }
            Self::DisposalFailed { type_name, reason } => {
                write!(f, "failed to dispose value of type {type_name}: {reason}")
            }

            Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

/// Evaluation error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalError {
    /// Structured error category.
    pub kind: EvalErrorKind,
    /// Human-readable error message; equals `kind.to_string()` for
    /// factory-created errors.
    pub message: String,
}

impl EvalError {
    /// Create an error with just a message.
    ///
    /// Uses `Custom` kind. Prefer specific factory functions when a
    /// structured kind is available.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: EvalErrorKind::Custom {
                message: message.clone(),
            },
            message,
        }
    }

    /// Create an error from a structured kind.
    pub fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self { kind, message }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EvalError {}

// Arithmetic Errors

/// Division by zero error.
#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::DivisionByZero)
}

/// Modulo by zero error.
#[cold]
pub fn modulo_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::ModuloByZero)
}

/// Integer overflow error.
#[cold]
pub fn integer_overflow(operation: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IntegerOverflow {
        operation: operation.to_string(),
    })
}

// Type and Operator Errors

/// Value of an unexpected type.
#[cold]
pub fn type_mismatch(expected: &str, got: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TypeMismatch {
        expected: expected.to_string(),
        got: got.to_string(),
    })
}

/// Invalid binary operator for a specific type.
#[cold]
pub fn invalid_binary_op_for(type_name: &str, op: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidBinaryOp {
        type_name: type_name.to_string(),
        op,
    })
}

/// Invalid unary operator for a specific type.
#[cold]
pub fn invalid_unary_op_for(type_name: &str, op: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidUnaryOp {
        type_name: type_name.to_string(),
        op,
    })
}

/// Operand types of a binary operation do not match.
#[cold]
pub fn binary_type_mismatch(left: &str, right: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::BinaryTypeMismatch {
        left: left.to_string(),
        right: right.to_string(),
    })
}

/// Conversion between two types is not possible for this value.
#[cold]
pub fn invalid_conversion(from: &str, to: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidConversion {
        from: from.to_string(),
        to: to.to_string(),
    })
}

// Access Errors

/// Member, index or method access on a null target.
#[cold]
pub fn null_reference(member: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NullReference {
        member: member.to_string(),
    })
}

/// Member does not exist on the target type.
#[cold]
pub fn no_such_member(member: &str, type_name: &QualifiedName) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NoSuchMember {
        member: member.to_string(),
        type_name: type_name.to_string(),
    })
}

/// Member exists but cannot be assigned.
#[cold]
pub fn read_only_member(member: &str, type_name: &QualifiedName) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ReadOnlyMember {
        member: member.to_string(),
        type_name: type_name.to_string(),
    })
}

/// Method does not exist on the target type.
#[cold]
pub fn no_such_method(method: &str, type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NoSuchMethod {
        method: method.to_string(),
        type_name: type_name.to_string(),
    })
}

/// Target type has no indexer.
#[cold]
pub fn not_indexable(type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotIndexable {
        type_name: type_name.to_string(),
    })
}

/// Index outside the bounds of a list or string.
#[cold]
pub fn index_out_of_bounds(index: i64) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IndexOutOfBounds { index })
}

/// Key missing from a map.
#[cold]
pub fn key_not_found(key: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::KeyNotFound {
        key: key.to_string(),
    })
}

// Function Errors

/// Wrong number of arguments passed to a function, method or constructor.
#[cold]
pub fn wrong_arg_count(name: &str, expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        name: name.to_string(),
        expected,
        got,
    })
}

/// Invocation of a value that is not a function.
#[cold]
pub fn not_callable(type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotCallable {
        type_name: type_name.to_string(),
    })
}

// Lifecycle Errors

/// Use of an object after it was disposed.
#[cold]
pub fn object_disposed(type_name: &QualifiedName) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ObjectDisposed {
        type_name: type_name.to_string(),
    })
}

/// A value's own disposal failed.
#[cold]
pub fn disposal_failed(type_name: &str, reason: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::DisposalFailed {
        type_name: type_name.to_string(),
        reason: reason.to_string(),
    })
}
