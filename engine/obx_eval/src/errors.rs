//! Engine-level errors.
//!
//! Evaluation faults are not errors at this level: they are captured inside
//! an [`Evaluation`](crate::Evaluation). The types here report failures of the
//! API calls themselves.

use obx_ir::ShapeError;
use obx_value::{disposal_failed, EvalError};

/// Failure of [`Registry::observe`](crate::Registry::observe).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ObserveError {
    /// The expression contains a node kind or conversion that cannot be
    /// observed.
    #[error("{kind} expressions cannot be observed")]
    Unsupported { kind: &'static str },

    #[error("lambda takes {expected} arguments, {got} were supplied")]
    ArgumentCount { expected: usize, got: usize },

    /// The lambda is malformed (dangling operand, parameter out of range,
    /// member initializer without a constructor).
    #[error("invalid expression: {0}")]
    InvalidExpression(ShapeError),

    /// `observe` was called from host code running inside an evaluation.
    #[error("observe cannot be called while the registry is evaluating")]
    Reentrant,

    /// A value disposed while the call was being served failed to dispose.
    #[error(transparent)]
    Disposal(#[from] DisposalError),
}

impl From<ShapeError> for ObserveError {
    fn from(err: ShapeError) -> Self {
        match err {
            ShapeError::Unsupported { kind } => ObserveError::Unsupported { kind },
            ShapeError::ArgumentCount { expected, got } => {
                ObserveError::ArgumentCount { expected, got }
            }
            other => ObserveError::InvalidExpression(other),
        }
    }
}

/// A value's own disposal failed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DisposalError {
    #[error("failed to dispose {type_name}: {source}")]
    Failed {
        type_name: String,
        #[source]
        source: EvalError,
    },
}

impl DisposalError {
    pub(crate) fn failed(type_name: &str, source: EvalError) -> Self {
        DisposalError::Failed {
            type_name: type_name.to_string(),
            source,
        }
    }
}

/// Lets change handlers report disposal failures back to the notifier.
impl From<DisposalError> for EvalError {
    fn from(err: DisposalError) -> Self {
        match err {
            DisposalError::Failed { type_name, source } => {
                disposal_failed(&type_name, &source.message)
            }
        }
    }
}

/// Invalid [`Options`](crate::Options).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum OptionsError {
    /// The rule lambda's body is not a member, method, indexer, operator or
    /// constructor expression.
    #[error("{kind} expressions cannot select values for disposal")]
    Unsupported { kind: &'static str },

    #[error("disposal rule lambda is malformed: {0}")]
    InvalidRule(ShapeError),

    #[error("property `{property}` of {ty} is ignored twice")]
    DuplicateIgnoredProperty { ty: String, property: String },
}
