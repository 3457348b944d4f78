#![allow(
    clippy::result_large_err,
    reason = "EvalError is fundamental; boxing would add complexity across the workspace"
)]
//! Obx Eval - live, incrementally re-evaluated expressions.
//!
//! This crate turns a [`Lambda`](obx_ir::Lambda) and its arguments into an
//! [`Observation`]: a handle whose value tracks the expression as the host
//! objects it reads from change.
//!
//! # Architecture
//!
//! The engine uses:
//! - `Registry`: cache of shared, reference-counted nodes keyed by the
//!   bound structural key of each sub-expression
//! - `NodeKind`: one live node kind per observable expression kind
//! - `Subscription`: per-node change handlers on the host objects it reads
//! - `DisposalPolicy`: which produced values the engine owns and disposes
//! - `evaluate_binary` / `evaluate_unary` / `evaluate_convert`: direct
//!   enum-based dispatch for built-in operators
//!
//! # Re-exports
//!
//! Value types from `obx_value` and expression types from `obx_ir` are
//! re-exported so a host only needs this crate:
//! - `Value`, `Object`, `ObjectRef`, `Function`, `Constructor`, `QualifiedName`
//! - `Lambda`, `LambdaBuilder`, `BinaryOp`, `UnaryOp`

mod disposal;
pub mod errors;
mod evaluation;
mod methods;
mod node;
mod operators;
mod optimizer;
mod options;
mod registry;
mod stack;
mod subscriber;
mod unary_operators;

pub use obx_ir::{BinaryOp, ExprId, Lambda, LambdaBuilder, UnaryOp};
pub use obx_value::{
    AsyncDispose, Change, Constructor, DisposalCompleter, DisposalTask, Dispose, EvalError,
    EvalErrorKind, EvalResult, Function, Object, ObjectRef, QualifiedName, Value,
};

pub use disposal::{DisposalMode, DisposalPolicy, DisposalRule, DisposalShape};
pub use errors::{DisposalError, ObserveError, OptionsError};
pub use evaluation::{Evaluation, EvaluationChanged, Fault};
pub use methods::{call_method, index_value, invoke_value, read_member};
pub use operators::evaluate_binary;
pub use optimizer::{ConstantFolding, Optimizer};
pub use options::{IgnoredProperty, Options, OptionsBuilder};
pub use registry::{Listener, ListenerId, Observation, Registry};
pub use stack::ensure_sufficient_stack;
pub use subscriber::INDEXER_PROPERTY;
pub use unary_operators::{evaluate_convert, evaluate_unary};

#[cfg(test)]
mod tests;
