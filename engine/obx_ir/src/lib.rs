//! Obx IR - expression trees for the observable expression engine.
//!
//! This crate provides:
//! - The flat expression arena (`ExprArena`, `ExprId`, `ExprRange`)
//! - Expression kinds and operators (`ExprKind`, `BinaryOp`, `UnaryOp`)
//! - Lambdas and their builder (`Lambda`, `LambdaBuilder`), with `Display`
//! - Structural keys (`Diagram`, `ShapeKey`, `ValueKey`) and `ShapePattern`
//!
//! # Design
//!
//! Expressions are stored in a flat arena and reference each other by
//! index rather than by pointer. Host callables are embedded as values, so
//! a lambda is fully self-contained and can be shared across threads.

mod arena;
mod ast;
mod diagram;
mod expr_id;
mod lambda;
mod name;

pub use arena::ExprArena;
pub use ast::{BinaryOp, ExprKind, MemberBinding, UnaryOp};
pub use diagram::{ConstructorKey, Diagram, ShapeError, ShapeKey, ShapePattern, Token, ValueKey};
pub use expr_id::{BindingRange, ExprId, ExprRange};
pub use lambda::{Lambda, LambdaBuilder};
pub use name::Name;
