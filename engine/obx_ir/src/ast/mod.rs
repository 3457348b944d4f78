//! Expression node kinds.
//!
//! Expressions are stored flat in an [`ExprArena`](crate::ExprArena) and
//! refer to their operands by [`ExprId`]. Host callables (static getters,
//! user operators, constructors) are embedded directly as values: there is
//! no reflection to resolve them by name later.

mod operators;

use obx_value::{Constructor, Function, QualifiedName, Value};

use crate::{BindingRange, ExprId, ExprRange, Name};

pub use operators::{BinaryOp, UnaryOp};

/// One expression node.
#[derive(Clone, Debug)]
pub enum ExprKind {
    /// Literal or closed-over value.
    Constant(Value),

    /// Reference to the lambda parameter at this position.
    Parameter(u32),

    /// Instance member read: `target.member`.
    Member { target: ExprId, member: Name },

    /// Static member read, served by a zero-argument getter.
    StaticMember { member: Name, getter: Function },

    /// Indexer: `target[args...]`.
    Index { target: ExprId, args: ExprRange },

    /// Binary operation. `method` is a user-defined operator implementation;
    /// for `??` it is the conversion applied to a non-null left operand.
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
        method: Option<Function>,
    },

    /// Unary operation, optionally user-defined.
    Unary {
        op: UnaryOp,
        operand: ExprId,
        method: Option<Function>,
    },

    /// Conversion to `ty`, optionally through a user conversion function.
    Convert {
        operand: ExprId,
        ty: QualifiedName,
        method: Option<Function>,
    },

    /// `test ? if_true : if_false`.
    Conditional {
        test: ExprId,
        if_true: ExprId,
        if_false: ExprId,
    },

    /// Instance method call: `receiver.method(args...)`.
    Call {
        receiver: ExprId,
        method: Name,
        args: ExprRange,
    },

    /// Free (static) function call.
    StaticCall { function: Function, args: ExprRange },

    /// Call of a function-valued expression.
    Invoke { callee: ExprId, args: ExprRange },

    /// Object construction.
    New {
        constructor: Constructor,
        args: ExprRange,
    },

    /// Construction followed by member assignments. `new` must be a
    /// [`ExprKind::New`] node.
    MemberInit { new: ExprId, bindings: BindingRange },

    /// List construction: `[items...]`.
    NewList { items: ExprRange },

    /// Runtime type test: `operand is ty`.
    TypeIs { operand: ExprId, ty: QualifiedName },

    /// Nested lambda. Not observable.
    Lambda { arity: u32, body: ExprId },

    /// Assignment. Not observable.
    Assign { target: ExprId, value: ExprId },

    /// Statement block. Not observable.
    Block { exprs: ExprRange },
}

impl ExprKind {
    /// Short name of the kind, used in diagnostics.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            ExprKind::Constant(_) => "constant",
            ExprKind::Parameter(_) => "parameter",
            ExprKind::Member { .. } => "member",
            ExprKind::StaticMember { .. } => "static member",
            ExprKind::Index { .. } => "index",
            ExprKind::Binary { .. } => "binary",
            ExprKind::Unary { .. } => "unary",
            ExprKind::Convert { .. } => "convert",
            ExprKind::Conditional { .. } => "conditional",
            ExprKind::Call { .. } => "call",
            ExprKind::StaticCall { .. } => "static call",
            ExprKind::Invoke { .. } => "invoke",
            ExprKind::New { .. } => "new",
            ExprKind::MemberInit { .. } => "member init",
            ExprKind::NewList { .. } => "list init",
            ExprKind::TypeIs { .. } => "type test",
            ExprKind::Lambda { .. } => "lambda",
            ExprKind::Assign { .. } => "assignment",
            ExprKind::Block { .. } => "block",
        }
    }
}

/// `member = value` inside a member-init expression.
#[derive(Clone, Debug)]
pub struct MemberBinding {
    pub member: Name,
    pub value: ExprId,
}
