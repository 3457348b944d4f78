//! Node kinds: the live counterpart of each expression kind.
//!
//! A [`NodeKind`] carries what a node needs to evaluate itself once its
//! operands are evaluated. Operands are other nodes, acquired through the
//! registry cache by the sub-expression's structural key; a [`Blueprint`]
//! lists them in evaluation order.
//!
//! # Short-circuit Kinds
//!
//! `&&`, `||`, `??` and `?:` materialize only their first operand up front.
//! The remaining operands are acquired when the first operand's value calls
//! for them and released as soon as it no longer does (see [`eval::choose`]).

pub(crate) mod eval;

use obx_ir::{BinaryOp, ExprId, ExprKind, Lambda, Name, ShapeError, UnaryOp};
use obx_value::{Constructor, Function, QualifiedName, Value};
use smallvec::SmallVec;

use crate::errors::ObserveError;
use crate::unary_operators::is_unconvertible_target;

/// One node kind per observable expression kind.
#[derive(Clone, Debug)]
pub(crate) enum NodeKind {
    Constant(Value),
    /// Bound argument value.
    Argument(Value),
    /// Operands: target.
    Member {
        member: Name,
    },
    StaticMember {
        #[allow(dead_code)]
        member: Name,
        getter: Function,
    },
    /// Operands: target, then the index arguments.
    Index,
    AndAlso,
    OrElse,
    Coalesce {
        conversion: Option<Function>,
    },
    /// Operands: test, if-true, if-false.
    Conditional,
    Binary {
        op: BinaryOp,
        method: Option<Function>,
    },
    Unary {
        op: UnaryOp,
        method: Option<Function>,
    },
    Convert {
        ty: QualifiedName,
        method: Option<Function>,
    },
    /// Operands: receiver, then the arguments.
    Call {
        method: Name,
    },
    StaticCall {
        function: Function,
    },
    /// Operands: callee, then the arguments.
    Invoke,
    New {
        constructor: Constructor,
    },
    /// Operands: constructor arguments, then one value per member.
    MemberInit {
        constructor: Constructor,
        members: Vec<Name>,
    },
    NewList,
    TypeIs {
        ty: QualifiedName,
    },
}

impl NodeKind {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            NodeKind::Constant(_) => "constant",
            NodeKind::Argument(_) => "argument",
            NodeKind::Member { .. } => "member",
            NodeKind::StaticMember { .. } => "static member",
            NodeKind::Index => "index",
            NodeKind::AndAlso => "and-also",
            NodeKind::OrElse => "or-else",
            NodeKind::Coalesce { .. } => "coalesce",
            NodeKind::Conditional => "conditional",
            NodeKind::Binary { .. } => "binary",
            NodeKind::Unary { .. } => "unary",
            NodeKind::Convert { .. } => "convert",
            NodeKind::Call { .. } => "call",
            NodeKind::StaticCall { .. } => "static call",
            NodeKind::Invoke => "invoke",
            NodeKind::New { .. } => "new",
            NodeKind::MemberInit { .. } => "member init",
            NodeKind::NewList => "list init",
            NodeKind::TypeIs { .. } => "type test",
        }
    }

    /// True for kinds that acquire operands past the first lazily.
    pub(crate) fn is_short_circuit(&self) -> bool {
        matches!(
            self,
            NodeKind::AndAlso | NodeKind::OrElse | NodeKind::Coalesce { .. } | NodeKind::Conditional
        )
    }

    /// True if the node's value comes from host code rather than from an
    /// operand or a literal. Only such values can be owned and disposed.
    pub(crate) fn produces_value(&self) -> bool {
        match self {
            NodeKind::Member { .. }
            | NodeKind::StaticMember { .. }
            | NodeKind::Index
            | NodeKind::Call { .. }
            | NodeKind::StaticCall { .. }
            | NodeKind::Invoke
            | NodeKind::New { .. }
            | NodeKind::MemberInit { .. } => true,
            NodeKind::Binary { method, .. }
            | NodeKind::Unary { method, .. }
            | NodeKind::Convert { method, .. } => method.is_some(),
            NodeKind::Coalesce { conversion } => conversion.is_some(),
            NodeKind::Constant(_)
            | NodeKind::Argument(_)
            | NodeKind::AndAlso
            | NodeKind::OrElse
            | NodeKind::Conditional
            | NodeKind::NewList
            | NodeKind::TypeIs { .. } => false,
        }
    }

    pub(crate) fn is_construction(&self) -> bool {
        matches!(self, NodeKind::New { .. } | NodeKind::MemberInit { .. })
    }
}

/// A node kind plus the expressions of its operands.
pub(crate) struct Blueprint {
    pub kind: NodeKind,
    pub operands: SmallVec<[ExprId; 4]>,
}

/// Derive the node for expression `id` of `lambda` applied to `args`.
pub(crate) fn blueprint(lambda: &Lambda, args: &[Value], id: ExprId) -> Result<Blueprint, ObserveError> {
    let arena = lambda.arena();
    let expr = lambda
        .get(id)
        .ok_or(ObserveError::InvalidExpression(ShapeError::DanglingExpr(id)))?;
    let mut operands: SmallVec<[ExprId; 4]> = arena.children(expr);

    let kind = match expr {
        ExprKind::Constant(value) => NodeKind::Constant(value.clone()),
        ExprKind::Parameter(index) => {
            let value = args.get(*index as usize).ok_or(ObserveError::InvalidExpression(
                ShapeError::UnboundParameter {
                    index: *index,
                    arity: args.len(),
                },
            ))?;
            NodeKind::Argument(value.clone())
        }
        ExprKind::Member { member, .. } => NodeKind::Member {
            member: member.clone(),
        },
        ExprKind::StaticMember { member, getter } => NodeKind::StaticMember {
            member: member.clone(),
            getter: getter.clone(),
        },
        ExprKind::Index { .. } => NodeKind::Index,
        ExprKind::Binary { op, method, .. } => match (op, method) {
            (BinaryOp::And | BinaryOp::Or, Some(_)) => {
                return Err(ObserveError::Unsupported {
                    kind: "user-defined short-circuit operator",
                });
            }
            (BinaryOp::And, None) => NodeKind::AndAlso,
            (BinaryOp::Or, None) => NodeKind::OrElse,
            (BinaryOp::Coalesce, conversion) => NodeKind::Coalesce {
                conversion: conversion.clone(),
            },
            (op, method) => NodeKind::Binary {
                op: *op,
                method: method.clone(),
            },
        },
        ExprKind::Unary { op, method, .. } => NodeKind::Unary {
            op: *op,
            method: method.clone(),
        },
        ExprKind::Convert { ty, method, .. } => {
            if is_unconvertible_target(ty) {
                return Err(ObserveError::Unsupported {
                    kind: "conversion to null or function",
                });
            }
            NodeKind::Convert {
                ty: ty.clone(),
                method: method.clone(),
            }
        }
        ExprKind::Conditional { .. } => NodeKind::Conditional,
        ExprKind::Call { method, .. } => NodeKind::Call {
            method: method.clone(),
        },
        ExprKind::StaticCall { function, .. } => NodeKind::StaticCall {
            function: function.clone(),
        },
        ExprKind::Invoke { .. } => NodeKind::Invoke,
        ExprKind::New { constructor, .. } => NodeKind::New {
            constructor: constructor.clone(),
        },
        ExprKind::MemberInit { new, bindings } => {
            let Some(ExprKind::New { constructor, args }) = lambda.get(*new) else {
                return Err(ObserveError::InvalidExpression(
                    ShapeError::MemberInitWithoutNew,
                ));
            };
            let bindings = arena.get_bindings(*bindings);
            operands = arena.get_expr_list(*args).iter().copied().collect();
            operands.extend(bindings.iter().map(|binding| binding.value));
            NodeKind::MemberInit {
                constructor: constructor.clone(),
                members: bindings.iter().map(|binding| binding.member.clone()).collect(),
            }
        }
        ExprKind::NewList { .. } => NodeKind::NewList,
        ExprKind::TypeIs { ty, .. } => NodeKind::TypeIs { ty: ty.clone() },
        ExprKind::Lambda { .. } | ExprKind::Assign { .. } | ExprKind::Block { .. } => {
            return Err(ObserveError::Unsupported {
                kind: expr.kind_name(),
            });
        }
    };

    Ok(Blueprint { kind, operands })
}

/// Reject everything [`blueprint`] would reject, before any node is built.
///
/// The constructor call wrapped by a member initializer never becomes a node
/// of its own, but it is checked like every other reachable expression.
pub(crate) fn check(lambda: &Lambda, args: &[Value]) -> Result<(), ObserveError> {
    for id in lambda.post_order() {
        blueprint(lambda, args, id)?;
    }
    Ok(())
}
