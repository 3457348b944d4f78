//! Lambda rewriting before node construction.
//!
//! The registry runs the configured [`Optimizer`] on every lambda passed to
//! `observe`, then keys and builds the rewritten lambda. Two lambdas that
//! optimize to the same shape share nodes.

use obx_ir::{BinaryOp, ExprId, ExprKind, Lambda};
use obx_value::Value;

use crate::operators::evaluate_binary;
use crate::unary_operators::{evaluate_convert, evaluate_unary, is_unconvertible_target};

/// Rewrites a lambda into an equivalent one.
pub trait Optimizer: Send + Sync {
    fn optimize(&self, lambda: &Lambda) -> Lambda;
}

impl<F> Optimizer for F
where
    F: Fn(&Lambda) -> Lambda + Send + Sync,
{
    fn optimize(&self, lambda: &Lambda) -> Lambda {
        self(lambda)
    }
}

/// Folds built-in operators, conversions and short-circuit operators whose
/// deciding operands are constants.
///
/// Operations that would fail are left in place so the fault is still
/// raised by the observation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConstantFolding;

impl Optimizer for ConstantFolding {
    fn optimize(&self, lambda: &Lambda) -> Lambda {
        let mut out = lambda.clone();
        let mut folded = 0usize;
        for id in lambda.post_order() {
            if let Some(expr) = fold(&out, id) {
                out.replace(id, expr);
                folded += 1;
            }
        }
        if folded > 0 {
            tracing::trace!(folded, "constant folding");
        }
        out
    }
}

fn constant(lambda: &Lambda, id: ExprId) -> Option<&Value> {
    match lambda.get(id)? {
        ExprKind::Constant(value) => Some(value),
        _ => None,
    }
}

/// The replacement for one node, if it can be folded.
fn fold(lambda: &Lambda, id: ExprId) -> Option<ExprKind> {
    match lambda.get(id)? {
        ExprKind::Binary {
            op: BinaryOp::And,
            left,
            right,
            method: None,
        } => match constant(lambda, *left)? {
            Value::Bool(false) => Some(ExprKind::Constant(Value::Bool(false))),
            Value::Bool(true) => fold_bool(lambda, *right),
            _ => None,
        },
        ExprKind::Binary {
            op: BinaryOp::Or,
            left,
            right,
            method: None,
        } => match constant(lambda, *left)? {
            Value::Bool(true) => Some(ExprKind::Constant(Value::Bool(true))),
            Value::Bool(false) => fold_bool(lambda, *right),
            _ => None,
        },
        ExprKind::Binary {
            op: BinaryOp::Coalesce,
            left,
            right,
            method: None,
        } => match constant(lambda, *left)? {
            Value::Null => lambda.get(*right).cloned(),
            value => Some(ExprKind::Constant(value.clone())),
        },
        ExprKind::Binary {
            op,
            left,
            right,
            method: None,
        } if !op.is_short_circuit() => {
            let value =
                evaluate_binary(constant(lambda, *left)?, constant(lambda, *right)?, *op).ok()?;
            Some(ExprKind::Constant(value))
        }
        ExprKind::Unary {
            op,
            operand,
            method: None,
        } => {
            let value = evaluate_unary(constant(lambda, *operand)?, *op).ok()?;
            Some(ExprKind::Constant(value))
        }
        ExprKind::Convert {
            operand,
            ty,
            method: None,
        } if !is_unconvertible_target(ty) => {
            let value = evaluate_convert(constant(lambda, *operand)?, ty).ok()?;
            Some(ExprKind::Constant(value))
        }
        ExprKind::Conditional {
            test,
            if_true,
            if_false,
        } => match constant(lambda, *test)? {
            Value::Bool(true) => lambda.get(*if_true).cloned(),
            Value::Bool(false) => lambda.get(*if_false).cloned(),
            _ => None,
        },
        _ => None,
    }
}

/// The right operand of `&&`/`||` once the left one no longer matters.
///
/// Only a constant boolean can replace the whole operator; anything else
/// must keep the operator's type check.
fn fold_bool(lambda: &Lambda, right: ExprId) -> Option<ExprKind> {
    match constant(lambda, right)? {
        value @ Value::Bool(_) => Some(ExprKind::Constant(value.clone())),
        _ => None,
    }
}
