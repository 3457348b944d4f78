//! Source-like rendering of lambdas.
//!
//! `|a, b| a.name.len + b.name.len`. Binary operands are parenthesized when
//! their own operator binds less tightly than the parent's.

use std::fmt::{self, Write};

use super::Lambda;
use crate::ast::{BinaryOp, ExprKind};
use crate::ExprId;

/// Precedence used for anything that is not a binary operation.
const ATOM: u8 = 0;
/// Conditionals bind less tightly than every binary operator.
const CONDITIONAL: u8 = 15;

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('|')?;
        for (i, param) in self.params().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
            if let Some(ty) = self.param_type(i) {
                write!(f, ": {ty}")?;
            }
        }
        f.write_str("| ")?;
        self.write_expr(f, self.body())
    }
}

impl Lambda {
    /// Render one sub-expression.
    pub fn display_expr(&self, id: ExprId) -> impl fmt::Display + '_ {
        ExprDisplay { lambda: self, id }
    }

    fn precedence_of(&self, id: ExprId) -> u8 {
        match self.get(id) {
            Some(ExprKind::Binary { op, .. }) => op.precedence(),
            Some(ExprKind::Conditional { .. } | ExprKind::TypeIs { .. }) => CONDITIONAL,
            _ => ATOM,
        }
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>, id: ExprId, parent: u8) -> fmt::Result {
        if self.precedence_of(id) > parent {
            f.write_char('(')?;
            self.write_expr(f, id)?;
            f.write_char(')')
        } else {
            self.write_expr(f, id)
        }
    }

    fn write_list(&self, f: &mut fmt::Formatter<'_>, ids: &[ExprId]) -> fmt::Result {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            self.write_expr(f, *id)?;
        }
        Ok(())
    }

    fn write_expr(&self, f: &mut fmt::Formatter<'_>, id: ExprId) -> fmt::Result {
        let arena = self.arena();
        let Some(expr) = self.get(id) else {
            return write!(f, "<{id:?}>");
        };
        match expr {
            ExprKind::Constant(value) => write!(f, "{value}"),
            ExprKind::Parameter(index) => match self.params().get(*index as usize) {
                Some(name) => write!(f, "{name}"),
                None => write!(f, "${index}"),
            },
            ExprKind::Member { target, member } => {
                self.write_operand(f, *target, ATOM)?;
                write!(f, ".{member}")
            }
            ExprKind::StaticMember { member, getter } => {
                write!(f, "{}::{member}", getter.name())
            }
            ExprKind::Index { target, args } => {
                self.write_operand(f, *target, ATOM)?;
                f.write_char('[')?;
                self.write_list(f, arena.get_expr_list(*args))?;
                f.write_char(']')
            }
            ExprKind::Binary {
                op, left, right, ..
            } => {
                let prec = op.precedence();
                self.write_operand(f, *left, prec)?;
                write!(f, " {} ", op.as_symbol())?;
                // Left-associative: an equal-precedence right operand needs parens.
                let right_limit = if *op == BinaryOp::Coalesce {
                    prec
                } else {
                    prec.saturating_sub(1)
                };
                self.write_operand(f, *right, right_limit)
            }
            ExprKind::Unary { op, operand, .. } => {
                f.write_str(op.as_symbol())?;
                self.write_operand(f, *operand, ATOM)
            }
            ExprKind::Convert { operand, ty, .. } => {
                write!(f, "({ty})")?;
                self.write_operand(f, *operand, ATOM)
            }
            ExprKind::Conditional {
                test,
                if_true,
                if_false,
            } => {
                self.write_operand(f, *test, CONDITIONAL - 1)?;
                f.write_str(" ? ")?;
                self.write_operand(f, *if_true, CONDITIONAL - 1)?;
                f.write_str(" : ")?;
                self.write_expr(f, *if_false)
            }
            ExprKind::Call {
                receiver,
                method,
                args,
            } => {
                self.write_operand(f, *receiver, ATOM)?;
                write!(f, ".{method}(")?;
                self.write_list(f, arena.get_expr_list(*args))?;
                f.write_char(')')
            }
            ExprKind::StaticCall { function, args } => {
                write!(f, "{}(", function.name())?;
                self.write_list(f, arena.get_expr_list(*args))?;
                f.write_char(')')
            }
            ExprKind::Invoke { callee, args } => {
                self.write_operand(f, *callee, ATOM)?;
                f.write_char('(')?;
                self.write_list(f, arena.get_expr_list(*args))?;
                f.write_char(')')
            }
            ExprKind::New { constructor, args } => {
                write!(f, "new {}(", constructor.ty())?;
                self.write_list(f, arena.get_expr_list(*args))?;
                f.write_char(')')
            }
            ExprKind::MemberInit { new, bindings } => {
                self.write_expr(f, *new)?;
                f.write_str(" {")?;
                for (i, binding) in arena.get_bindings(*bindings).iter().enumerate() {
                    f.write_str(if i > 0 { ", " } else { " " })?;
                    write!(f, "{} = ", binding.member)?;
                    self.write_expr(f, binding.value)?;
                }
                f.write_str(" }")
            }
            ExprKind::NewList { items } => {
                f.write_char('[')?;
                self.write_list(f, arena.get_expr_list(*items))?;
                f.write_char(']')
            }
            ExprKind::TypeIs { operand, ty } => {
                self.write_operand(f, *operand, ATOM)?;
                write!(f, " is {ty}")
            }
            ExprKind::Lambda { arity, body } => {
                write!(f, "|{arity} params| ")?;
                self.write_expr(f, *body)
            }
            ExprKind::Assign { target, value } => {
                self.write_expr(f, *target)?;
                f.write_str(" = ")?;
                self.write_expr(f, *value)
            }
            ExprKind::Block { exprs } => {
                f.write_str("{ ")?;
                for id in arena.get_expr_list(*exprs) {
                    self.write_expr(f, *id)?;
                    f.write_str("; ")?;
                }
                f.write_char('}')
            }
        }
    }
}

struct ExprDisplay<'a> {
    lambda: &'a Lambda,
    id: ExprId,
}

impl fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.lambda.write_expr(f, self.id)
    }
}
