//! Arena allocation for flat expression trees.
//!
//! - Contiguous storage for all expressions of one lambda
//! - Child references use `ExprId` indices
//! - Expression lists use `ExprRange` into `expr_lists`

use smallvec::SmallVec;

use crate::ast::{ExprKind, MemberBinding};
use crate::{BindingRange, ExprId, ExprRange};

/// Contiguous storage for all expressions of a lambda.
#[derive(Clone, Debug, Default)]
pub struct ExprArena {
    /// All expressions (indexed by `ExprId`).
    exprs: Vec<ExprKind>,

    /// Flattened expression lists (call args, index args, list items).
    expr_lists: Vec<ExprId>,

    /// Member-init bindings.
    bindings: Vec<MemberBinding>,
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    // Expression allocation

    /// Allocate expression, return ID.
    #[inline]
    pub fn alloc_expr(&mut self, expr: ExprKind) -> ExprId {
        let id = ExprId::new(to_u32(self.exprs.len()));
        self.exprs.push(expr);
        id
    }

    /// Get expression by ID, or `None` for an ID from another arena.
    #[inline]
    pub fn get(&self, id: ExprId) -> Option<&ExprKind> {
        self.exprs.get(id.index())
    }

    /// Replace the expression stored at `id`. Returns false if `id` is not
    /// part of this arena.
    pub fn replace(&mut self, id: ExprId, expr: ExprKind) -> bool {
        match self.exprs.get_mut(id.index()) {
            Some(slot) => {
                *slot = expr;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    // Expression list allocation

    /// Allocate expression list, return range.
    pub fn alloc_expr_list(&mut self, exprs: impl IntoIterator<Item = ExprId>) -> ExprRange {
        let start = self.expr_lists.len();
        self.expr_lists.extend(exprs);
        ExprRange::new(to_u32(start), to_u32(self.expr_lists.len() - start))
    }

    /// Get expression list by range. Out-of-range lists read as empty.
    #[inline]
    pub fn get_expr_list(&self, range: ExprRange) -> &[ExprId] {
        let start = range.start as usize;
        let end = start + range.len();
        self.expr_lists.get(start..end).unwrap_or(&[])
    }

    // Binding allocation

    pub fn alloc_bindings(
        &mut self,
        bindings: impl IntoIterator<Item = MemberBinding>,
    ) -> BindingRange {
        let start = self.bindings.len();
        self.bindings.extend(bindings);
        BindingRange::new(to_u32(start), to_u32(self.bindings.len() - start))
    }

    #[inline]
    pub fn get_bindings(&self, range: BindingRange) -> &[MemberBinding] {
        let start = range.start as usize;
        let end = start + range.len();
        self.bindings.get(start..end).unwrap_or(&[])
    }

    /// Direct operands of `expr`, in evaluation order.
    pub fn children(&self, expr: &ExprKind) -> SmallVec<[ExprId; 4]> {
        let mut out = SmallVec::new();
        match expr {
            ExprKind::Constant(_) | ExprKind::Parameter(_) | ExprKind::StaticMember { .. } => {}
            ExprKind::Member { target, .. } => out.push(*target),
            ExprKind::Index { target, args } => {
                out.push(*target);
                out.extend_from_slice(self.get_expr_list(*args));
            }
            ExprKind::Binary { left, right, .. } => {
                out.push(*left);
                out.push(*right);
            }
            ExprKind::Unary { operand, .. }
            | ExprKind::Convert { operand, .. }
            | ExprKind::TypeIs { operand, .. } => out.push(*operand),
            ExprKind::Conditional {
                test,
                if_true,
                if_false,
            } => {
                out.push(*test);
                out.push(*if_true);
                out.push(*if_false);
            }
            ExprKind::Call { receiver, args, .. } => {
                out.push(*receiver);
                out.extend_from_slice(self.get_expr_list(*args));
            }
            ExprKind::Invoke { callee, args } => {
                out.push(*callee);
                out.extend_from_slice(self.get_expr_list(*args));
            }
            ExprKind::StaticCall { args, .. } | ExprKind::New { args, .. } => {
                out.extend_from_slice(self.get_expr_list(*args));
            }
            ExprKind::NewList { items } | ExprKind::Block { exprs: items } => {
                out.extend_from_slice(self.get_expr_list(*items));
            }
            ExprKind::MemberInit { new, bindings } => {
                out.push(*new);
                out.extend(self.get_bindings(*bindings).iter().map(|b| b.value));
            }
            ExprKind::Lambda { body, .. } => out.push(*body),
            ExprKind::Assign { target, value } => {
                out.push(*target);
                out.push(*value);
            }
        }
        out
    }
}
