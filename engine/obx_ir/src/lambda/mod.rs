//! Lambdas: an expression tree plus its parameter list.
//!
//! [`LambdaBuilder`] is the construction API. Parameters are referenced by
//! position, so renaming a parameter never changes the tree itself, only
//! how it prints.

mod display;

use obx_value::{Constructor, Function, QualifiedName, Value};
use smallvec::SmallVec;

use crate::ast::{BinaryOp, ExprKind, MemberBinding, UnaryOp};
use crate::{ExprArena, ExprId, Name};

/// An expression tree over zero or more parameters.
#[derive(Clone, Debug)]
pub struct Lambda {
    arena: ExprArena,
    params: Vec<Name>,
    /// Declared parameter types, parallel to `params`. Not part of the
    /// structural key.
    param_types: Vec<Option<QualifiedName>>,
    body: ExprId,
}

impl Lambda {
    #[inline]
    pub fn params(&self) -> &[Name] {
        &self.params
    }

    /// Declared type of parameter `index`, if it has one.
    pub fn param_type(&self, index: usize) -> Option<&QualifiedName> {
        self.param_types.get(index)?.as_ref()
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn body(&self) -> ExprId {
        self.body
    }

    #[inline]
    pub fn arena(&self) -> &ExprArena {
        &self.arena
    }

    #[inline]
    pub fn get(&self, id: ExprId) -> Option<&ExprKind> {
        self.arena.get(id)
    }

    /// Replace one node in place. Used by optimizers rewriting a copy of a
    /// lambda; the replaced node's operands become unreachable.
    pub fn replace(&mut self, id: ExprId, expr: ExprKind) -> bool {
        self.arena.replace(id, expr)
    }

    /// Every node reachable from the body, operands before their parents.
    ///
    /// A node shared by several parents is listed once. Dangling IDs are
    /// skipped.
    pub fn post_order(&self) -> Vec<ExprId> {
        let mut visited = vec![false; self.arena.expr_count()];
        let mut out = Vec::new();
        // (node, operands already pushed)
        let mut stack: SmallVec<[(ExprId, bool); 32]> = SmallVec::new();
        stack.push((self.body, false));
        while let Some((id, expanded)) = stack.pop() {
            let Some(expr) = self.arena.get(id) else {
                continue;
            };
            if expanded {
                out.push(id);
                continue;
            }
            if visited[id.index()] {
                continue;
            }
            visited[id.index()] = true;
            stack.push((id, true));
            for child in self.arena.children(expr).into_iter().rev() {
                stack.push((child, false));
            }
        }
        out
    }
}

/// Builder for [`Lambda`] expression trees.
///
/// Every method allocates one node and returns its ID; the final call to
/// [`build`](LambdaBuilder::build) selects the body.
#[derive(Debug, Default)]
pub struct LambdaBuilder {
    arena: ExprArena,
    params: Vec<Name>,
    param_types: Vec<Option<QualifiedName>>,
}

impl LambdaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the next parameter and return a reference to it.
    pub fn param(&mut self, name: &str) -> ExprId {
        self.declare(name, None)
    }

    /// Declare the next parameter with a type. Only disposal rules look at
    /// parameter types.
    pub fn typed_param(&mut self, name: &str, ty: impl Into<QualifiedName>) -> ExprId {
        self.declare(name, Some(ty.into()))
    }

    fn declare(&mut self, name: &str, ty: Option<QualifiedName>) -> ExprId {
        let index = u32::try_from(self.params.len()).unwrap_or(u32::MAX);
        self.params.push(Name::new(name));
        self.param_types.push(ty);
        self.arena.alloc_expr(ExprKind::Parameter(index))
    }

    /// Another reference to an already declared parameter.
    pub fn param_ref(&mut self, index: u32) -> ExprId {
        self.arena.alloc_expr(ExprKind::Parameter(index))
    }

    // Literals

    pub fn constant(&mut self, value: impl Into<Value>) -> ExprId {
        self.arena.alloc_expr(ExprKind::Constant(value.into()))
    }

    pub fn null(&mut self) -> ExprId {
        self.constant(Value::Null)
    }

    // Access

    pub fn member(&mut self, target: ExprId, member: &str) -> ExprId {
        self.arena.alloc_expr(ExprKind::Member {
            target,
            member: Name::new(member),
        })
    }

    pub fn static_member(&mut self, member: &str, getter: Function) -> ExprId {
        self.arena.alloc_expr(ExprKind::StaticMember {
            member: Name::new(member),
            getter,
        })
    }

    pub fn index(&mut self, target: ExprId, args: &[ExprId]) -> ExprId {
        let args = self.arena.alloc_expr_list(args.iter().copied());
        self.arena.alloc_expr(ExprKind::Index { target, args })
    }

    // Operators

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        self.arena.alloc_expr(ExprKind::Binary {
            op,
            left,
            right,
            method: None,
        })
    }

    /// Binary operation implemented by a user-defined operator function.
    pub fn binary_with(
        &mut self,
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
        method: Function,
    ) -> ExprId {
        self.arena.alloc_expr(ExprKind::Binary {
            op,
            left,
            right,
            method: Some(method),
        })
    }

    pub fn and_also(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(BinaryOp::And, left, right)
    }

    pub fn or_else(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(BinaryOp::Or, left, right)
    }

    pub fn coalesce(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(BinaryOp::Coalesce, left, right)
    }

    /// `left ?? right` where a non-null left value is passed through
    /// `conversion`.
    pub fn coalesce_with(&mut self, left: ExprId, right: ExprId, conversion: Function) -> ExprId {
        self.binary_with(BinaryOp::Coalesce, left, right, conversion)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.arena.alloc_expr(ExprKind::Unary {
            op,
            operand,
            method: None,
        })
    }

    pub fn unary_with(&mut self, op: UnaryOp, operand: ExprId, method: Function) -> ExprId {
        self.arena.alloc_expr(ExprKind::Unary {
            op,
            operand,
            method: Some(method),
        })
    }

    pub fn convert(&mut self, operand: ExprId, ty: impl Into<QualifiedName>) -> ExprId {
        self.arena.alloc_expr(ExprKind::Convert {
            operand,
            ty: ty.into(),
            method: None,
        })
    }

    pub fn convert_with(
        &mut self,
        operand: ExprId,
        ty: impl Into<QualifiedName>,
        method: Function,
    ) -> ExprId {
        self.arena.alloc_expr(ExprKind::Convert {
            operand,
            ty: ty.into(),
            method: Some(method),
        })
    }

    pub fn conditional(&mut self, test: ExprId, if_true: ExprId, if_false: ExprId) -> ExprId {
        self.arena.alloc_expr(ExprKind::Conditional {
            test,
            if_true,
            if_false,
        })
    }

    pub fn type_is(&mut self, operand: ExprId, ty: impl Into<QualifiedName>) -> ExprId {
        self.arena.alloc_expr(ExprKind::TypeIs {
            operand,
            ty: ty.into(),
        })
    }

    // Calls and construction

    pub fn call(&mut self, receiver: ExprId, method: &str, args: &[ExprId]) -> ExprId {
        let args = self.arena.alloc_expr_list(args.iter().copied());
        self.arena.alloc_expr(ExprKind::Call {
            receiver,
            method: Name::new(method),
            args,
        })
    }

    pub fn static_call(&mut self, function: Function, args: &[ExprId]) -> ExprId {
        let args = self.arena.alloc_expr_list(args.iter().copied());
        self.arena.alloc_expr(ExprKind::StaticCall { function, args })
    }

    pub fn invoke(&mut self, callee: ExprId, args: &[ExprId]) -> ExprId {
        let args = self.arena.alloc_expr_list(args.iter().copied());
        self.arena.alloc_expr(ExprKind::Invoke { callee, args })
    }

    pub fn new_object(&mut self, constructor: Constructor, args: &[ExprId]) -> ExprId {
        let args = self.arena.alloc_expr_list(args.iter().copied());
        self.arena.alloc_expr(ExprKind::New { constructor, args })
    }

    pub fn member_init(&mut self, new: ExprId, bindings: &[(&str, ExprId)]) -> ExprId {
        let bindings = self
            .arena
            .alloc_bindings(bindings.iter().map(|(member, value)| MemberBinding {
                member: Name::new(member),
                value: *value,
            }));
        self.arena.alloc_expr(ExprKind::MemberInit { new, bindings })
    }

    pub fn new_list(&mut self, items: &[ExprId]) -> ExprId {
        let items = self.arena.alloc_expr_list(items.iter().copied());
        self.arena.alloc_expr(ExprKind::NewList { items })
    }

    // Kinds that can be represented but not observed

    pub fn lambda(&mut self, arity: u32, body: ExprId) -> ExprId {
        self.arena.alloc_expr(ExprKind::Lambda { arity, body })
    }

    pub fn assign(&mut self, target: ExprId, value: ExprId) -> ExprId {
        self.arena.alloc_expr(ExprKind::Assign { target, value })
    }

    pub fn block(&mut self, exprs: &[ExprId]) -> ExprId {
        let exprs = self.arena.alloc_expr_list(exprs.iter().copied());
        self.arena.alloc_expr(ExprKind::Block { exprs })
    }

    /// Finish the lambda with `body` as its result expression.
    pub fn build(self, body: ExprId) -> Lambda {
        Lambda {
            arena: self.arena,
            params: self.params,
            param_types: self.param_types,
            body,
        }
    }
}

#[cfg(test)]
mod tests;
