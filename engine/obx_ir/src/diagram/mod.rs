//! Structural keys for expression trees.
//!
//! A [`Diagram`] is the pre-order token sequence of a lambda body. Every
//! token that influences evaluation is emitted (node kind, operator,
//! literal, member name, callable identity, target type, operand count), and
//! parameters are emitted by position, so two trees produce the same tokens
//! iff they differ at most in parameter names.
//!
//! Each sub-expression occupies a contiguous token range. A sub-expression's
//! key is therefore a slice of its parent's diagram, which is what lets the
//! registry share one node between every observation containing the same
//! sub-expression.
//!
//! # Bound Diagrams
//!
//! [`Diagram::bind`] replaces parameter tokens with the identity of the
//! argument values ([`ValueKey`]). The resulting keys identify an
//! observation: same shape, same arguments.

mod value_key;

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use obx_value::{QualifiedName, Value};
use rustc_hash::FxHasher;
use smallvec::{smallvec, SmallVec};

use crate::ast::{BinaryOp, ExprKind, UnaryOp};
use crate::{ExprId, Lambda, Name};

pub use value_key::{ConstructorKey, ValueKey};

/// Reasons a lambda has no structural key.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("{kind} expressions cannot be observed")]
    Unsupported { kind: &'static str },

    #[error("{0:?} does not belong to this lambda")]
    DanglingExpr(ExprId),

    #[error("parameter {index} is out of range for a lambda with {arity} parameters")]
    UnboundParameter { index: u32, arity: usize },

    #[error("member initializer must wrap a constructor call")]
    MemberInitWithoutNew,

    #[error("lambda takes {expected} arguments, {got} were supplied")]
    ArgumentCount { expected: usize, got: usize },

    #[error("{0:?} is its own operand")]
    Cycle(ExprId),

    #[error("expression expands to more than {limit} key tokens")]
    TooLarge { limit: usize },
}

/// Upper bound on the tokens of one diagram. Operands shared by several
/// parents are expanded once per use, so a small arena can still describe a
/// huge tree.
const MAX_TOKENS: usize = 1 << 20;

/// One element of a diagram.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    /// Parameter count prefix of an unbound diagram.
    Lambda(usize),
    /// Node kind tag.
    Kind(&'static str),
    Binary(BinaryOp),
    Unary(UnaryOp),
    Constant(ValueKey),
    /// Unbound parameter slot.
    Parameter(u32),
    /// Bound argument identity.
    Argument(ValueKey),
    /// Member or method name.
    Member(Name),
    Type(QualifiedName),
    Function(ValueKey),
    Constructor(ConstructorKey),
    /// Absent optional user operator.
    NoMethod,
    /// Number of variable-length operands that follow.
    Count(usize),
}

/// Hashable structural identity of an expression.
#[derive(Clone, Debug)]
pub struct ShapeKey {
    tokens: Arc<[Token]>,
    hash: u64,
}

impl ShapeKey {
    fn from_tokens(tokens: &[Token]) -> Self {
        let mut hasher = FxHasher::default();
        tokens.hash(&mut hasher);
        ShapeKey {
            tokens: Arc::from(tokens),
            hash: hasher.finish(),
        }
    }

    /// Key of an unbound lambda.
    pub fn of(lambda: &Lambda) -> Result<ShapeKey, ShapeError> {
        Ok(Diagram::of(lambda)?.key())
    }

    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

impl PartialEq for ShapeKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.tokens == other.tokens
    }
}

impl Eq for ShapeKey {}

impl Hash for ShapeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

/// Token sequence of a lambda plus the token range of every reachable
/// sub-expression.
#[derive(Clone, Debug)]
pub struct Diagram {
    tokens: Vec<Token>,
    /// Token range per `ExprId` index; `None` for unreachable nodes.
    spans: Vec<Option<(usize, usize)>>,
}

enum Step {
    Enter(ExprId),
    Exit(ExprId, usize),
}

impl Diagram {
    /// Diagram of an unbound lambda: parameters are positional slots.
    pub fn of(lambda: &Lambda) -> Result<Diagram, ShapeError> {
        let mut diagram = Diagram::empty(lambda);
        diagram.tokens.push(Token::Lambda(lambda.arity()));
        diagram.walk(lambda, None)?;
        Ok(diagram)
    }

    /// Diagram of a lambda applied to `args`: parameters become argument
    /// identities.
    pub fn bind(lambda: &Lambda, args: &[Value]) -> Result<Diagram, ShapeError> {
        if args.len() != lambda.arity() {
            return Err(ShapeError::ArgumentCount {
                expected: lambda.arity(),
                got: args.len(),
            });
        }
        let mut diagram = Diagram::empty(lambda);
        diagram.walk(lambda, Some(args))?;
        Ok(diagram)
    }

    fn empty(lambda: &Lambda) -> Diagram {
        Diagram {
            tokens: Vec::new(),
            spans: vec![None; lambda.arena().expr_count()],
        }
    }

    /// Key of the whole lambda.
    pub fn key(&self) -> ShapeKey {
        ShapeKey::from_tokens(&self.tokens)
    }

    /// Key of one sub-expression, or `None` if it is not reachable from the
    /// body.
    pub fn subkey(&self, id: ExprId) -> Option<ShapeKey> {
        let (start, end) = (*self.spans.get(id.index())?)?;
        Some(ShapeKey::from_tokens(&self.tokens[start..end]))
    }

    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn walk(&mut self, lambda: &Lambda, args: Option<&[Value]>) -> Result<(), ShapeError> {
        let arena = lambda.arena();
        // Nodes entered but not yet exited: the path from the body down.
        let mut open = vec![false; arena.expr_count()];
        let mut stack: SmallVec<[Step; 32]> = SmallVec::new();
        stack.push(Step::Enter(lambda.body()));

        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(id) => {
                    let expr = arena.get(id).ok_or(ShapeError::DanglingExpr(id))?;
                    if open[id.index()] {
                        return Err(ShapeError::Cycle(id));
                    }
                    open[id.index()] = true;
                    let start = self.tokens.len();
                    self.emit_header(lambda, expr, args)?;
                    if self.tokens.len() > MAX_TOKENS {
                        return Err(ShapeError::TooLarge { limit: MAX_TOKENS });
                    }
                    stack.push(Step::Exit(id, start));
                    for child in arena.children(expr).into_iter().rev() {
                        stack.push(Step::Enter(child));
                    }
                }
                Step::Exit(id, start) => {
                    open[id.index()] = false;
                    if let Some(span) = self.spans.get_mut(id.index()) {
                        *span = Some((start, self.tokens.len()));
                    }
                }
            }
        }
        Ok(())
    }

    /// Tokens of one node, excluding its operands.
    fn emit_header(
        &mut self,
        lambda: &Lambda,
        expr: &ExprKind,
        args: Option<&[Value]>,
    ) -> Result<(), ShapeError> {
        let arena = lambda.arena();
        let tokens = &mut self.tokens;
        tokens.push(Token::Kind(expr.kind_name()));
        match expr {
            ExprKind::Constant(value) => tokens.push(Token::Constant(ValueKey::of(value))),
            ExprKind::Parameter(index) => {
                let slot = *index as usize;
                if slot >= lambda.arity() {
                    return Err(ShapeError::UnboundParameter {
                        index: *index,
                        arity: lambda.arity(),
                    });
                }
                match args {
                    Some(args) => tokens.push(Token::Argument(ValueKey::of(&args[slot]))),
                    None => tokens.push(Token::Parameter(*index)),
                }
            }
            ExprKind::Member { member, .. } => tokens.push(Token::Member(member.clone())),
            ExprKind::StaticMember { member, getter } => {
                tokens.push(Token::Member(member.clone()));
                tokens.push(Token::Function(ValueKey::function(getter)));
            }
            ExprKind::Index { args, .. } => tokens.push(Token::Count(args.len())),
            ExprKind::Binary { op, method, .. } => {
                tokens.push(Token::Binary(*op));
                tokens.push(method_token(method.as_ref()));
            }
            ExprKind::Unary { op, method, .. } => {
                tokens.push(Token::Unary(*op));
                tokens.push(method_token(method.as_ref()));
            }
            ExprKind::Convert { ty, method, .. } => {
                tokens.push(Token::Type(ty.clone()));
                tokens.push(method_token(method.as_ref()));
            }
            ExprKind::Conditional { .. } => {}
            ExprKind::Call { method, args, .. } => {
                tokens.push(Token::Member(method.clone()));
                tokens.push(Token::Count(args.len()));
            }
            ExprKind::StaticCall { function, args } => {
                tokens.push(Token::Function(ValueKey::function(function)));
                tokens.push(Token::Count(args.len()));
            }
            ExprKind::Invoke { args, .. } => tokens.push(Token::Count(args.len())),
            ExprKind::New { constructor, args } => {
                tokens.push(Token::Constructor(ConstructorKey::of(constructor)));
                tokens.push(Token::Count(args.len()));
            }
            ExprKind::MemberInit { new, bindings } => {
                if !matches!(arena.get(*new), Some(ExprKind::New { .. })) {
                    return Err(ShapeError::MemberInitWithoutNew);
                }
                let bindings = arena.get_bindings(*bindings);
                tokens.push(Token::Count(bindings.len()));
                tokens.extend(bindings.iter().map(|b| Token::Member(b.member.clone())));
            }
            ExprKind::NewList { items } => tokens.push(Token::Count(items.len())),
            ExprKind::TypeIs { ty, .. } => tokens.push(Token::Type(ty.clone())),
            ExprKind::Lambda { .. } | ExprKind::Assign { .. } | ExprKind::Block { .. } => {
                return Err(ShapeError::Unsupported {
                    kind: expr.kind_name(),
                });
            }
        }
        Ok(())
    }
}

/// A lambda body used as a template for bound keys.
///
/// A pattern matches a bound key token for token, except that each
/// parameter slot matches an argument. A parameter used twice must meet the
/// same argument both times; a typed parameter only meets arguments of its
/// type (generic instances included).
#[derive(Clone, Debug)]
pub struct ShapePattern {
    tokens: Arc<[Token]>,
    types: Vec<Option<QualifiedName>>,
}

impl ShapePattern {
    pub fn of(lambda: &Lambda) -> Result<ShapePattern, ShapeError> {
        let diagram = Diagram::of(lambda)?;
        let body = lambda.body();
        let (start, end) = diagram
            .spans
            .get(body.index())
            .copied()
            .flatten()
            .ok_or(ShapeError::DanglingExpr(body))?;
        Ok(ShapePattern {
            tokens: Arc::from(&diagram.tokens[start..end]),
            types: (0..lambda.arity())
                .map(|index| lambda.param_type(index).cloned())
                .collect(),
        })
    }

    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// True if `key`, a bound key, has this shape.
    pub fn matches(&self, key: &ShapeKey) -> bool {
        let tokens = key.tokens();
        if tokens.len() != self.tokens.len() {
            return false;
        }
        let mut bound: SmallVec<[Option<&ValueKey>; 4]> = smallvec![None; self.types.len()];
        for (expected, actual) in self.tokens.iter().zip(tokens) {
            match (expected, actual) {
                (Token::Parameter(index), Token::Argument(arg)) => {
                    let slot = *index as usize;
                    let Some(seen) = bound.get_mut(slot) else {
                        return false;
                    };
                    if let Some(previous) = seen {
                        if *previous != arg {
                            return false;
                        }
                        continue;
                    }
                    if let Some(Some(ty)) = self.types.get(slot) {
                        if !arg.value().is_instance_of(ty, true) {
                            return false;
                        }
                    }
                    *seen = Some(arg);
                }
                (expected, actual) if expected != actual => return false,
                _ => {}
            }
        }
        true
    }
}

fn method_token(method: Option<&obx_value::Function>) -> Token {
    method.map_or(Token::NoMethod, |m| Token::Function(ValueKey::function(m)))
}

impl Lambda {
    /// True if both lambdas have the same structural key.
    ///
    /// Parameter names are ignored; lambdas that cannot be keyed are never
    /// equal.
    pub fn structurally_eq(&self, other: &Lambda) -> bool {
        match (ShapeKey::of(self), ShapeKey::of(other)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}
