//! Value-disposal policy.
//!
//! A node that produces a value (a member read, call, indexer, user operator
//! or construction) may own that value. When the node replaces the value or
//! is torn down, the value is disposed if a rule matches. Pass-through nodes
//! (short-circuit operators, casts, constants, arguments) never own what
//! they hold, so a value is disposed at most once per production.
//!
//! # Rules
//!
//! - [`DisposalRule::Shape`]: values produced by one expression shape. A
//!   member, method or indexer shape names the type it is read from and is
//!   checked against the target operand when the value is produced.
//!   Functions, operators and constructors are matched by identity. An
//!   [`DisposalShape::Expression`] pattern selects nodes whose bound key has
//!   exactly the pattern's shape.
//! - [`DisposalRule::ConstructedType`]: values of a type produced by `new`.
//! - [`DisposalRule::ResultType`]: values of a type produced by any node.
//!
//! The global switches `dispose_constructed_objects` and
//! `dispose_static_call_results` act as catch-all rules.

mod dispose;

use obx_ir::{Name, ShapeKey, ShapePattern};
use obx_value::{Constructor, Function, QualifiedName, Value};

use crate::node::NodeKind;

pub use dispose::DisposalMode;
pub(crate) use dispose::{dispose_value, Disposed};

/// Expression shape whose produced values are disposed.
#[derive(Clone, Debug)]
pub enum DisposalShape {
    /// Instance member `member` read from objects of type `target`.
    Member { target: QualifiedName, member: Name },
    /// Instance method `method` called on objects of type `target`.
    Method { target: QualifiedName, method: Name },
    /// Static call (or static member getter) of this function.
    Function(Function),
    /// Indexer of objects of type `target`.
    Indexer { target: QualifiedName },
    /// User-defined operator or conversion function.
    Operator(Function),
    /// Construction through this constructor.
    Constructor(Constructor),
    /// Nodes whose bound key has this shape.
    Expression(ShapePattern),
}

impl DisposalShape {
    /// True if the shape selects the node whatever its operands hold.
    fn selects(&self, kind: &NodeKind, key: &ShapeKey) -> bool {
        match (self, kind) {
            (DisposalShape::Function(f), NodeKind::StaticCall { function }) => f.same(function),
            (DisposalShape::Function(f), NodeKind::StaticMember { getter, .. }) => f.same(getter),
            (
                DisposalShape::Operator(f),
                NodeKind::Binary {
                    method: Some(method),
                    ..
                }
                | NodeKind::Unary {
                    method: Some(method),
                    ..
                }
                | NodeKind::Convert {
                    method: Some(method),
                    ..
                }
                | NodeKind::Coalesce {
                    conversion: Some(method),
                },
            ) => f.same(method),
            (
                DisposalShape::Constructor(c),
                NodeKind::New { constructor } | NodeKind::MemberInit { constructor, .. },
            ) => c.same(constructor),
            (DisposalShape::Expression(pattern), _) => pattern.matches(key),
            _ => false,
        }
    }

    /// The type the node's target operand must have for the shape to
    /// select it, or `None` if the shape never selects this kind.
    fn target_type(&self, kind: &NodeKind) -> Option<&QualifiedName> {
        match (self, kind) {
            (DisposalShape::Member { target, member }, NodeKind::Member { member: read })
            | (DisposalShape::Method { target, method: member }, NodeKind::Call { method: read })
                if member == read =>
            {
                Some(target)
            }
            (DisposalShape::Indexer { target }, NodeKind::Index) => Some(target),
            _ => None,
        }
    }
}

/// One disposal rule.
#[derive(Clone, Debug)]
pub enum DisposalRule {
    Shape(DisposalShape),
    /// Objects of `ty` created by `new` or member-init expressions.
    ConstructedType {
        ty: QualifiedName,
        include_generic_instances: bool,
    },
    /// Objects of `ty` produced by any node.
    ResultType {
        ty: QualifiedName,
        include_generic_instances: bool,
    },
}

/// Policy verdict for one node, decided when the node is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// No rule applies.
    Never,
    /// The node itself is selected: every object it produces is disposed.
    Always,
    /// Depends on the produced value or on the target it was read from.
    Check,
}

/// The complete set of rules plus the global switches.
#[derive(Clone, Debug)]
pub struct DisposalPolicy {
    rules: Vec<DisposalRule>,
    dispose_constructed_objects: bool,
    dispose_static_call_results: bool,
}

impl Default for DisposalPolicy {
    fn default() -> Self {
        DisposalPolicy {
            rules: Vec::new(),
            dispose_constructed_objects: true,
            dispose_static_call_results: true,
        }
    }
}

impl DisposalPolicy {
    pub(crate) fn new(
        rules: Vec<DisposalRule>,
        dispose_constructed_objects: bool,
        dispose_static_call_results: bool,
    ) -> Self {
        DisposalPolicy {
            rules,
            dispose_constructed_objects,
            dispose_static_call_results,
        }
    }

    #[inline]
    pub fn rules(&self) -> &[DisposalRule] {
        &self.rules
    }

    #[inline]
    pub fn dispose_constructed_objects(&self) -> bool {
        self.dispose_constructed_objects
    }

    #[inline]
    pub fn dispose_static_call_results(&self) -> bool {
        self.dispose_static_call_results
    }

    /// Verdict for a node of this kind built for the bound key `key`.
    ///
    /// Computed once per node. Rules that depend on values are settled by
    /// [`matches_value`](Self::matches_value).
    pub(crate) fn should_dispose(&self, kind: &NodeKind, key: &ShapeKey) -> Verdict {
        if !kind.produces_value() {
            return Verdict::Never;
        }
        let selected = self.matches_switch(kind)
            || self
                .rules
                .iter()
                .any(|rule| matches!(rule, DisposalRule::Shape(shape) if shape.selects(kind, key)));
        if selected {
            return Verdict::Always;
        }
        let conditional = self.rules.iter().any(|rule| match rule {
            DisposalRule::Shape(shape) => shape.target_type(kind).is_some(),
            DisposalRule::ConstructedType { .. } => kind.is_construction(),
            DisposalRule::ResultType { .. } => true,
        });
        if conditional {
            Verdict::Check
        } else {
            Verdict::Never
        }
    }

    /// True if `value`, produced by a node of this kind from `target` (its
    /// first operand's value, if any), must be disposed.
    pub(crate) fn matches_value(
        &self,
        kind: &NodeKind,
        verdict: Verdict,
        target: Option<&Value>,
        value: &Value,
    ) -> bool {
        if !matches!(value, Value::Object(_)) {
            return false;
        }
        match verdict {
            Verdict::Never => false,
            Verdict::Always => true,
            Verdict::Check => self.rules.iter().any(|rule| match rule {
                DisposalRule::Shape(shape) => shape
                    .target_type(kind)
                    .zip(target)
                    .is_some_and(|(ty, target)| target.is_instance_of(ty, true)),
                DisposalRule::ConstructedType {
                    ty,
                    include_generic_instances,
                } => kind.is_construction() && value.is_instance_of(ty, *include_generic_instances),
                DisposalRule::ResultType {
                    ty,
                    include_generic_instances,
                } => value.is_instance_of(ty, *include_generic_instances),
            }),
        }
    }

    fn matches_switch(&self, kind: &NodeKind) -> bool {
        (self.dispose_constructed_objects && kind.is_construction())
            || (self.dispose_static_call_results && matches!(kind, NodeKind::StaticCall { .. }))
    }
}
