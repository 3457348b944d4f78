//! `OptionsBuilder` for creating [`Options`] with various configurations.

use std::sync::Arc;

use obx_ir::{ExprKind, Lambda, Name, ShapeError, ShapePattern};
use obx_value::{Constructor, Function, QualifiedName};

use super::{IgnoredProperty, Options};
use crate::disposal::{DisposalMode, DisposalPolicy, DisposalRule, DisposalShape};
use crate::errors::OptionsError;
use crate::optimizer::Optimizer;

/// Builder for [`Options`].
///
/// Defaults: no ignored properties, no rules, constructed objects and
/// static call results are disposed, disposal is synchronous and
/// asynchronous disposal is not waited for.
pub struct OptionsBuilder {
    ignored: Vec<IgnoredProperty>,
    rules: Vec<DisposalRule>,
    rule_lambdas: Vec<Lambda>,
    dispose_constructed_objects: bool,
    dispose_static_call_results: bool,
    mode: DisposalMode,
    optimizer: Option<Arc<dyn Optimizer>>,
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self {
            ignored: Vec::new(),
            rules: Vec::new(),
            rule_lambdas: Vec::new(),
            dispose_constructed_objects: true,
            dispose_static_call_results: true,
            mode: DisposalMode::default(),
            optimizer: None,
        }
    }

    /// Ignore change notifications for `property` on objects of type `ty`.
    #[must_use]
    pub fn ignore_property(mut self, ty: impl Into<QualifiedName>, property: &str) -> Self {
        self.ignored.push(IgnoredProperty {
            ty: ty.into(),
            property: Arc::from(property),
        });
        self
    }

    /// Dispose values produced by `shape`.
    #[must_use]
    pub fn dispose_shape(mut self, shape: DisposalShape) -> Self {
        self.rules.push(DisposalRule::Shape(shape));
        self
    }

    /// Dispose values read through `member` of objects of type `target`.
    #[must_use]
    pub fn dispose_member(self, target: impl Into<QualifiedName>, member: &str) -> Self {
        self.dispose_shape(DisposalShape::Member {
            target: target.into(),
            member: Name::new(member),
        })
    }

    /// Dispose values returned by `method` of objects of type `target`.
    #[must_use]
    pub fn dispose_method(self, target: impl Into<QualifiedName>, method: &str) -> Self {
        self.dispose_shape(DisposalShape::Method {
            target: target.into(),
            method: Name::new(method),
        })
    }

    /// Dispose values returned by `function`.
    #[must_use]
    pub fn dispose_function(self, function: Function) -> Self {
        self.dispose_shape(DisposalShape::Function(function))
    }

    /// Dispose values read through the indexer of objects of type `target`.
    #[must_use]
    pub fn dispose_indexer(self, target: impl Into<QualifiedName>) -> Self {
        self.dispose_shape(DisposalShape::Indexer {
            target: target.into(),
        })
    }

    /// Dispose values created by `constructor`.
    #[must_use]
    pub fn dispose_constructor(self, constructor: Constructor) -> Self {
        self.dispose_shape(DisposalShape::Constructor(constructor))
    }

    /// Dispose values produced by the expression shape of `lambda`'s body.
    ///
    /// The body must be a member read, method or function call, indexer,
    /// user-defined operator or construction. Checked by
    /// [`build`](Self::build).
    ///
    /// Static calls, operators and constructions select every use of their
    /// callable. Member reads, method calls and indexers select only
    /// expressions of exactly this shape: each parameter stands for one
    /// argument of the observed lambda, and a typed parameter
    /// ([`LambdaBuilder::typed_param`](obx_ir::LambdaBuilder::typed_param))
    /// only for arguments of that type.
    #[must_use]
    pub fn dispose_values_of(mut self, lambda: &Lambda) -> Self {
        self.rule_lambdas.push(lambda.clone());
        self
    }

    /// Dispose objects of type `ty` created by construction expressions.
    #[must_use]
    pub fn dispose_constructed_type(
        mut self,
        ty: impl Into<QualifiedName>,
        include_generic_instances: bool,
    ) -> Self {
        self.rules.push(DisposalRule::ConstructedType {
            ty: ty.into(),
            include_generic_instances,
        });
        self
    }

    /// Dispose objects of type `ty` produced by any expression.
    #[must_use]
    pub fn dispose_result_type(
        mut self,
        ty: impl Into<QualifiedName>,
        include_generic_instances: bool,
    ) -> Self {
        self.rules.push(DisposalRule::ResultType {
            ty: ty.into(),
            include_generic_instances,
        });
        self
    }

    #[must_use]
    pub fn dispose_constructed_objects(mut self, enabled: bool) -> Self {
        self.dispose_constructed_objects = enabled;
        self
    }

    #[must_use]
    pub fn dispose_static_call_results(mut self, enabled: bool) -> Self {
        self.dispose_static_call_results = enabled;
        self
    }

    /// Use asynchronous disposal when an object supports both forms.
    #[must_use]
    pub fn prefer_async_disposal(mut self, enabled: bool) -> Self {
        self.mode.prefer_async = enabled;
        self
    }

    /// Wait for asynchronous disposals before returning control.
    #[must_use]
    pub fn block_on_async_disposal(mut self, enabled: bool) -> Self {
        self.mode.block_on_async = enabled;
        self
    }

    /// Rewrite every lambda before its nodes are built.
    #[must_use]
    pub fn optimizer(mut self, optimizer: impl Optimizer + 'static) -> Self {
        self.optimizer = Some(Arc::new(optimizer));
        self
    }

    pub fn build(self) -> Result<Options, OptionsError> {
        let mut ignored: Vec<IgnoredProperty> = Vec::with_capacity(self.ignored.len());
        for entry in self.ignored {
            if ignored.contains(&entry) {
                return Err(OptionsError::DuplicateIgnoredProperty {
                    ty: entry.ty.to_string(),
                    property: entry.property.to_string(),
                });
            }
            ignored.push(entry);
        }

        let mut rules = self.rules;
        for lambda in &self.rule_lambdas {
            rules.push(DisposalRule::Shape(shape_of(lambda)?));
        }

        Ok(Options {
            ignored,
            policy: DisposalPolicy::new(
                rules,
                self.dispose_constructed_objects,
                self.dispose_static_call_results,
            ),
            mode: self.mode,
            optimizer: self.optimizer,
        })
    }
}

/// The disposal shape selected by a rule lambda's body.
fn shape_of(lambda: &Lambda) -> Result<DisposalShape, OptionsError> {
    let body = lambda.body();
    let expr = lambda
        .get(body)
        .ok_or(OptionsError::InvalidRule(ShapeError::DanglingExpr(body)))?;
    match expr {
        ExprKind::Member { .. } | ExprKind::Call { .. } | ExprKind::Index { .. } => {
            let pattern = ShapePattern::of(lambda).map_err(OptionsError::InvalidRule)?;
            Ok(DisposalShape::Expression(pattern))
        }
        ExprKind::StaticMember { getter, .. } => Ok(DisposalShape::Function(getter.clone())),
        ExprKind::StaticCall { function, .. } => Ok(DisposalShape::Function(function.clone())),
        ExprKind::Binary {
            method: Some(method),
            ..
        }
        | ExprKind::Unary {
            method: Some(method),
            ..
        }
        | ExprKind::Convert {
            method: Some(method),
            ..
        } => Ok(DisposalShape::Operator(method.clone())),
        ExprKind::New { constructor, .. } => Ok(DisposalShape::Constructor(constructor.clone())),
        ExprKind::MemberInit { new, .. } => match lambda.get(*new) {
            Some(ExprKind::New { constructor, .. }) => {
                Ok(DisposalShape::Constructor(constructor.clone()))
            }
            _ => Err(OptionsError::InvalidRule(ShapeError::MemberInitWithoutNew)),
        },
        other => Err(OptionsError::Unsupported {
            kind: other.kind_name(),
        }),
    }
}
