//! Per-kind evaluation.
//!
//! Eager kinds compute their evaluation from the evaluations of all
//! operands ([`evaluate`]). Short-circuit kinds first look at their deciding
//! operand ([`choose`]) and, if another operand is needed, take its
//! evaluation through [`follow`].
//!
//! The first fault among the operands, left to right, is the node's fault.
//! Faults are passed on as the same `Arc`, so an unchanged upstream fault is
//! never reported as a new change.

use obx_ir::Name;
use obx_value::{type_mismatch, EvalError, EvalResult, Value};
use smallvec::SmallVec;

use super::NodeKind;
use crate::evaluation::{Evaluation, Fault};
use crate::methods::{call_method, index_value, invoke_value, read_member};
use crate::operators::evaluate_binary;
use crate::subscriber::{Dependency, Interest};
use crate::unary_operators::{evaluate_convert, evaluate_unary};

/// What one evaluation pass produced.
pub(crate) struct Outcome {
    pub evaluation: Evaluation,
    /// True if the node produced the value itself (and so may dispose it).
    pub owned: bool,
    /// Object the node must watch until its next evaluation.
    pub dependency: Option<Dependency>,
    /// A value produced and then discarded in the same pass.
    pub discarded: Option<Value>,
}

impl Outcome {
    fn produced(result: EvalResult) -> Self {
        Outcome {
            evaluation: Evaluation::from_result(result),
            owned: true,
            dependency: None,
            discarded: None,
        }
    }

    pub(crate) fn passed(evaluation: Evaluation) -> Self {
        Outcome {
            evaluation,
            owned: false,
            dependency: None,
            discarded: None,
        }
    }

    fn fault(fault: &Fault) -> Self {
        Outcome::passed(Evaluation::Fault(fault.clone()))
    }

    fn watching(mut self, target: &Value, interest: Interest) -> Self {
        if let Value::Object(object) = target {
            self.dependency = Some(Dependency {
                target: object.clone(),
                interest,
            });
        }
        self
    }
}

/// Operand values, or the first faulted operand.
fn values(inputs: &[Evaluation]) -> Result<SmallVec<[Value; 4]>, &Fault> {
    inputs
        .iter()
        .map(|input| match input {
            Evaluation::Value(value) => Ok(value.clone()),
            Evaluation::Fault(fault) => Err(fault),
        })
        .collect()
}

/// Evaluate an eager node.
pub(crate) fn evaluate(kind: &NodeKind, inputs: &[Evaluation]) -> Outcome {
    let args = match values(inputs) {
        Ok(args) => args,
        Err(fault) => return Outcome::fault(fault),
    };

    match kind {
        NodeKind::Constant(value) | NodeKind::Argument(value) => Outcome::passed(value.clone().into()),

        NodeKind::Member { member } => {
            let target = &args[0];
            Outcome::produced(read_member(target, member.as_str()))
                .watching(target, Interest::Member(member.clone()))
        }

        NodeKind::StaticMember { getter, .. } => Outcome::produced(getter.invoke(&[])),

        NodeKind::Index => {
            let (target, rest) = (&args[0], &args[1..]);
            let key = match rest {
                [key] => Some(key.clone()),
                _ => None,
            };
            Outcome::produced(index_value(target, rest)).watching(target, Interest::Index { key })
        }

        NodeKind::Call { method } => {
            let (receiver, rest) = (&args[0], &args[1..]);
            Outcome::produced(call_method(receiver, method.as_str(), rest))
                .watching(receiver, Interest::Any)
        }

        NodeKind::StaticCall { function } => Outcome::produced(function.invoke(&args)),

        NodeKind::Invoke => Outcome::produced(invoke_value(&args[0], &args[1..])),

        NodeKind::New { constructor } => Outcome::produced(constructor.construct(&args)),

        NodeKind::MemberInit {
            constructor,
            members,
        } => {
            let split = args.len().saturating_sub(members.len());
            let (ctor_args, values) = args.split_at(split);
            let object = match constructor.construct(ctor_args) {
                Ok(object) => object,
                Err(err) => return Outcome::produced(Err(err)),
            };
            match initialize(&object, members, values) {
                Ok(()) => Outcome::produced(Ok(object)),
                Err(err) => Outcome {
                    discarded: Some(object),
                    ..Outcome::produced(Err(err))
                },
            }
        }

        NodeKind::NewList => Outcome::passed(Value::list(args.to_vec()).into()),

        // `null` is an instance of nothing.
        NodeKind::TypeIs { ty } => Outcome::passed(Value::Bool(args[0].is_instance_of(ty, false)).into()),

        NodeKind::Binary { op, method } => {
            let result = match method {
                Some(method) => method.invoke(&args),
                None => evaluate_binary(&args[0], &args[1], *op),
            };
            Outcome {
                owned: method.is_some(),
                ..Outcome::produced(result)
            }
        }

        NodeKind::Unary { op, method } => {
            let result = match method {
                Some(method) => method.invoke(&args),
                None => evaluate_unary(&args[0], *op),
            };
            Outcome {
                owned: method.is_some(),
                ..Outcome::produced(result)
            }
        }

        NodeKind::Convert { ty, method } => {
            let result = match method {
                Some(method) => method.invoke(&args),
                None => evaluate_convert(&args[0], ty),
            };
            Outcome {
                owned: method.is_some(),
                ..Outcome::produced(result)
            }
        }

        NodeKind::AndAlso | NodeKind::OrElse | NodeKind::Coalesce { .. } | NodeKind::Conditional => {
            Outcome::passed(Evaluation::from_result(Err(type_mismatch(
                "eager operator",
                kind.name(),
            ))))
        }
    }
}

/// Apply member-init bindings to a freshly constructed object.
fn initialize(object: &Value, members: &[Name], values: &[Value]) -> Result<(), EvalError> {
    let Value::Object(target) = object else {
        return Err(type_mismatch("object", object.kind_name()));
    };
    for (member, value) in members.iter().zip(values) {
        target.set(member.as_str(), value.clone())?;
    }
    Ok(())
}

/// Decision of a short-circuit node after its deciding operand.
pub(crate) enum Branch {
    /// The result is known; every lazy operand is released.
    Done(Outcome),
    /// The result is the evaluation of this operand slot.
    Follow(usize),
}

/// Decide a short-circuit node from its first operand.
pub(crate) fn choose(kind: &NodeKind, first: &Evaluation) -> Branch {
    let value = match first {
        Evaluation::Fault(fault) => return Branch::Done(Outcome::fault(fault)),
        Evaluation::Value(value) => value,
    };
    match (kind, value) {
        (NodeKind::AndAlso, Value::Bool(false)) => Branch::Done(Outcome::passed(Value::Bool(false).into())),
        (NodeKind::OrElse, Value::Bool(true)) => Branch::Done(Outcome::passed(Value::Bool(true).into())),
        (NodeKind::AndAlso | NodeKind::OrElse, Value::Bool(_)) => Branch::Follow(1),
        (NodeKind::AndAlso | NodeKind::OrElse | NodeKind::Conditional, other) if other.as_bool().is_none() => {
            Branch::Done(Outcome::passed(Evaluation::from_result(Err(type_mismatch(
                "bool",
                other.kind_name(),
            )))))
        }
        (NodeKind::Conditional, test) => Branch::Follow(if test.as_bool() == Some(true) { 1 } else { 2 }),
        (NodeKind::Coalesce { .. }, Value::Null) => Branch::Follow(1),
        (NodeKind::Coalesce { conversion: None }, present) => {
            Branch::Done(Outcome::passed(present.clone().into()))
        }
        (NodeKind::Coalesce { conversion: Some(conversion) }, present) => {
            Branch::Done(Outcome::produced(conversion.invoke(std::slice::from_ref(present))))
        }
        _ => Branch::Done(Outcome::passed(Evaluation::from_result(Err(type_mismatch(
            "short-circuit operator",
            kind.name(),
        ))))),
    }
}

/// The evaluation of a short-circuit node whose result is operand `followed`.
pub(crate) fn follow(kind: &NodeKind, followed: &Evaluation) -> Outcome {
    match (kind, followed) {
        (NodeKind::AndAlso | NodeKind::OrElse, Evaluation::Value(value)) if value.as_bool().is_none() => {
            Outcome::passed(Evaluation::from_result(Err(type_mismatch(
                "bool",
                value.kind_name(),
            ))))
        }
        _ => Outcome::passed(followed.clone()),
    }
}
