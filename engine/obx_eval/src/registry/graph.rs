//! The node graph.
//!
//! Nodes live in a generational arena and are shared through a cache keyed
//! by the bound structural key of their sub-expression. Each acquisition
//! (by a parent node or by an observation) holds one reference; the node is
//! torn down when the last reference is released.
//!
//! Graph methods never run host callbacks other than evaluation itself.
//! Disposals and listener events are collected into [`Effects`] and applied
//! by the caller once the graph is no longer borrowed.

use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use obx_ir::{Diagram, ExprId, Lambda, ShapeError, ShapeKey};
use obx_value::{EvalError, Value};
use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

use super::handle::HandleShared;
use super::{NodeId, Shared};
use crate::errors::ObserveError;
use crate::evaluation::{Evaluation, EvaluationChanged};
use crate::node::eval::{self, Branch, Outcome};
use crate::disposal::Verdict;
use crate::node::{blueprint, Blueprint, NodeKind};
use crate::options::Options;
use crate::stack::ensure_sufficient_stack;
use crate::subscriber::{self, Dependency, Subscription};

/// A lambda bound to its arguments, shared by every node built from it.
pub(crate) struct Template {
    pub lambda: Lambda,
    pub diagram: Diagram,
    pub args: Vec<Value>,
}

/// Context for one graph session.
pub(crate) struct Cx<'a> {
    pub options: &'a Options,
    pub live: &'a AtomicUsize,
    pub registry: Weak<Shared>,
}

/// Host work deferred until the graph is released.
#[derive(Default)]
pub(crate) struct Effects {
    pub disposals: Vec<Value>,
    pub events: Vec<(Arc<HandleShared>, EvaluationChanged)>,
}

struct Node {
    key: ShapeKey,
    kind: NodeKind,
    template: Arc<Template>,
    operands: SmallVec<[ExprId; 4]>,
    /// Materialized operand nodes, parallel to `operands`.
    children: SmallVec<[Option<NodeId>; 4]>,
    evaluation: Evaluation,
    /// True if `evaluation` holds a value this node produced and must
    /// dispose.
    owned: bool,
    disposes: Verdict,
    ref_count: usize,
    /// One entry per acquisition by a parent.
    parents: SmallVec<[NodeId; 2]>,
    subscription: Option<Subscription>,
    watchers: Vec<Weak<HandleShared>>,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Default)]
pub(crate) struct Graph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    cache: FxHashMap<ShapeKey, NodeId>,
}

impl Graph {
    fn node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    fn insert(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn remove(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    fn evaluation_of(&self, id: Option<NodeId>) -> Evaluation {
        id.and_then(|id| self.node(id))
            .map(|node| node.evaluation.clone())
            .unwrap_or_default()
    }

    // Acquisition

    /// Acquire the node for `expr`, building it (and its eager operands) if
    /// it is not cached.
    pub(crate) fn acquire(
        &mut self,
        cx: &Cx<'_>,
        template: &Arc<Template>,
        expr: ExprId,
        effects: &mut Effects,
    ) -> Result<NodeId, ObserveError> {
        ensure_sufficient_stack(|| self.acquire_inner(cx, template, expr, effects))
    }

    fn acquire_inner(
        &mut self,
        cx: &Cx<'_>,
        template: &Arc<Template>,
        expr: ExprId,
        effects: &mut Effects,
    ) -> Result<NodeId, ObserveError> {
        let key = template
            .diagram
            .subkey(expr)
            .ok_or(ObserveError::InvalidExpression(ShapeError::DanglingExpr(expr)))?;

        if let Some(&id) = self.cache.get(&key) {
            if let Some(node) = self.node_mut(id) {
                node.ref_count += 1;
                tracing::trace!(?id, kind = node.kind.name(), refs = node.ref_count, "cache hit");
                return Ok(id);
            }
        }

        let Blueprint { kind, operands } = blueprint(&template.lambda, &template.args, expr)?;
        let disposes = cx.options.disposal_policy().should_dispose(&kind, &key);
        let eager = if kind.is_short_circuit() {
            operands.len().min(1)
        } else {
            operands.len()
        };
        let name = kind.name();
        let node = Node {
            key: key.clone(),
            kind,
            template: Arc::clone(template),
            children: smallvec![None; operands.len()],
            operands,
            evaluation: Evaluation::default(),
            owned: false,
            disposes,
            ref_count: 1,
            parents: SmallVec::new(),
            subscription: None,
            watchers: Vec::new(),
        };
        let id = self.insert(node);
        self.cache.insert(key, id);
        cx.live.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(?id, kind = name, "node created");

        for slot in 0..eager {
            if let Err(err) = self.attach(cx, id, slot, effects) {
                self.release(cx, id, effects);
                return Err(err);
            }
        }
        self.refresh(cx, id, effects);
        Ok(id)
    }

    /// Materialize operand `slot` of `parent`.
    fn attach(
        &mut self,
        cx: &Cx<'_>,
        parent: NodeId,
        slot: usize,
        effects: &mut Effects,
    ) -> Result<NodeId, ObserveError> {
        let (template, expr) = match self.node(parent) {
            Some(node) => {
                if let Some(child) = node.children[slot] {
                    return Ok(child);
                }
                (Arc::clone(&node.template), node.operands[slot])
            }
            None => return Err(ObserveError::InvalidExpression(ShapeError::DanglingExpr(ExprId::INVALID))),
        };
        let child = self.acquire(cx, &template, expr, effects)?;
        if let Some(node) = self.node_mut(child) {
            node.parents.push(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children[slot] = Some(child);
        }
        Ok(child)
    }

    /// Release operand `slot` of `parent` if it is materialized.
    fn detach(&mut self, cx: &Cx<'_>, parent: NodeId, slot: usize, effects: &mut Effects) {
        let Some(child) = self.node_mut(parent).and_then(|node| node.children[slot].take()) else {
            return;
        };
        self.unlink(child, parent);
        self.release(cx, child, effects);
    }

    fn unlink(&mut self, child: NodeId, parent: NodeId) {
        if let Some(node) = self.node_mut(child) {
            if let Some(pos) = node.parents.iter().position(|p| *p == parent) {
                node.parents.swap_remove(pos);
            }
        }
    }

    // Release

    /// Drop one reference to `id`, tearing it down at zero.
    pub(crate) fn release(&mut self, cx: &Cx<'_>, id: NodeId, effects: &mut Effects) {
        ensure_sufficient_stack(|| {
            let Some(node) = self.node_mut(id) else {
                return;
            };
            node.ref_count = node.ref_count.saturating_sub(1);
            if node.ref_count == 0 {
                self.teardown(cx, id, effects);
            }
        });
    }

    fn teardown(&mut self, cx: &Cx<'_>, id: NodeId, effects: &mut Effects) {
        let Some(node) = self.remove(id) else {
            return;
        };
        if self.cache.get(&node.key) == Some(&id) {
            self.cache.remove(&node.key);
            cx.live.fetch_sub(1, Ordering::Relaxed);
        }
        tracing::debug!(?id, kind = node.kind.name(), "node torn down");

        if let Some(subscription) = node.subscription {
            subscription.cancel();
        }
        if node.owned {
            if let Evaluation::Value(value) = &node.evaluation {
                effects.disposals.push(value.clone());
            }
        }
        for child in node.children.into_iter().flatten() {
            self.unlink(child, id);
            self.release(cx, child, effects);
        }
    }

    // Evaluation

    /// Re-evaluate `id`, then every ancestor whose evaluation is affected.
    pub(crate) fn propagate(&mut self, cx: &Cx<'_>, id: NodeId, effects: &mut Effects) {
        ensure_sufficient_stack(|| {
            if !self.refresh(cx, id, effects) {
                return;
            }
            let Some(node) = self.node(id) else {
                return;
            };
            let mut parents = node.parents.clone();
            parents.sort_unstable();
            parents.dedup();
            for parent in parents {
                if self.node(parent).is_some() {
                    self.propagate(cx, parent, effects);
                }
            }
        });
    }

    /// Re-evaluate `id` from its operands. Returns true if the evaluation
    /// changed.
    fn refresh(&mut self, cx: &Cx<'_>, id: NodeId, effects: &mut Effects) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let kind = node.kind.clone();
        let verdict = node.disposes;
        tracing::trace!(?id, kind = kind.name(), "refresh");

        let (outcome, target) = if kind.is_short_circuit() {
            (self.refresh_short_circuit(cx, id, &kind, effects), None)
        } else {
            let inputs: SmallVec<[Evaluation; 4]> = node
                .children
                .iter()
                .map(|child| self.evaluation_of(*child))
                .collect();
            let target = inputs.first().and_then(Evaluation::value).cloned();
            (eval::evaluate(&kind, &inputs), target)
        };

        let Outcome {
            evaluation,
            owned,
            dependency,
            discarded,
        } = outcome;
        let policy = cx.options.disposal_policy();
        if let Some(value) = discarded {
            if policy.matches_value(&kind, verdict, target.as_ref(), &value) {
                effects.disposals.push(value);
            }
        }
        let owned = owned
            && evaluation
                .value()
                .is_some_and(|value| policy.matches_value(&kind, verdict, target.as_ref(), value));
        self.resubscribe(cx, id, dependency);
        self.set_evaluation(id, evaluation, owned, effects)
    }

    fn refresh_short_circuit(
        &mut self,
        cx: &Cx<'_>,
        id: NodeId,
        kind: &NodeKind,
        effects: &mut Effects,
    ) -> Outcome {
        let (first, count) = match self.node(id) {
            Some(node) => (self.evaluation_of(node.children[0]), node.operands.len()),
            None => return Outcome::passed(Evaluation::default()),
        };
        match eval::choose(kind, &first) {
            Branch::Done(outcome) => {
                for slot in 1..count {
                    self.detach(cx, id, slot, effects);
                }
                outcome
            }
            Branch::Follow(wanted) => {
                // Acquire before releasing, so an operand shared by both
                // branches survives the switch.
                let attached = self.attach(cx, id, wanted, effects);
                for slot in (1..count).filter(|slot| *slot != wanted) {
                    self.detach(cx, id, slot, effects);
                }
                match attached {
                    Ok(child) => eval::follow(kind, &self.evaluation_of(Some(child))),
                    Err(err) => Outcome::passed(Evaluation::from_result(Err(EvalError::new(
                        err.to_string(),
                    )))),
                }
            }
        }
    }

    fn resubscribe(&mut self, cx: &Cx<'_>, id: NodeId, dependency: Option<Dependency>) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        if let (Some(current), Some(wanted)) = (&node.subscription, &dependency) {
            if current.serves(wanted) {
                return;
            }
        }
        if let Some(stale) = node.subscription.take() {
            stale.cancel();
        }
        node.subscription =
            dependency.map(|dependency| subscriber::subscribe(&cx.registry, id, dependency, cx.options));
    }

    /// Store a new evaluation. Disposes the superseded value if this node
    /// owned it and queues change events for watching handles.
    ///
    /// `owned` is true if the node must dispose `evaluation` once it is
    /// superseded.
    fn set_evaluation(
        &mut self,
        id: NodeId,
        evaluation: Evaluation,
        owned: bool,
        effects: &mut Effects,
    ) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        let unchanged = node.evaluation.same(&evaluation);
        let previous = mem::replace(&mut node.evaluation, evaluation.clone());
        let previously_owned = mem::replace(&mut node.owned, owned);
        if unchanged {
            return false;
        }

        if previously_owned {
            if let Evaluation::Value(old) = &previous {
                effects.disposals.push(old.clone());
            }
        }

        node.watchers
            .retain(|watcher| watcher.upgrade().is_some_and(|handle| handle.is_active()));
        for watcher in &node.watchers {
            let Some(handle) = watcher.upgrade() else {
                continue;
            };
            handle.set_current(evaluation.clone());
            effects.events.push((
                handle,
                EvaluationChanged {
                    previous: previous.clone(),
                    current: evaluation.clone(),
                },
            ));
        }
        true
    }

    // Handles

    /// Attach a handle to `id` and seed its current evaluation.
    pub(crate) fn watch(&mut self, id: NodeId, handle: &Arc<HandleShared>) {
        if let Some(node) = self.node_mut(id) {
            node.watchers.push(Arc::downgrade(handle));
            handle.set_current(node.evaluation.clone());
        }
    }

    pub(crate) fn unwatch(&mut self, id: NodeId, handle: &Arc<HandleShared>) {
        if let Some(node) = self.node_mut(id) {
            node.watchers
                .retain(|watcher| !std::ptr::eq(watcher.as_ptr(), Arc::as_ptr(handle)));
        }
    }
}
