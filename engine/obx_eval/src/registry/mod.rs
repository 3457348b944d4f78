//! The observer registry.
//!
//! [`Registry::observe`] maps a lambda and its arguments to a shared,
//! reference-counted node and returns an [`Observation`] handle over it.
//! Structurally identical observations (same shape, same arguments) share
//! one node, and so one evaluation and one set of subscriptions.
//!
//! # Locking
//!
//! One re-entrant lock serializes every graph mutation. A change handler
//! runs on the thread that raised the change; if that thread is already
//! inside the graph (a getter raised a change while being evaluated), the
//! refresh is queued and drained, in arrival order, before the outer call
//! returns. Disposals and listener callbacks run under the lock but outside
//! the graph borrow, so they may re-enter the registry.

mod graph;
mod handle;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use obx_ir::{Diagram, Lambda};
use obx_value::{DisposalTask, Value};
use parking_lot::{Mutex, ReentrantMutex};

use crate::disposal::{dispose_value, Disposed};
use crate::errors::{DisposalError, ObserveError};
use crate::node;
use crate::options::Options;

use graph::{Cx, Effects, Graph, Template};
use handle::HandleShared;

pub use handle::{Listener, ListenerId, Observation};

/// Generational index of a node in the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId {
    index: u32,
    generation: u32,
}

/// Work that arrived while the graph was borrowed.
enum Pending {
    Refresh(NodeId),
    Release(NodeId),
}

struct Engine {
    graph: RefCell<Graph>,
    deferred: RefCell<VecDeque<Pending>>,
}

/// An asynchronous disposal still running after its value was released.
struct Detached {
    type_name: String,
    task: DisposalTask,
}

/// State shared by the registry, its observations and its change handlers.
pub(crate) struct Shared {
    engine: ReentrantMutex<Engine>,
    options: Arc<Options>,
    live: AtomicUsize,
    detached: Mutex<Vec<Detached>>,
}

impl Shared {
    /// Run `f` against the graph, then apply its effects and drain deferred
    /// work. Returns `None` if the calling thread is already inside the
    /// graph.
    fn session<R>(
        self: &Arc<Self>,
        f: impl FnOnce(&mut Graph, &Cx<'_>, &mut Effects) -> R,
    ) -> Option<(R, Result<(), DisposalError>)> {
        let engine = self.engine.lock();
        let cx = self.cx();
        let mut effects = Effects::default();
        let out = {
            let mut graph = engine.graph.try_borrow_mut().ok()?;
            f(&mut graph, &cx, &mut effects)
        };
        let mut result = self.apply(effects);
        keep_first(&mut result, self.drain(&engine, &cx));
        Some((out, result))
    }

    fn cx(self: &Arc<Self>) -> Cx<'_> {
        Cx {
            options: &self.options,
            live: &self.live,
            registry: Arc::downgrade(self),
        }
    }

    fn defer(&self, pending: Pending) {
        self.engine.lock().deferred.borrow_mut().push_back(pending);
    }

    fn drain(&self, engine: &Engine, cx: &Cx<'_>) -> Result<(), DisposalError> {
        let mut result = Ok(());
        loop {
            let Some(pending) = engine.deferred.borrow_mut().pop_front() else {
                break;
            };
            let mut effects = Effects::default();
            {
                let Ok(mut graph) = engine.graph.try_borrow_mut() else {
                    engine.deferred.borrow_mut().push_front(pending);
                    break;
                };
                match pending {
                    Pending::Refresh(id) => {
                        tracing::trace!(?id, "draining deferred refresh");
                        graph.propagate(cx, id, &mut effects);
                    }
                    Pending::Release(id) => graph.release(cx, id, &mut effects),
                }
            }
            keep_first(&mut result, self.apply(effects));
        }
        result
    }

    /// Deliver events, then release disposed values.
    fn apply(&self, effects: Effects) -> Result<(), DisposalError> {
        for (handle, event) in effects.events {
            handle.emit(&event);
        }
        let mut result = Ok(());
        for value in effects.disposals {
            match dispose_value(&value, self.options.disposal_mode()) {
                Ok(Disposed::Done) => {}
                Ok(Disposed::Detached(type_name, task)) => {
                    self.detached.lock().push(Detached { type_name, task });
                }
                Err(err) => keep_first(&mut result, Err(err)),
            }
        }
        self.reap();
        result
    }

    /// Forget finished asynchronous disposals, logging failures.
    fn reap(&self) -> usize {
        let mut detached = self.detached.lock();
        detached.retain(|entry| match entry.task.try_wait() {
            None => true,
            Some(Ok(())) => false,
            Some(Err(err)) => {
                tracing::warn!(type_name = %entry.type_name, %err, "asynchronous disposal failed");
                false
            }
        });
        detached.len()
    }

    /// Re-evaluate `node` after a change notification.
    pub(crate) fn refresh(self: &Arc<Self>, node: NodeId) -> Result<(), DisposalError> {
        match self.session(|graph, cx, effects| graph.propagate(cx, node, effects)) {
            Some(((), result)) => result,
            None => {
                tracing::trace!(?node, "refresh deferred");
                self.defer(Pending::Refresh(node));
                Ok(())
            }
        }
    }

    /// Release the reference an observation holds on `root`.
    fn release(self: &Arc<Self>, root: NodeId, handle: &Arc<HandleShared>) -> Result<(), DisposalError> {
        let session = self.session(|graph, cx, effects| {
            graph.unwatch(root, handle);
            graph.release(cx, root, effects);
        });
        match session {
            Some(((), result)) => result,
            None => {
                self.defer(Pending::Release(root));
                Ok(())
            }
        }
    }
}

/// Keep the first error of a sequence, logging later ones.
fn keep_first(result: &mut Result<(), DisposalError>, next: Result<(), DisposalError>) {
    if let Err(err) = next {
        if result.is_ok() {
            *result = Err(err);
        } else {
            tracing::warn!(%err, "additional disposal failure");
        }
    }
}

/// Registry of observable expressions.
///
/// Cloning a registry shares it.
#[derive(Clone)]
pub struct Registry {
    shared: Arc<Shared>,
}

impl Registry {
    pub fn new(options: Options) -> Self {
        Registry {
            shared: Arc::new(Shared {
                engine: ReentrantMutex::new(Engine {
                    graph: RefCell::new(Graph::default()),
                    deferred: RefCell::new(VecDeque::new()),
                }),
                options: Arc::new(options),
                live: AtomicUsize::new(0),
                detached: Mutex::new(Vec::new()),
            }),
        }
    }

    #[inline]
    pub fn options(&self) -> &Options {
        &self.shared.options
    }

    /// Observe `lambda` applied to `args`.
    ///
    /// The returned handle holds one reference on the shared root node until
    /// it is disposed or dropped.
    #[tracing::instrument(level = "debug", skip_all, fields(arity = lambda.arity()))]
    pub fn observe(&self, lambda: &Lambda, args: &[Value]) -> Result<Observation, ObserveError> {
        if args.len() != lambda.arity() {
            return Err(ObserveError::ArgumentCount {
                expected: lambda.arity(),
                got: args.len(),
            });
        }
        let lambda = match self.shared.options.optimizer() {
            Some(optimizer) => optimizer.optimize(lambda),
            None => lambda.clone(),
        };
        let diagram = Diagram::bind(&lambda, args)?;
        node::check(&lambda, args)?;

        let expression = lambda.to_string();
        let template = Arc::new(Template {
            lambda,
            diagram,
            args: args.to_vec(),
        });
        let handle = Arc::new(HandleShared::new());

        let session = self.shared.session(|graph, cx, effects| {
            let root = graph.acquire(cx, &template, template.lambda.body(), effects)?;
            graph.watch(root, &handle);
            Ok::<_, ObserveError>(root)
        });
        let Some((root, disposal)) = session else {
            return Err(ObserveError::Reentrant);
        };
        let observation = Observation::new(Arc::clone(&self.shared), root?, handle, expression);
        tracing::debug!(
            expression = observation.expression(),
            cached = self.cached_observations(),
            "observing"
        );
        disposal?;
        Ok(observation)
    }

    /// Number of live cache entries (one per node).
    pub fn cached_observations(&self) -> usize {
        self.shared.live.load(Ordering::Relaxed)
    }

    /// Number of asynchronous disposals started but not yet finished.
    pub fn pending_disposals(&self) -> usize {
        self.shared.reap()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new(Options::default())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("cached_observations", &self.cached_observations())
            .field("options", &self.shared.options)
            .finish()
    }
}
