//! Dependency subscriptions.
//!
//! A node that reads from a host object subscribes to the object's change
//! notifiers and re-evaluates when a relevant change arrives. Each relevant
//! notification triggers exactly one re-evaluation.
//!
//! Handlers hold the registry weakly: a handler that outlives its registry
//! does nothing.

use std::sync::{Arc, Weak};

use obx_ir::Name;
use obx_value::{Change, ChangeHandler, ChangeNotifier, EvalError, HandlerId, ObjectRef, Value};
use smallvec::SmallVec;

use crate::options::Options;
use crate::registry::{NodeId, Shared};

/// Property name raised by hosts whose indexer results changed.
pub const INDEXER_PROPERTY: &str = "[]";

/// Which changes a node reacts to.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Interest {
    /// One named member.
    Member(Name),
    /// Indexer reads. A dictionary change only matters when it touches `key`.
    Index { key: Option<Value> },
    /// Method calls: any property or collection change.
    Any,
}

impl Interest {
    fn matches(&self, change: &Change, ignored: &[Arc<str>]) -> bool {
        if let Change::Property(name) = change {
            if ignored.iter().any(|ignored| ignored == name) {
                return false;
            }
        }
        match self {
            Interest::Member(member) => change.affects_property(member.as_str()),
            Interest::Index { key } => match change {
                Change::Property(name) => &**name == INDEXER_PROPERTY,
                Change::AllProperties | Change::Collection(_) => true,
                Change::Dictionary(change) => key.as_ref().map_or(true, |key| change.affects_key(key)),
            },
            Interest::Any => true,
        }
    }

    fn wants_collection_changes(&self) -> bool {
        !matches!(self, Interest::Member(_))
    }
}

/// An object a node depends on and how.
#[derive(Clone, Debug)]
pub(crate) struct Dependency {
    pub target: ObjectRef,
    pub interest: Interest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Channel {
    Properties,
    Collection,
}

fn notifier(target: &ObjectRef, channel: Channel) -> Option<&ChangeNotifier> {
    match channel {
        Channel::Properties => target.property_changes(),
        Channel::Collection => target.collection_changes(),
    }
}

/// Live handlers attached for one [`Dependency`].
#[derive(Debug)]
pub(crate) struct Subscription {
    dependency: Dependency,
    tokens: SmallVec<[(Channel, HandlerId); 2]>,
}

impl Subscription {
    /// True if this subscription already serves `dependency`.
    pub(crate) fn serves(&self, dependency: &Dependency) -> bool {
        std::ptr::addr_eq(
            Arc::as_ptr(&self.dependency.target),
            Arc::as_ptr(&dependency.target),
        ) && self.dependency.interest == dependency.interest
    }

    /// Detach every handler.
    pub(crate) fn cancel(self) {
        for (channel, id) in self.tokens {
            if let Some(notifier) = notifier(&self.dependency.target, channel) {
                notifier.unsubscribe(id);
            }
        }
    }
}

/// Attach the handlers `dependency` calls for on behalf of `node`.
pub(crate) fn subscribe(
    registry: &Weak<Shared>,
    node: NodeId,
    dependency: Dependency,
    options: &Options,
) -> Subscription {
    let mut tokens = SmallVec::new();

    if let Interest::Member(member) = &dependency.interest {
        if options.is_ignored(&*dependency.target, member.as_str()) {
            tracing::trace!(member = member.as_str(), "ignored property, not subscribing");
            return Subscription { dependency, tokens };
        }
    }

    let ignored: Arc<[Arc<str>]> = options.ignored_for(&*dependency.target).into();
    let mut channels: SmallVec<[Channel; 2]> = SmallVec::new();
    channels.push(Channel::Properties);
    if dependency.interest.wants_collection_changes() {
        channels.push(Channel::Collection);
    }

    for channel in channels {
        let Some(notifier) = notifier(&dependency.target, channel) else {
            continue;
        };
        let handler = handler(
            Weak::clone(registry),
            node,
            dependency.interest.clone(),
            Arc::clone(&ignored),
        );
        tokens.push((channel, notifier.subscribe(handler)));
    }

    Subscription { dependency, tokens }
}

fn handler(
    registry: Weak<Shared>,
    node: NodeId,
    interest: Interest,
    ignored: Arc<[Arc<str>]>,
) -> ChangeHandler {
    Arc::new(move |change: &Change| -> Result<(), EvalError> {
        if !interest.matches(change, &ignored) {
            return Ok(());
        }
        let Some(registry) = registry.upgrade() else {
            return Ok(());
        };
        registry.refresh(node).map_err(EvalError::from)
    })
}
