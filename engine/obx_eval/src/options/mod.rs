//! Registry configuration.
//!
//! [`Options`] is immutable once built and shared by every node of a
//! registry. Use [`Options::builder`] to create one.

mod builder;

use std::fmt;
use std::sync::Arc;

use obx_value::{Object, QualifiedName};

use crate::disposal::{DisposalMode, DisposalPolicy};
use crate::optimizer::Optimizer;

pub use builder::OptionsBuilder;

/// A property whose change notifications are ignored on one type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IgnoredProperty {
    pub ty: QualifiedName,
    pub property: Arc<str>,
}

/// Registry configuration.
#[derive(Clone, Default)]
pub struct Options {
    ignored: Vec<IgnoredProperty>,
    policy: DisposalPolicy,
    mode: DisposalMode,
    optimizer: Option<Arc<dyn Optimizer>>,
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
    }

    #[inline]
    pub fn ignored_properties(&self) -> &[IgnoredProperty] {
        &self.ignored
    }

    #[inline]
    pub fn disposal_policy(&self) -> &DisposalPolicy {
        &self.policy
    }

    #[inline]
    pub fn disposal_mode(&self) -> DisposalMode {
        self.mode
    }

    #[inline]
    pub fn optimizer(&self) -> Option<&dyn Optimizer> {
        self.optimizer.as_deref()
    }

    /// True if changes of `property` on `object` are not reacted to.
    pub fn is_ignored(&self, object: &dyn Object, property: &str) -> bool {
        self.ignored
            .iter()
            .any(|entry| &*entry.property == property && object.is_instance_of(&entry.ty))
    }

    /// Every ignored property name that applies to `object`.
    pub(crate) fn ignored_for(&self, object: &dyn Object) -> Vec<Arc<str>> {
        self.ignored
            .iter()
            .filter(|entry| object.is_instance_of(&entry.ty))
            .map(|entry| Arc::clone(&entry.property))
            .collect()
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("ignored", &self.ignored)
            .field("policy", &self.policy)
            .field("mode", &self.mode)
            .field("optimizer", &self.optimizer.is_some())
            .finish()
    }
}
