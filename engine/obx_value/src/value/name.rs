//! Qualified type and function names.

use std::fmt;
use std::sync::Arc;

/// A host type or function name, optionally instantiated with generic
/// arguments (`Pool<Int>`).
///
/// Generic matching is by definition: `Pool<Int>` is an instance of the
/// generic definition `Pool`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    name: Arc<str>,
    generic_args: Arc<[QualifiedName]>,
}

impl QualifiedName {
    /// A non-generic name.
    pub fn new(name: impl AsRef<str>) -> Self {
        QualifiedName {
            name: Arc::from(name.as_ref()),
            generic_args: Arc::from(Vec::new()),
        }
    }

    /// A generic instantiation such as `Pool<Int>`.
    pub fn generic(name: impl AsRef<str>, args: Vec<QualifiedName>) -> Self {
        QualifiedName {
            name: Arc::from(name.as_ref()),
            generic_args: Arc::from(args),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn generic_args(&self) -> &[QualifiedName] {
        &self.generic_args
    }

    #[inline]
    pub fn is_generic(&self) -> bool {
        !self.generic_args.is_empty()
    }

    /// The generic definition (the name with its arguments stripped).
    pub fn definition(&self) -> QualifiedName {
        QualifiedName {
            name: Arc::clone(&self.name),
            generic_args: Arc::from(Vec::new()),
        }
    }

    /// Check whether `self` satisfies `pattern`.
    ///
    /// An exact match always succeeds. With `include_generic_instances`, a
    /// pattern without arguments also matches every instantiation of the
    /// same definition.
    pub fn matches(&self, pattern: &QualifiedName, include_generic_instances: bool) -> bool {
        if self == pattern {
            return true;
        }
        include_generic_instances && !pattern.is_generic() && self.name == pattern.name
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some((first, rest)) = self.generic_args.split_first() {
            write!(f, "<{first}")?;
            for arg in rest {
                write!(f, ", {arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl fmt::Debug for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QualifiedName({self})")
    }
}

impl From<&str> for QualifiedName {
    fn from(name: &str) -> Self {
        QualifiedName::new(name)
    }
}
