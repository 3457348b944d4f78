//! Handles into a lambda's expression arena.

use std::fmt;

/// Index of one expression in its lambda's arena.
///
/// Only meaningful together with the lambda that issued it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ExprId(u32);

impl ExprId {
    /// Sentinel for "no expression".
    pub const INVALID: ExprId = ExprId(u32::MAX);

    #[inline]
    pub const fn new(index: u32) -> Self {
        ExprId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            f.write_str("ExprId::INVALID")
        } else {
            write!(f, "e{}", self.0)
        }
    }
}

impl Default for ExprId {
    fn default() -> Self {
        Self::INVALID
    }
}

/// A run of expression ids in the arena's shared list storage: call
/// arguments, index arguments, list items.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct ExprRange {
    pub start: u32,
    pub len: u32,
}

impl ExprRange {
    #[inline]
    pub const fn new(start: u32, len: u32) -> Self {
        ExprRange { start, len }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for ExprRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = u64::from(self.start) + u64::from(self.len);
        write!(f, "exprs[{}..{end}]", self.start)
    }
}

/// A run of `member = value` bindings of one member-init expression.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Debug)]
pub struct BindingRange {
    pub start: u32,
    pub len: u32,
}

impl BindingRange {
    #[inline]
    pub const fn new(start: u32, len: u32) -> Self {
        BindingRange { start, len }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}
