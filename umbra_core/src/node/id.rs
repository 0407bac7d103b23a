// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational node handles.

use core::fmt;

/// Marks an absent link in the tree's index arrays.
pub const INVALID: u32 = u32::MAX;

/// A handle to a node in a [`SceneTree`](super::SceneTree).
///
/// Destroying a node advances its slot's generation, so a handle held past
/// the node's lifetime is refused by every tree operation, and it never
/// compares equal to the handle of a node later created in the same slot.
/// The same applies to handles stored in a
/// [`SceneGraphCache`](crate::cache::SceneGraphCache): a destroyed node's
/// entry is not found by `index_of` for its successor, and the next build
/// over the affected subtree drops it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Slot in the tree's arrays. Slots are reused; pair with
    /// [`generation`](Self::generation) to identify a node.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Slot generation; advanced when the slot is freed and again when it
    /// is reused.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;

    #[test]
    fn handles_differ_by_generation() {
        let a = NodeId {
            idx: 4,
            generation: 0,
        };
        let b = NodeId {
            idx: 4,
            generation: 2,
        };
        assert_ne!(a, b);
        assert_eq!(a.index(), b.index());
        assert_eq!(format!("{b:?}"), "NodeId(4@gen2)");
    }
}
