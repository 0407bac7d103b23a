// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty state and dirty-tracking channels.
//!
//! Every node carries a [`DirtState`] describing what the
//! [`SceneGraphCache`](crate::cache::SceneGraphCache) still has to recompute
//! for it:
//!
//! - [`DirtState::COMMANDS`]: only the node's own command list changed; the
//!   tree shape is untouched. If the per-pass command counts are unchanged the
//!   cached ranges stay valid and the node is merely reported back to the
//!   caller. If they changed, the node is promoted to a subtree rebuild.
//! - [`DirtState::SUBTREE`]: the node's composed subtree changed
//!   structurally (children inserted, removed or moved) or its total extent
//!   changed. The cache re-walks the subtree and splices the result.
//!
//! Commands-only marks are recorded in an [`understory_dirty`] tracker on the
//! [`COMMANDS`] channel. The channel is local-only: it has no dependency
//! edges and is drained once per build. Subtree marks live in the cache's own
//! dirty-root queue, which deduplicates against composed ancestors.

use understory_dirty::Channel;

bitflags::bitflags! {
    /// Pending recomputation for a node.
    ///
    /// The empty set means the node is clean.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DirtState: u8 {
        /// The node's own commands changed.
        const COMMANDS = 0b01;
        /// The node's composed subtree changed shape or extent.
        const SUBTREE = 0b10;
    }
}

/// Own command list edited without touching the tree structure.
pub const COMMANDS: Channel = Channel::new(0);
