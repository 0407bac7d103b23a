// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental flattening of a composed tree.
//!
//! A [`SceneGraphCache`] keeps, for one cache root:
//!
//! - `nodes`: every composed descendant of the root (root included) in
//!   composed pre-order.
//! - A subtree range per node: the node's own index and one past its last
//!   composed descendant. Subtree ranges nest, so a node's composed subtree
//!   is always a contiguous slice of `nodes`.
//! - Per registered pass, a [`CommandSpan`] per node locating the node's own
//!   pre and post commands and its descendants' commands in that pass's
//!   flattened command buffer.
//!
//! Structural edits are reported with
//! [`invalidated_subtree`](SceneGraphCache::invalidated_subtree) and queued as
//! *dirty roots*. [`build`](SceneGraphCache::build) re-walks only those
//! subtrees, splices the result into the tables, and shifts everything after
//! the splice. Same-shape command edits go through
//! [`invalidated_commands`](SceneGraphCache::invalidated_commands) and avoid
//! the re-walk when no count changed.

mod build;
mod range;

pub use range::{CommandRange, CommandSpan};

use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use understory_dirty::{CycleHandling, DirtyTracker};

use crate::command::CommandFilter;
use crate::dirty::{self, DirtState};
use crate::node::{INVALID, NodeId, SceneTree};

/// The set of changes produced by a single [`SceneGraphCache::build`] call.
#[derive(Clone, Debug, Default)]
pub struct BuildChanges {
    /// Subtrees that were re-walked and spliced, in flattened order.
    pub rebuilt: Vec<NodeId>,
    /// Nodes whose own commands changed while every range stayed the same.
    pub commands: Vec<NodeId>,
    /// Whether the flattened node list or any command span changed.
    pub structure_changed: bool,
}

impl BuildChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.rebuilt.clear();
        self.commands.clear();
        self.structure_changed = false;
    }

    /// Returns `true` if the build changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rebuilt.is_empty() && self.commands.is_empty() && !self.structure_changed
    }
}

/// Flattened composed pre-order of a subtree, with per-pass command ranges.
///
/// The cache does not own the tree. Every method that needs to look at the
/// tree takes it explicitly, and the caller is responsible for reporting
/// every edit below the cache root before the next
/// [`build`](Self::build).
#[derive(Debug)]
pub struct SceneGraphCache {
    pub(crate) root: NodeId,
    pub(crate) passes: Vec<CommandFilter>,

    // Flattened order, indexed by position.
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) subtree_end: Vec<u32>,
    /// One span table per pass, aligned with `nodes`.
    pub(crate) spans: Vec<Vec<CommandSpan>>,

    /// Position of each node slot in `nodes`, or [`INVALID`].
    pub(crate) position: Vec<u32>,

    pub(crate) dirty_roots: Vec<NodeId>,
    pub(crate) commands: DirtyTracker<u32>,
    pub(crate) build_index: u64,
}

impl SceneGraphCache {
    /// Creates a cache flattening the composed subtree of `root` for the
    /// given passes.
    ///
    /// The cache starts out dirty: the first [`build`](Self::build) walks
    /// the whole subtree.
    #[must_use]
    pub fn new(root: NodeId, passes: &[CommandFilter]) -> Self {
        Self {
            root,
            passes: passes.to_vec(),
            nodes: Vec::new(),
            subtree_end: Vec::new(),
            spans: vec![Vec::new(); passes.len()],
            position: Vec::new(),
            dirty_roots: vec![root],
            commands: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            build_index: 0,
        }
    }

    // -- Invalidation API --

    /// Reports a structural change below `node`: children inserted, removed
    /// or moved, a shadow root or slot set, or commands edited so that a
    /// per-pass count may have changed.
    ///
    /// Moving a node requires invalidating both its old and its new parent.
    ///
    /// If `node` or one of its composed ancestors is already queued, the
    /// pending rebuild covers this change and nothing is queued. Otherwise
    /// `node` becomes a dirty root, replacing any queued roots below it.
    /// Nodes outside the cache root are ignored.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn invalidated_subtree<T>(&mut self, tree: &mut SceneTree<T>, node: NodeId) {
        tree.validate(node);
        let i = node.idx;
        if !tree.is_composed_ancestor_or_self(self.root.idx, i) {
            return;
        }
        let queued = self.dirty_roots.contains(&node);
        tree.dirt[i as usize].insert(DirtState::SUBTREE);
        if queued || self.is_covered(tree, i) {
            return;
        }
        self.dirty_roots
            .retain(|r| tree.is_alive(*r) && !tree.is_composed_ancestor_or_self(i, r.idx));
        self.dirty_roots.push(node);
    }

    /// Reports an edit of `node`'s own command list that did not touch the
    /// tree structure.
    ///
    /// At the next build the node's per-pass counts are compared with the
    /// cached spans. Unchanged counts leave every range valid and the node is
    /// only listed in [`BuildChanges::commands`]; changed counts promote the
    /// node to a dirty root.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn invalidated_commands<T>(&mut self, tree: &mut SceneTree<T>, node: NodeId) {
        tree.validate(node);
        tree.dirt[node.idx as usize].insert(DirtState::COMMANDS);
        self.commands.mark(node.idx, dirty::COMMANDS);
    }

    /// Whether a strict composed ancestor of `n` is a queued dirty root.
    ///
    /// `SUBTREE` only narrows the search. A flag can outlive its queue entry
    /// when the node was moved out of a queued subtree before the build.
    fn is_covered<T>(&self, tree: &SceneTree<T>, n: u32) -> bool {
        if n != self.root.idx {
            let mut a = tree.composed_parent_raw(n);
            while a != INVALID {
                if tree.dirt[a as usize].contains(DirtState::SUBTREE)
                    && self.dirty_roots.contains(&tree.handle(a))
                {
                    return true;
                }
                if a == self.root.idx {
                    break;
                }
                a = tree.composed_parent_raw(a);
            }
        }
        // A fresh or cleared cache rebuilds everything.
        self.nodes.is_empty() && self.dirty_roots.contains(&self.root)
    }

    // -- Query API --

    /// Returns the cache root.
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the registered passes in registration order.
    #[inline]
    #[must_use]
    pub fn passes(&self) -> &[CommandFilter] {
        &self.passes
    }

    /// Returns the flattened composed pre-order.
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Number of flattened nodes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing has been flattened yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of completed builds that did some work.
    #[inline]
    #[must_use]
    pub fn build_index(&self) -> u64 {
        self.build_index
    }

    /// Returns the flattened index of `node`, if present.
    #[must_use]
    pub fn index_of(&self, node: NodeId) -> Option<u32> {
        let pos = *self.position.get(node.idx as usize)?;
        if pos != INVALID && self.nodes.get(pos as usize) == Some(&node) {
            Some(pos)
        } else {
            None
        }
    }

    /// Whether `node` is in the flattened list.
    #[inline]
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.index_of(node).is_some()
    }

    /// Returns the half-open range of flattened indices covered by `node`'s
    /// composed subtree, starting at `node` itself.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not in the flattened list.
    #[must_use]
    pub fn subtree_range(&self, node: NodeId) -> Range<u32> {
        let pos = self.expect_index(node);
        pos..self.subtree_end[pos as usize]
    }

    /// Returns `node`'s command span in `pass`.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not in the flattened list or `pass` was not
    /// registered.
    #[must_use]
    pub fn command_span(&self, node: NodeId, pass: CommandFilter) -> CommandSpan {
        let p = self.pass_index(pass);
        let pos = self.expect_index(node);
        self.spans[p][pos as usize]
    }

    /// Returns `node`'s command range in `pass` in compact form.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not in the flattened list or `pass` was not
    /// registered.
    #[must_use]
    pub fn command_range(&self, node: NodeId, pass: CommandFilter) -> CommandRange {
        self.command_span(node, pass).to_range()
    }

    /// Returns the whole command range of `pass`: the root's total extent.
    ///
    /// # Panics
    ///
    /// Panics if `pass` was not registered.
    #[must_use]
    pub fn pass_range(&self, pass: CommandFilter) -> Range<u32> {
        let p = self.pass_index(pass);
        self.spans[p].first().map_or(0..0, |s| s.total())
    }

    /// Returns the span table of `pass`, aligned with [`nodes`](Self::nodes).
    ///
    /// # Panics
    ///
    /// Panics if `pass` was not registered.
    #[must_use]
    pub fn spans(&self, pass: CommandFilter) -> &[CommandSpan] {
        &self.spans[self.pass_index(pass)]
    }

    /// Returns the subtree end of every flattened node, aligned with
    /// [`nodes`](Self::nodes).
    #[inline]
    #[must_use]
    pub fn subtree_ends(&self) -> &[u32] {
        &self.subtree_end
    }

    /// Returns the queued dirty roots.
    #[inline]
    #[must_use]
    pub fn dirty_roots(&self) -> &[NodeId] {
        &self.dirty_roots
    }

    /// Whether a subtree rebuild is pending.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty_roots.is_empty()
    }

    /// Forgets the flattened state. The next build walks the whole subtree.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.subtree_end.clear();
        for table in &mut self.spans {
            table.clear();
        }
        self.position.fill(INVALID);
        self.dirty_roots.clear();
        self.dirty_roots.push(self.root);
    }

    // -- Internal helpers --

    pub(crate) fn pass_index(&self, pass: CommandFilter) -> usize {
        match self.passes.iter().position(|p| *p == pass) {
            Some(p) => p,
            None => panic!("pass {pass:?} is not registered with this cache"),
        }
    }

    fn expect_index(&self, node: NodeId) -> u32 {
        match self.index_of(node) {
            Some(pos) => pos,
            None => panic!("node {node:?} is not in the flattened list"),
        }
    }
}
