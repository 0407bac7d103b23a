// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composed-tree navigation and the resumable composite traversal.
//!
//! The *composed children* of a node are its shadow root (if any) followed by
//! its light children. When the node is a host with a designated slot, its
//! light children are composed under the slot instead, after the slot's own
//! light children, and the host's composed children reduce to its shadow
//! root.

use alloc::vec::Vec;

use super::id::{INVALID, NodeId};
use super::store::SceneTree;

impl<T> SceneTree<T> {
    /// Returns the composed parent of a node: the host for a shadow root, the
    /// slot for a projected child, the light parent otherwise.
    #[must_use]
    pub fn composed_parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.composed_parent_raw(id.idx);
        (p != INVALID).then(|| self.handle(p))
    }

    /// Returns the first composed child of a node.
    #[must_use]
    pub fn composed_first_child(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let c = self.composed_first_raw(id.idx);
        (c != INVALID).then(|| self.handle(c))
    }

    /// Returns the next composed sibling of a node.
    #[must_use]
    pub fn composed_next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.composed_parent_raw(id.idx);
        if p == INVALID {
            return None;
        }
        let n = self.composed_next_raw(p, id.idx);
        (n != INVALID).then(|| self.handle(n))
    }

    /// Returns the composed children of a node in composed order.
    #[must_use]
    pub fn composed_children(&self, id: NodeId) -> Vec<NodeId> {
        self.validate(id);
        let mut out = Vec::new();
        let mut c = self.composed_first_raw(id.idx);
        while c != INVALID {
            out.push(self.handle(c));
            c = self.composed_next_raw(id.idx, c);
        }
        out
    }

    /// Returns a composed pre-order walk below `root`.
    #[must_use]
    pub fn traverse_composed(&self, root: NodeId) -> CompositeTraversal<'_, T> {
        self.validate(root);
        CompositeTraversal::new(self, root.idx)
    }

    pub(crate) fn composed_parent_raw(&self, n: u32) -> u32 {
        let host = self.shadow_host[n as usize];
        if host != INVALID {
            return host;
        }
        let p = self.parent[n as usize];
        if p == INVALID {
            return INVALID;
        }
        let slot = self.slot[p as usize];
        if slot != INVALID { slot } else { p }
    }

    pub(crate) fn composed_first_raw(&self, n: u32) -> u32 {
        let root = self.shadow_root[n as usize];
        if root != INVALID {
            root
        } else {
            self.light_head(n)
        }
    }

    /// Next composed sibling of `cur` under its composed parent `p`.
    pub(crate) fn composed_next_raw(&self, p: u32, cur: u32) -> u32 {
        if cur == self.shadow_root[p as usize] {
            return self.light_head(p);
        }
        let next = self.next_sibling[cur as usize];
        if next != INVALID {
            return next;
        }
        if self.parent[cur as usize] == p {
            // Own light children exhausted; projected children follow.
            self.projected_head(p)
        } else {
            INVALID
        }
    }

    /// First light child composed under `n`, own children before projected.
    fn light_head(&self, n: u32) -> u32 {
        if self.slot[n as usize] == INVALID {
            let own = self.first_child[n as usize];
            if own != INVALID {
                return own;
            }
        }
        self.projected_head(n)
    }

    /// First light child of the host projected into slot `n`, if any.
    fn projected_head(&self, n: u32) -> u32 {
        let host = self.slot_host[n as usize];
        if host == INVALID {
            INVALID
        } else {
            self.first_child[host as usize]
        }
    }
}

/// One level of the composite walk: the composed parent and the child of it
/// currently being visited.
#[derive(Clone, Copy, Debug)]
struct Frame {
    parent: u32,
    node: u32,
}

/// Resumable composed pre-order walk.
///
/// Yields the composed descendants of a root, excluding the root itself but
/// starting with the root's own shadow root when it has one. The walk is an
/// explicit stack of [`Frame`]s so that it can be pruned mid-walk with
/// [`skip_to_next_sibling`](Self::skip_to_next_sibling) and resumed exactly
/// at the next composed sibling.
///
/// Created by [`SceneTree::traverse_composed`].
#[derive(Debug)]
pub struct CompositeTraversal<'a, T> {
    tree: &'a SceneTree<T>,
    root: u32,
    stack: Vec<Frame>,
    started: bool,
    skip: bool,
}

impl<'a, T> CompositeTraversal<'a, T> {
    pub(crate) fn new(tree: &'a SceneTree<T>, root: u32) -> Self {
        Self {
            tree,
            root,
            stack: Vec::new(),
            started: false,
            skip: false,
        }
    }

    /// Returns the node most recently yielded.
    #[must_use]
    pub fn current(&self) -> Option<NodeId> {
        self.stack.last().map(|f| self.tree.handle(f.node))
    }

    /// Returns the composed depth of the node most recently yielded; the
    /// root's composed children are at depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Abandons the rest of the current node's composed subtree.
    ///
    /// The next call to [`move_next`](Self::move_next) resumes at the current
    /// node's next composed sibling: for a shadow root that is its host's
    /// first light child, for a light child its next light sibling, and
    /// otherwise the walk backtracks as a normal depth-first walk would.
    pub fn skip_to_next_sibling(&mut self) {
        self.skip = true;
    }

    /// Advances the walk, returning the next composed descendant.
    pub fn move_next(&mut self) -> Option<NodeId> {
        let tree = self.tree;
        if !self.started {
            self.started = true;
            self.skip = false;
            let first = tree.composed_first_raw(self.root);
            if first == INVALID {
                return None;
            }
            self.stack.push(Frame {
                parent: self.root,
                node: first,
            });
            return self.current();
        }

        let top = *self.stack.last()?;
        if !core::mem::take(&mut self.skip) {
            let first = tree.composed_first_raw(top.node);
            if first != INVALID {
                self.stack.push(Frame {
                    parent: top.node,
                    node: first,
                });
                return self.current();
            }
        }

        while let Some(frame) = self.stack.last_mut() {
            let next = tree.composed_next_raw(frame.parent, frame.node);
            if next != INVALID {
                frame.node = next;
                return self.current();
            }
            self.stack.pop();
        }
        None
    }
}

impl<T> Iterator for CompositeTraversal<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.move_next()
    }
}
