// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Light-tree traversal utilities.

use super::id::{INVALID, NodeId};
use super::store::SceneTree;

/// An iterator over the light children of a node.
///
/// Created by [`SceneTree::children`].
#[derive(Debug)]
pub struct Children<'a, T> {
    tree: &'a SceneTree<T>,
    current: u32,
}

impl<'a, T> Children<'a, T> {
    pub(crate) fn new(tree: &'a SceneTree<T>, first: u32) -> Self {
        Self {
            tree,
            current: first,
        }
    }
}

impl<T> Iterator for Children<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.tree.next_sibling[idx as usize];
        Some(self.tree.handle(idx))
    }
}

/// Pre-order walk over the light descendants of a root, root excluded.
///
/// Shadow subtrees are not entered; see
/// [`CompositeTraversal`](super::CompositeTraversal) for the composed walk.
/// The walk holds no stack: it follows parent and sibling links, bounded by
/// the root.
///
/// Created by [`SceneTree::traverse`].
#[derive(Debug)]
pub struct Traversal<'a, T> {
    tree: &'a SceneTree<T>,
    root: u32,
    current: u32,
    started: bool,
    skip: bool,
}

impl<'a, T> Traversal<'a, T> {
    pub(crate) fn new(tree: &'a SceneTree<T>, root: u32) -> Self {
        Self {
            tree,
            root,
            current: INVALID,
            started: false,
            skip: false,
        }
    }

    /// Returns the node most recently yielded.
    #[must_use]
    pub fn current(&self) -> Option<NodeId> {
        (self.current != INVALID).then(|| self.tree.handle(self.current))
    }

    /// Prunes the subtree of the node most recently yielded.
    ///
    /// The next call to [`next`](Iterator::next) resumes at that node's next
    /// sibling, or further up if it has none.
    pub fn skip_to_next_sibling(&mut self) {
        self.skip = true;
    }

    fn advance(&self, from: u32) -> u32 {
        let tree = self.tree;
        let mut n = from;
        while n != self.root {
            let next = tree.next_sibling[n as usize];
            if next != INVALID {
                return next;
            }
            n = tree.parent[n as usize];
        }
        INVALID
    }
}

impl<T> Iterator for Traversal<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let next = if !self.started {
            self.started = true;
            self.tree.first_child[self.root as usize]
        } else if self.current == INVALID {
            return None;
        } else {
            let first = self.tree.first_child[self.current as usize];
            if !self.skip && first != INVALID {
                first
            } else {
                self.advance(self.current)
            }
        };
        self.skip = false;
        self.current = next;
        self.current()
    }
}
