// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Document order over a light tree.

use alloc::vec::Vec;
use core::cmp::Ordering;

use super::id::{INVALID, NodeId};
use super::store::SceneTree;

impl<T> SceneTree<T> {
    /// Compares two nodes of the same light tree in document order.
    ///
    /// Ancestors order before their descendants and earlier siblings before
    /// later siblings (and their subtrees).
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale or the nodes do not share a root.
    #[must_use]
    pub fn compare(&self, a: NodeId, b: NodeId) -> Ordering {
        self.validate(a);
        self.validate(b);
        if a == b {
            return Ordering::Equal;
        }
        let chain_a = self.ancestry(a.idx);
        let chain_b = self.ancestry(b.idx);
        assert!(
            chain_a[0] == chain_b[0],
            "nodes {a:?} and {b:?} are not in the same tree"
        );

        let common = chain_a
            .iter()
            .zip(&chain_b)
            .take_while(|(x, y)| x == y)
            .count();
        if common == chain_a.len() {
            // `a` is an ancestor of `b`.
            return Ordering::Less;
        }
        if common == chain_b.len() {
            return Ordering::Greater;
        }

        let (sa, sb) = (chain_a[common], chain_b[common]);
        let mut n = self.next_sibling[sa as usize];
        while n != INVALID {
            if n == sb {
                return Ordering::Less;
            }
            n = self.next_sibling[n as usize];
        }
        Ordering::Greater
    }

    /// Returns all nodes strictly between `a` and `b` in document order.
    ///
    /// The arguments may be given in either order. Only the span between the
    /// two nodes is walked.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale or the nodes do not share a root.
    #[must_use]
    pub fn select_between(&self, a: NodeId, b: NodeId) -> Vec<NodeId> {
        let (first, last) = match self.compare(a, b) {
            Ordering::Equal => return Vec::new(),
            Ordering::Less => (a.idx, b.idx),
            Ordering::Greater => (b.idx, a.idx),
        };

        let mut out = Vec::new();
        let mut n = self.next_in_document_order(first);
        while n != last {
            debug_assert!(n != INVALID, "walked past the end of the tree");
            out.push(self.handle(n));
            n = self.next_in_document_order(n);
        }
        out
    }

    /// Root-first chain of light ancestors ending at `n`.
    fn ancestry(&self, n: u32) -> Vec<u32> {
        let mut chain = Vec::new();
        let mut c = n;
        while c != INVALID {
            chain.push(c);
            c = self.parent[c as usize];
        }
        chain.reverse();
        chain
    }

    /// Successor of `n` in a pre-order walk of its whole light tree.
    fn next_in_document_order(&self, n: u32) -> u32 {
        let first = self.first_child[n as usize];
        if first != INVALID {
            return first;
        }
        let mut c = n;
        while c != INVALID {
            let next = self.next_sibling[c as usize];
            if next != INVALID {
                return next;
            }
            c = self.parent[c as usize];
        }
        INVALID
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cmp::Ordering;

    use crate::node::{NodeId, SceneTree};

    /// root -> [a -> [a1, a2 -> [a2x]], b, c -> [c1]]
    fn sample() -> (SceneTree<()>, Vec<NodeId>) {
        let mut tree = SceneTree::new();
        let n: Vec<NodeId> = (0..8).map(|_| tree.create_node()).collect();
        let [root, a, a1, a2, a2x, b, c, c1] = [n[0], n[1], n[2], n[3], n[4], n[5], n[6], n[7]];
        tree.append_children(root, &[a, b, c]);
        tree.append_children(a, &[a1, a2]);
        tree.append_child(a2, a2x);
        tree.append_child(c, c1);
        (tree, n)
    }

    #[test]
    fn compare_is_document_order() {
        let (tree, n) = sample();
        for (i, &x) in n.iter().enumerate() {
            for (j, &y) in n.iter().enumerate() {
                assert_eq!(tree.compare(x, y), i.cmp(&j), "compare({i}, {j})");
            }
        }
    }

    #[test]
    fn ancestor_before_descendant() {
        let (tree, n) = sample();
        assert_eq!(tree.compare(n[1], n[4]), Ordering::Less);
        assert_eq!(tree.compare(n[4], n[1]), Ordering::Greater);
    }

    #[test]
    fn select_between_unrelated_nodes() {
        let (tree, n) = sample();
        assert_eq!(tree.select_between(n[2], n[6]), vec![n[3], n[4], n[5]]);
        assert_eq!(tree.select_between(n[6], n[2]), vec![n[3], n[4], n[5]]);
    }

    #[test]
    fn select_between_ancestor_and_descendant() {
        let (tree, n) = sample();
        assert_eq!(tree.select_between(n[1], n[4]), vec![n[2], n[3]]);
        assert_eq!(tree.select_between(n[0], n[7]), n[1..7].to_vec());
    }

    #[test]
    fn select_between_adjacent_or_same_is_empty() {
        let (tree, n) = sample();
        assert!(tree.select_between(n[2], n[3]).is_empty());
        assert!(tree.select_between(n[5], n[5]).is_empty());
    }

    #[test]
    #[should_panic(expected = "are not in the same tree")]
    fn compare_across_trees_panics() {
        let mut tree: SceneTree<()> = SceneTree::new();
        let a = tree.create_node();
        let b = tree.create_node();
        let _ = tree.compare(a, b);
    }
}
