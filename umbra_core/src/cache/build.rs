// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental rebuild of the flattened tables.
//!
//! A build runs in three phases:
//!
//! 1. **Commands** — drain the commands-only channel. A node whose per-pass
//!    own counts still match its cached span is reported as-is; any other
//!    node is promoted to a dirty root.
//! 2. **Anchors** — map every dirty root to the nearest composed
//!    ancestor-or-self already flattened, drop roots no longer below the
//!    cache root, and merge anchors nested inside other anchors.
//! 3. **Splice** — re-walk each anchor's composed subtree, splice the fresh
//!    slice over the old one, shift everything after it, and resize the
//!    anchor's composed ancestors.
//!
//! Anchors are spliced back to front. A splice only moves entries after
//! itself, so the positions of the remaining anchors and of every ancestor
//! stay valid while the build runs.

use alloc::vec;
use alloc::vec::Vec;

use super::range::{CommandSpan, offset};
use super::{BuildChanges, SceneGraphCache};
use crate::command::{Command, CommandFilter, OwnCounts, count_matching};
use crate::dirty::{self, DirtState};
use crate::node::{INVALID, NodeId, SceneTree};
#[cfg(feature = "trace-rich")]
use crate::trace::SpliceEvent;
use crate::trace::{BuildBeginEvent, BuildEndEvent, Tracer};

impl SceneGraphCache {
    /// Brings the flattened tables up to date with the tree.
    ///
    /// Returns what changed. With nothing invalidated since the last build
    /// this is a no-op returning empty changes.
    ///
    /// # Panics
    ///
    /// Panics if the cache root has been destroyed.
    pub fn build<T: Command>(&mut self, tree: &mut SceneTree<T>) -> BuildChanges {
        self.build_traced(tree, &mut Tracer::none())
    }

    /// Like [`build`](Self::build), reporting progress to `tracer`.
    ///
    /// # Panics
    ///
    /// Panics if the cache root has been destroyed.
    pub fn build_traced<T: Command>(
        &mut self,
        tree: &mut SceneTree<T>,
        tracer: &mut Tracer<'_>,
    ) -> BuildChanges {
        let mut changes = BuildChanges::default();
        tree.validate(self.root);

        let marked: Vec<u32> = self
            .commands
            .drain(dirty::COMMANDS)
            .deterministic()
            .run()
            .collect();
        if self.dirty_roots.is_empty() && marked.is_empty() {
            return changes;
        }
        if self.position.len() < tree.len as usize {
            self.position.resize(tree.len as usize, INVALID);
        }

        tracer.build_begin(&BuildBeginEvent {
            build_index: self.build_index,
            dirty_roots: self.dirty_roots.len(),
            commands_marked: marked.len(),
        });

        for idx in marked {
            self.settle_commands(tree, idx, &mut changes);
        }

        let anchors = self.resolve_anchors(tree);
        for &(start, anchor) in anchors.iter().rev() {
            if self.splice_subtree(tree, start, anchor, tracer) {
                changes.structure_changed = true;
            }
        }
        changes.rebuilt = anchors.into_iter().map(|(_, a)| a).collect();

        tracer.build_end(&BuildEndEvent {
            build_index: self.build_index,
            node_count: to_u32(self.nodes.len()),
            rebuilt: changes.rebuilt.len(),
            commands_changed: changes.commands.len(),
        });
        self.build_index += 1;
        changes
    }

    /// Handles one commands-only mark.
    fn settle_commands<T: Command>(
        &mut self,
        tree: &mut SceneTree<T>,
        idx: u32,
        changes: &mut BuildChanges,
    ) {
        if idx >= tree.len {
            return;
        }
        let node = tree.handle(idx);
        if !tree.is_alive(node) {
            return;
        }
        tree.dirt[idx as usize].remove(DirtState::COMMANDS);
        let Some(pos) = self.index_of(node) else {
            // Not flattened: either detached or waiting on a subtree rebuild.
            return;
        };

        let list = tree.commands[idx as usize].as_ref();
        let unchanged = self.passes.iter().zip(&self.spans).all(|(pass, table)| {
            let counts = list.map_or(OwnCounts::default(), |l| count_matching(l, *pass));
            table[pos as usize].own_counts() == counts
        });
        if unchanged {
            changes.commands.push(node);
        } else {
            self.invalidated_subtree(tree, node);
        }
    }

    /// Drains the dirty-root queue into disjoint anchors in ascending
    /// flattened order, paired with their current position.
    fn resolve_anchors<T>(&mut self, tree: &mut SceneTree<T>) -> Vec<(u32, NodeId)> {
        let root = self.root;
        let roots = core::mem::take(&mut self.dirty_roots);
        let mut anchors = Vec::with_capacity(roots.len());
        let mut full = false;

        for r in roots {
            if !tree.is_alive(r) {
                continue;
            }
            if !tree.is_composed_ancestor_or_self(root.idx, r.idx) {
                tree.dirt[r.idx as usize].remove(DirtState::SUBTREE);
                continue;
            }
            let mut a = r.idx;
            loop {
                let handle = tree.handle(a);
                if let Some(pos) = self.index_of(handle) {
                    anchors.push((pos, handle));
                    break;
                }
                if a == root.idx {
                    full = true;
                    break;
                }
                a = tree.composed_parent_raw(a);
            }
        }

        if full {
            return vec![(0, root)];
        }

        anchors.sort_unstable_by_key(|&(pos, _)| pos);
        let mut kept: Vec<(u32, NodeId)> = Vec::with_capacity(anchors.len());
        let mut end = 0;
        for (pos, anchor) in anchors {
            if !kept.is_empty() && pos < end {
                continue;
            }
            end = self.subtree_end[pos as usize];
            kept.push((pos, anchor));
        }
        kept
    }

    /// Re-walks `anchor` and splices the result at `start`. Returns whether
    /// any table entry changed.
    fn splice_subtree<T: Command>(
        &mut self,
        tree: &mut SceneTree<T>,
        start: u32,
        anchor: NodeId,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        // An unflattened anchor is the root of an empty or cleared cache.
        let old_end = if self.contains(anchor) {
            self.subtree_end[start as usize]
        } else {
            to_u32(self.nodes.len())
        };
        let s = start as usize;
        let e = old_end as usize;

        let (bases, old_totals): (Vec<u32>, Vec<u32>) = self
            .spans
            .iter()
            .map(|table| table.get(s).map_or((0, 0), |span| (span.pre_start, span.len())))
            .unzip();

        let mut slice = Slice::new(start, &bases);
        slice.open(tree, &self.passes, anchor, 0);
        let mut walk = tree.traverse_composed(anchor);
        while let Some(node) = walk.move_next() {
            slice.open(tree, &self.passes, node, walk.depth());
        }
        slice.finish();

        for node in &slice.nodes {
            tree.dirt[node.idx as usize] = DirtState::empty();
        }

        let new_len = to_u32(slice.nodes.len());
        let node_delta = i64::from(new_len) - i64::from(old_end - start);
        let deltas: Vec<i64> = slice
            .cursor
            .iter()
            .zip(bases.iter().zip(&old_totals))
            .map(|(&cursor, (&base, &old))| i64::from(cursor - base) - i64::from(old))
            .collect();

        let changed = node_delta != 0
            || self.nodes[s..e] != slice.nodes[..]
            || self.subtree_end[s..e] != slice.ends[..]
            || self
                .spans
                .iter()
                .zip(&slice.spans)
                .any(|(table, fresh)| table[s..e] != fresh[..]);

        #[cfg(feature = "trace-rich")]
        tracer.splice(&SpliceEvent {
            build_index: self.build_index,
            anchor,
            start,
            old_len: old_end - start,
            new_len,
        });
        #[cfg(not(feature = "trace-rich"))]
        {
            _ = tracer;
        }

        if !changed {
            return false;
        }

        self.nodes.splice(s..e, slice.nodes);
        self.subtree_end.splice(s..e, slice.ends);
        for (table, fresh) in self.spans.iter_mut().zip(slice.spans) {
            table.splice(s..e, fresh);
        }

        let after = s + new_len as usize;
        let moved = node_delta != 0 || deltas.iter().any(|&d| d != 0);
        if moved {
            for end in &mut self.subtree_end[after..] {
                *end = offset(*end, node_delta);
            }
            for (table, &delta) in self.spans.iter_mut().zip(&deltas) {
                if delta != 0 {
                    for span in &mut table[after..] {
                        *span = span.shifted(delta);
                    }
                }
            }
            self.resize_ancestors(tree, anchor, node_delta, &deltas);
        }

        let reindex_to = if node_delta != 0 {
            self.nodes.len()
        } else {
            after
        };
        for (i, node) in self.nodes[s..reindex_to].iter().enumerate() {
            self.position[node.idx as usize] = to_u32(s + i);
        }
        true
    }

    /// Applies a splice's deltas to the end bounds of every flattened
    /// composed ancestor of `anchor`.
    fn resize_ancestors<T>(
        &mut self,
        tree: &SceneTree<T>,
        anchor: NodeId,
        node_delta: i64,
        deltas: &[i64],
    ) {
        if anchor == self.root {
            return;
        }
        let mut a = tree.composed_parent_raw(anchor.idx);
        while a != INVALID {
            let Some(pos) = self.index_of(tree.handle(a)) else {
                break;
            };
            let pos = pos as usize;
            self.subtree_end[pos] = offset(self.subtree_end[pos], node_delta);
            for (table, &delta) in self.spans.iter_mut().zip(deltas) {
                table[pos] = table[pos].resized(delta);
            }
            if a == self.root.idx {
                break;
            }
            a = tree.composed_parent_raw(a);
        }
    }
}

/// A freshly walked slice, with absolute indices.
struct Slice {
    start: u32,
    nodes: Vec<NodeId>,
    ends: Vec<u32>,
    /// Per pass: spans of the slice, and own post counts awaiting close.
    spans: Vec<Vec<CommandSpan>>,
    posts: Vec<Vec<u32>>,
    cursor: Vec<u32>,
    /// Open nodes as `(slice index, depth)`.
    open: Vec<(usize, usize)>,
}

impl Slice {
    fn new(start: u32, bases: &[u32]) -> Self {
        Self {
            start,
            nodes: Vec::new(),
            ends: Vec::new(),
            spans: vec![Vec::new(); bases.len()],
            posts: vec![Vec::new(); bases.len()],
            cursor: bases.to_vec(),
            open: Vec::new(),
        }
    }

    /// Records `node` at composed `depth`, closing every open node that is
    /// not one of its ancestors.
    fn open<T: Command>(
        &mut self,
        tree: &SceneTree<T>,
        passes: &[CommandFilter],
        node: NodeId,
        depth: usize,
    ) {
        while let Some(&(k, d)) = self.open.last() {
            if d < depth {
                break;
            }
            self.open.pop();
            self.close(k);
        }

        let k = self.nodes.len();
        self.nodes.push(node);
        self.ends.push(0);
        let list = tree.commands[node.idx as usize].as_ref();
        for (p, pass) in passes.iter().enumerate() {
            let counts = list.map_or(OwnCounts::default(), |l| count_matching(l, *pass));
            let pre_start = self.cursor[p];
            self.cursor[p] += counts.pre;
            self.spans[p].push(CommandSpan {
                pre_start,
                body_start: self.cursor[p],
                body_end: 0,
                post_end: 0,
            });
            self.posts[p].push(counts.post);
        }
        self.open.push((k, depth));
    }

    fn close(&mut self, k: usize) {
        self.ends[k] = self.start + to_u32(self.nodes.len());
        let columns = self.spans.iter_mut().zip(&self.posts).zip(&mut self.cursor);
        for ((table, posts), cursor) in columns {
            let span = &mut table[k];
            span.body_end = *cursor;
            *cursor += posts[k];
            span.post_end = *cursor;
        }
    }

    fn finish(&mut self) {
        while let Some((k, _)) = self.open.pop() {
            self.close(k);
        }
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).expect("flattened index exceeds u32")
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;
    use crate::cache::CommandRange;

    const COLOR: CommandFilter = CommandFilter::COLOR;
    const ENCODE: CommandFilter = CommandFilter::ENCODE;
    const BOTH: CommandFilter = CommandFilter::COLOR.union(CommandFilter::ENCODE);

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Cmd(CommandFilter);

    impl Command for Cmd {
        fn filter(&self) -> CommandFilter {
            self.0
        }
    }

    type Tree = SceneTree<Cmd>;

    fn renderable(tree: &mut Tree, pre: &[CommandFilter], post: &[CommandFilter]) -> NodeId {
        let n = tree.create_renderable();
        let list = tree.commands_mut(n);
        for &f in pre {
            list.add_pre(Cmd(f));
        }
        for &f in post {
            list.add_post(Cmd(f));
        }
        n
    }

    /// Checks that `cache` matches a from-scratch build and that its ranges
    /// tile and sum correctly.
    fn check(tree: &mut Tree, cache: &SceneGraphCache) {
        let mut fresh = SceneGraphCache::new(cache.root(), cache.passes());
        fresh.build(tree);
        assert_eq!(cache.nodes(), fresh.nodes(), "flattened order");
        assert_eq!(cache.subtree_ends(), fresh.subtree_ends(), "subtree ends");
        for &pass in cache.passes() {
            assert_eq!(cache.spans(pass), fresh.spans(pass), "spans of {pass:?}");
        }

        let mut expected = vec![cache.root()];
        expected.extend(tree.traverse_composed(cache.root()));
        assert_eq!(cache.nodes(), &expected[..], "composed pre-order");

        for &node in cache.nodes() {
            assert_eq!(cache.index_of(node), Some(cache.subtree_range(node).start));
            let range = cache.subtree_range(node);
            let mut next = range.start + 1;
            for child in tree.composed_children(node) {
                let child_range = cache.subtree_range(child);
                assert_eq!(child_range.start, next, "children of {node:?} tile");
                next = child_range.end;
            }
            assert_eq!(next, range.end, "children of {node:?} fill the range");

            for &pass in cache.passes() {
                let span = cache.command_span(node, pass);
                let children: u32 = tree
                    .composed_children(node)
                    .into_iter()
                    .map(|c| cache.command_span(c, pass).len())
                    .sum();
                assert_eq!(span.body_end - span.body_start, children, "body of {node:?}");
                let own = tree
                    .commands(node)
                    .map_or(0, |l| count_matching(l, pass).total());
                assert_eq!(span.len(), own + children, "length of {node:?}");
            }
        }
    }

    #[test]
    fn first_build_flattens_and_ranges_commands() {
        let mut tree = Tree::new();
        let root = renderable(&mut tree, &[COLOR], &[COLOR]);
        let a = renderable(&mut tree, &[BOTH, COLOR], &[]);
        let b = tree.create_node();
        let b1 = renderable(&mut tree, &[ENCODE], &[COLOR]);
        tree.append_children(root, &[a, b]);
        tree.append_child(b, b1);

        let mut cache = SceneGraphCache::new(root, &[COLOR, ENCODE]);
        let changes = cache.build(&mut tree);
        assert!(changes.structure_changed);
        assert_eq!(changes.rebuilt, vec![root]);
        assert_eq!(cache.nodes(), &[root, a, b, b1]);

        // COLOR: root.pre | a.pre a.pre | b1.post | root.post
        assert_eq!(cache.command_range(root, COLOR), CommandRange::Full(0, 1, 4, 5));
        assert_eq!(cache.command_range(a, COLOR), CommandRange::PreAndBody(1, 3, 3));
        assert_eq!(cache.command_range(b, COLOR), CommandRange::Contiguous(3, 4));
        assert_eq!(cache.command_range(b1, COLOR), CommandRange::Full(3, 3, 3, 4));
        assert_eq!(cache.pass_range(COLOR), 0..5);

        // ENCODE: a.pre | b1.pre
        assert_eq!(cache.command_range(root, ENCODE), CommandRange::Contiguous(0, 2));
        assert_eq!(cache.command_range(b1, ENCODE), CommandRange::PreAndBody(1, 2, 2));
        assert_eq!(cache.pass_range(ENCODE), 0..2);
        check(&mut tree, &cache);
    }

    #[test]
    fn empty_queue_is_a_noop() {
        let mut tree = Tree::new();
        let root = renderable(&mut tree, &[COLOR], &[]);
        let mut cache = SceneGraphCache::new(root, &[COLOR]);
        cache.build(&mut tree);
        let before = (cache.nodes().to_vec(), cache.spans(COLOR).to_vec());
        let index = cache.build_index();

        let changes = cache.build(&mut tree);
        assert!(changes.is_empty());
        assert_eq!(cache.build_index(), index);
        assert_eq!((cache.nodes().to_vec(), cache.spans(COLOR).to_vec()), before);
    }

    #[test]
    fn insertion_shifts_later_nodes_and_grows_ancestors() {
        let mut tree = Tree::new();
        let root = renderable(&mut tree, &[COLOR], &[]);
        let a = renderable(&mut tree, &[COLOR], &[]);
        let b = renderable(&mut tree, &[COLOR], &[]);
        let b1 = renderable(&mut tree, &[COLOR], &[]);
        tree.append_children(root, &[a, b]);
        tree.append_child(b, b1);
        let mut cache = SceneGraphCache::new(root, &[COLOR]);
        cache.build(&mut tree);
        assert_eq!(cache.command_range(b1, COLOR), CommandRange::PreAndBody(3, 4, 4));

        let a1 = renderable(&mut tree, &[COLOR, COLOR], &[COLOR]);
        tree.append_child(a, a1);
        cache.invalidated_subtree(&mut tree, a);
        let changes = cache.build(&mut tree);
        assert_eq!(changes.rebuilt, vec![a]);

        assert_eq!(cache.nodes(), &[root, a, a1, b, b1]);
        assert_eq!(cache.subtree_range(root), 0..5);
        assert_eq!(cache.subtree_range(b), 3..5);
        assert_eq!(cache.command_range(b1, COLOR), CommandRange::PreAndBody(6, 7, 7));
        assert_eq!(cache.pass_range(COLOR), 0..7);
        check(&mut tree, &cache);
    }

    #[test]
    fn removal_shrinks() {
        let mut tree = Tree::new();
        let root = tree.create_node();
        let a = renderable(&mut tree, &[COLOR], &[COLOR]);
        let a1 = renderable(&mut tree, &[COLOR], &[]);
        let b = renderable(&mut tree, &[COLOR], &[]);
        tree.append_children(root, &[a, b]);
        tree.append_child(a, a1);
        let mut cache = SceneGraphCache::new(root, &[COLOR]);
        cache.build(&mut tree);

        tree.detach(a1);
        cache.invalidated_subtree(&mut tree, a);
        cache.build(&mut tree);
        assert_eq!(cache.nodes(), &[root, a, b]);
        assert!(!cache.contains(a1));
        assert_eq!(cache.command_range(b, COLOR), CommandRange::PreAndBody(2, 3, 3));
        check(&mut tree, &cache);
    }

    #[test]
    fn move_between_parents_in_one_build() {
        let mut tree = Tree::new();
        let root = tree.create_node();
        let [a, b, x, y] = [(); 4].map(|()| renderable(&mut tree, &[COLOR], &[]));
        tree.append_children(root, &[a, b]);
        tree.append_children(b, &[x, y]);
        let mut cache = SceneGraphCache::new(root, &[COLOR]);
        cache.build(&mut tree);

        // Later subtree into an earlier one.
        tree.detach(y);
        tree.append_child(a, y);
        cache.invalidated_subtree(&mut tree, b);
        cache.invalidated_subtree(&mut tree, a);
        cache.build(&mut tree);
        assert_eq!(cache.nodes(), &[root, a, y, b, x]);
        check(&mut tree, &cache);

        // And back again.
        tree.detach(y);
        tree.append_child(b, y);
        cache.invalidated_subtree(&mut tree, a);
        cache.invalidated_subtree(&mut tree, b);
        cache.build(&mut tree);
        assert_eq!(cache.nodes(), &[root, a, b, x, y]);
        check(&mut tree, &cache);
    }

    #[test]
    fn dirty_root_inside_another_anchor_is_merged() {
        let mut tree = Tree::new();
        let root = tree.create_node();
        let [a, b, x] = [(); 3].map(|()| renderable(&mut tree, &[COLOR], &[]));
        tree.append_children(root, &[a, b]);
        tree.append_child(b, x);
        let mut cache = SceneGraphCache::new(root, &[COLOR]);
        cache.build(&mut tree);

        cache.invalidated_subtree(&mut tree, a);
        cache.invalidated_subtree(&mut tree, x);
        tree.detach(x);
        tree.append_child(a, x);
        cache.invalidated_subtree(&mut tree, b);
        assert_eq!(cache.dirty_roots(), &[a, x, b]);

        // `x` is still flattened inside `b`'s old range.
        let changes = cache.build(&mut tree);
        assert_eq!(changes.rebuilt, vec![a, b]);
        assert_eq!(cache.nodes(), &[root, a, x, b]);
        assert_eq!(tree.dirt(x), DirtState::empty());
        check(&mut tree, &cache);
    }

    #[test]
    fn unflattened_dirty_root_anchors_at_nearest_flattened_ancestor() {
        let mut tree = Tree::new();
        let root = tree.create_node();
        let a = tree.create_node();
        tree.append_child(root, a);
        let mut cache = SceneGraphCache::new(root, &[COLOR]);
        cache.build(&mut tree);

        let fresh = tree.create_node();
        let leaf = renderable(&mut tree, &[COLOR], &[]);
        tree.append_child(fresh, leaf);
        tree.append_child(a, fresh);
        cache.invalidated_subtree(&mut tree, leaf);
        let changes = cache.build(&mut tree);
        assert_eq!(changes.rebuilt, vec![a]);
        assert_eq!(cache.nodes(), &[root, a, fresh, leaf]);
        check(&mut tree, &cache);
    }

    #[test]
    fn detached_dirty_root_is_dropped() {
        let mut tree = Tree::new();
        let root = tree.create_node();
        let a = tree.create_node();
        let a1 = renderable(&mut tree, &[COLOR], &[]);
        tree.append_child(root, a);
        tree.append_child(a, a1);
        let mut cache = SceneGraphCache::new(root, &[COLOR]);
        cache.build(&mut tree);

        cache.invalidated_subtree(&mut tree, a1);
        tree.detach(a1);
        let changes = cache.build(&mut tree);
        assert!(changes.rebuilt.is_empty());
        assert!(!changes.structure_changed);
        assert_eq!(tree.dirt(a1), DirtState::empty());
        assert!(!cache.is_dirty());
    }

    #[test]
    fn rebuild_without_change_reports_no_structure_change() {
        let mut tree = Tree::new();
        let root = tree.create_node();
        let a = renderable(&mut tree, &[COLOR], &[]);
        tree.append_child(root, a);
        let mut cache = SceneGraphCache::new(root, &[COLOR]);
        cache.build(&mut tree);

        cache.invalidated_subtree(&mut tree, a);
        let changes = cache.build(&mut tree);
        assert_eq!(changes.rebuilt, vec![a]);
        assert!(!changes.structure_changed);
    }

    #[test]
    fn same_count_command_edit_does_not_rebuild() {
        let mut tree = Tree::new();
        let root = tree.create_node();
        let a = renderable(&mut tree, &[COLOR, ENCODE], &[]);
        tree.append_child(root, a);
        let mut cache = SceneGraphCache::new(root, &[COLOR, ENCODE]);
        cache.build(&mut tree);

        // [ENCODE, COLOR] becomes [COLOR, ENCODE].
        let list = tree.commands_mut(a);
        list.remove_at(1);
        list.insert(0, Cmd(COLOR));
        cache.invalidated_commands(&mut tree, a);
        assert!(tree.dirt(a).contains(DirtState::COMMANDS));

        let changes = cache.build(&mut tree);
        assert_eq!(changes.commands, vec![a]);
        assert!(changes.rebuilt.is_empty());
        assert_eq!(tree.dirt(a), DirtState::empty());
        check(&mut tree, &cache);
    }

    #[test]
    fn count_changing_command_edit_is_promoted() {
        let mut tree = Tree::new();
        let root = tree.create_node();
        let a = renderable(&mut tree, &[COLOR], &[]);
        let b = renderable(&mut tree, &[COLOR], &[]);
        tree.append_children(root, &[a, b]);
        let mut cache = SceneGraphCache::new(root, &[COLOR]);
        cache.build(&mut tree);

        tree.commands_mut(a).add_post(Cmd(COLOR));
        cache.invalidated_commands(&mut tree, a);
        let changes = cache.build(&mut tree);
        assert!(changes.commands.is_empty());
        assert_eq!(changes.rebuilt, vec![a]);
        assert_eq!(cache.command_range(a, COLOR), CommandRange::Full(0, 1, 1, 2));
        assert_eq!(cache.command_range(b, COLOR), CommandRange::PreAndBody(2, 3, 3));
        check(&mut tree, &cache);
    }

    #[test]
    fn nested_components_flatten_transitively() {
        let mut tree = Tree::new();
        let outer = renderable(&mut tree, &[COLOR], &[COLOR]);
        let outer_shadow = tree.create_node();
        let inner = renderable(&mut tree, &[COLOR], &[]);
        let inner_shadow = renderable(&mut tree, &[COLOR], &[]);
        let light = renderable(&mut tree, &[COLOR], &[]);
        tree.set_shadow_root(outer, outer_shadow);
        tree.append_child(outer_shadow, inner);
        tree.set_shadow_root(inner, inner_shadow);
        tree.append_child(outer, light);

        let mut cache = SceneGraphCache::new(outer, &[COLOR]);
        cache.build(&mut tree);
        assert_eq!(cache.nodes(), &[outer, outer_shadow, inner, inner_shadow, light]);
        assert_eq!(cache.subtree_range(outer_shadow), 1..4);
        check(&mut tree, &cache);

        // Grow the innermost shadow subtree.
        let deep = renderable(&mut tree, &[COLOR, COLOR], &[]);
        tree.append_child(inner_shadow, deep);
        cache.invalidated_subtree(&mut tree, inner_shadow);
        cache.build(&mut tree);
        assert_eq!(
            cache.nodes(),
            &[outer, outer_shadow, inner, inner_shadow, deep, light]
        );
        assert_eq!(cache.command_range(light, COLOR), CommandRange::PreAndBody(5, 6, 6));
        check(&mut tree, &cache);
    }

    #[test]
    fn slot_projects_light_children() {
        let mut tree = Tree::new();
        let host = tree.create_node();
        let shadow = tree.create_node();
        let header = renderable(&mut tree, &[COLOR], &[]);
        let slot = tree.create_node();
        let x = renderable(&mut tree, &[COLOR], &[]);
        tree.set_shadow_root(host, shadow);
        tree.append_children(shadow, &[header, slot]);
        tree.append_child(host, x);
        tree.set_slot(host, slot);

        let mut cache = SceneGraphCache::new(host, &[COLOR]);
        cache.build(&mut tree);
        assert_eq!(cache.nodes(), &[host, shadow, header, slot, x]);
        assert_eq!(cache.subtree_range(slot), 3..5);

        // Adding a light child of the host lands under the slot.
        let y = renderable(&mut tree, &[COLOR], &[]);
        tree.append_child(host, y);
        cache.invalidated_subtree(&mut tree, host);
        cache.build(&mut tree);
        assert_eq!(cache.nodes(), &[host, shadow, header, slot, x, y]);
        assert_eq!(cache.command_range(slot, COLOR), CommandRange::Contiguous(1, 3));
        check(&mut tree, &cache);
    }

    #[test]
    fn clear_then_build_is_full() {
        let mut tree = Tree::new();
        let root = tree.create_node();
        let a = renderable(&mut tree, &[COLOR], &[]);
        tree.append_child(root, a);
        let mut cache = SceneGraphCache::new(root, &[COLOR]);
        cache.build(&mut tree);
        cache.clear();
        let changes = cache.build(&mut tree);
        assert_eq!(changes.rebuilt, vec![root]);
        check(&mut tree, &cache);
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_root_panics() {
        let mut tree = Tree::new();
        let root = tree.create_node();
        let mut cache = SceneGraphCache::new(root, &[COLOR]);
        tree.destroy_node(root);
        cache.build(&mut tree);
    }

    /// Small deterministic generator for edit sequences.
    struct Lcg(u64);

    impl Lcg {
        fn next_u32(&mut self) -> u32 {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            u32::try_from(self.0 >> 33).expect("top 31 bits fit in u32")
        }

        fn below(&mut self, n: usize) -> usize {
            self.next_u32() as usize % n
        }

        fn filter(&mut self) -> CommandFilter {
            [COLOR, ENCODE, BOTH][self.below(3)]
        }
    }

    fn random_renderable(tree: &mut Tree, rng: &mut Lcg) -> NodeId {
        let pre: Vec<_> = (0..rng.below(3)).map(|_| rng.filter()).collect();
        let post: Vec<_> = (0..rng.below(2)).map(|_| rng.filter()).collect();
        renderable(tree, &pre, &post)
    }

    /// Nodes that can be detached: attached light children that are not a
    /// designated slot.
    fn movable(tree: &Tree, cache: &SceneGraphCache) -> Vec<NodeId> {
        cache
            .nodes()
            .iter()
            .copied()
            .filter(|&n| tree.parent(n).is_some() && tree.slot_host[n.idx as usize] == INVALID)
            .collect()
    }

    #[test]
    fn incremental_build_matches_fresh_build() {
        for seed in 1..=8_u64 {
            let mut rng = Lcg(seed);
            let mut tree = Tree::new();
            let root = renderable(&mut tree, &[COLOR], &[ENCODE]);

            // A component with a slot, so projection is exercised too.
            let host = renderable(&mut tree, &[COLOR], &[COLOR]);
            let shadow = tree.create_node();
            let slot = renderable(&mut tree, &[ENCODE], &[]);
            tree.set_shadow_root(host, shadow);
            tree.append_child(shadow, slot);
            tree.set_slot(host, slot);
            tree.append_child(root, host);

            let mut cache = SceneGraphCache::new(root, &[COLOR, ENCODE]);
            cache.build(&mut tree);

            for step in 0..60 {
                let nodes = cache.nodes().to_vec();
                match rng.below(6) {
                    0 | 1 => {
                        let parent = nodes[rng.below(nodes.len())];
                        let child = random_renderable(&mut tree, &mut rng);
                        let first = tree.first_child(parent);
                        if let Some(before) = first.filter(|_| rng.below(2) == 0) {
                            tree.insert_before(before, child);
                        } else {
                            tree.append_child(parent, child);
                        }
                        cache.invalidated_subtree(&mut tree, parent);
                    }
                    2 => {
                        let candidates = movable(&tree, &cache);
                        if let Some(&x) = candidates.get(rng.below(candidates.len().max(1))) {
                            let old = tree.parent(x).unwrap();
                            tree.detach(x);
                            cache.invalidated_subtree(&mut tree, old);
                            let target = nodes[rng.below(nodes.len())];
                            if tree.is_composed_ancestor_or_self(root.idx, target.idx)
                                && !tree.is_composed_ancestor_or_self(x.idx, target.idx)
                            {
                                tree.append_child(target, x);
                                cache.invalidated_subtree(&mut tree, target);
                            }
                        }
                    }
                    3 => {
                        let n = nodes[rng.below(nodes.len())];
                        if let Some(list) = tree.commands(n).filter(|l| !l.is_empty()) {
                            // Reinserting in place keeps the counts unless the
                            // item sat on the separator.
                            let i = rng.below(list.len());
                            let same = list[i];
                            let list = tree.commands_mut(n);
                            list.remove_at(i);
                            list.insert(i, same);
                            cache.invalidated_commands(&mut tree, n);
                        }
                    }
                    4 => {
                        let n = nodes[rng.below(nodes.len())];
                        if tree.is_renderable(n) {
                            let f = rng.filter();
                            tree.commands_mut(n).add_post(Cmd(f));
                            cache.invalidated_commands(&mut tree, n);
                        }
                    }
                    _ => {
                        let n = nodes[rng.below(nodes.len())];
                        cache.invalidated_subtree(&mut tree, n);
                    }
                }

                if step % 3 == 2 {
                    cache.build(&mut tree);
                    check(&mut tree, &cache);
                    // Idempotence.
                    assert!(cache.build(&mut tree).is_empty(), "seed {seed} step {step}");
                }
            }
        }
    }

    #[cfg(feature = "trace-rich")]
    #[test]
    fn splice_events_are_reported() {
        use crate::trace::TraceSink;

        #[derive(Default)]
        struct Splices(Vec<(u32, u32, u32)>);
        impl TraceSink for Splices {
            fn on_splice(&mut self, e: &SpliceEvent) {
                self.0.push((e.start, e.old_len, e.new_len));
            }
        }

        let mut tree = Tree::new();
        let root = tree.create_node();
        let a = tree.create_node();
        tree.append_child(root, a);
        let mut cache = SceneGraphCache::new(root, &[COLOR]);
        cache.build(&mut tree);

        let a1 = tree.create_node();
        tree.append_child(a, a1);
        cache.invalidated_subtree(&mut tree, a);
        let mut sink = Splices::default();
        cache.build_traced(&mut tree, &mut Tracer::new(&mut sink));
        assert_eq!(sink.0, vec![(1, 1, 2)]);
    }
}
