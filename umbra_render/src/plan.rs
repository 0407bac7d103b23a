// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pass plan: the paint-ordered command sequence of one render pass.

use alloc::vec::Vec;

use kurbo::Affine;
use umbra_core::cache::SceneGraphCache;
use umbra_core::command::{Command, CommandFilter};
use umbra_core::node::{NodeId, SceneTree};

/// A single command emitted by a pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderItem {
    /// The node owning the command.
    pub node: NodeId,
    /// Index of the command in the node's command list.
    pub command_index: usize,
    /// Position of the command in the pass's command buffer.
    pub global_index: u32,
    /// Product of the node's and its composed ancestors' transforms.
    pub world_transform: Affine,
}

/// The commands of one pass, in paint order.
///
/// Each node contributes its pre commands, then everything its composed
/// descendants contribute, then its post commands. An item's
/// [`global_index`](RenderItem::global_index) is its position in
/// [`items`](Self::items) and falls inside the owning node's
/// [`CommandSpan`](umbra_core::cache::CommandSpan).
#[derive(Clone, Debug)]
pub struct PassPlan {
    /// The pass this plan was built for.
    pub pass: CommandFilter,
    /// Items in paint order.
    pub items: Vec<RenderItem>,
}

/// A node whose post commands are still to be emitted.
struct Open {
    end: u32,
    pos: usize,
    world: Affine,
}

impl PassPlan {
    /// Creates an empty plan for `pass`.
    #[must_use]
    pub fn new(pass: CommandFilter) -> Self {
        Self {
            pass,
            items: Vec::new(),
        }
    }

    /// Builds the plan of `pass` from a cache that is up to date with
    /// `tree`.
    ///
    /// # Panics
    ///
    /// Panics if `pass` is not registered with the cache, or if the cache
    /// has not been rebuilt since the tree's commands last changed.
    #[must_use]
    pub fn build<T: Command>(
        cache: &SceneGraphCache,
        tree: &SceneTree<T>,
        pass: CommandFilter,
    ) -> Self {
        let mut plan = Self::new(pass);
        plan.rebuild(cache, tree);
        plan
    }

    /// Rebuilds the plan in place, reusing its allocation.
    ///
    /// # Panics
    ///
    /// Same as [`build`](Self::build).
    pub fn rebuild<T: Command>(&mut self, cache: &SceneGraphCache, tree: &SceneTree<T>) {
        self.items.clear();
        let nodes = cache.nodes();
        let ends = cache.subtree_ends();
        let Some(&root) = nodes.first() else {
            return;
        };

        let mut stack: Vec<Open> = Vec::new();
        for (pos, &node) in nodes.iter().enumerate() {
            while let Some(open) = stack.pop_if(|o| o.end as usize <= pos) {
                self.emit_post(cache, tree, nodes[open.pos], open.world);
            }
            let parent_world = match stack.last() {
                Some(open) => open.world,
                None => ancestors_world(tree, root),
            };
            let world = parent_world * tree.transform(node);
            self.emit_pre(cache, tree, node, world);
            stack.push(Open {
                end: ends[pos],
                pos,
                world,
            });
        }
        while let Some(open) = stack.pop() {
            self.emit_post(cache, tree, nodes[open.pos], open.world);
        }
    }

    /// Returns the items in paint order.
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    /// Number of items.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the pass emits nothing.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Clears the plan for reuse.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn emit_pre<T: Command>(
        &mut self,
        cache: &SceneGraphCache,
        tree: &SceneTree<T>,
        node: NodeId,
        world: Affine,
    ) {
        let span = cache.command_span(node, self.pass);
        self.expect_at(span.pre_start, node);
        if let Some(list) = tree.commands(node) {
            self.emit(node, list.pre(), 0, world);
        }
        self.expect_at(span.body_start, node);
    }

    fn emit_post<T: Command>(
        &mut self,
        cache: &SceneGraphCache,
        tree: &SceneTree<T>,
        node: NodeId,
        world: Affine,
    ) {
        let span = cache.command_span(node, self.pass);
        self.expect_at(span.body_end, node);
        if let Some(list) = tree.commands(node) {
            let first = list.len() - list.post().len();
            self.emit(node, list.post(), first, world);
        }
        self.expect_at(span.post_end, node);
    }

    fn emit<T: Command>(&mut self, node: NodeId, commands: &[T], first: usize, world: Affine) {
        for (i, command) in commands.iter().enumerate() {
            if command.filter().intersects(self.pass) {
                let global_index = self.next_index();
                self.items.push(RenderItem {
                    node,
                    command_index: first + i,
                    global_index,
                    world_transform: world,
                });
            }
        }
    }

    fn next_index(&self) -> u32 {
        u32::try_from(self.items.len()).expect("pass exceeds u32 commands")
    }

    fn expect_at(&self, index: u32, node: NodeId) {
        assert_eq!(
            self.next_index(),
            index,
            "cache is out of date with the tree at {node:?}"
        );
    }
}

/// Accumulated transform of `node`'s strict composed ancestors.
fn ancestors_world<T>(tree: &SceneTree<T>, node: NodeId) -> Affine {
    let mut world = Affine::IDENTITY;
    let mut n = tree.composed_parent(node);
    while let Some(a) = n {
        world = tree.transform(a) * world;
        n = tree.composed_parent(a);
    }
    world
}
