// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and per-node data.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Affine;

use super::id::{INVALID, NodeId};
use super::traverse::{Children, Traversal};
use crate::dirty::DirtState;
use crate::split_list::SplitList;

/// Struct-of-arrays storage for all nodes of a scene.
///
/// Nodes are addressed by [`NodeId`] handles. Each node occupies a slot in
/// parallel arrays. Destroyed nodes are recycled via a free list, and
/// generation counters prevent stale handle access.
///
/// `T` is the drawing command type carried by renderable nodes.
#[derive(Debug)]
pub struct SceneTree<T> {
    // -- Light topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) last_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Composition --
    pub(crate) shadow_root: Vec<u32>,
    pub(crate) shadow_host: Vec<u32>,
    /// Host -> slot node its light children are projected into.
    pub(crate) slot: Vec<u32>,
    /// Slot node -> host whose light children it receives.
    pub(crate) slot_host: Vec<u32>,

    // -- Per-node data --
    pub(crate) name: Vec<Option<String>>,
    pub(crate) transform: Vec<Affine>,
    pub(crate) commands: Vec<Option<SplitList<T>>>,
    pub(crate) dirt: Vec<DirtState>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
}

impl<T> Default for SceneTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SceneTree<T> {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            last_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            shadow_root: Vec::new(),
            shadow_host: Vec::new(),
            slot: Vec::new(),
            slot_host: Vec::new(),
            name: Vec::new(),
            transform: Vec::new(),
            commands: Vec::new(),
            dirt: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    // -- Allocation API --

    /// Creates a plain, detached node that carries no commands.
    pub fn create_node(&mut self) -> NodeId {
        self.allocate(None)
    }

    /// Creates a detached renderable node with an empty command list.
    pub fn create_renderable(&mut self) -> NodeId {
        self.allocate(Some(SplitList::new()))
    }

    fn allocate(&mut self, commands: Option<SplitList<T>>) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.last_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.shadow_root[i] = INVALID;
            self.shadow_host[i] = INVALID;
            self.slot[i] = INVALID;
            self.slot_host[i] = INVALID;
            self.name[i] = None;
            self.transform[i] = Affine::IDENTITY;
            self.commands[i] = commands;
            self.dirt[i] = DirtState::empty();
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.last_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.shadow_root.push(INVALID);
            self.shadow_host.push(INVALID);
            self.slot.push(INVALID);
            self.slot_host.push(INVALID);
            self.name.push(None);
            self.transform.push(Affine::IDENTITY);
            self.commands.push(commands);
            self.dirt.push(DirtState::empty());
            self.generation.push(0);
            idx
        };

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a detached node, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, or if the node still has a parent,
    /// light children, a shadow root, or is the shadow root of a live host.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let i = id.idx as usize;
        assert!(self.parent[i] == INVALID, "cannot destroy attached node");
        assert!(
            self.first_child[i] == INVALID,
            "cannot destroy node with children"
        );
        assert!(
            self.shadow_root[i] == INVALID,
            "cannot destroy node with a shadow root"
        );
        assert!(
            self.shadow_host[i] == INVALID,
            "cannot destroy an attached shadow root"
        );
        if self.slot_host[i] != INVALID {
            self.slot[self.slot_host[i] as usize] = INVALID;
            self.slot_host[i] = INVALID;
        }

        // Bump generation so old handles immediately fail validation.
        self.generation[i] += 1;
        self.commands[i] = None;
        self.name[i] = None;
        self.free_list.push(id.idx);
    }

    /// Destroys a detached node together with its light and shadow
    /// descendants.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, the node still has a parent, or it is
    /// the shadow root of a live host.
    pub fn destroy_subtree(&mut self, id: NodeId) {
        self.validate(id);
        let i = id.idx as usize;
        assert!(self.parent[i] == INVALID, "cannot destroy attached node");
        assert!(
            self.shadow_host[i] == INVALID,
            "cannot destroy an attached shadow root"
        );

        // Collect first, then release bottom-up so every node is detached
        // by the time it is destroyed.
        let mut order = Vec::new();
        let mut stack = alloc::vec![id.idx];
        while let Some(n) = stack.pop() {
            order.push(n);
            let root = self.shadow_root[n as usize];
            if root != INVALID {
                stack.push(root);
            }
            let mut c = self.first_child[n as usize];
            while c != INVALID {
                stack.push(c);
                c = self.next_sibling[c as usize];
            }
        }
        for &n in order.iter().rev() {
            let ni = n as usize;
            let owner = self.slot_host[ni];
            if owner != INVALID {
                self.slot[owner as usize] = INVALID;
                self.slot_host[ni] = INVALID;
            }
            if self.parent[ni] != INVALID {
                self.unlink(n);
            }
            let host = self.shadow_host[ni];
            if host != INVALID {
                self.shadow_root[host as usize] = INVALID;
                self.shadow_host[ni] = INVALID;
            }
            let slot = self.slot[ni];
            if slot != INVALID {
                self.slot_host[slot as usize] = INVALID;
                self.slot[ni] = INVALID;
            }
            self.destroy_node(NodeId {
                idx: n,
                generation: self.generation[ni],
            });
        }
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        // Freed slots sit one generation ahead of every handle issued for them.
        id.idx < self.len && self.generation[id.idx as usize] == id.generation
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, `child` is already attached or is a
    /// shadow root, or the insertion would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        self.link(parent.idx, child.idx, INVALID);
    }

    /// Adds `child` as the first child of `parent`.
    ///
    /// # Panics
    ///
    /// Same conditions as [`append_child`](Self::append_child).
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        let before = self.first_child[parent.idx as usize];
        self.link(parent.idx, child.idx, before);
    }

    /// Inserts `child` immediately before `sibling`.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` is already attached, or
    /// `sibling` has no parent.
    pub fn insert_before(&mut self, sibling: NodeId, child: NodeId) {
        self.validate(sibling);
        self.validate(child);
        let p = self.parent[sibling.idx as usize];
        assert!(p != INVALID, "sibling has no parent");
        self.link(p, child.idx, sibling.idx);
    }

    /// Inserts `child` immediately after `sibling`.
    ///
    /// # Panics
    ///
    /// Same conditions as [`insert_before`](Self::insert_before).
    pub fn insert_after(&mut self, sibling: NodeId, child: NodeId) {
        self.validate(sibling);
        self.validate(child);
        let p = self.parent[sibling.idx as usize];
        assert!(p != INVALID, "sibling has no parent");
        let before = self.next_sibling[sibling.idx as usize];
        self.link(p, child.idx, before);
    }

    /// Appends `children` to `parent`, preserving their order.
    pub fn append_children(&mut self, parent: NodeId, children: &[NodeId]) {
        for &child in children {
            self.append_child(parent, child);
        }
    }

    /// Prepends `children` to `parent`; they end up first, in the given order.
    pub fn prepend_children(&mut self, parent: NodeId, children: &[NodeId]) {
        self.validate(parent);
        let before = self.first_child[parent.idx as usize];
        for &child in children {
            self.validate(child);
            self.link(parent.idx, child.idx, before);
        }
    }

    /// Inserts `children` before `sibling`, preserving their order.
    pub fn insert_nodes_before(&mut self, sibling: NodeId, children: &[NodeId]) {
        for &child in children {
            self.insert_before(sibling, child);
        }
    }

    /// Inserts `children` after `sibling`, preserving their order.
    pub fn insert_nodes_after(&mut self, sibling: NodeId, children: &[NodeId]) {
        let mut anchor = sibling;
        for &child in children {
            self.insert_after(anchor, child);
            anchor = child;
        }
    }

    /// Replaces `old` (a child of `parent`) with the detached node `new`.
    ///
    /// `old` ends up detached.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `old` is not a child of `parent`, or
    /// `new` is already attached.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        self.validate(parent);
        self.validate(old);
        self.validate(new);
        assert!(
            self.parent[old.idx as usize] == parent.idx,
            "node is not a child of the given parent"
        );
        let before = self.next_sibling[old.idx as usize];
        self.unlink(old.idx);
        self.link(parent.idx, new.idx, before);
    }

    /// Puts the detached node `new` in place of `old` under `old`'s parent.
    ///
    /// # Panics
    ///
    /// Panics if `old` has no parent, or as [`replace_child`](Self::replace_child).
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
        self.validate(old);
        let p = self.parent[old.idx as usize];
        assert!(p != INVALID, "node has no parent");
        self.replace_child(self.handle(p), old, new);
    }

    /// Removes `child` from `parent`.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` is not a child of `parent`, or
    /// `child` is a designated slot.
    pub fn detach_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        assert!(
            self.parent[child.idx as usize] == parent.idx,
            "node is not a child of the given parent"
        );
        self.unlink(child.idx);
    }

    /// Removes `child` from whatever parent it has.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has no parent.
    pub fn detach(&mut self, child: NodeId) {
        self.validate(child);
        assert!(
            self.parent[child.idx as usize] != INVALID,
            "node has no parent"
        );
        self.unlink(child.idx);
    }

    /// Removes all light children of `parent`, returning them in order.
    pub fn detach_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        self.validate(parent);
        let mut out = Vec::new();
        loop {
            let c = self.first_child[parent.idx as usize];
            if c == INVALID {
                break;
            }
            self.unlink(c);
            out.push(self.handle(c));
        }
        out
    }

    /// Removes the contiguous run of siblings from `a` to `b` inclusive.
    ///
    /// `a` and `b` may be given in either relative order. The detached nodes
    /// are returned in document order.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, either node has no parent, or they have
    /// different parents.
    pub fn detach_children_in_range(&mut self, a: NodeId, b: NodeId) -> Vec<NodeId> {
        self.validate(a);
        self.validate(b);
        let p = self.parent[a.idx as usize];
        assert!(p != INVALID, "node has no parent");
        assert!(
            self.parent[b.idx as usize] == p,
            "range endpoints have different parents"
        );

        // Find which endpoint comes first.
        let mut first = a.idx;
        let mut last = b.idx;
        let mut n = a.idx;
        while n != INVALID && n != b.idx {
            n = self.next_sibling[n as usize];
        }
        if n == INVALID {
            core::mem::swap(&mut first, &mut last);
        }

        let mut out = Vec::new();
        let mut n = first;
        loop {
            let next = self.next_sibling[n as usize];
            self.unlink(n);
            out.push(self.handle(n));
            if n == last {
                break;
            }
            n = next;
        }
        out
    }

    // -- Shadow composition --

    /// Attaches `root` as the shadow root of `host`.
    ///
    /// A host owns at most one shadow root and it can only be set once.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `host` already has a shadow root, `root`
    /// is attached anywhere, or `root` is a composed ancestor of `host`.
    pub fn set_shadow_root(&mut self, host: NodeId, root: NodeId) {
        self.validate(host);
        self.validate(root);
        let h = host.idx as usize;
        let r = root.idx as usize;
        assert!(
            self.shadow_root[h] == INVALID,
            "host already has a shadow root"
        );
        assert!(self.parent[r] == INVALID, "shadow root already has a parent");
        assert!(
            self.shadow_host[r] == INVALID,
            "node is already a shadow root"
        );
        assert!(
            !self.is_composed_ancestor_or_self(root.idx, host.idx),
            "shadow root would create a cycle"
        );
        self.shadow_root[h] = root.idx;
        self.shadow_host[r] = host.idx;
    }

    /// Designates `slot`, a node inside `host`'s shadow subtree, as the place
    /// where `host`'s light children are projected in composed order.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `host` has no shadow root, `slot` is not
    /// inside it, or `slot` already serves another host.
    pub fn set_slot(&mut self, host: NodeId, slot: NodeId) {
        self.validate(host);
        self.validate(slot);
        let h = host.idx as usize;
        let root = self.shadow_root[h];
        assert!(root != INVALID, "host has no shadow root");
        let mut top = slot.idx;
        while self.parent[top as usize] != INVALID {
            top = self.parent[top as usize];
        }
        assert!(top == root, "slot is not inside the host's shadow subtree");
        let owner = self.slot_host[slot.idx as usize];
        assert!(
            owner == INVALID || owner == host.idx,
            "slot already serves another host"
        );
        if self.slot[h] != INVALID {
            self.slot_host[self.slot[h] as usize] = INVALID;
        }
        self.slot[h] = slot.idx;
        self.slot_host[slot.idx as usize] = host.idx;
    }

    /// Removes `host`'s slot designation; its light children are composed
    /// after its shadow root again.
    pub fn clear_slot(&mut self, host: NodeId) {
        self.validate(host);
        let h = host.idx as usize;
        let s = self.slot[h];
        if s != INVALID {
            self.slot_host[s as usize] = INVALID;
            self.slot[h] = INVALID;
        }
    }

    // -- Queries --

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.opt(self.parent[id.idx as usize])
    }

    /// Returns the first light child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.opt(self.first_child[id.idx as usize])
    }

    /// Returns the last light child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.opt(self.last_child[id.idx as usize])
    }

    /// Returns the next light sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.opt(self.next_sibling[id.idx as usize])
    }

    /// Returns the previous light sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.opt(self.prev_sibling[id.idx as usize])
    }

    /// Returns the shadow root owned by `host`, if any.
    #[must_use]
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.validate(host);
        self.opt(self.shadow_root[host.idx as usize])
    }

    /// Returns the host owning `root` if `root` is a shadow root.
    #[must_use]
    pub fn shadow_host(&self, root: NodeId) -> Option<NodeId> {
        self.validate(root);
        self.opt(self.shadow_host[root.idx as usize])
    }

    /// Returns the slot `host`'s light children are projected into.
    #[must_use]
    pub fn slot(&self, host: NodeId) -> Option<NodeId> {
        self.validate(host);
        self.opt(self.slot[host.idx as usize])
    }

    /// Returns an iterator over the light children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_, T> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns a pre-order walk over the light descendants of `root`
    /// (excluding `root` itself).
    #[must_use]
    pub fn traverse(&self, root: NodeId) -> Traversal<'_, T> {
        self.validate(root);
        Traversal::new(self, root.idx)
    }

    /// Returns the debug name of a node.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.validate(id);
        self.name[id.idx as usize].as_deref()
    }

    /// Sets the debug name of a node.
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        self.validate(id);
        self.name[id.idx as usize] = Some(name.into());
    }

    /// Returns the local transform of a node.
    #[must_use]
    pub fn transform(&self, id: NodeId) -> Affine {
        self.validate(id);
        self.transform[id.idx as usize]
    }

    /// Sets the local transform of a node.
    ///
    /// Transforms are read at draw time and never affect cached ranges, so no
    /// invalidation is needed.
    pub fn set_transform(&mut self, id: NodeId, transform: Affine) {
        self.validate(id);
        self.transform[id.idx as usize] = transform;
    }

    /// Returns whether the node carries a command list.
    #[must_use]
    pub fn is_renderable(&self, id: NodeId) -> bool {
        self.validate(id);
        self.commands[id.idx as usize].is_some()
    }

    /// Returns the command list of a renderable node.
    #[must_use]
    pub fn commands(&self, id: NodeId) -> Option<&SplitList<T>> {
        self.validate(id);
        self.commands[id.idx as usize].as_ref()
    }

    /// Returns the command list of a renderable node for editing.
    ///
    /// Callers must report the edit through the cache's invalidation methods
    /// before the next build.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node is not renderable.
    pub fn commands_mut(&mut self, id: NodeId) -> &mut SplitList<T> {
        self.validate(id);
        match &mut self.commands[id.idx as usize] {
            Some(list) => list,
            None => panic!("node {id:?} is not renderable"),
        }
    }

    /// Returns the pending dirty state of a node.
    #[must_use]
    pub fn dirt(&self, id: NodeId) -> DirtState {
        self.validate(id);
        self.dirt[id.idx as usize]
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Builds the current handle for a raw slot index.
    #[inline]
    pub(crate) fn handle(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    #[inline]
    fn opt(&self, idx: u32) -> Option<NodeId> {
        if idx == INVALID {
            None
        } else {
            Some(self.handle(idx))
        }
    }

    /// Links the detached node `c` under `p`, before `before` (or last when
    /// `before` is [`INVALID`]).
    fn link(&mut self, p: u32, c: u32, before: u32) {
        let ci = c as usize;
        assert!(self.parent[ci] == INVALID, "child already has a parent");
        assert!(
            self.shadow_host[ci] == INVALID,
            "a shadow root cannot be a child"
        );
        assert!(
            !self.is_composed_ancestor_or_self(c, p),
            "insertion would create a cycle"
        );

        self.parent[ci] = p;
        if before == INVALID {
            let last = self.last_child[p as usize];
            self.prev_sibling[ci] = last;
            self.next_sibling[ci] = INVALID;
            if last == INVALID {
                self.first_child[p as usize] = c;
            } else {
                self.next_sibling[last as usize] = c;
            }
            self.last_child[p as usize] = c;
        } else {
            let prev = self.prev_sibling[before as usize];
            self.prev_sibling[ci] = prev;
            self.next_sibling[ci] = before;
            self.prev_sibling[before as usize] = c;
            if prev == INVALID {
                // `before` was the first child.
                self.first_child[p as usize] = c;
            } else {
                self.next_sibling[prev as usize] = c;
            }
        }
    }

    /// Removes `idx` from its parent's child list.
    fn unlink(&mut self, idx: u32) {
        let i = idx as usize;
        assert!(
            self.slot_host[i] == INVALID,
            "cannot detach a designated slot; clear it first"
        );
        let p = self.parent[i];
        let prev = self.prev_sibling[i];
        let next = self.next_sibling[i];

        if prev == INVALID {
            self.first_child[p as usize] = next;
        } else {
            self.next_sibling[prev as usize] = next;
        }
        if next == INVALID {
            self.last_child[p as usize] = prev;
        } else {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[i] = INVALID;
        self.prev_sibling[i] = INVALID;
        self.next_sibling[i] = INVALID;
    }

    /// Returns whether `ancestor` is `node` or one of its composed ancestors.
    pub(crate) fn is_composed_ancestor_or_self(&self, ancestor: u32, node: u32) -> bool {
        let mut n = node;
        while n != INVALID {
            if n == ancestor {
                return true;
            }
            n = self.composed_parent_raw(n);
        }
        false
    }
}
