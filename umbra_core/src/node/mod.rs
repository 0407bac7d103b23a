// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node tree data model.
//!
//! A *node* is an element of a scene tree. Each node has:
//!
//! - An identity ([`NodeId`]), a generational handle that becomes stale when
//!   the node is destroyed.
//! - Light topology: parent, first/last child, and sibling links forming an
//!   ordered tree, edited with [`append_child`](SceneTree::append_child),
//!   [`insert_before`](SceneTree::insert_before),
//!   [`replace_child`](SceneTree::replace_child),
//!   [`detach_children_in_range`](SceneTree::detach_children_in_range) and
//!   friends.
//! - At most one *shadow root*: the root of a private subtree owned by the
//!   node, set once with [`set_shadow_root`](SceneTree::set_shadow_root).
//! - Optionally a *slot*, the node inside its shadow subtree that receives
//!   its light children in composed order.
//! - Per-node data: debug name, local transform, [`DirtState`], and for
//!   renderable nodes a [`SplitList`] of commands.
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles.
//!
//! # Walks
//!
//! [`Traversal`] walks the light subtree of a node in pre-order.
//! [`CompositeTraversal`] walks the composed tree: a host's shadow subtree
//! first, then its light children, recursively. Both can prune the current
//! branch mid-walk.
//!
//! [`DirtState`]: crate::dirty::DirtState
//! [`SplitList`]: crate::split_list::SplitList

mod composite;
mod id;
mod order;
mod store;
mod traverse;

pub use composite::CompositeTraversal;
pub use id::{INVALID, NodeId};
pub use store::SceneTree;
pub use traverse::{Children, Traversal};
