// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composed node tree and incremental flattening for render passes.
//!
//! `umbra_core` maintains a tree of nodes where any node may own a private
//! *shadow subtree* (component internals) in addition to its ordinary *light*
//! children. Render passes want the *composed* tree, with each shadow
//! subtree visited before the host's light children, flattened into one array
//! with every node's extent in every pass's command buffer precomputed. This
//! crate keeps that flattening up to date incrementally. It is `no_std`
//! compatible (with `alloc`) and uses array-based struct-of-arrays storage
//! with index handles.
//!
//! # Architecture
//!
//! ```text
//!   Scene owner
//!       │ edits tree / SplitList
//!       ▼
//!   SceneTree ──► SceneGraphCache::invalidated_subtree()
//!       │                    │ dirty roots
//!       │                    ▼
//!       └──────────► SceneGraphCache::build() ──► BuildChanges
//!                            │
//!                            ▼
//!            nodes() + subtree_range() + command_span()
//!                            │
//!                            ▼
//!                   render passes (umbra_render)
//! ```
//!
//! **[`node`]** — Struct-of-arrays node tree with generational handles, shadow
//! roots, slots, and the resumable [`CompositeTraversal`](node::CompositeTraversal).
//!
//! **[`split_list`]** — [`SplitList`](split_list::SplitList), an ordered list
//! partitioned into pre and post items by a movable separator.
//!
//! **[`command`]** — The [`Command`](command::Command) trait and
//! [`CommandFilter`](command::CommandFilter) pass tags.
//!
//! **[`dirty`]** — Per-node [`DirtState`](dirty::DirtState) and the
//! commands-only dirty channel tracked with `understory_dirty`.
//!
//! **[`cache`]** — [`SceneGraphCache`](cache::SceneGraphCache): the flattened
//! node order, subtree ranges and per-pass command spans, rebuilt by splicing
//! only the invalidated subtrees.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! build instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-splice
//!   events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod cache;
pub mod command;
pub mod dirty;
pub mod node;
pub mod split_list;
pub mod trace;
