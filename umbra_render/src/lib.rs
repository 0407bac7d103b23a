// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint-ordered pass plans for umbra.
//!
//! This crate reads a [`SceneGraphCache`](umbra_core::cache::SceneGraphCache)
//! that is up to date with its tree and produces, per render pass:
//!
//! - [`PassPlan`] — the pass's commands in paint order
//! - [`RenderItem`] — one command with its owner, buffer index and world
//!   transform

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod plan;

pub use plan::{PassPlan, RenderItem};
