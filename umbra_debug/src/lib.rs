// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing and JSON snapshots for umbra diagnostics.
//!
//! This crate provides development aids around
//! [`umbra_core`]'s scene graph cache:
//!
//! - [`pretty::PrettyPrintSink`] — a [`TraceSink`](umbra_core::trace::TraceSink)
//!   writing human-readable one-line-per-event output.
//! - [`snapshot::snapshot`] / [`snapshot::write_snapshot`] — a JSON view of
//!   the flattened node order and its ranges.

pub mod pretty;
pub mod snapshot;
