// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for cache builds.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! [`SceneGraphCache::build_traced`](crate::cache::SceneGraphCache::build_traced)
//! calls at each stage. All method bodies default to no-ops, so implementing
//! only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates per-splice [`SpliceEvent`]s and
//!   the corresponding `TraceSink` method.

#[cfg(feature = "trace-rich")]
use crate::node::NodeId;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a build starts processing a non-empty dirty queue.
#[derive(Clone, Copy, Debug)]
pub struct BuildBeginEvent {
    /// Monotonic build counter of the cache.
    pub build_index: u64,
    /// Dirty roots queued by subtree invalidations.
    pub dirty_roots: usize,
    /// Nodes marked by commands-only invalidations.
    pub commands_marked: usize,
}

/// Emitted for every subtree re-walk spliced into the flattened list.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct SpliceEvent {
    /// Build counter.
    pub build_index: u64,
    /// Node whose composed subtree was re-walked.
    pub anchor: NodeId,
    /// Flattened index of the anchor.
    pub start: u32,
    /// Length of the replaced slice.
    pub old_len: u32,
    /// Length of the inserted slice.
    pub new_len: u32,
}

/// Emitted when a build finishes.
#[derive(Clone, Copy, Debug)]
pub struct BuildEndEvent {
    /// Build counter.
    pub build_index: u64,
    /// Length of the flattened node list after the build.
    pub node_count: u32,
    /// Number of subtrees re-walked.
    pub rebuilt: usize,
    /// Nodes whose commands changed without changing any range.
    pub commands_changed: usize,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the cache.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a build starts.
    fn on_build_begin(&mut self, e: &BuildBeginEvent) {
        _ = e;
    }

    /// Called for every spliced subtree (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_splice(&mut self, e: &SpliceEvent) {
        _ = e;
    }

    /// Called when a build finishes.
    fn on_build_end(&mut self, e: &BuildEndEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// The build's handle to an optional [`TraceSink`].
///
/// `build` runs with [`Tracer::none`]. Without the `trace` feature no sink is
/// stored and every emit is an empty inline function.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _sink: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to `sink`.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        Self::with_sink(Some(sink))
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::with_sink(None)
    }

    #[inline]
    fn with_sink(sink: Option<&'a mut dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _sink: core::marker::PhantomData,
            }
        }
    }

    #[inline]
    fn emit(&mut self, f: impl FnOnce(&mut dyn TraceSink)) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            f(&mut **sink);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = f;
        }
    }

    /// Emits a [`BuildBeginEvent`].
    #[inline]
    pub fn build_begin(&mut self, e: &BuildBeginEvent) {
        self.emit(|s| s.on_build_begin(e));
    }

    /// Emits a [`SpliceEvent`].
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn splice(&mut self, e: &SpliceEvent) {
        self.emit(|s| s.on_splice(e));
    }

    /// Emits a [`BuildEndEvent`].
    #[inline]
    pub fn build_end(&mut self, e: &BuildEndEvent) {
        self.emit(|s| s.on_build_end(e));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
