// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use umbra_core::trace::{BuildBeginEvent, BuildEndEvent, SpliceEvent, TraceSink};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the destination, consuming the sink.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_build_begin(&mut self, e: &BuildBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[build:begin] build={} dirty_roots={} commands_marked={}",
            e.build_index, e.dirty_roots, e.commands_marked,
        );
    }

    fn on_splice(&mut self, e: &SpliceEvent) {
        let _ = writeln!(
            self.writer,
            "[splice] build={} anchor={:?} at={} len={}->{}",
            e.build_index, e.anchor, e.start, e.old_len, e.new_len,
        );
    }

    fn on_build_end(&mut self, e: &BuildEndEvent) {
        let _ = writeln!(
            self.writer,
            "[build:end] build={} nodes={} rebuilt={} commands={}",
            e.build_index, e.node_count, e.rebuilt, e.commands_changed,
        );
    }
}
