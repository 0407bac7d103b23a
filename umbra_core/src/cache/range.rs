// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command index ranges.

use core::ops::Range;

use crate::command::OwnCounts;

/// A node's extent in one pass's command buffer.
///
/// The four bounds split the extent into the node's own pre commands
/// `[pre_start, body_start)`, its composed descendants' commands
/// `[body_start, body_end)`, and its own post commands
/// `[body_end, post_end)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CommandSpan {
    /// First own pre command.
    pub pre_start: u32,
    /// First descendant command.
    pub body_start: u32,
    /// First own post command.
    pub body_end: u32,
    /// One past the last own post command.
    pub post_end: u32,
}

impl CommandSpan {
    /// Number of commands covered, own and descendants.
    #[inline]
    #[must_use]
    pub const fn len(self) -> u32 {
        self.post_end - self.pre_start
    }

    /// Whether the span covers no commands.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.post_end == self.pre_start
    }

    /// Own pre command indices.
    #[inline]
    #[must_use]
    pub const fn pre(self) -> Range<u32> {
        self.pre_start..self.body_start
    }

    /// Descendant command indices.
    #[inline]
    #[must_use]
    pub const fn body(self) -> Range<u32> {
        self.body_start..self.body_end
    }

    /// Own post command indices.
    #[inline]
    #[must_use]
    pub const fn post(self) -> Range<u32> {
        self.body_end..self.post_end
    }

    /// The whole extent.
    #[inline]
    #[must_use]
    pub const fn total(self) -> Range<u32> {
        self.pre_start..self.post_end
    }

    /// Number of own commands (pre and post).
    #[inline]
    #[must_use]
    pub const fn own_len(self) -> u32 {
        (self.body_start - self.pre_start) + (self.post_end - self.body_end)
    }

    /// Own pre and post command counts.
    #[inline]
    #[must_use]
    pub const fn own_counts(self) -> OwnCounts {
        OwnCounts {
            pre: self.body_start - self.pre_start,
            post: self.post_end - self.body_end,
        }
    }

    /// Moves every bound by `delta`.
    #[must_use]
    pub(crate) fn shifted(self, delta: i64) -> Self {
        Self {
            pre_start: offset(self.pre_start, delta),
            body_start: offset(self.body_start, delta),
            body_end: offset(self.body_end, delta),
            post_end: offset(self.post_end, delta),
        }
    }

    /// Grows or shrinks the descendant part by `delta`; the own pre commands
    /// stay in place and the post commands follow the body.
    #[must_use]
    pub(crate) fn resized(self, delta: i64) -> Self {
        Self {
            pre_start: self.pre_start,
            body_start: self.body_start,
            body_end: offset(self.body_end, delta),
            post_end: offset(self.post_end, delta),
        }
    }

    /// Canonical compact form.
    #[must_use]
    pub const fn to_range(self) -> CommandRange {
        if self.is_empty() {
            CommandRange::Empty
        } else if self.body_end != self.post_end {
            CommandRange::Full(self.pre_start, self.body_start, self.body_end, self.post_end)
        } else if self.pre_start != self.body_start {
            CommandRange::PreAndBody(self.pre_start, self.body_start, self.body_end)
        } else {
            CommandRange::Contiguous(self.body_start, self.body_end)
        }
    }
}

/// Compact view of a [`CommandSpan`], collapsing absent segments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandRange {
    /// The node and its descendants emit nothing in this pass.
    Empty,
    /// Only descendant commands: `(start, end)`.
    Contiguous(u32, u32),
    /// Own pre commands then descendants, no post:
    /// `(pre_start, body_start, end)`.
    PreAndBody(u32, u32, u32),
    /// Own post commands present:
    /// `(pre_start, body_start, body_end, post_end)`.
    Full(u32, u32, u32, u32),
}

impl CommandRange {
    /// Returns the half-open index range covered, or `None` when empty.
    #[must_use]
    pub const fn bounds(self) -> Option<Range<u32>> {
        match self {
            Self::Empty => None,
            Self::Contiguous(start, end) | Self::PreAndBody(start, _, end) => Some(start..end),
            Self::Full(start, _, _, end) => Some(start..end),
        }
    }

    /// Number of commands covered.
    #[must_use]
    pub const fn len(self) -> u32 {
        match self.bounds() {
            Some(r) => r.end - r.start,
            None => 0,
        }
    }

    /// Whether no commands are covered.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Applies a signed delta to an index.
///
/// # Panics
///
/// Panics if the result leaves the `u32` range, which means the range tables
/// are corrupt.
pub(crate) fn offset(v: u32, delta: i64) -> u32 {
    let moved = i64::from(v) + delta;
    match u32::try_from(moved) {
        Ok(v) => v,
        Err(_) => panic!("index {v} shifted by {delta} leaves the u32 range"),
    }
}
