// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-pass filters for drawing commands.

use crate::split_list::SplitList;

bitflags::bitflags! {
    /// Render pass(es) a command belongs to.
    ///
    /// A command is counted in a pass when its filter intersects the pass
    /// filter. The two named passes cover the common case; the remaining bits
    /// are free for application-defined passes.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CommandFilter: u32 {
        /// Visible color output.
        const COLOR = 1 << 0;
        /// Object-id encoding used for picking.
        const ENCODE = 1 << 1;
    }
}

/// A drawing command owned by a renderable node.
pub trait Command {
    /// Returns the passes this command is emitted in.
    fn filter(&self) -> CommandFilter;
}

/// Per-pass command counts of a single node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct OwnCounts {
    /// Matching commands in the pre partition.
    pub pre: u32,
    /// Matching commands in the post partition.
    pub post: u32,
}

impl OwnCounts {
    /// Total matching commands.
    #[inline]
    #[must_use]
    pub const fn total(self) -> u32 {
        self.pre + self.post
    }
}

/// Counts the commands of `list` that belong to `pass`.
#[must_use]
pub fn count_matching<T: Command>(list: &SplitList<T>, pass: CommandFilter) -> OwnCounts {
    let count = |items: &[T]| {
        let n = items.iter().filter(|c| c.filter().intersects(pass)).count();
        u32::try_from(n).expect("command count exceeds u32")
    };
    OwnCounts {
        pre: count(list.pre()),
        post: count(list.post()),
    }
}
