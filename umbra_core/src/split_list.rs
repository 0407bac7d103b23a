// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A growable sequence split into a *pre* and a *post* partition.
//!
//! A [`SplitList`] keeps one contiguous backing store and a movable separator.
//! Items in `[0, separator)` form the pre partition and are painted before a
//! node's descendants; items in `[separator, len)` form the post partition and
//! are painted after them.
//!
//! The separator may be unset. An unset separator means the owner never asked
//! for a split: [`add`](SplitList::add) just appends and every item counts as
//! pre. The first [`add_pre`](SplitList::add_pre) or
//! [`add_post`](SplitList::add_post) sets it to the current length.

use alloc::vec::Vec;
use core::ops::Index;

/// A vector with a movable pre/post separator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitList<T> {
    items: Vec<T>,
    separator: Option<usize>,
}

impl<T> Default for SplitList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SplitList<T> {
    /// Creates an empty list with an unset separator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            separator: None,
        }
    }

    /// Creates an empty list with room for `capacity` items.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            separator: None,
        }
    }

    /// Returns the number of items in both partitions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether the list holds no items.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the capacity of the backing store.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Returns the separator, or `None` if it was never set.
    #[inline]
    #[must_use]
    pub fn separator(&self) -> Option<usize> {
        self.separator
    }

    /// Returns the effective separator: the stored one, or `len` when unset.
    #[inline]
    fn split_point(&self) -> usize {
        self.separator.unwrap_or(self.items.len())
    }

    /// Appends `item` without touching the separator.
    ///
    /// With an unset separator the item lands in the pre partition; otherwise
    /// it lands at the end of the post partition.
    pub fn add(&mut self, item: T) {
        self.items.push(item);
    }

    /// Inserts `item` at the front of the pre partition and advances the
    /// separator by one.
    ///
    /// Successive `add_pre` calls therefore stack outwards: the most recent
    /// item is painted first.
    pub fn add_pre(&mut self, item: T) {
        let sep = self.split_point();
        self.items.insert(0, item);
        self.separator = Some(sep + 1);
    }

    /// Appends `item` to the post partition.
    pub fn add_post(&mut self, item: T) {
        let at = self.split_point();
        self.separator = Some(at);
        self.items.push(item);
    }

    /// Inserts `item` at index `i`.
    ///
    /// If `i <= separator`, the separator moves right by one so the item joins
    /// the pre partition.
    ///
    /// # Panics
    ///
    /// Panics if `i > len`.
    pub fn insert(&mut self, i: usize, item: T) {
        assert!(
            i <= self.items.len(),
            "insert index {i} out of range (len {})",
            self.items.len()
        );
        self.items.insert(i, item);
        if let Some(sep) = &mut self.separator
            && i <= *sep
        {
            *sep += 1;
        }
    }

    /// Removes and returns the item at index `i`.
    ///
    /// If the item was in the pre partition the separator moves left by one.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len`.
    pub fn remove_at(&mut self, i: usize) -> T {
        assert!(
            i < self.items.len(),
            "remove index {i} out of range (len {})",
            self.items.len()
        );
        let item = self.items.remove(i);
        if let Some(sep) = &mut self.separator
            && i < *sep
        {
            *sep -= 1;
        }
        item
    }

    /// Removes the first item equal to `item`, returning whether one was found.
    pub fn remove(&mut self, item: &T) -> bool
    where
        T: PartialEq,
    {
        match self.items.iter().position(|x| x == item) {
            Some(i) => {
                self.remove_at(i);
                true
            }
            None => false,
        }
    }

    /// Removes all items and unsets the separator.
    pub fn clear(&mut self) {
        self.items.clear();
        self.separator = None;
    }

    /// Returns the whole backing run in index order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Returns the pre partition.
    #[inline]
    #[must_use]
    pub fn pre(&self) -> &[T] {
        &self.items[..self.split_point()]
    }

    /// Returns the post partition.
    #[inline]
    #[must_use]
    pub fn post(&self) -> &[T] {
        &self.items[self.split_point()..]
    }

    /// Returns an iterator over all items in index order.
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Index<usize> for SplitList<T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        &self.items[i]
    }
}

impl<'a, T> IntoIterator for &'a SplitList<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
