//! Order-statistics map: every key occupies `count` consecutive ranks, and
//! the rank of a key is maintained under insertion and removal without
//! renumbering.

use core::borrow::Borrow;
use core::fmt;

use crate::cursor::{CursorWrite, FastCursor, RobustCursor};
use crate::error::Error;
use crate::options::{Axis, Direction, Options};
use crate::raw::node::XOffset;
use crate::raw::tree::{RawTree, WalkStack};

/// An ordered map with per-key multiplicity and O(log n) rank queries.
///
/// Each key owns a block of `count >= 1` consecutive ranks starting at its
/// rank; the total rank space is [`extent`](RankMap::extent). Inserting or
/// removing a key shifts the ranks of every later key by its count.
///
/// # Examples
///
/// ```
/// use spantree::RankMap;
///
/// let mut map = RankMap::new();
/// map.insert("b", (), 3).unwrap();
/// map.insert("a", (), 1).unwrap();
///
/// assert_eq!(map.rank_of(&"a"), Some(0));
/// assert_eq!(map.rank_of(&"b"), Some(1));
/// assert_eq!(map.rank_count(&"b"), Some(3));
/// assert_eq!(map.extent(), 4);
/// assert_eq!(map.get_by_rank(2).map(|(k, _, _)| *k), Some("b"));
/// ```
#[derive(Clone)]
pub struct RankMap<K, V> {
    raw: RawTree<K, V, XOffset>,
}

impl<K: Ord, V> RankMap<K, V> {
    /// Creates an empty map with default [`Options`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(Options::default()).expect("default options are always valid")
    }

    /// Creates an empty map.
    ///
    /// # Errors
    ///
    /// As for [`TreeMap::with_options`](crate::TreeMap::with_options).
    pub fn with_options(options: Options) -> Result<Self, Error> {
        Ok(Self { raw: RawTree::new(options, false)? })
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    /// Total rank count: the sum of every key's count.
    #[must_use]
    pub fn extent(&self) -> i64 {
        self.raw.extents.x
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Inserts `key` with `count` ranks if it is absent. Returns whether
    /// the map changed. The ranks of every greater key grow by `count`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRankCount`] when `count < 1`, [`Error::Overflow`]
    /// when the extent would overflow, [`Error::CapacityExhausted`] under
    /// fixed allocation. All are detected before any mutation.
    pub fn try_insert(&mut self, key: K, value: V, count: i64) -> Result<bool, Error> {
        if count < 1 {
            return Err(Error::InvalidRankCount);
        }
        let descent = self.raw.descend_key(&key);
        if descent.found.is_some() {
            return Ok(false);
        }
        let new_extent = self.raw.extents.x.checked_add(count).ok_or(Error::Overflow)?;
        if !self.raw.arena.can_alloc() {
            return Err(Error::CapacityExhausted);
        }

        // The new block starts where the key's successor currently starts.
        let rank = descent.succ_abs.map_or(self.raw.extents.x, |abs| abs.x);
        self.raw.shift_from(rank, Axis::X, XOffset { x: count });
        let descent = self.raw.descend_key(&key);
        self.raw
            .attach_and_rebalance(descent.path, descent.abs, XOffset { x: rank }, key, value)?;
        self.raw.extents.x = new_extent;
        Ok(true)
    }

    /// Like [`RankMap::try_insert`], but the key must be absent.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateKey`], plus the errors of [`RankMap::try_insert`].
    pub fn insert(&mut self, key: K, value: V, count: i64) -> Result<(), Error> {
        if self.try_insert(key, value, count)? { Ok(()) } else { Err(Error::DuplicateKey) }
    }

    /// Removes `key`, shifting the ranks of every greater key down by its
    /// count.
    pub fn try_remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let descent = self.raw.descend_key(key);
        let found = descent.found?;
        let rank = descent.abs.x;
        let count = descent.succ_abs.map_or(self.raw.extents.x, |abs| abs.x) - rank;
        let node = self.raw.detach_and_rebalance(found, descent.path);
        self.raw.shift_from(rank, Axis::X, XOffset { x: -count });
        self.raw.extents.x -= count;
        Some(node.value)
    }

    /// Like [`RankMap::try_remove`], but absence is a domain error.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`].
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.try_remove(key).ok_or(Error::KeyNotFound)
    }

    /// Adds `delta` to the key's count and returns the resulting count.
    /// A count that reaches zero removes the key; later ranks shift by
    /// `delta` either way.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`] when the key is absent,
    /// [`Error::InvalidRankCount`] when the count would go below zero,
    /// [`Error::Overflow`] when the count or extent would overflow.
    pub fn adjust_count<Q>(&mut self, key: &Q, delta: i64) -> Result<i64, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let descent = self.raw.descend_key(key);
        let found = descent.found.ok_or(Error::KeyNotFound)?;
        let rank = descent.abs.x;
        let block_end = descent.succ_abs.map_or(self.raw.extents.x, |abs| abs.x);
        let count = block_end - rank;

        let new_count = count.checked_add(delta).ok_or(Error::Overflow)?;
        if new_count < 0 {
            return Err(Error::InvalidRankCount);
        }
        if delta == 0 {
            return Ok(count);
        }
        let new_extent = self.raw.extents.x.checked_add(delta).ok_or(Error::Overflow)?;

        if new_count == 0 {
            self.raw.detach_and_rebalance(found, descent.path);
            self.raw.shift_from(rank, Axis::X, XOffset { x: -count });
        } else {
            self.raw.shift_from(block_end, Axis::X, XOffset { x: delta });
            // Coordinates moved, so direct-handle cursors are stale.
            self.raw.version = self.raw.version.wrapping_add(1);
        }
        self.raw.extents.x = new_extent;
        Ok(new_count)
    }

    // ─── Conditional update ──────────────────────────────────────────────

    /// Inserts `key` with `count` ranks, or overwrites its value, if
    /// `predicate` agrees. The predicate receives whether the key is
    /// resident and its current value; the exclusive borrow guarantees it
    /// cannot reenter the map. An overwrite keeps the existing count.
    /// Returns whether the map changed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRankCount`] when `count < 1`, plus the capacity
    /// errors of [`RankMap::try_insert`].
    pub fn insert_or_set_if<F>(
        &mut self,
        key: K,
        value: V,
        count: i64,
        predicate: F,
    ) -> Result<bool, Error>
    where
        F: FnOnce(bool, Option<&V>) -> bool,
    {
        if count < 1 {
            return Err(Error::InvalidRankCount);
        }
        let descent = self.raw.descend_key(&key);
        match descent.found {
            Some(h) => {
                if predicate(true, Some(&self.raw.arena.get(h).value)) {
                    self.raw.arena.get_mut(h).value = value;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            None => {
                if predicate(false, None) {
                    self.try_insert(key, value, count)
                } else {
                    Ok(false)
                }
            }
        }
    }

    /// Removes `key` if it is resident and `predicate` agrees. The ranks
    /// of every greater key shrink by the removed count.
    pub fn remove_if<Q, F>(&mut self, key: &Q, predicate: F) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        F: FnOnce(bool, Option<&V>) -> bool,
    {
        let descent = self.raw.descend_key(key);
        match descent.found {
            Some(h) => {
                if predicate(true, Some(&self.raw.arena.get(h).value)) {
                    let rank = descent.abs.x;
                    let count = descent.succ_abs.map_or(self.raw.extents.x, |abs| abs.x) - rank;
                    let node = self.raw.detach_and_rebalance(h, descent.path);
                    self.raw.shift_from(rank, Axis::X, XOffset { x: -count });
                    self.raw.extents.x -= count;
                    Some(node.value)
                } else {
                    None
                }
            }
            None => {
                let _ = predicate(false, None);
                None
            }
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let descent = self.raw.descend_key(key);
        descent.found.map(|h| &self.raw.arena.get(h).value)
    }

    #[must_use]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let descent = self.raw.descend_key(key);
        descent.found.map(|h| &mut self.raw.arena.get_mut(h).value)
    }

    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Replaces the value of an existing key, returning the old value.
    pub fn try_set_value<Q>(&mut self, key: &Q, value: V) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_mut(key).map(|slot| core::mem::replace(slot, value))
    }

    /// Like [`RankMap::try_set_value`], but absence is a domain error.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`].
    pub fn set_value<Q>(&mut self, key: &Q, value: V) -> Result<V, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.try_set_value(key, value).ok_or(Error::KeyNotFound)
    }

    /// The first rank the key occupies.
    #[must_use]
    pub fn rank_of<Q>(&self, key: &Q) -> Option<i64>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let descent = self.raw.descend_key(key);
        descent.found.map(|_| descent.abs.x)
    }

    /// How many consecutive ranks the key occupies.
    #[must_use]
    pub fn rank_count<Q>(&self, key: &Q) -> Option<i64>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let descent = self.raw.descend_key(key);
        descent
            .found
            .map(|_| descent.succ_abs.map_or(self.raw.extents.x, |abs| abs.x) - descent.abs.x)
    }

    /// The entry whose rank block contains `rank`, with the block's first
    /// rank.
    #[must_use]
    pub fn get_by_rank(&self, rank: i64) -> Option<(&K, i64, &V)> {
        if rank < 0 || rank >= self.raw.extents.x {
            return None;
        }
        let (h, abs, _) = self.raw.find_position(rank, Axis::X)?;
        let node = self.raw.arena.get(h);
        Some((&node.key, abs.x, &node.value))
    }

    /// The greatest entry strictly below `key`, with its rank.
    #[must_use]
    pub fn nearest_less<Q>(&self, key: &Q) -> Option<(&K, i64, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.nearest(key, false, false)
    }

    /// The greatest entry at or below `key`, with its rank.
    #[must_use]
    pub fn nearest_less_or_equal<Q>(&self, key: &Q) -> Option<(&K, i64, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.nearest(key, false, true)
    }

    /// The smallest entry strictly above `key`, with its rank.
    #[must_use]
    pub fn nearest_greater<Q>(&self, key: &Q) -> Option<(&K, i64, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.nearest(key, true, false)
    }

    /// The smallest entry at or above `key`, with its rank.
    #[must_use]
    pub fn nearest_greater_or_equal<Q>(&self, key: &Q) -> Option<(&K, i64, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.nearest(key, true, true)
    }

    fn nearest<Q>(&self, key: &Q, greater: bool, or_equal: bool) -> Option<(&K, i64, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (h, abs) = self.raw.nearest_by_key(key, greater, or_equal)?;
        let node = self.raw.arena.get(h);
        Some((&node.key, abs.x, &node.value))
    }

    #[must_use]
    pub fn first(&self) -> Option<(&K, i64, &V)> {
        let (h, abs) = self.raw.first()?;
        let node = self.raw.arena.get(h);
        Some((&node.key, abs.x, &node.value))
    }

    #[must_use]
    pub fn last(&self) -> Option<(&K, i64, &V)> {
        let (h, abs) = self.raw.last()?;
        let node = self.raw.arena.get(h);
        Some((&node.key, abs.x, &node.value))
    }

    // ─── Enumeration ─────────────────────────────────────────────────────

    /// Iterates in key order, yielding `(key, rank, count, value)`.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            raw: &self.raw,
            stack: self.raw.walk_stack(true),
        }
    }

    #[must_use]
    pub fn fast_cursor(&self, direction: Direction) -> FastCursor {
        self.raw.fast_cursor(direction)
    }

    #[must_use]
    pub fn fast_cursor_at<Q>(&self, key: &Q, direction: Direction) -> FastCursor
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.raw.fast_cursor_at_key(key, direction)
    }

    /// Advances a fast cursor, yielding `(key, rank, count, value)`.
    ///
    /// # Errors
    ///
    /// [`Error::CursorInvalidated`] after any structural or rank change.
    pub fn fast_next(&self, cursor: &mut FastCursor) -> Result<Option<(&K, i64, i64, &V)>, Error> {
        // A backward cursor's previous yield is the current block's end.
        let prev = cursor.current();
        let Some((h, rank, _)) = self.raw.fast_step(cursor)? else {
            return Ok(None);
        };
        let end = match cursor.direction() {
            Direction::Forward => cursor.peek_next().map_or(self.raw.extents.x, |(_, x, _)| x),
            Direction::Backward => prev.map_or(self.raw.extents.x, |(_, x, _)| x),
        };
        let node = self.raw.arena.get(h);
        Ok(Some((&node.key, rank, end - rank, &node.value)))
    }

    /// Writes a value at the cursor's current entry without invalidating
    /// other cursors (no key, rank, or count changes).
    ///
    /// # Errors
    ///
    /// [`Error::CursorInvalidated`] if the map changed structurally since
    /// the cursor was created, or if the cursor has not yielded an entry.
    pub fn fast_set_value(&mut self, cursor: &FastCursor, value: V) -> Result<V, Error> {
        if cursor.version() != self.raw.version {
            return Err(Error::CursorInvalidated);
        }
        let (h, _, _) = cursor.current().ok_or(Error::CursorInvalidated)?;
        Ok(core::mem::replace(&mut self.raw.arena.get_mut(h).value, value))
    }

    /// Writes through a [`CursorWrite`] ticket, additionally refusing the
    /// write if the cursor advanced after the ticket was taken.
    ///
    /// # Errors
    ///
    /// [`Error::CursorInvalidated`].
    pub fn fast_set_value_at(&mut self, cursor: &FastCursor, write: CursorWrite, value: V) -> Result<V, Error> {
        let h = self.raw.check_write(cursor, &write)?;
        Ok(core::mem::replace(&mut self.raw.arena.get_mut(h).value, value))
    }

    #[must_use]
    pub fn robust_cursor(&self, direction: Direction) -> RobustCursor<K> {
        self.raw.robust_cursor(None, direction)
    }

    #[must_use]
    pub fn robust_cursor_at(&self, key: K, direction: Direction) -> RobustCursor<K> {
        self.raw.robust_cursor(Some(key), direction)
    }

    /// Advances a robust cursor, yielding `(key, rank, value)`.
    pub fn robust_next(&self, cursor: &mut RobustCursor<K>) -> Option<(&K, i64, &V)>
    where
        K: Clone,
    {
        let (h, abs) = self.raw.robust_step_key(cursor)?;
        let node = self.raw.arena.get(h);
        Some((&node.key, abs.x, &node.value))
    }

    /// Writes a value at the robust cursor's last entry.
    ///
    /// # Errors
    ///
    /// [`Error::CursorInvalidated`] if the map was cleared since the
    /// cursor was created, [`Error::KeyNotFound`] if the entry is gone or
    /// the cursor has not yielded one.
    pub fn robust_set_value(&mut self, cursor: &RobustCursor<K>, value: V) -> Result<V, Error> {
        self.raw.check_reset(cursor)?;
        let key = cursor.last.as_ref().ok_or(Error::KeyNotFound)?;
        self.set_value(key, value)
    }
}

impl<K: Ord, V> Default for RankMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RankMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        let mut stack = self.raw.walk_stack(true);
        while let Some((h, x, _)) = self.raw.walk_next(&mut stack) {
            let node = self.raw.arena.get(h);
            map.entry(&x, &(&node.key, &node.value));
        }
        map.finish()
    }
}

/// Borrowed in-order iterator over a [`RankMap`], yielding
/// `(key, rank, count, value)`.
pub struct Iter<'a, K, V> {
    raw: &'a RawTree<K, V, XOffset>,
    stack: WalkStack,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, i64, i64, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let (h, rank, _) = self.raw.walk_next(&mut self.stack)?;
        let end = self.stack.last().map_or(self.raw.extents.x, |&(_, x, _)| x);
        let node = self.raw.arena.get(h);
        Some((&node.key, rank, end - rank, &node.value))
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a RankMap<K, V> {
    type Item = (&'a K, i64, i64, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
impl<K: Ord, V> RankMap<K, V> {
    pub(crate) fn validate_invariants(&self) {
        self.raw.validate_invariants();
    }
}
