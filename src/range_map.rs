//! Interval map on one axis: contiguous intervals addressed by absolute
//! start coordinate, with insertion and removal shifting everything after
//! the edit point.

use core::fmt;

use crate::cursor::{CursorWrite, FastCursor, RobustCursor};
use crate::error::Error;
use crate::options::{Axis, Direction, Options};
use crate::raw::handle::Handle;
use crate::raw::node::XOffset;
use crate::raw::tree::{RawTree, WalkStack};

/// A map of contiguous intervals on a single axis.
///
/// The axis is fully covered from 0 to [`extent`](RangeMap::extent): every
/// interval starts where its predecessor ends, and an interval's length is
/// the distance to its successor's start. Inserting at an existing
/// interval's start (or at the extent) shifts that interval and everything
/// after it; inserting into the interior of an interval is an error, never
/// an update.
///
/// # Examples
///
/// ```
/// use spantree::RangeMap;
///
/// let mut map = RangeMap::new();
/// map.insert(0, 10, "a").unwrap();
/// map.insert(10, 5, "b").unwrap();
///
/// assert_eq!(map.extent(), 15);
/// assert_eq!(map.nearest_less_or_equal(12), Some((10, 5, &"b")));
/// ```
#[derive(Clone)]
pub struct RangeMap<V> {
    raw: RawTree<(), V, XOffset>,
}

impl<V> RangeMap<V> {
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

    /// Number of intervals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    /// Total covered length: the sum of every interval's length.
    #[must_use]
    pub fn extent(&self) -> i64 {
        self.raw.extents.x
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Locates the interval starting exactly at `start`, with its length.
    fn span_at(&self, start: i64) -> Option<(Handle, i64)> {
        let descent = self.raw.descend_position_exact(start, Axis::X);
        let found = descent.found?;
        let end = descent.succ_abs.map_or(self.raw.extents.x, |abs| abs.x);
        Some((found, end - start))
    }

    /// Inserts an interval at `start`, shifting the interval currently at
    /// `start` and everything after it right by `length`. `start` must be
    /// an existing interval's start or the extent. Returns `Ok(false)`
    /// when it is neither.
    ///
    /// # Errors
    ///
    /// [`Error::NonPositiveLength`], [`Error::NegativeStart`],
    /// [`Error::Overflow`], [`Error::CapacityExhausted`]; the map is
    /// unchanged in every failure case.
    pub fn try_insert(&mut self, start: i64, length: i64, value: V) -> Result<bool, Error> {
        if length < 1 {
            return Err(Error::NonPositiveLength);
        }
        if start < 0 {
            return Err(Error::NegativeStart);
        }
        if start != self.raw.extents.x && self.span_at(start).is_none() {
            return Ok(false);
        }
        let new_extent = self.raw.extents.x.checked_add(length).ok_or(Error::Overflow)?;
        if !self.raw.arena.can_alloc() {
            return Err(Error::CapacityExhausted);
        }

        self.raw.shift_from(start, Axis::X, XOffset { x: length });
        let (path, parent_abs) = self.raw.descend_position_insert(start, Axis::X);
        self.raw
            .attach_and_rebalance(path, parent_abs, XOffset { x: start }, (), value)?;
        self.raw.extents.x = new_extent;
        Ok(true)
    }

    /// Like [`RangeMap::try_insert`], but a bad start coordinate is a
    /// domain error.
    ///
    /// # Errors
    ///
    /// [`Error::PositionNotFound`] past the extent,
    /// [`Error::PositionOccupied`] inside an existing interval, plus the
    /// errors of [`RangeMap::try_insert`].
    pub fn insert(&mut self, start: i64, length: i64, value: V) -> Result<(), Error> {
        if self.try_insert(start, length, value)? {
            Ok(())
        } else if start > self.raw.extents.x {
            Err(Error::PositionNotFound)
        } else {
            Err(Error::PositionOccupied)
        }
    }

    /// Removes the interval starting exactly at `start`, shifting
    /// everything after it left by its length.
    pub fn try_delete(&mut self, start: i64) -> Option<V> {
        let descent = self.raw.descend_position_exact(start, Axis::X);
        let found = descent.found?;
        let length = descent.succ_abs.map_or(self.raw.extents.x, |abs| abs.x) - start;
        let node = self.raw.detach_and_rebalance(found, descent.path);
        self.raw.shift_from(start, Axis::X, XOffset { x: -length });
        self.raw.extents.x -= length;
        Some(node.value)
    }

    /// Like [`RangeMap::try_delete`], but absence is a domain error.
    ///
    /// # Errors
    ///
    /// [`Error::PositionNotFound`].
    pub fn delete(&mut self, start: i64) -> Result<V, Error> {
        self.try_delete(start).ok_or(Error::PositionNotFound)
    }

    /// The length and value of the interval starting exactly at `start`.
    #[must_use]
    pub fn try_get(&self, start: i64) -> Option<(i64, &V)> {
        let (h, length) = self.span_at(start)?;
        Some((length, &self.raw.arena.get(h).value))
    }

    /// Like [`RangeMap::try_get`], but absence is a domain error.
    ///
    /// # Errors
    ///
    /// [`Error::PositionNotFound`].
    pub fn get(&self, start: i64) -> Result<(i64, &V), Error> {
        self.try_get(start).ok_or(Error::PositionNotFound)
    }

    /// Resizes the interval starting exactly at `start`, shifting every
    /// later interval by the difference. Returns `Ok(false)` when no
    /// interval starts there.
    ///
    /// # Errors
    ///
    /// [`Error::NonPositiveLength`], [`Error::Overflow`].
    pub fn try_set_length(&mut self, start: i64, length: i64) -> Result<bool, Error> {
        if length < 1 {
            return Err(Error::NonPositiveLength);
        }
        let Some((_, old_length)) = self.span_at(start) else {
            return Ok(false);
        };
        let delta = length - old_length;
        if delta == 0 {
            return Ok(true);
        }
        let new_extent = self.raw.extents.x.checked_add(delta).ok_or(Error::Overflow)?;

        self.raw.shift_from(start + old_length, Axis::X, XOffset { x: delta });
        // Coordinates moved, so direct-handle cursors are stale.
        self.raw.version = self.raw.version.wrapping_add(1);
        self.raw.extents.x = new_extent;
        Ok(true)
    }

    /// Like [`RangeMap::try_set_length`], but a bad start coordinate is a
    /// domain error.
    ///
    /// # Errors
    ///
    /// [`Error::PositionNotFound`], plus the errors of
    /// [`RangeMap::try_set_length`].
    pub fn set_length(&mut self, start: i64, length: i64) -> Result<(), Error> {
        if self.try_set_length(start, length)? { Ok(()) } else { Err(Error::PositionNotFound) }
    }

    /// Replaces the value of the interval starting exactly at `start`,
    /// returning the old value.
    pub fn try_set_value(&mut self, start: i64, value: V) -> Option<V> {
        let (h, _) = self.span_at(start)?;
        Some(core::mem::replace(&mut self.raw.arena.get_mut(h).value, value))
    }

    /// Like [`RangeMap::try_set_value`], but absence is a domain error.
    ///
    /// # Errors
    ///
    /// [`Error::PositionNotFound`].
    pub fn set_value(&mut self, start: i64, value: V) -> Result<V, Error> {
        self.try_set_value(start, value).ok_or(Error::PositionNotFound)
    }

    // ─── Nearest-position queries ────────────────────────────────────────

    /// The last interval starting strictly before `position`, as
    /// `(start, length, value)`.
    #[must_use]
    pub fn nearest_less(&self, position: i64) -> Option<(i64, i64, &V)> {
        self.nearest(position, false, false)
    }

    /// The last interval starting at or before `position`.
    #[must_use]
    pub fn nearest_less_or_equal(&self, position: i64) -> Option<(i64, i64, &V)> {
        self.nearest(position, false, true)
    }

    /// The first interval starting strictly after `position`.
    #[must_use]
    pub fn nearest_greater(&self, position: i64) -> Option<(i64, i64, &V)> {
        self.nearest(position, true, false)
    }

    /// The first interval starting at or after `position`.
    #[must_use]
    pub fn nearest_greater_or_equal(&self, position: i64) -> Option<(i64, i64, &V)> {
        self.nearest(position, true, true)
    }

    fn nearest(&self, position: i64, greater: bool, or_equal: bool) -> Option<(i64, i64, &V)> {
        let (h, abs) = self.raw.nearest_by_position(position, Axis::X, greater, or_equal)?;
        let (_, length) = self.span_at(abs.x)?;
        Some((abs.x, length, &self.raw.arena.get(h).value))
    }

    #[must_use]
    pub fn first(&self) -> Option<(i64, i64, &V)> {
        let (h, abs) = self.raw.first()?;
        let (_, length) = self.span_at(abs.x)?;
        Some((abs.x, length, &self.raw.arena.get(h).value))
    }

    #[must_use]
    pub fn last(&self) -> Option<(i64, i64, &V)> {
        let (h, abs) = self.raw.last()?;
        Some((abs.x, self.raw.extents.x - abs.x, &self.raw.arena.get(h).value))
    }

    // ─── Enumeration ─────────────────────────────────────────────────────

    /// Iterates in position order, yielding `(start, length, value)`.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            raw: &self.raw,
            stack: self.raw.walk_stack(true),
        }
    }

    #[must_use]
    pub fn fast_cursor(&self, direction: Direction) -> FastCursor {
        self.raw.fast_cursor(direction)
    }

    /// A fast cursor positioned so the first step yields the first
    /// interval starting at or after (forward) / at or before (backward)
    /// `position`.
    #[must_use]
    pub fn fast_cursor_at(&self, position: i64, direction: Direction) -> FastCursor {
        self.raw.fast_cursor_at_position(position, Axis::X, direction)
    }

    /// Advances a fast cursor, yielding `(start, length, value)`.
    ///
    /// # Errors
    ///
    /// [`Error::CursorInvalidated`] after any structural or length change.
    pub fn fast_next(&self, cursor: &mut FastCursor) -> Result<Option<(i64, i64, &V)>, Error> {
        // A backward cursor's previous yield is the current interval's end.
        let prev = cursor.current();
        let Some((h, start, _)) = self.raw.fast_step(cursor)? else {
            return Ok(None);
        };
        let end = match cursor.direction() {
            Direction::Forward => cursor.peek_next().map_or(self.raw.extents.x, |(_, x, _)| x),
            Direction::Backward => prev.map_or(self.raw.extents.x, |(_, x, _)| x),
        };
        Ok(Some((start, end - start, &self.raw.arena.get(h).value)))
    }

    /// Writes a value at the cursor's current interval without
    /// invalidating other cursors (no start or length changes).
    ///
    /// # Errors
    ///
    /// [`Error::CursorInvalidated`] if the map changed structurally since
    /// the cursor was created, or if the cursor has not yielded an
    /// interval.
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
    pub fn robust_cursor(&self, direction: Direction) -> RobustCursor<i64> {
        self.raw.robust_cursor(None, direction)
    }

    #[must_use]
    pub fn robust_cursor_at(&self, position: i64, direction: Direction) -> RobustCursor<i64> {
        self.raw.robust_cursor(Some(position), direction)
    }

    /// Advances a robust cursor by re-querying around its last start
    /// coordinate, yielding `(start, length, value)`.
    pub fn robust_next(&self, cursor: &mut RobustCursor<i64>) -> Option<(i64, i64, &V)> {
        let (h, abs) = self.raw.robust_step_position(cursor, Axis::X)?;
        let (_, length) = self.span_at(abs.x)?;
        Some((abs.x, length, &self.raw.arena.get(h).value))
    }

    /// Writes a value at the interval starting where the robust cursor
    /// last stopped.
    ///
    /// # Errors
    ///
    /// [`Error::CursorInvalidated`] if the map was cleared since the
    /// cursor was created, [`Error::PositionNotFound`] if no interval
    /// starts there anymore or the cursor has not yielded one.
    pub fn robust_set_value(&mut self, cursor: &RobustCursor<i64>, value: V) -> Result<V, Error> {
        self.raw.check_reset(cursor)?;
        let start = cursor.last.ok_or(Error::PositionNotFound)?;
        self.set_value(start, value)
    }
}

impl<V> Default for RangeMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for RangeMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (start, length, value) in self.iter() {
            list.entry(&(start, length, value));
        }
        list.finish()
    }
}

/// Borrowed in-order iterator over a [`RangeMap`], yielding
/// `(start, length, value)`.
pub struct Iter<'a, V> {
    raw: &'a RawTree<(), V, XOffset>,
    stack: WalkStack,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (i64, i64, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let (h, start, _) = self.raw.walk_next(&mut self.stack)?;
        let end = self.stack.last().map_or(self.raw.extents.x, |&(_, x, _)| x);
        Some((start, end - start, &self.raw.arena.get(h).value))
    }
}

impl<'a, V> IntoIterator for &'a RangeMap<V> {
    type Item = (i64, i64, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
impl<V> RangeMap<V> {
    pub(crate) fn validate_invariants(&self) {
        self.raw.validate_invariants();
    }
}
