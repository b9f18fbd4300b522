//! Interval map on two independent axes: one ordered sequence of entries,
//! each covering an interval on the x axis and an interval on the y axis
//! at the same time.

use core::fmt;

use crate::cursor::{CursorWrite, FastCursor, RobustCursor};
use crate::error::Error;
use crate::options::{Axis, Direction, Options};
use crate::raw::handle::Handle;
use crate::raw::node::{Axes, XyOffset};
use crate::raw::tree::{RawTree, WalkStack};

/// The two intervals a [`Range2Map`] entry covers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Span2 {
    pub x_start: i64,
    pub x_length: i64,
    pub y_start: i64,
    pub y_length: i64,
}

impl Span2 {
    #[must_use]
    pub fn start(&self, axis: Axis) -> i64 {
        match axis {
            Axis::X => self.x_start,
            Axis::Y => self.y_start,
        }
    }

    #[must_use]
    pub fn length(&self, axis: Axis) -> i64 {
        match axis {
            Axis::X => self.x_length,
            Axis::Y => self.y_length,
        }
    }
}

/// A map of contiguous intervals on two axes at once.
///
/// Entries are a single ordered sequence; the n-th entry covers the n-th
/// interval on the x axis and the n-th interval on the y axis, so both
/// axes are fully covered from 0 to their [`extent`](Range2Map::extent).
/// Operations address an entry by its start coordinate on either axis;
/// the start on the other axis is derived from the addressed entry (or
/// from the other extent when appending).
///
/// # Examples
///
/// ```
/// use spantree::{Axis, Range2Map};
///
/// let mut map = Range2Map::new();
/// map.insert(Axis::X, 0, 10, 1, "a").unwrap();
/// map.insert(Axis::X, 10, 5, 2, "b").unwrap();
///
/// assert_eq!(map.extent(Axis::X), 15);
/// assert_eq!(map.extent(Axis::Y), 3);
///
/// let (span, value) = map.get(Axis::Y, 1).unwrap();
/// assert_eq!(*value, "b");
/// assert_eq!((span.x_start, span.x_length), (10, 5));
/// ```
#[derive(Clone)]
pub struct Range2Map<V> {
    raw: RawTree<(), V, XyOffset>,
}

impl<V> Range2Map<V> {
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

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    /// Total covered length on `axis`.
    #[must_use]
    pub fn extent(&self, axis: Axis) -> i64 {
        self.raw.extents.get(axis)
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }

    fn span_of(&self, abs: XyOffset, succ: Option<XyOffset>) -> Span2 {
        let end = succ.unwrap_or(self.raw.extents);
        Span2 {
            x_start: abs.x,
            x_length: end.x - abs.x,
            y_start: abs.y,
            y_length: end.y - abs.y,
        }
    }

    /// Locates the entry starting exactly at `start` on `axis`.
    fn entry_at(&self, axis: Axis, start: i64) -> Option<(Handle, Span2)> {
        let descent = self.raw.descend_position_exact(start, axis);
        let found = descent.found?;
        Some((found, self.span_of(descent.abs, descent.succ_abs)))
    }

    /// Inserts an entry whose start on `axis` is `start`, shifting the
    /// entry currently there and everything after it by the new lengths on
    /// both axes. The start on the other axis is derived. `start` must be
    /// an existing entry's start on `axis` or that axis's extent; returns
    /// `Ok(false)` when it is neither.
    ///
    /// # Errors
    ///
    /// [`Error::NonPositiveLength`], [`Error::NegativeStart`],
    /// [`Error::Overflow`], [`Error::CapacityExhausted`]; the map is
    /// unchanged in every failure case.
    pub fn try_insert(
        &mut self,
        axis: Axis,
        start: i64,
        x_length: i64,
        y_length: i64,
        value: V,
    ) -> Result<bool, Error> {
        if x_length < 1 || y_length < 1 {
            return Err(Error::NonPositiveLength);
        }
        if start < 0 {
            return Err(Error::NegativeStart);
        }
        let starts = if start == self.raw.extents.get(axis) {
            self.raw.extents
        } else {
            match self.entry_at(axis, start) {
                Some((_, span)) => XyOffset::from_xy(span.x_start, span.y_start),
                None => return Ok(false),
            }
        };
        let lengths = XyOffset::from_xy(x_length, y_length);
        let new_x = self.raw.extents.x.checked_add(x_length).ok_or(Error::Overflow)?;
        let new_y = self.raw.extents.y.checked_add(y_length).ok_or(Error::Overflow)?;
        if !self.raw.arena.can_alloc() {
            return Err(Error::CapacityExhausted);
        }

        // Both axes order entries identically, so one descent on the
        // addressed axis shifts both coordinates.
        self.raw.shift_from(starts.get(axis), axis, lengths);
        let (path, parent_abs) = self.raw.descend_position_insert(starts.get(axis), axis);
        self.raw.attach_and_rebalance(path, parent_abs, starts, (), value)?;
        self.raw.extents = XyOffset::from_xy(new_x, new_y);
        Ok(true)
    }

    /// Like [`Range2Map::try_insert`], but a bad start coordinate is a
    /// domain error.
    ///
    /// # Errors
    ///
    /// [`Error::PositionNotFound`] past the extent,
    /// [`Error::PositionOccupied`] inside an existing interval, plus the
    /// errors of [`Range2Map::try_insert`].
    pub fn insert(
        &mut self,
        axis: Axis,
        start: i64,
        x_length: i64,
        y_length: i64,
        value: V,
    ) -> Result<(), Error> {
        if self.try_insert(axis, start, x_length, y_length, value)? {
            Ok(())
        } else if start > self.raw.extents.get(axis) {
            Err(Error::PositionNotFound)
        } else {
            Err(Error::PositionOccupied)
        }
    }

    /// Removes the entry starting exactly at `start` on `axis`, shifting
    /// everything after it back by its lengths on both axes.
    pub fn try_delete(&mut self, axis: Axis, start: i64) -> Option<V> {
        let descent = self.raw.descend_position_exact(start, axis);
        let found = descent.found?;
        let span = self.span_of(descent.abs, descent.succ_abs);
        let node = self.raw.detach_and_rebalance(found, descent.path);
        self.raw.shift_from(
            start,
            axis,
            XyOffset::from_xy(-span.x_length, -span.y_length),
        );
        self.raw.extents = XyOffset::from_xy(
            self.raw.extents.x - span.x_length,
            self.raw.extents.y - span.y_length,
        );
        Some(node.value)
    }

    /// Like [`Range2Map::try_delete`], but absence is a domain error.
    ///
    /// # Errors
    ///
    /// [`Error::PositionNotFound`].
    pub fn delete(&mut self, axis: Axis, start: i64) -> Result<V, Error> {
        self.try_delete(axis, start).ok_or(Error::PositionNotFound)
    }

    /// The spans and value of the entry starting exactly at `start` on
    /// `axis`.
    #[must_use]
    pub fn try_get(&self, axis: Axis, start: i64) -> Option<(Span2, &V)> {
        let (h, span) = self.entry_at(axis, start)?;
        Some((span, &self.raw.arena.get(h).value))
    }

    /// Like [`Range2Map::try_get`], but absence is a domain error.
    ///
    /// # Errors
    ///
    /// [`Error::PositionNotFound`].
    pub fn get(&self, axis: Axis, start: i64) -> Result<(Span2, &V), Error> {
        self.try_get(axis, start).ok_or(Error::PositionNotFound)
    }

    /// Resizes the entry starting exactly at `start` on `axis`, shifting
    /// every later entry by the differences on both axes. Returns
    /// `Ok(false)` when no entry starts there.
    ///
    /// # Errors
    ///
    /// [`Error::NonPositiveLength`], [`Error::Overflow`].
    pub fn try_set_lengths(
        &mut self,
        axis: Axis,
        start: i64,
        x_length: i64,
        y_length: i64,
    ) -> Result<bool, Error> {
        if x_length < 1 || y_length < 1 {
            return Err(Error::NonPositiveLength);
        }
        let Some((_, span)) = self.entry_at(axis, start) else {
            return Ok(false);
        };
        let delta = XyOffset::from_xy(x_length - span.x_length, y_length - span.y_length);
        if delta == XyOffset::default() {
            return Ok(true);
        }
        let new_x = self.raw.extents.x.checked_add(delta.x).ok_or(Error::Overflow)?;
        let new_y = self.raw.extents.y.checked_add(delta.y).ok_or(Error::Overflow)?;

        self.raw
            .shift_from(span.start(axis) + span.length(axis), axis, delta);
        // Coordinates moved, so direct-handle cursors are stale.
        self.raw.version = self.raw.version.wrapping_add(1);
        self.raw.extents = XyOffset::from_xy(new_x, new_y);
        Ok(true)
    }

    /// Like [`Range2Map::try_set_lengths`], but a bad start coordinate is
    /// a domain error.
    ///
    /// # Errors
    ///
    /// [`Error::PositionNotFound`], plus the errors of
    /// [`Range2Map::try_set_lengths`].
    pub fn set_lengths(
        &mut self,
        axis: Axis,
        start: i64,
        x_length: i64,
        y_length: i64,
    ) -> Result<(), Error> {
        if self.try_set_lengths(axis, start, x_length, y_length)? {
            Ok(())
        } else {
            Err(Error::PositionNotFound)
        }
    }

    /// Replaces the value of the entry starting exactly at `start` on
    /// `axis`, returning the old value.
    pub fn try_set_value(&mut self, axis: Axis, start: i64, value: V) -> Option<V> {
        let (h, _) = self.entry_at(axis, start)?;
        Some(core::mem::replace(&mut self.raw.arena.get_mut(h).value, value))
    }

    /// Like [`Range2Map::try_set_value`], but absence is a domain error.
    ///
    /// # Errors
    ///
    /// [`Error::PositionNotFound`].
    pub fn set_value(&mut self, axis: Axis, start: i64, value: V) -> Result<V, Error> {
        self.try_set_value(axis, start, value).ok_or(Error::PositionNotFound)
    }

    // ─── Nearest-position queries ────────────────────────────────────────

    /// The last entry starting strictly before `position` on `axis`.
    #[must_use]
    pub fn nearest_less(&self, axis: Axis, position: i64) -> Option<(Span2, &V)> {
        self.nearest(axis, position, false, false)
    }

    /// The last entry starting at or before `position` on `axis`.
    #[must_use]
    pub fn nearest_less_or_equal(&self, axis: Axis, position: i64) -> Option<(Span2, &V)> {
        self.nearest(axis, position, false, true)
    }

    /// The first entry starting strictly after `position` on `axis`.
    #[must_use]
    pub fn nearest_greater(&self, axis: Axis, position: i64) -> Option<(Span2, &V)> {
        self.nearest(axis, position, true, false)
    }

    /// The first entry starting at or after `position` on `axis`.
    #[must_use]
    pub fn nearest_greater_or_equal(&self, axis: Axis, position: i64) -> Option<(Span2, &V)> {
        self.nearest(axis, position, true, true)
    }

    fn nearest(&self, axis: Axis, position: i64, greater: bool, or_equal: bool) -> Option<(Span2, &V)> {
        let (h, abs) = self.raw.nearest_by_position(position, axis, greater, or_equal)?;
        let (_, span) = self.entry_at(axis, abs.get(axis))?;
        Some((span, &self.raw.arena.get(h).value))
    }

    #[must_use]
    pub fn first(&self) -> Option<(Span2, &V)> {
        let (h, abs) = self.raw.first()?;
        let (_, span) = self.entry_at(Axis::X, abs.x)?;
        Some((span, &self.raw.arena.get(h).value))
    }

    #[must_use]
    pub fn last(&self) -> Option<(Span2, &V)> {
        let (h, abs) = self.raw.last()?;
        Some((self.span_of(abs, None), &self.raw.arena.get(h).value))
    }

    // ─── Enumeration ─────────────────────────────────────────────────────

    /// Iterates in position order, yielding `(span, value)`.
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

    /// A fast cursor positioned so the first step yields the first entry
    /// starting at or after (forward) / at or before (backward) `position`
    /// on `axis`.
    #[must_use]
    pub fn fast_cursor_at(&self, axis: Axis, position: i64, direction: Direction) -> FastCursor {
        self.raw.fast_cursor_at_position(position, axis, direction)
    }

    /// Advances a fast cursor, yielding `(span, value)`.
    ///
    /// # Errors
    ///
    /// [`Error::CursorInvalidated`] after any structural or length change.
    pub fn fast_next(&self, cursor: &mut FastCursor) -> Result<Option<(Span2, &V)>, Error> {
        // A backward cursor's previous yield is the current entry's end.
        let prev = cursor.current();
        let Some((h, x, y)) = self.raw.fast_step(cursor)? else {
            return Ok(None);
        };
        let end = match cursor.direction() {
            Direction::Forward => cursor.peek_next(),
            Direction::Backward => prev,
        };
        let span = self.span_of(
            XyOffset::from_xy(x, y),
            end.map(|(_, ex, ey)| XyOffset::from_xy(ex, ey)),
        );
        Ok(Some((span, &self.raw.arena.get(h).value)))
    }

    /// Writes a value at the cursor's current entry without invalidating
    /// other cursors (no start or length changes on either axis).
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

    /// A robust cursor stepping by start coordinate on `axis`.
    #[must_use]
    pub fn robust_cursor(&self, axis: Axis, direction: Direction) -> Robust2Cursor {
        Robust2Cursor {
            inner: self.raw.robust_cursor(None, direction),
            axis,
        }
    }

    /// A robust cursor that starts at the first entry at-or-after
    /// (forward) / at-or-before (backward) `position` on `axis`.
    #[must_use]
    pub fn robust_cursor_at(&self, axis: Axis, position: i64, direction: Direction) -> Robust2Cursor {
        Robust2Cursor {
            inner: self.raw.robust_cursor(Some(position), direction),
            axis,
        }
    }

    /// Advances a robust cursor by re-querying around its last start
    /// coordinate, yielding `(span, value)`.
    pub fn robust_next(&self, cursor: &mut Robust2Cursor) -> Option<(Span2, &V)> {
        let (h, abs) = self.raw.robust_step_position(&mut cursor.inner, cursor.axis)?;
        let (_, span) = self.entry_at(cursor.axis, abs.get(cursor.axis))?;
        Some((span, &self.raw.arena.get(h).value))
    }

    /// Writes a value at the entry where the robust cursor last stopped
    /// on its axis.
    ///
    /// # Errors
    ///
    /// [`Error::CursorInvalidated`] if the map was cleared since the
    /// cursor was created, [`Error::PositionNotFound`] if no entry starts
    /// there anymore or the cursor has not yielded one.
    pub fn robust_set_value(&mut self, cursor: &Robust2Cursor, value: V) -> Result<V, Error> {
        self.raw.check_reset(&cursor.inner)?;
        let start = cursor.inner.last.ok_or(Error::PositionNotFound)?;
        self.set_value(cursor.axis, start, value)
    }
}

impl<V> Default for Range2Map<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for Range2Map<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (span, value) in self.iter() {
            list.entry(&(span, value));
        }
        list.finish()
    }
}

/// Robust cursor over a [`Range2Map`], bound to the axis it steps on.
pub struct Robust2Cursor {
    inner: RobustCursor<i64>,
    axis: Axis,
}

/// Borrowed in-order iterator over a [`Range2Map`], yielding
/// `(span, value)`.
pub struct Iter<'a, V> {
    raw: &'a RawTree<(), V, XyOffset>,
    stack: WalkStack,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (Span2, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let (h, x, y) = self.raw.walk_next(&mut self.stack)?;
        let end = self
            .stack
            .last()
            .map_or(self.raw.extents, |&(_, ex, ey)| XyOffset::from_xy(ex, ey));
        let span = Span2 {
            x_start: x,
            x_length: end.x - x,
            y_start: y,
            y_length: end.y - y,
        };
        Some((span, &self.raw.arena.get(h).value))
    }
}

impl<'a, V> IntoIterator for &'a Range2Map<V> {
    type Item = (Span2, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
impl<V> Range2Map<V> {
    pub(crate) fn validate_invariants(&self) {
        self.raw.validate_invariants();
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use alloc::vec::Vec;

    use proptest::prelude::*;

    use super::*;
    use crate::options::Balance;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Replays random boundary edits, addressed by a random axis,
        /// against a vector of length pairs.
        #[test]
        fn matches_two_axis_model(
            red_black in any::<bool>(),
            ops in prop::collection::vec(
                (0_u8..3, any::<bool>(), any::<u16>(), 1_i64..8, 1_i64..8),
                0..96,
            ),
        ) {
            let options = Options::default()
                .balance(if red_black { Balance::RedBlack } else { Balance::Avl });
            let mut map: Range2Map<u32> = Range2Map::with_options(options).unwrap();
            let mut model: Vec<(i64, i64, u32)> = Vec::new();
            let mut next_id = 0_u32;

            for (op, by_y, which, x_length, y_length) in ops {
                let axis = if by_y { Axis::Y } else { Axis::X };
                let which = which as usize;
                let start_on = |model: &Vec<(i64, i64, u32)>, index: usize| -> i64 {
                    model[..index]
                        .iter()
                        .map(|&(x, y, _)| if by_y { y } else { x })
                        .sum()
                };
                match op {
                    0 => {
                        let index = which % (model.len() + 1);
                        map.insert(axis, start_on(&model, index), x_length, y_length, next_id)
                            .unwrap();
                        model.insert(index, (x_length, y_length, next_id));
                        next_id += 1;
                    }
                    1 if !model.is_empty() => {
                        let index = which % model.len();
                        let start = start_on(&model, index);
                        let (.., id) = model.remove(index);
                        prop_assert_eq!(map.try_delete(axis, start), Some(id));
                    }
                    2 if !model.is_empty() => {
                        let index = which % model.len();
                        map.set_lengths(axis, start_on(&model, index), x_length, y_length).unwrap();
                        model[index] = (x_length, y_length, model[index].2);
                    }
                    _ => {}
                }
                map.validate_invariants();
                prop_assert_eq!(map.extent(Axis::X), model.iter().map(|(x, ..)| x).sum::<i64>());
                prop_assert_eq!(map.extent(Axis::Y), model.iter().map(|(_, y, _)| y).sum::<i64>());
            }

            let (mut x, mut y) = (0, 0);
            for ((span, &v), &(xl, yl, mv)) in map.iter().zip(model.iter()) {
                prop_assert_eq!(span, Span2 { x_start: x, x_length: xl, y_start: y, y_length: yl });
                prop_assert_eq!(v, mv);
                x += xl;
                y += yl;
            }
            prop_assert_eq!(map.len(), model.len());
        }
    }

    fn spans(map: &Range2Map<&str>) -> Vec<(i64, i64, i64, i64)> {
        map.iter()
            .map(|(s, _)| (s.x_start, s.x_length, s.y_start, s.y_length))
            .collect()
    }

    #[test]
    fn both_axes_track_independent_lengths() {
        let mut map = Range2Map::new();
        map.insert(Axis::X, 0, 10, 1, "a").unwrap();
        map.insert(Axis::X, 10, 5, 2, "b").unwrap();
        map.validate_invariants();

        assert_eq!(map.extent(Axis::X), 15);
        assert_eq!(map.extent(Axis::Y), 3);
        assert_eq!(spans(&map), [(0, 10, 0, 1), (10, 5, 1, 2)]);

        // Addressing by the y axis reaches the same entries.
        let (span, value) = map.get(Axis::Y, 1).unwrap();
        assert_eq!(*value, "b");
        assert_eq!(span.start(Axis::X), 10);
    }

    #[test]
    fn insert_derives_the_other_start() {
        let mut map = Range2Map::new();
        map.insert(Axis::X, 0, 4, 2, "a").unwrap();
        map.insert(Axis::X, 4, 4, 2, "c").unwrap();
        // Displaces "c": its x start moves 4 -> 10, its y start 2 -> 5.
        map.insert(Axis::X, 4, 6, 3, "b").unwrap();
        map.validate_invariants();

        assert_eq!(spans(&map), [(0, 4, 0, 2), (4, 6, 2, 3), (10, 4, 5, 2)]);
        assert_eq!(map.extent(Axis::X), 14);
        assert_eq!(map.extent(Axis::Y), 7);
    }

    #[test]
    fn insert_rejects_bad_coordinates() {
        let mut map = Range2Map::new();
        map.insert(Axis::X, 0, 10, 10, ()).unwrap();

        assert_eq!(map.insert(Axis::X, 5, 1, 1, ()), Err(Error::PositionOccupied));
        assert_eq!(map.insert(Axis::Y, 11, 1, 1, ()), Err(Error::PositionNotFound));
        assert_eq!(map.insert(Axis::X, 0, 0, 1, ()), Err(Error::NonPositiveLength));
        assert_eq!(map.insert(Axis::X, 0, 1, -1, ()), Err(Error::NonPositiveLength));
        assert_eq!(map.insert(Axis::X, -1, 1, 1, ()), Err(Error::NegativeStart));
        map.validate_invariants();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn delete_closes_both_axes() {
        let mut map = Range2Map::new();
        map.insert(Axis::X, 0, 3, 1, "a").unwrap();
        map.insert(Axis::X, 3, 4, 2, "b").unwrap();
        map.insert(Axis::X, 7, 5, 3, "c").unwrap();

        // Delete by the y axis: "b" starts at y = 1.
        assert_eq!(map.try_delete(Axis::Y, 1), Some("b"));
        map.validate_invariants();
        assert_eq!(spans(&map), [(0, 3, 0, 1), (3, 5, 1, 3)]);
        assert_eq!(map.extent(Axis::X), 8);
        assert_eq!(map.extent(Axis::Y), 4);

        assert_eq!(map.try_delete(Axis::X, 1), None);
    }

    #[test]
    fn set_lengths_shifts_later_entries() {
        let mut map = Range2Map::new();
        map.insert(Axis::X, 0, 3, 3, "a").unwrap();
        map.insert(Axis::X, 3, 4, 4, "b").unwrap();

        map.set_lengths(Axis::X, 0, 5, 1).unwrap();
        map.validate_invariants();
        assert_eq!(spans(&map), [(0, 5, 0, 1), (5, 4, 1, 4)]);
        assert_eq!(map.extent(Axis::X), 9);
        assert_eq!(map.extent(Axis::Y), 5);

        assert_eq!(map.set_lengths(Axis::X, 1, 2, 2), Err(Error::PositionNotFound));
    }

    #[test]
    fn nearest_by_either_axis() {
        let mut map = Range2Map::new();
        map.insert(Axis::X, 0, 10, 1, "a").unwrap();
        map.insert(Axis::X, 10, 5, 2, "b").unwrap();

        let (span, value) = map.nearest_less_or_equal(Axis::X, 12).unwrap();
        assert_eq!((*value, span.x_start), ("b", 10));
        let (span, value) = map.nearest_less_or_equal(Axis::Y, 0).unwrap();
        assert_eq!((*value, span.y_start), ("a", 0));
        assert_eq!(map.nearest_greater(Axis::Y, 2), None);
    }

    #[test]
    fn cursors_yield_full_spans() {
        let mut map = Range2Map::new();
        map.insert(Axis::X, 0, 2, 5, ()).unwrap();
        map.insert(Axis::X, 2, 3, 1, ()).unwrap();
        map.insert(Axis::X, 5, 1, 4, ()).unwrap();

        let expected = [(0, 2, 0, 5), (2, 3, 5, 1), (5, 1, 6, 4)];

        let mut cursor = map.fast_cursor(Direction::Forward);
        let mut forward = Vec::new();
        while let Some((s, _)) = map.fast_next(&mut cursor).unwrap() {
            forward.push((s.x_start, s.x_length, s.y_start, s.y_length));
        }
        assert_eq!(forward, expected);

        let mut cursor = map.fast_cursor(Direction::Backward);
        let mut backward = Vec::new();
        while let Some((s, _)) = map.fast_next(&mut cursor).unwrap() {
            backward.push((s.x_start, s.x_length, s.y_start, s.y_length));
        }
        backward.reverse();
        assert_eq!(backward, expected);

        let mut cursor = map.robust_cursor(Axis::Y, Direction::Forward);
        let mut by_y = Vec::new();
        while let Some((s, _)) = map.robust_next(&mut cursor) {
            by_y.push((s.x_start, s.x_length, s.y_start, s.y_length));
        }
        assert_eq!(by_y, expected);
    }

    #[test]
    fn cursor_value_writes() {
        let mut map = Range2Map::new();
        map.insert(Axis::X, 0, 2, 1, "a").unwrap();
        map.insert(Axis::X, 2, 3, 2, "b").unwrap();

        let mut cursor = map.fast_cursor(Direction::Forward);
        map.fast_next(&mut cursor).unwrap();
        let write = cursor.write_context().unwrap();
        assert_eq!(map.fast_set_value_at(&cursor, write, "a2"), Ok("a"));
        assert_eq!(map.fast_set_value(&cursor, "a3"), Ok("a2"));

        // Backward by y: the first yield is the highest y start.
        let mut cursor = map.robust_cursor(Axis::Y, Direction::Backward);
        map.robust_next(&mut cursor);
        assert_eq!(map.robust_set_value(&cursor, "b2"), Ok("b"));
        assert_eq!(map.try_get(Axis::Y, 1), Some((Span2 { x_start: 2, x_length: 3, y_start: 1, y_length: 2 }, &"b2")));
    }
}
