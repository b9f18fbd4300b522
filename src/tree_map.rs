//! Ordered key/value dictionary, optionally threaded for O(1) amortized
//! traversal.

use core::borrow::Borrow;
use core::fmt;

use crate::cursor::{CursorWrite, FastCursor, RobustCursor};
use crate::error::Error;
use crate::options::{Direction, Options};
use crate::raw::tree::{RawTree, WalkStack};

/// An ordered map over a balanced binary search tree.
///
/// Balancing strategy, storage backend and allocation mode are chosen at
/// construction through [`Options`] and are immutable afterwards. The
/// [`threaded`](TreeMap::threaded) constructor embeds in-order
/// predecessor/successor links in unused child slots, making fast-cursor
/// traversal stackless.
///
/// # Examples
///
/// ```
/// use spantree::TreeMap;
///
/// let mut map = TreeMap::new();
/// assert!(map.try_insert(3, "c").unwrap());
/// assert!(map.try_insert(1, "a").unwrap());
/// assert!(!map.try_insert(3, "x").unwrap());
///
/// assert_eq!(map.get(&3), Some(&"c"));
/// assert_eq!(map.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [1, 3]);
/// ```
#[derive(Clone)]
pub struct TreeMap<K, V> {
    raw: RawTree<K, V, ()>,
}

impl<K: Ord, V> TreeMap<K, V> {
    /// Creates an empty map with default [`Options`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(Options::default()).expect("default options are always valid")
    }

    /// Creates an empty threaded map with default [`Options`].
    #[must_use]
    pub fn threaded() -> Self {
        Self {
            raw: RawTree::new(Options::default(), true).expect("default options are always valid"),
        }
    }

    /// Creates an empty map.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedAllocationMode`] for
    /// [`DynamicDiscard`](crate::AllocationMode::DynamicDiscard) with slab
    /// storage, [`Error::CapacityExhausted`] when the requested capacity
    /// exceeds the maximum handle index.
    pub fn with_options(options: Options) -> Result<Self, Error> {
        Ok(Self { raw: RawTree::new(options, false)? })
    }

    /// Threaded counterpart of [`TreeMap::with_options`].
    ///
    /// # Errors
    ///
    /// As for [`TreeMap::with_options`].
    pub fn threaded_with_options(options: Options) -> Result<Self, Error> {
        Ok(Self { raw: RawTree::new(options, true)? })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    /// Removes every entry. Array-backed storage keeps its reservation.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Inserts `key` if it is absent. Returns whether the map changed.
    ///
    /// # Errors
    ///
    /// [`Error::CapacityExhausted`] under
    /// [`PreallocatedFixed`](crate::AllocationMode::PreallocatedFixed)
    /// allocation; the map is left unchanged.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<bool, Error> {
        let descent = self.raw.descend_key(&key);
        if descent.found.is_some() {
            return Ok(false);
        }
        self.raw.attach_and_rebalance(descent.path, (), (), key, value)?;
        Ok(true)
    }

    /// Inserts `key`, which must be absent.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateKey`] if the key is present, plus the capacity
    /// errors of [`TreeMap::try_insert`].
    pub fn insert(&mut self, key: K, value: V) -> Result<(), Error> {
        if self.try_insert(key, value)? { Ok(()) } else { Err(Error::DuplicateKey) }
    }

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

    /// Like [`TreeMap::get`], but absence is a domain error.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`].
    pub fn value<Q>(&self, key: &Q) -> Result<&V, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Replaces the value of an existing key, returning the old value, or
    /// `None` if the key is absent.
    pub fn try_set_value<Q>(&mut self, key: &Q, value: V) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_mut(key).map(|slot| core::mem::replace(slot, value))
    }

    /// Like [`TreeMap::try_set_value`], but absence is a domain error.
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

    /// Removes `key`, returning its value if it was present.
    pub fn try_remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let descent = self.raw.descend_key(key);
        let found = descent.found?;
        Some(self.raw.detach_and_rebalance(found, descent.path).value)
    }

    /// Like [`TreeMap::try_remove`], but absence is a domain error.
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

    // ─── Nearest-neighbor queries ────────────────────────────────────────

    /// The greatest entry strictly below `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use spantree::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// map.insert(10, "a").unwrap();
    /// map.insert(20, "b").unwrap();
    /// assert_eq!(map.nearest_less(&20), Some((&10, &"a")));
    /// assert_eq!(map.nearest_less_or_equal(&20), Some((&20, &"b")));
    /// assert_eq!(map.nearest_less(&10), None);
    /// ```
    #[must_use]
    pub fn nearest_less<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.nearest(key, false, false)
    }

    /// The greatest entry at or below `key`.
    #[must_use]
    pub fn nearest_less_or_equal<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.nearest(key, false, true)
    }

    /// The smallest entry strictly above `key`.
    #[must_use]
    pub fn nearest_greater<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.nearest(key, true, false)
    }

    /// The smallest entry at or above `key`.
    #[must_use]
    pub fn nearest_greater_or_equal<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.nearest(key, true, true)
    }

    fn nearest<Q>(&self, key: &Q, greater: bool, or_equal: bool) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (h, ()) = self.raw.nearest_by_key(key, greater, or_equal)?;
        let node = self.raw.arena.get(h);
        Some((&node.key, &node.value))
    }

    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        let (h, ()) = self.raw.first()?;
        let node = self.raw.arena.get(h);
        Some((&node.key, &node.value))
    }

    #[must_use]
    pub fn last(&self) -> Option<(&K, &V)> {
        let (h, ()) = self.raw.last()?;
        let node = self.raw.arena.get(h);
        Some((&node.key, &node.value))
    }

    // ─── Conditional update ──────────────────────────────────────────────

    /// Inserts or overwrites `key` if `predicate` agrees, in a single
    /// descent. The predicate receives whether the key is resident and
    /// its current value; the exclusive borrow guarantees it cannot
    /// reenter the map. Returns whether the map changed.
    ///
    /// # Errors
    ///
    /// The capacity errors of [`TreeMap::try_insert`].
    pub fn insert_or_set_if<F>(&mut self, key: K, value: V, predicate: F) -> Result<bool, Error>
    where
        F: FnOnce(bool, Option<&V>) -> bool,
    {
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
                    self.raw.attach_and_rebalance(descent.path, (), (), key, value)?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    /// Removes `key` if it is resident and `predicate` agrees, in a
    /// single descent.
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
                    Some(self.raw.detach_and_rebalance(h, descent.path).value)
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

    // ─── Enumeration ─────────────────────────────────────────────────────

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            raw: &self.raw,
            stack: self.raw.walk_stack(true),
        }
    }

    /// A fast cursor positioned before the first (forward) or after the
    /// last (backward) entry. Stepping is O(1) amortized; any structural
    /// change invalidates it.
    #[must_use]
    pub fn fast_cursor(&self, direction: Direction) -> FastCursor {
        self.raw.fast_cursor(direction)
    }

    /// A fast cursor positioned so the first step yields the first entry
    /// at-or-after (forward) or at-or-before (backward) `key`.
    #[must_use]
    pub fn fast_cursor_at<Q>(&self, key: &Q, direction: Direction) -> FastCursor
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.raw.fast_cursor_at_key(key, direction)
    }

    /// Advances a fast cursor.
    ///
    /// # Errors
    ///
    /// [`Error::CursorInvalidated`] if the map changed structurally since
    /// the cursor was created.
    ///
    /// # Examples
    ///
    /// ```
    /// use spantree::{Direction, TreeMap};
    ///
    /// let mut map = TreeMap::new();
    /// map.insert(1, "a").unwrap();
    /// let mut cursor = map.fast_cursor(Direction::Forward);
    /// assert_eq!(map.fast_next(&mut cursor).unwrap(), Some((&1, &"a")));
    ///
    /// map.insert(2, "b").unwrap();
    /// assert!(map.fast_next(&mut cursor).is_err());
    /// ```
    pub fn fast_next(&self, cursor: &mut FastCursor) -> Result<Option<(&K, &V)>, Error> {
        Ok(self.raw.fast_step(cursor)?.map(|(h, _, _)| {
            let node = self.raw.arena.get(h);
            (&node.key, &node.value)
        }))
    }

    /// Writes a value at the cursor's current entry without invalidating
    /// other cursors (no key or offset changes).
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

    /// A robust cursor: O(log n) per step, tolerant of structural change.
    #[must_use]
    pub fn robust_cursor(&self, direction: Direction) -> RobustCursor<K> {
        self.raw.robust_cursor(None, direction)
    }

    /// A robust cursor that starts at the first entry at-or-after
    /// (forward) or at-or-before (backward) `key`.
    #[must_use]
    pub fn robust_cursor_at(&self, key: K, direction: Direction) -> RobustCursor<K> {
        self.raw.robust_cursor(Some(key), direction)
    }

    /// Advances a robust cursor by re-querying around its last key.
    /// Entries inserted or removed behind the cursor are invisible to it.
    pub fn robust_next(&self, cursor: &mut RobustCursor<K>) -> Option<(&K, &V)>
    where
        K: Clone,
    {
        let (h, ()) = self.raw.robust_step_key(cursor)?;
        let node = self.raw.arena.get(h);
        Some((&node.key, &node.value))
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

impl<K: Ord, V> Default for TreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for TreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        let mut stack = self.raw.walk_stack(true);
        while let Some((h, _, _)) = self.raw.walk_next(&mut stack) {
            let node = self.raw.arena.get(h);
            map.entry(&node.key, &node.value);
        }
        map.finish()
    }
}

/// Borrowed in-order iterator over a [`TreeMap`].
pub struct Iter<'a, K, V> {
    raw: &'a RawTree<K, V, ()>,
    stack: WalkStack,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let (h, _, _) = self.raw.walk_next(&mut self.stack)?;
        let node = self.raw.arena.get(h);
        Some((&node.key, &node.value))
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a TreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
impl<K: Ord, V> TreeMap<K, V> {
    pub(crate) fn validate_invariants(&self) {
        self.raw.validate_invariants();
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;

    use proptest::prelude::*;

    use super::*;
    use crate::options::{AllocationMode, Balance, Storage};

    fn all_configs() -> impl Iterator<Item = Options> {
        [Balance::Avl, Balance::RedBlack].into_iter().flat_map(|balance| {
            [Storage::Slab, Storage::Boxed]
                .into_iter()
                .map(move |storage| Options::default().balance(balance).storage(storage))
        })
    }

    #[test]
    fn in_order_enumeration() {
        for options in all_configs() {
            let mut map = TreeMap::with_options(options).unwrap();
            for key in [5, 3, 8, 1, 4, 7, 9] {
                map.insert(key, ()).unwrap();
                map.validate_invariants();
            }

            let mut cursor = map.fast_cursor(Direction::Forward);
            let mut keys = Vec::new();
            while let Some((&key, _)) = map.fast_next(&mut cursor).unwrap() {
                keys.push(key);
            }
            assert_eq!(keys, [1, 3, 4, 5, 7, 8, 9]);
        }
    }

    #[test]
    fn root_removal_keeps_invariants() {
        for options in all_configs() {
            let mut map = TreeMap::with_options(options).unwrap();
            for key in [4, 2, 6, 1, 3, 5, 7] {
                map.insert(key, key * 10).unwrap();
            }
            // 4 is the root after this insertion order.
            assert_eq!(map.try_remove(&4), Some(40));
            map.validate_invariants();
            assert_eq!(map.len(), 6);
            let keys: Vec<i32> = map.iter().map(|(&k, _)| k).collect();
            assert_eq!(keys, [1, 2, 3, 5, 6, 7]);
        }
    }

    #[test]
    fn fast_cursor_invalidation() {
        let mut map = TreeMap::new();
        map.insert(1, "a").unwrap();
        let mut cursor = map.fast_cursor(Direction::Forward);
        map.insert(2, "b").unwrap();
        assert_eq!(map.fast_next(&mut cursor), Err(Error::CursorInvalidated));
    }

    #[test]
    fn write_ticket_rejects_advanced_cursor() {
        let mut map = TreeMap::new();
        map.insert(1, 10).unwrap();
        map.insert(2, 20).unwrap();

        let mut cursor = map.fast_cursor(Direction::Forward);
        map.fast_next(&mut cursor).unwrap();
        let write = cursor.write_context().unwrap();
        assert_eq!(map.fast_set_value_at(&cursor, write, 11), Ok(10));

        map.fast_next(&mut cursor).unwrap();
        assert_eq!(map.fast_set_value_at(&cursor, write, 12), Err(Error::CursorInvalidated));
        assert_eq!(map.get(&1), Some(&11));
    }

    #[test]
    fn robust_cursor_survives_mutation() {
        let mut map = TreeMap::new();
        for key in [10, 20, 30] {
            map.insert(key, ()).unwrap();
        }
        let mut cursor = map.robust_cursor(Direction::Forward);
        assert_eq!(map.robust_next(&mut cursor).map(|(k, _)| *k), Some(10));

        map.insert(15, ()).unwrap();
        map.try_remove(&20);
        assert_eq!(map.robust_next(&mut cursor).map(|(k, _)| *k), Some(15));
        assert_eq!(map.robust_next(&mut cursor).map(|(k, _)| *k), Some(30));
        assert_eq!(map.robust_next(&mut cursor), None);

        // Not sticky: a later entry appears on the next step.
        map.insert(40, ()).unwrap();
        assert_eq!(map.robust_next(&mut cursor).map(|(k, _)| *k), Some(40));
    }

    #[test]
    fn robust_write_rejected_after_clear() {
        let mut map = TreeMap::new();
        map.insert(1, 10).unwrap();
        let mut cursor = map.robust_cursor(Direction::Forward);
        map.robust_next(&mut cursor);
        map.clear();
        map.insert(1, 10).unwrap();
        assert_eq!(map.robust_set_value(&cursor, 11), Err(Error::CursorInvalidated));
    }

    #[test]
    fn threaded_traversal_matches_plain() {
        let mut plain = TreeMap::new();
        let mut threaded = TreeMap::threaded();
        let keys = [50, 20, 80, 10, 30, 70, 90, 25, 35, 60, 15];
        for key in keys {
            plain.insert(key, key).unwrap();
            threaded.insert(key, key).unwrap();
            threaded.validate_invariants();
        }
        for key in [20, 90, 50] {
            plain.try_remove(&key);
            threaded.try_remove(&key);
            threaded.validate_invariants();
        }

        let expected: Vec<i32> = plain.iter().map(|(&k, _)| k).collect();
        let mut cursor = threaded.fast_cursor(Direction::Forward);
        let mut forward = Vec::new();
        while let Some((&k, _)) = threaded.fast_next(&mut cursor).unwrap() {
            forward.push(k);
        }
        assert_eq!(forward, expected);

        let mut cursor = threaded.fast_cursor(Direction::Backward);
        let mut backward = Vec::new();
        while let Some((&k, _)) = threaded.fast_next(&mut cursor).unwrap() {
            backward.push(k);
        }
        backward.reverse();
        assert_eq!(backward, expected);
    }

    #[test]
    fn conditional_update() {
        let mut map = TreeMap::new();
        assert!(map.insert_or_set_if(1, 10, |resident, value| {
            assert!(!resident);
            assert!(value.is_none());
            true
        }).unwrap());
        assert!(!map.insert_or_set_if(1, 99, |resident, value| {
            assert!(resident);
            assert_eq!(value, Some(&10));
            false
        }).unwrap());
        assert_eq!(map.get(&1), Some(&10));

        assert_eq!(map.remove_if(&1, |_, value| *value.unwrap() == 10), Some(10));
        assert!(map.is_empty());
    }

    #[test]
    fn conditional_update_consumes_the_predicate() {
        // Closures that can only be called once must be accepted on
        // every path, resident or not.
        let mut map = TreeMap::new();
        map.insert(1, 10).unwrap();

        let witness = String::from("resident");
        assert_eq!(map.remove_if(&1, move |resident, _| {
            drop(witness);
            resident
        }), Some(10));

        let witness = String::from("absent");
        assert_eq!(map.remove_if(&1, move |resident, _| {
            drop(witness);
            resident
        }), None);

        let witness = String::from("insert");
        assert!(map.insert_or_set_if(2, 20, move |_, value| {
            drop(witness);
            value.is_none()
        }).unwrap());
        assert_eq!(map.get(&2), Some(&20));
    }

    #[test]
    fn clone_is_independent() {
        let mut map = TreeMap::new();
        for key in 0..32 {
            map.insert(key, key).unwrap();
        }
        let mut copy = map.clone();
        copy.try_remove(&7);
        copy.try_set_value(&8, 80);

        assert_eq!(map.get(&7), Some(&7));
        assert_eq!(map.get(&8), Some(&8));
        assert_eq!(copy.len(), map.len() - 1);
        map.validate_invariants();
        copy.validate_invariants();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Replays random insert/remove sequences against the standard
        /// ordered map and checks every structural invariant after each
        /// step, across every configuration.
        #[test]
        fn matches_btreemap(
            threaded in any::<bool>(),
            red_black in any::<bool>(),
            boxed in any::<bool>(),
            ops in prop::collection::vec((any::<bool>(), 0_u8..48), 0..192),
        ) {
            use alloc::collections::BTreeMap;

            let options = Options::default()
                .balance(if red_black { Balance::RedBlack } else { Balance::Avl })
                .storage(if boxed { Storage::Boxed } else { Storage::Slab });
            let mut map = if threaded {
                TreeMap::threaded_with_options(options).unwrap()
            } else {
                TreeMap::with_options(options).unwrap()
            };
            let mut model: BTreeMap<u8, u8> = BTreeMap::new();

            for (remove, key) in ops {
                if remove {
                    prop_assert_eq!(map.try_remove(&key), model.remove(&key));
                } else {
                    let inserted = map.try_insert(key, key).unwrap();
                    prop_assert_eq!(inserted, model.insert(key, key).is_none());
                }
                map.validate_invariants();
                prop_assert_eq!(map.len(), model.len());
                prop_assert_eq!(map.get(&key), model.get(&key));
            }

            prop_assert!(map.iter().eq(model.iter()));
            if map.is_empty() {
                prop_assert_eq!(map.first(), None);
            }
        }
    }

    #[test]
    fn preallocated_capacity_errors() {
        let options = Options::default().allocation(AllocationMode::PreallocatedFixed).capacity(2);
        let mut map = TreeMap::with_options(options).unwrap();
        map.insert(1, ()).unwrap();
        map.insert(2, ()).unwrap();
        assert_eq!(map.try_insert(3, ()), Err(Error::CapacityExhausted));
        // The failed insert left the map unchanged.
        map.validate_invariants();
        assert_eq!(map.len(), 2);

        map.try_remove(&1);
        assert_eq!(map.try_insert(3, ()), Ok(true));
    }
}
