use alloc::boxed::Box;
use alloc::vec::Vec;

use super::handle::Handle;
use crate::error::Error;
use crate::options::{AllocationMode, Storage};

/// Owning node storage addressed by [`Handle`]s, with a free-list
/// discipline shared by both backends.
#[derive(Clone)]
pub(crate) struct Arena<T> {
    slots: Slots<T>,
    free: Vec<Handle>,
    mode: AllocationMode,
    fixed_capacity: usize,
    live: usize,
}

#[derive(Clone)]
enum Slots<T> {
    Slab(Vec<Option<T>>),
    Boxed(Vec<Option<Box<T>>>),
}

impl<T> Slots<T> {
    fn len(&self) -> usize {
        match self {
            Self::Slab(slots) => slots.len(),
            Self::Boxed(slots) => slots.len(),
        }
    }

    fn clear(&mut self) {
        match self {
            Self::Slab(slots) => slots.clear(),
            Self::Boxed(slots) => slots.clear(),
        }
    }

    fn push_empty(&mut self) {
        match self {
            Self::Slab(slots) => slots.push(None),
            Self::Boxed(slots) => slots.push(None),
        }
    }

    fn put(&mut self, handle: Handle, element: T) {
        match self {
            Self::Slab(slots) => slots[handle.to_index()] = Some(element),
            Self::Boxed(slots) => slots[handle.to_index()] = Some(Box::new(element)),
        }
    }

    fn take(&mut self, handle: Handle) -> Option<T> {
        match self {
            Self::Slab(slots) => slots[handle.to_index()].take(),
            Self::Boxed(slots) => slots[handle.to_index()].take().map(|boxed| *boxed),
        }
    }
}

impl<T> Arena<T> {
    pub(crate) fn new(storage: Storage, mode: AllocationMode, capacity: usize) -> Result<Self, Error> {
        if storage == Storage::Slab && mode == AllocationMode::DynamicDiscard {
            return Err(Error::UnsupportedAllocationMode);
        }
        if capacity > Handle::MAX {
            return Err(Error::CapacityExhausted);
        }

        let slots = match storage {
            Storage::Slab => Slots::Slab(Vec::with_capacity(capacity)),
            Storage::Boxed => Slots::Boxed(Vec::with_capacity(capacity)),
        };
        let mut arena = Self {
            slots,
            free: Vec::new(),
            mode,
            fixed_capacity: capacity,
            live: 0,
        };
        if mode == AllocationMode::PreallocatedFixed {
            arena.ensure_free(capacity);
        }
        Ok(arena)
    }

    /// Pre-populates the free list so `target` allocations succeed without
    /// further growth. Capacity was validated at construction.
    fn ensure_free(&mut self, target: usize) {
        while self.free.len() < target {
            self.slots.push_empty();
            self.free.push(Handle::from_index(self.slots.len() - 1));
        }
        // Keep handle reuse order deterministic: lowest index first.
        self.free.reverse();
    }

    pub(crate) const fn len(&self) -> usize {
        self.live
    }

    /// Whether the next `alloc` is guaranteed to succeed. Checked up front
    /// by operations that mutate offsets before allocating, so a capacity
    /// failure never leaves the tree partially updated.
    pub(crate) fn can_alloc(&self) -> bool {
        !self.free.is_empty()
            || (self.mode != AllocationMode::PreallocatedFixed && self.slots.len() < Handle::MAX)
    }

    pub(crate) fn alloc(&mut self, element: T) -> Result<Handle, Error> {
        let handle = if let Some(handle) = self.free.pop() {
            handle
        } else {
            if self.mode == AllocationMode::PreallocatedFixed || self.slots.len() >= Handle::MAX {
                return Err(Error::CapacityExhausted);
            }
            self.slots.push_empty();
            Handle::from_index(self.slots.len() - 1)
        };
        self.slots.put(handle, element);
        self.live += 1;
        Ok(handle)
    }

    /// Removes and returns the element. A `Boxed` slot's box goes back to
    /// the host allocator; the slot index itself is always pooled, so
    /// insert/delete churn never grows the slot table.
    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let element = self.slots.take(handle).expect("`Arena::take()` - `handle` is invalid!");
        self.free.push(handle);
        self.live -= 1;
        element
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        match &self.slots {
            Slots::Slab(slots) => slots[handle.to_index()].as_ref(),
            Slots::Boxed(slots) => slots[handle.to_index()].as_deref(),
        }
        .expect("`Arena::get()` - `handle` is invalid!")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        match &mut self.slots {
            Slots::Slab(slots) => slots[handle.to_index()].as_mut(),
            Slots::Boxed(slots) => slots[handle.to_index()].as_deref_mut(),
        }
        .expect("`Arena::get_mut()` - `handle` is invalid!")
    }

    /// Resets to empty. Array-backed storage keeps its reservation; under
    /// `PreallocatedFixed` the free list is re-seeded to full capacity.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
        if self.mode == AllocationMode::PreallocatedFixed {
            self.ensure_free(self.fixed_capacity);
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn slab_rejects_discard_mode() {
        let result = Arena::<u32>::new(Storage::Slab, AllocationMode::DynamicDiscard, 0);
        assert_eq!(result.err(), Some(Error::UnsupportedAllocationMode));
    }

    #[test]
    fn fixed_capacity_is_enforced() {
        let mut arena = Arena::new(Storage::Slab, AllocationMode::PreallocatedFixed, 2).unwrap();
        let a = arena.alloc(1_u32).unwrap();
        let _b = arena.alloc(2_u32).unwrap();
        assert_eq!(arena.alloc(3), Err(Error::CapacityExhausted));

        // Freeing makes room again.
        assert_eq!(arena.take(a), 1);
        assert!(arena.alloc(3).is_ok());
    }

    #[test]
    fn fixed_capacity_survives_clear() {
        let mut arena = Arena::new(Storage::Boxed, AllocationMode::PreallocatedFixed, 1).unwrap();
        let _ = arena.alloc(7_u32).unwrap();
        arena.clear();
        assert!(arena.alloc(8).is_ok());
        assert_eq!(arena.alloc(9), Err(Error::CapacityExhausted));
    }

    #[test]
    fn discard_mode_recycles_slot_indices() {
        let mut arena = Arena::new(Storage::Boxed, AllocationMode::DynamicDiscard, 0).unwrap();
        // The box is released per take, but the slot index is reused, so
        // sustained churn keeps the slot table at one entry.
        for value in 0..1_000_u32 {
            let handle = arena.alloc(value).unwrap();
            assert_eq!(handle.to_index(), 0);
            assert_eq!(arena.take(handle), value);
        }
        assert_eq!(arena.len(), 0);
        assert_eq!(arena.slots.len(), 1);
    }

    proptest! {
        #[test]
        fn arena_behaves_like_vec(
            boxed in any::<bool>(),
            operations in prop::collection::vec(strategy(), 0..256),
        ) {
            let storage = if boxed { Storage::Boxed } else { Storage::Slab };
            let mut model: Vec<(Handle, u32)> = Vec::new();
            let mut arena: Arena<u32> =
                Arena::new(storage, AllocationMode::DynamicRetainFreelist, 0).unwrap();

            for operation in operations {
                match operation {
                    Operation::Alloc(value) => {
                        let handle = arena.alloc(value).unwrap();
                        model.push((handle, value));
                    }
                    Operation::Get(which) => {
                        if model.is_empty() {
                            continue;
                        }

                        let index = which % model.len();
                        let handle = model[index].0;
                        prop_assert_eq!(*arena.get(handle), model[index].1);
                    }
                    Operation::GetMut(which, value) => {
                        if model.is_empty() {
                            continue;
                        }

                        let index = which % model.len();
                        let handle = model[index].0;
                        *arena.get_mut(handle) = value;
                        model[index].1 = value;
                    }
                    Operation::Take(which) => {
                        if model.is_empty() {
                            continue;
                        }

                        let index = which % model.len();
                        let handle = model[index].0;
                        let value1 = arena.take(handle);
                        let (_, value2) = model.swap_remove(index);
                        prop_assert_eq!(value1, value2);
                    }
                    Operation::Clear => {
                        arena.clear();
                        model.clear();
                    }
                }

                prop_assert_eq!(arena.len(), model.len());

                for &(handle, value) in &model {
                    prop_assert_eq!(*arena.get(handle), value);
                }
            }
        }
    }

    #[derive(Clone, Debug)]
    enum Operation {
        Alloc(u32),
        Get(usize),
        GetMut(usize, u32),
        Take(usize),
        Clear,
    }

    fn strategy() -> impl Strategy<Value = Operation> {
        prop_oneof![
            20 => any::<u32>().prop_map(Operation::Alloc),
            5 => any::<usize>().prop_map(Operation::Get),
            5 => (any::<usize>(), any::<u32>()).prop_map(|(which, value)| Operation::GetMut(which, value)),
            5 => any::<usize>().prop_map(Operation::Take),
            1 => Just(Operation::Clear),
        ]
    }
}
