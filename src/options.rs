/// Which self-balancing strategy a tree instance uses.
///
/// The strategy is chosen at construction and is immutable for the
/// instance's lifetime. Both strategies maintain O(log n) height; they
/// differ in rebalancing cost profiles (AVL rebalances more eagerly and
/// yields a shallower tree, red-black rotates less on mutation).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Balance {
    /// Height-balanced: every node's subtree heights differ by at most one.
    #[default]
    Avl,
    /// Color-balanced: red-black invariants (black root, no red-red edge,
    /// equal black-height on every path to an absence).
    RedBlack,
}

/// Which node storage backend a tree instance uses.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Storage {
    /// One flat growable slot array; a handle is an index.
    #[default]
    Slab,
    /// Individually heap-owned nodes behind a slot table.
    Boxed,
}

/// How node storage is acquired and returned.
///
/// Immutable for the instance's lifetime.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AllocationMode {
    /// All capacity is reserved at construction; allocating past it fails
    /// the operation with [`Error::CapacityExhausted`](crate::Error).
    PreallocatedFixed,
    /// Freed nodes are returned to the allocator immediately instead of
    /// being pooled; slot indices are still reused. Only supported by
    /// [`Storage::Boxed`].
    DynamicDiscard,
    /// Freed handles are pooled on a free list and reused by later
    /// allocations; backing storage grows geometrically on demand.
    #[default]
    DynamicRetainFreelist,
}

/// Coordinate axis selector for the range2 mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Axis {
    X,
    Y,
}

/// Traversal direction for cursors.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Construction-time options shared by all map kinds.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Options {
    pub balance: Balance,
    pub storage: Storage,
    pub allocation: AllocationMode,
    /// Initial capacity in nodes. Under
    /// [`AllocationMode::PreallocatedFixed`] this is also the hard limit.
    pub capacity: usize,
}

impl Options {
    #[must_use]
    pub fn balance(mut self, balance: Balance) -> Self {
        self.balance = balance;
        self
    }

    #[must_use]
    pub fn storage(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }

    #[must_use]
    pub fn allocation(mut self, allocation: AllocationMode) -> Self {
        self.allocation = allocation;
        self
    }

    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}
