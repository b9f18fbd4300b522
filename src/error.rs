use core::fmt;

/// Errors reported by the tree maps.
///
/// Every error is local to the call that produced it and leaves the tree
/// unchanged; there is no fatal class and nothing is retried internally.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Non-`try` insert of a key that is already present.
    DuplicateKey,
    /// Non-`try` lookup or removal of a key that is absent.
    KeyNotFound,
    /// A range operation addressed a coordinate that is not the start of a
    /// stored interval (and not the extent, where appending is allowed).
    PositionNotFound,
    /// A positional insert landed on an already-occupied coordinate.
    PositionOccupied,
    /// Interval length must be strictly positive.
    NonPositiveLength,
    /// Start coordinates must be non-negative.
    NegativeStart,
    /// Rank counts must be at least 1, and adjustments may not drive a
    /// count below zero.
    InvalidRankCount,
    /// `PreallocatedFixed` capacity is exhausted, or the arena has reached
    /// the maximum representable handle index.
    CapacityExhausted,
    /// A position, length, count, or extent computation would overflow.
    /// Detected before any mutation is committed.
    Overflow,
    /// `DynamicDiscard` was requested for slab storage, which cannot return
    /// individual slots to the allocator.
    UnsupportedAllocationMode,
    /// A fast cursor (or a write context captured from one) was used after
    /// the tree's structural version advanced.
    CursorInvalidated,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::DuplicateKey => "key is already present",
            Self::KeyNotFound => "key not found",
            Self::PositionNotFound => "no interval starts at the given position",
            Self::PositionOccupied => "position is already occupied",
            Self::NonPositiveLength => "interval length must be positive",
            Self::NegativeStart => "start coordinate must be non-negative",
            Self::InvalidRankCount => "rank count must be at least 1",
            Self::CapacityExhausted => "arena capacity exhausted",
            Self::Overflow => "position or extent arithmetic overflowed",
            Self::UnsupportedAllocationMode => "allocation mode unsupported by this storage",
            Self::CursorInvalidated => "cursor invalidated by a structural change",
        };
        f.write_str(message)
    }
}

impl core::error::Error for Error {}
