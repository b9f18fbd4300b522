use core::num::NonZero;

// Narrow handles under test force early slot reuse.
#[cfg(test)]
type Repr = u16;
#[cfg(not(test))]
type Repr = u32;

/// Arena address of a node. Identity is the slot index, never the
/// contents; the niche keeps `Option<Handle>` pointer-free and word-sized.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub(crate) struct Handle(NonZero<Repr>);

impl Handle {
    /// Largest addressable slot index.
    pub(crate) const MAX: usize = (Repr::MAX - 1) as usize;

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn from_index(index: usize) -> Self {
        assert!(index <= Self::MAX, "`Handle::from_index()` - `index` out of range!");
        // `index + 1` cannot be zero and cannot overflow `Repr` here.
        Self(NonZero::new((index + 1) as Repr).unwrap())
    }

    #[inline]
    pub(crate) const fn to_index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}
