use super::handle::Handle;
use crate::options::Axis;

/// One side of a node: a real child, an in-order thread (dictionary mode
/// only), or nothing. The thread variant replaces the original
/// dual-purpose pointer-plus-boolean encoding.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Link {
    Child(Handle),
    Thread(Handle),
    Empty,
}

impl Link {
    #[inline]
    pub(crate) fn child(self) -> Option<Handle> {
        match self {
            Self::Child(handle) => Some(handle),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn thread(self) -> Option<Handle> {
        match self {
            Self::Thread(handle) => Some(handle),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// Per-node balancing state: an AVL balance factor
/// (`height(right) - height(left)`, in {-1, 0, 1} at rest) or a red-black
/// color, depending on the strategy the owning tree was built with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Meta {
    Factor(i8),
    Color(Color),
}

/// The per-node offset bundle: nothing (dictionary), one axis (rank and
/// range), or two axes (range2). A node's absolute position is the sum of
/// offsets on the path from the root down to it; all offset arithmetic in
/// rotations and shifts goes through this trait so the dictionary mode
/// compiles to no-ops.
pub(crate) trait Axes: Copy + Default + core::fmt::Debug + Eq {
    const HAS_X: bool;
    const HAS_Y: bool;

    fn from_xy(x: i64, y: i64) -> Self;
    fn get(self, axis: Axis) -> i64;
    fn added(self, other: Self) -> Self;
    fn negated(self) -> Self;

    #[inline]
    fn x(self) -> i64 {
        self.get(Axis::X)
    }

    #[inline]
    fn y(self) -> i64 {
        self.get(Axis::Y)
    }
}

impl Axes for () {
    const HAS_X: bool = false;
    const HAS_Y: bool = false;

    #[inline]
    fn from_xy(_x: i64, _y: i64) -> Self {}

    #[inline]
    fn get(self, _axis: Axis) -> i64 {
        0
    }

    #[inline]
    fn added(self, _other: Self) -> Self {}

    #[inline]
    fn negated(self) -> Self {}
}

/// One-axis offsets, used by the rank and range modes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct XOffset {
    pub(crate) x: i64,
}

impl Axes for XOffset {
    const HAS_X: bool = true;
    const HAS_Y: bool = false;

    #[inline]
    fn from_xy(x: i64, _y: i64) -> Self {
        Self { x }
    }

    #[inline]
    fn get(self, axis: Axis) -> i64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => 0,
        }
    }

    #[inline]
    fn added(self, other: Self) -> Self {
        Self { x: self.x + other.x }
    }

    #[inline]
    fn negated(self) -> Self {
        Self { x: -self.x }
    }
}

/// Two-axis offsets, used by the range2 mode. Both axes order nodes
/// identically; only the lengths differ.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct XyOffset {
    pub(crate) x: i64,
    pub(crate) y: i64,
}

impl Axes for XyOffset {
    const HAS_X: bool = true;
    const HAS_Y: bool = true;

    #[inline]
    fn from_xy(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    #[inline]
    fn get(self, axis: Axis) -> i64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    #[inline]
    fn added(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    #[inline]
    fn negated(self) -> Self {
        Self { x: -self.x, y: -self.y }
    }
}

#[derive(Clone)]
pub(crate) struct Node<K, V, A> {
    pub(crate) left: Link,
    pub(crate) right: Link,
    pub(crate) meta: Meta,
    pub(crate) offsets: A,
    pub(crate) key: K,
    pub(crate) value: V,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn rotation_offset_algebra(x1 in -1_000_i64..1_000, x2 in -1_000_i64..1_000, y in -1_000_i64..1_000) {
            // added/negated must behave like vector addition on every impl.
            let a = XyOffset::from_xy(x1, y);
            let b = XyOffset::from_xy(x2, -y);
            assert_eq!(a.added(b).get(Axis::X), x1 + x2);
            assert_eq!(a.added(a.negated()), XyOffset::default());

            let a = XOffset::from_xy(x1, 0);
            assert_eq!(a.added(a.negated()), XOffset::default());
            assert_eq!(a.get(Axis::Y), 0);
        }
    }
}
