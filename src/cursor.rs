//! Detached enumerator state. Cursors never borrow the tree; each step
//! takes the owning map again, which is what lets the robust kind survive
//! mutation in between.

use core::borrow::Borrow;

use crate::error::Error;
use crate::options::{Axis, Direction};
use crate::raw::handle::Handle;
use crate::raw::node::Axes;
use crate::raw::tree::{RawTree, WalkStack};

/// O(1)-amortized in-order cursor.
///
/// Holds direct node handles (an explicit spine stack, or a single handle
/// when the owning dictionary is threaded) plus a snapshot of the tree's
/// structural version. Any insert or delete on the owning map invalidates
/// it: the next step or write fails with
/// [`Error::CursorInvalidated`]. Value-only writes do not invalidate it.
pub struct FastCursor {
    stack: WalkStack,
    /// Next node to yield, threaded stepping only.
    upcoming: Option<Handle>,
    at: Option<(Handle, i64, i64)>,
    version: u64,
    token: u64,
    direction: Direction,
    threaded: bool,
}

impl FastCursor {
    /// Context for a later value write at the current position. The write
    /// is refused if the cursor advances or the tree mutates structurally
    /// in between.
    #[must_use]
    pub fn write_context(&self) -> Option<CursorWrite> {
        self.at.map(|(node, _, _)| CursorWrite {
            node,
            token: self.token,
            version: self.version,
        })
    }

    pub(crate) fn current(&self) -> Option<(Handle, i64, i64)> {
        self.at
    }

    pub(crate) fn token(&self) -> u64 {
        self.token
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn direction(&self) -> Direction {
        self.direction
    }

    /// The node the next forward step would yield, with its coordinates.
    /// Range modes derive the current interval's length from it.
    pub(crate) fn peek_next(&self) -> Option<(Handle, i64, i64)> {
        self.stack.last().copied()
    }
}

/// Ticket for a deferred value write through a [`FastCursor`].
#[derive(Clone, Copy, Debug)]
pub struct CursorWrite {
    pub(crate) node: Handle,
    pub(crate) token: u64,
    pub(crate) version: u64,
}

/// O(log n)-per-step cursor that survives structural change.
///
/// Holds the last-seen key or position, never a node handle, and re-finds
/// its place with a nearest-neighbor query on every step. Mutations before
/// the cursor are invisible to it; mutations at or after it are picked up
/// or dropped as appropriate. Only [`clear`](crate::TreeMap::clear)
/// invalidates its write context.
pub struct RobustCursor<C> {
    pub(crate) last: Option<C>,
    pub(crate) seek: Option<C>,
    pub(crate) direction: Direction,
    pub(crate) reset_version: u64,
}

impl<K, V, A: Axes> RawTree<K, V, A> {
    pub(crate) fn fast_cursor(&self, direction: Direction) -> FastCursor {
        if self.threaded {
            let upcoming = match direction {
                Direction::Forward => self.first().map(|(h, _)| h),
                Direction::Backward => self.last().map(|(h, _)| h),
            };
            self.fast_threaded(upcoming, direction)
        } else {
            self.fast_stacked(self.walk_stack(direction == Direction::Forward), direction)
        }
    }

    pub(crate) fn fast_cursor_at_key<Q>(&self, key: &Q, direction: Direction) -> FastCursor
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if self.threaded {
            let greater = direction == Direction::Forward;
            let upcoming = self.nearest_by_key(key, greater, true).map(|(h, _)| h);
            self.fast_threaded(upcoming, direction)
        } else {
            let stack = self.walk_stack_at_key(key, direction == Direction::Forward);
            self.fast_stacked(stack, direction)
        }
    }

    pub(crate) fn fast_cursor_at_position(&self, pos: i64, axis: Axis, direction: Direction) -> FastCursor {
        let stack = self.walk_stack_at_position(pos, axis, direction == Direction::Forward);
        self.fast_stacked(stack, direction)
    }

    fn fast_stacked(&self, stack: WalkStack, direction: Direction) -> FastCursor {
        FastCursor {
            stack,
            upcoming: None,
            at: None,
            version: self.version,
            token: 0,
            direction,
            threaded: false,
        }
    }

    fn fast_threaded(&self, upcoming: Option<Handle>, direction: Direction) -> FastCursor {
        FastCursor {
            stack: WalkStack::new(),
            upcoming,
            at: None,
            version: self.version,
            token: 0,
            direction,
            threaded: true,
        }
    }

    /// Advances a fast cursor by one node, or reports staleness.
    pub(crate) fn fast_step(&self, cursor: &mut FastCursor) -> Result<Option<(Handle, i64, i64)>, Error> {
        if cursor.version != self.version {
            return Err(Error::CursorInvalidated);
        }
        let step = if cursor.threaded {
            cursor.upcoming.map(|h| {
                cursor.upcoming = match cursor.direction {
                    Direction::Forward => self.thread_next(h),
                    Direction::Backward => self.thread_prev(h),
                };
                (h, 0, 0)
            })
        } else {
            match cursor.direction {
                Direction::Forward => self.walk_next(&mut cursor.stack),
                Direction::Backward => self.walk_prev(&mut cursor.stack),
            }
        };
        if let Some(at) = step {
            cursor.at = Some(at);
            cursor.token = cursor.token.wrapping_add(1);
        }
        Ok(step)
    }

    /// Validates a write ticket against the tree and its cursor.
    pub(crate) fn check_write(&self, cursor: &FastCursor, write: &CursorWrite) -> Result<Handle, Error> {
        if write.version != self.version || write.token != cursor.token() {
            return Err(Error::CursorInvalidated);
        }
        Ok(write.node)
    }

    pub(crate) fn robust_cursor<C>(&self, seek: Option<C>, direction: Direction) -> RobustCursor<C> {
        RobustCursor {
            last: None,
            seek,
            direction,
            reset_version: self.reset_version,
        }
    }

    /// Re-finds the robust cursor's place by key and advances one node.
    pub(crate) fn robust_step_key(&self, cursor: &mut RobustCursor<K>) -> Option<(Handle, A)>
    where
        K: Ord + Clone,
    {
        let greater = cursor.direction == Direction::Forward;
        let found = match &cursor.last {
            Some(key) => self.nearest_by_key(key, greater, false),
            None => match &cursor.seek {
                Some(key) => self.nearest_by_key(key, greater, true),
                None if greater => self.first(),
                None => self.last(),
            },
        };
        if let Some((h, _)) = found {
            cursor.last = Some(self.arena.get(h).key.clone());
        }
        found
    }

    /// Positional counterpart of [`Self::robust_step_key`].
    pub(crate) fn robust_step_position(&self, cursor: &mut RobustCursor<i64>, axis: Axis) -> Option<(Handle, A)> {
        let greater = cursor.direction == Direction::Forward;
        let found = match cursor.last {
            Some(pos) => self.nearest_by_position(pos, axis, greater, false),
            None => match cursor.seek {
                Some(pos) => self.nearest_by_position(pos, axis, greater, true),
                None if greater => self.first(),
                None => self.last(),
            },
        };
        if let Some((_, abs)) = found {
            cursor.last = Some(abs.get(axis));
        }
        found
    }

    /// A robust write context is invalidated only by a structural reset.
    pub(crate) fn check_reset<C>(&self, cursor: &RobustCursor<C>) -> Result<(), Error> {
        if cursor.reset_version != self.reset_version {
            return Err(Error::CursorInvalidated);
        }
        Ok(())
    }
}
