use core::borrow::Borrow;
use core::cmp::Ordering;

use smallvec::SmallVec;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Axes, Color, Link, Meta, Node};
use crate::error::Error;
use crate::options::{Axis, Balance, Options};

/// One step of a root-to-node descent: the node visited and the direction
/// taken from it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PathStep {
    pub(crate) node: Handle,
    pub(crate) went_right: bool,
}

/// Explicit descent stack. 16 inline steps cover trees up to tens of
/// thousands of nodes before spilling.
pub(crate) type Path = SmallVec<[PathStep; 16]>;

/// Iteration stack: pending nodes with their absolute x/y coordinates.
pub(crate) type WalkStack = SmallVec<[(Handle, i64, i64); 16]>;

/// Result of a key-directed descent.
pub(crate) struct KeyDescent<A> {
    pub(crate) path: Path,
    pub(crate) found: Option<Handle>,
    /// Absolute offsets of the found node, or of the attach parent when
    /// nothing was found.
    pub(crate) abs: A,
    /// Absolute offsets of the in-order successor of the found node or of
    /// the attach point; `None` past the maximum.
    pub(crate) succ_abs: Option<A>,
}

/// The structural core shared by every map mode. Key type, payload type
/// and offset bundle are compile-time parameters; balancing strategy,
/// storage backend and threading are fixed per instance at construction.
pub(crate) struct RawTree<K, V, A: Axes> {
    pub(crate) arena: Arena<Node<K, V, A>>,
    pub(crate) root: Option<Handle>,
    pub(crate) len: usize,
    /// Total accumulated length (range modes) or element count (rank
    /// mode) per axis.
    pub(crate) extents: A,
    /// Bumped by every structural mutation; fast cursors snapshot it.
    pub(crate) version: u64,
    /// Bumped only by `clear`; robust-cursor write contexts snapshot it.
    pub(crate) reset_version: u64,
    pub(crate) balance: Balance,
    pub(crate) threaded: bool,
}

impl<K, V, A: Axes> RawTree<K, V, A> {
    pub(crate) fn new(options: Options, threaded: bool) -> Result<Self, Error> {
        Ok(Self {
            arena: Arena::new(options.storage, options.allocation, options.capacity)?,
            root: None,
            len: 0,
            extents: A::default(),
            version: 0,
            reset_version: 0,
            balance: options.balance,
            threaded,
        })
    }

    pub(crate) fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
        self.len = 0;
        self.extents = A::default();
        self.version = self.version.wrapping_add(1);
        self.reset_version = self.reset_version.wrapping_add(1);
    }

    // ─── Descent ─────────────────────────────────────────────────────────

    pub(crate) fn descend_key<Q>(&self, key: &Q) -> KeyDescent<A>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut path = Path::new();
        let mut cur = self.root;
        let mut acc = A::default();
        let mut succ_abs = None;
        while let Some(h) = cur {
            let node = self.arena.get(h);
            let abs = acc.added(node.offsets);
            match key.cmp(node.key.borrow()) {
                Ordering::Equal => {
                    return KeyDescent { path, found: Some(h), abs, succ_abs };
                }
                Ordering::Less => {
                    succ_abs = Some(abs);
                    path.push(PathStep { node: h, went_right: false });
                    cur = node.left.child();
                }
                Ordering::Greater => {
                    path.push(PathStep { node: h, went_right: true });
                    cur = node.right.child();
                }
            }
            acc = abs;
        }
        KeyDescent { path, found: None, abs: acc, succ_abs }
    }

    /// Descent to the node whose absolute coordinate on `axis` equals
    /// `pos` exactly, recording the path for a subsequent detach.
    pub(crate) fn descend_position_exact(&self, pos: i64, axis: Axis) -> KeyDescent<A> {
        let mut path = Path::new();
        let mut cur = self.root;
        let mut acc = A::default();
        let mut succ_abs = None;
        while let Some(h) = cur {
            let node = self.arena.get(h);
            let abs = acc.added(node.offsets);
            match pos.cmp(&abs.get(axis)) {
                Ordering::Equal => {
                    return KeyDescent { path, found: Some(h), abs, succ_abs };
                }
                Ordering::Less => {
                    succ_abs = Some(abs);
                    path.push(PathStep { node: h, went_right: false });
                    cur = node.left.child();
                }
                Ordering::Greater => {
                    path.push(PathStep { node: h, went_right: true });
                    cur = node.right.child();
                }
            }
            acc = abs;
        }
        KeyDescent { path, found: None, abs: acc, succ_abs }
    }

    /// Attach-point descent for a positional insert. Positional equality
    /// goes right, so inserting at an occupied coordinate cannot silently
    /// land on the occupant.
    pub(crate) fn descend_position_insert(&self, pos: i64, axis: Axis) -> (Path, A) {
        let mut path = Path::new();
        let mut cur = self.root;
        let mut acc = A::default();
        while let Some(h) = cur {
            let node = self.arena.get(h);
            let abs = acc.added(node.offsets);
            if pos < abs.get(axis) {
                path.push(PathStep { node: h, went_right: false });
                cur = node.left.child();
            } else {
                path.push(PathStep { node: h, went_right: true });
                cur = node.right.child();
            }
            acc = abs;
        }
        (path, acc)
    }

    /// The last node whose absolute coordinate on `axis` is at or before
    /// `pos`, with its offsets and its successor's offsets.
    pub(crate) fn find_position(&self, pos: i64, axis: Axis) -> Option<(Handle, A, Option<A>)> {
        let mut cur = self.root;
        let mut acc = A::default();
        let mut best = None;
        let mut succ_abs = None;
        while let Some(h) = cur {
            let node = self.arena.get(h);
            let abs = acc.added(node.offsets);
            if pos < abs.get(axis) {
                // Every left turn is a closer upper neighbor; the last one
                // is the best node's in-order successor.
                succ_abs = Some(abs);
                cur = node.left.child();
            } else {
                best = Some((h, abs));
                cur = node.right.child();
            }
            acc = abs;
        }
        best.map(|(h, abs)| (h, abs, succ_abs))
    }

    pub(crate) fn nearest_by_key<Q>(&self, key: &Q, greater: bool, or_equal: bool) -> Option<(Handle, A)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cur = self.root;
        let mut acc = A::default();
        let mut best = None;
        while let Some(h) = cur {
            let node = self.arena.get(h);
            let abs = acc.added(node.offsets);
            match key.cmp(node.key.borrow()) {
                Ordering::Equal if or_equal => return Some((h, abs)),
                Ordering::Equal => {
                    cur = if greater { node.right.child() } else { node.left.child() };
                }
                Ordering::Less => {
                    if greater {
                        best = Some((h, abs));
                    }
                    cur = node.left.child();
                }
                Ordering::Greater => {
                    if !greater {
                        best = Some((h, abs));
                    }
                    cur = node.right.child();
                }
            }
            acc = abs;
        }
        best
    }

    pub(crate) fn nearest_by_position(&self, pos: i64, axis: Axis, greater: bool, or_equal: bool) -> Option<(Handle, A)> {
        let mut cur = self.root;
        let mut acc = A::default();
        let mut best = None;
        while let Some(h) = cur {
            let node = self.arena.get(h);
            let abs = acc.added(node.offsets);
            match pos.cmp(&abs.get(axis)) {
                Ordering::Equal if or_equal => return Some((h, abs)),
                Ordering::Equal => {
                    cur = if greater { node.right.child() } else { node.left.child() };
                }
                Ordering::Less => {
                    if greater {
                        best = Some((h, abs));
                    }
                    cur = node.left.child();
                }
                Ordering::Greater => {
                    if !greater {
                        best = Some((h, abs));
                    }
                    cur = node.right.child();
                }
            }
            acc = abs;
        }
        best
    }

    // ─── Offset maintenance ──────────────────────────────────────────────

    /// Adds `delta` to the offsets of every node whose absolute coordinate
    /// on `axis` is at or after `at`, in a single root-to-leaf descent.
    /// Nodes on the descent path absorb the delta; their left children are
    /// compensated so untouched subtrees keep their absolute positions.
    pub(crate) fn shift_from(&mut self, at: i64, axis: Axis, delta: A) {
        let mut cur = self.root;
        let mut acc = A::default();
        while let Some(h) = cur {
            let abs = acc.added(self.arena.get(h).offsets);
            if abs.get(axis) >= at {
                let node = self.arena.get_mut(h);
                node.offsets = node.offsets.added(delta);
                let left = node.left;
                if let Some(l) = left.child() {
                    let lnode = self.arena.get_mut(l);
                    lnode.offsets = lnode.offsets.added(delta.negated());
                }
                cur = left.child();
                acc = abs.added(delta);
            } else {
                cur = self.arena.get(h).right.child();
                acc = abs;
            }
        }
    }

    // ─── Rotations ───────────────────────────────────────────────────────
    //
    // Rotations preserve every node's absolute position: the promoted node
    // absorbs the offset that separated it from its old parent, the demoted
    // node's new offset is the negation, and the transferred middle subtree
    // is re-based onto its new parent.

    pub(crate) fn rotate_left(&mut self, h: Handle) -> Handle {
        let (h_off, r) = {
            let node = self.arena.get(h);
            (node.offsets, node.right.child().expect("`rotate_left()` - no right child!"))
        };
        let (r_off, r_left) = {
            let node = self.arena.get(r);
            (node.offsets, node.left)
        };

        let new_right = match r_left {
            Link::Child(c) => {
                let cnode = self.arena.get_mut(c);
                cnode.offsets = cnode.offsets.added(r_off);
                Link::Child(c)
            }
            // The promoted node's left thread can only point back here.
            Link::Thread(_) => Link::Thread(r),
            Link::Empty => Link::Empty,
        };
        {
            let hnode = self.arena.get_mut(h);
            hnode.right = new_right;
            hnode.offsets = r_off.negated();
        }
        {
            let rnode = self.arena.get_mut(r);
            rnode.left = Link::Child(h);
            rnode.offsets = h_off.added(r_off);
        }
        r
    }

    pub(crate) fn rotate_right(&mut self, h: Handle) -> Handle {
        let (h_off, l) = {
            let node = self.arena.get(h);
            (node.offsets, node.left.child().expect("`rotate_right()` - no left child!"))
        };
        let (l_off, l_right) = {
            let node = self.arena.get(l);
            (node.offsets, node.right)
        };

        let new_left = match l_right {
            Link::Child(c) => {
                let cnode = self.arena.get_mut(c);
                cnode.offsets = cnode.offsets.added(l_off);
                Link::Child(c)
            }
            Link::Thread(_) => Link::Thread(l),
            Link::Empty => Link::Empty,
        };
        {
            let hnode = self.arena.get_mut(h);
            hnode.left = new_left;
            hnode.offsets = l_off.negated();
        }
        {
            let lnode = self.arena.get_mut(l);
            lnode.right = Link::Child(h);
            lnode.offsets = h_off.added(l_off);
        }
        l
    }

    /// Re-points a parent's child link (or the root) after a rotation or
    /// a removal.
    pub(crate) fn set_link(&mut self, parent: Option<PathStep>, link: Link) {
        match parent {
            None => self.root = link.child(),
            Some(step) => {
                let pnode = self.arena.get_mut(step.node);
                if step.went_right {
                    pnode.right = link;
                } else {
                    pnode.left = link;
                }
            }
        }
    }

    // ─── Structural insert / remove ──────────────────────────────────────

    /// Attaches a new leaf below the descent's attach point and rebalances.
    /// The arena allocation happens before any link is touched, so a
    /// capacity failure leaves the tree unchanged.
    pub(crate) fn attach_and_rebalance(
        &mut self,
        path: Path,
        parent_abs: A,
        desired_abs: A,
        key: K,
        value: V,
    ) -> Result<Handle, Error> {
        let meta = match self.balance {
            Balance::Avl => Meta::Factor(0),
            Balance::RedBlack => Meta::Color(Color::Red),
        };
        let mut node = Node {
            left: Link::Empty,
            right: Link::Empty,
            meta,
            offsets: desired_abs.added(parent_abs.negated()),
            key,
            value,
        };

        let handle = match path.last().copied() {
            None => {
                let handle = self.arena.alloc(node)?;
                self.root = Some(handle);
                handle
            }
            Some(step) => {
                if self.threaded {
                    let pnode = self.arena.get(step.node);
                    if step.went_right {
                        node.right = pnode.right;
                        node.left = Link::Thread(step.node);
                    } else {
                        node.left = pnode.left;
                        node.right = Link::Thread(step.node);
                    }
                }
                let handle = self.arena.alloc(node)?;
                let pnode = self.arena.get_mut(step.node);
                if step.went_right {
                    pnode.right = Link::Child(handle);
                } else {
                    pnode.left = Link::Child(handle);
                }
                handle
            }
        };

        self.len += 1;
        self.version = self.version.wrapping_add(1);
        match self.balance {
            Balance::Avl => self.avl_rebalance_after_insert(&path),
            Balance::RedBlack => self.rb_rebalance_after_insert(path, handle),
        }
        Ok(handle)
    }

    /// Detaches a previously located node, preserving the absolute
    /// positions of everything that remains, then rebalances along the
    /// physical removal path. Returns the detached node.
    pub(crate) fn detach_and_rebalance(&mut self, found: Handle, mut path: Path) -> Node<K, V, A> {
        let (h_left, h_right, h_off, h_meta) = {
            let node = self.arena.get(found);
            (node.left, node.right, node.offsets, node.meta)
        };

        let pred_holder = if self.threaded { h_left.child().map(|l| self.rightmost(l)) } else { None };
        let parent = path.last().copied();
        let removed_meta;
        let replacement;

        match (h_left.child(), h_right.child()) {
            (Some(l), Some(r0)) => {
                // Two children: splice the in-order successor into this
                // node's place. `d` accumulates the successor's offset
                // relative to the removed node.
                let mut spine: SmallVec<[Handle; 16]> = SmallVec::new();
                let mut s = r0;
                let mut d = self.arena.get(r0).offsets;
                while let Some(next) = self.arena.get(s).left.child() {
                    spine.push(s);
                    d = d.added(self.arena.get(next).offsets);
                    s = next;
                }
                let (s_off, s_meta, s_right) = {
                    let node = self.arena.get(s);
                    (node.offsets, node.meta, node.right)
                };
                removed_meta = s_meta;
                replacement = s_right.child();

                if let Some(&sp) = spine.last() {
                    // Successor sits deeper: unhook it from its parent,
                    // promoting its right side.
                    let unhooked = match s_right {
                        Link::Child(c) => {
                            let cnode = self.arena.get_mut(c);
                            cnode.offsets = cnode.offsets.added(s_off);
                            Link::Child(c)
                        }
                        // The successor's old parent becomes its own
                        // subtree's minimum; its predecessor is now the
                        // spliced node.
                        Link::Thread(_) => Link::Thread(s),
                        Link::Empty => Link::Empty,
                    };
                    self.arena.get_mut(sp).left = unhooked;
                    {
                        let snode = self.arena.get_mut(s);
                        snode.left = h_left;
                        snode.right = h_right;
                    }
                    let rnode = self.arena.get_mut(r0);
                    rnode.offsets = rnode.offsets.added(d.negated());
                } else {
                    // Successor is the right child; it keeps its own right
                    // subtree and only inherits the left one.
                    self.arena.get_mut(s).left = h_left;
                }
                {
                    let lnode = self.arena.get_mut(l);
                    lnode.offsets = lnode.offsets.added(d.negated());
                }
                {
                    let snode = self.arena.get_mut(s);
                    snode.meta = h_meta;
                    snode.offsets = h_off.added(d);
                }
                self.set_link(parent, Link::Child(s));

                if self.threaded {
                    if let Some(p) = pred_holder {
                        self.arena.get_mut(p).right = Link::Thread(s);
                    }
                }

                // Rebalance from the successor's old slot upward.
                path.push(PathStep { node: s, went_right: true });
                for &n in &spine {
                    path.push(PathStep { node: n, went_right: false });
                }
            }
            (left_child, right_child) => {
                removed_meta = h_meta;
                let child = left_child.or(right_child);
                replacement = child;
                let new_link = match child {
                    Some(c) => {
                        let cnode = self.arena.get_mut(c);
                        cnode.offsets = cnode.offsets.added(h_off);
                        Link::Child(c)
                    }
                    None => {
                        if self.threaded {
                            // The removed leaf's surviving thread moves up
                            // into the parent's link.
                            match parent {
                                Some(step) if step.went_right => h_right,
                                Some(_) => h_left,
                                None => Link::Empty,
                            }
                        } else {
                            Link::Empty
                        }
                    }
                };
                self.set_link(parent, new_link);

                if self.threaded {
                    let succ_holder = h_right.child().map(|r| self.leftmost(r));
                    let pred = pred_holder.or_else(|| h_left.thread());
                    let succ = succ_holder.or_else(|| h_right.thread());
                    if let Some(p) = pred_holder {
                        self.arena.get_mut(p).right = succ.map_or(Link::Empty, Link::Thread);
                    }
                    if let Some(sh) = succ_holder {
                        self.arena.get_mut(sh).left = pred.map_or(Link::Empty, Link::Thread);
                    }
                }
            }
        }

        self.len -= 1;
        self.version = self.version.wrapping_add(1);
        match self.balance {
            Balance::Avl => self.avl_rebalance_after_remove(&path),
            Balance::RedBlack => {
                if removed_meta == Meta::Color(Color::Black) {
                    self.rb_rebalance_after_remove(path, replacement);
                }
            }
        }

        self.arena.take(found)
    }

    // ─── Traversal primitives ────────────────────────────────────────────

    pub(crate) fn leftmost(&self, mut h: Handle) -> Handle {
        while let Some(l) = self.arena.get(h).left.child() {
            h = l;
        }
        h
    }

    pub(crate) fn rightmost(&self, mut h: Handle) -> Handle {
        while let Some(r) = self.arena.get(h).right.child() {
            h = r;
        }
        h
    }

    pub(crate) fn first(&self) -> Option<(Handle, A)> {
        let mut h = self.root?;
        let mut abs = self.arena.get(h).offsets;
        while let Some(l) = self.arena.get(h).left.child() {
            h = l;
            abs = abs.added(self.arena.get(h).offsets);
        }
        Some((h, abs))
    }

    pub(crate) fn last(&self) -> Option<(Handle, A)> {
        let mut h = self.root?;
        let mut abs = self.arena.get(h).offsets;
        while let Some(r) = self.arena.get(h).right.child() {
            h = r;
            abs = abs.added(self.arena.get(h).offsets);
        }
        Some((h, abs))
    }

    /// In-order successor via threads (threaded dictionary mode only).
    pub(crate) fn thread_next(&self, h: Handle) -> Option<Handle> {
        match self.arena.get(h).right {
            Link::Thread(t) => Some(t),
            Link::Child(c) => Some(self.leftmost(c)),
            Link::Empty => None,
        }
    }

    /// In-order predecessor via threads (threaded dictionary mode only).
    pub(crate) fn thread_prev(&self, h: Handle) -> Option<Handle> {
        match self.arena.get(h).left {
            Link::Thread(t) => Some(t),
            Link::Child(c) => Some(self.rightmost(c)),
            Link::Empty => None,
        }
    }

    pub(crate) fn push_left_spine(&self, stack: &mut WalkStack, mut link: Link, mut x: i64, mut y: i64) {
        while let Link::Child(h) = link {
            let node = self.arena.get(h);
            x += node.offsets.x();
            y += node.offsets.y();
            stack.push((h, x, y));
            link = node.left;
        }
    }

    pub(crate) fn push_right_spine(&self, stack: &mut WalkStack, mut link: Link, mut x: i64, mut y: i64) {
        while let Link::Child(h) = link {
            let node = self.arena.get(h);
            x += node.offsets.x();
            y += node.offsets.y();
            stack.push((h, x, y));
            link = node.right;
        }
    }

    pub(crate) fn walk_next(&self, stack: &mut WalkStack) -> Option<(Handle, i64, i64)> {
        let (h, x, y) = stack.pop()?;
        self.push_left_spine(stack, self.arena.get(h).right, x, y);
        Some((h, x, y))
    }

    pub(crate) fn walk_prev(&self, stack: &mut WalkStack) -> Option<(Handle, i64, i64)> {
        let (h, x, y) = stack.pop()?;
        self.push_right_spine(stack, self.arena.get(h).left, x, y);
        Some((h, x, y))
    }

    pub(crate) fn walk_stack(&self, forward: bool) -> WalkStack {
        let mut stack = WalkStack::new();
        let link = self.root.map_or(Link::Empty, Link::Child);
        if forward {
            self.push_left_spine(&mut stack, link, 0, 0);
        } else {
            self.push_right_spine(&mut stack, link, 0, 0);
        }
        stack
    }

    /// Iteration stack positioned so the first step yields the first node
    /// at or after (forward) / at or before (backward) `key`.
    pub(crate) fn walk_stack_at_key<Q>(&self, key: &Q, forward: bool) -> WalkStack
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut stack = WalkStack::new();
        let mut cur = self.root;
        let mut x = 0;
        let mut y = 0;
        while let Some(h) = cur {
            let node = self.arena.get(h);
            let nx = x + node.offsets.x();
            let ny = y + node.offsets.y();
            match key.cmp(node.key.borrow()) {
                Ordering::Equal => {
                    stack.push((h, nx, ny));
                    break;
                }
                Ordering::Less => {
                    if forward {
                        stack.push((h, nx, ny));
                    }
                    cur = node.left.child();
                }
                Ordering::Greater => {
                    if !forward {
                        stack.push((h, nx, ny));
                    }
                    cur = node.right.child();
                }
            }
            x = nx;
            y = ny;
        }
        stack
    }

    /// Positional counterpart of [`Self::walk_stack_at_key`].
    pub(crate) fn walk_stack_at_position(&self, pos: i64, axis: Axis, forward: bool) -> WalkStack {
        let mut stack = WalkStack::new();
        let mut cur = self.root;
        let mut x = 0;
        let mut y = 0;
        while let Some(h) = cur {
            let node = self.arena.get(h);
            let nx = x + node.offsets.x();
            let ny = y + node.offsets.y();
            let coord = match axis {
                Axis::X => nx,
                Axis::Y => ny,
            };
            match pos.cmp(&coord) {
                Ordering::Equal => {
                    stack.push((h, nx, ny));
                    break;
                }
                Ordering::Less => {
                    if forward {
                        stack.push((h, nx, ny));
                    }
                    cur = node.left.child();
                }
                Ordering::Greater => {
                    if !forward {
                        stack.push((h, nx, ny));
                    }
                    cur = node.right.child();
                }
            }
            x = nx;
            y = ny;
        }
        stack
    }
}

impl<K: Clone, V: Clone, A: Axes> Clone for RawTree<K, V, A> {
    /// Deep copy: the arena clones its slot vector and free list exactly,
    /// so the clone reproduces topology, threading and free-list shape and
    /// never aliases the original's nodes.
    fn clone(&self) -> Self {
        Self {
            arena: self.arena.clone(),
            root: self.root,
            len: self.len,
            extents: self.extents,
            version: self.version,
            reset_version: self.reset_version,
            balance: self.balance,
            threaded: self.threaded,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
impl<K: Ord, V, A: Axes> RawTree<K, V, A> {
    /// Checks every structural invariant: ordering, balance, offset
    /// agreement, thread targets and the theoretical depth bound.
    /// Test-only; panics on violation.
    pub(crate) fn validate_invariants(&self) {
        use alloc::vec::Vec;

        let Some(root) = self.root else {
            assert_eq!(self.len, 0, "empty root with nonzero len");
            return;
        };

        if self.balance == Balance::RedBlack {
            assert_eq!(self.node_color(root), Color::Black, "root must be black");
        }

        // Positional modes use `()` keys; ordering is checked on positions.
        let check_keys = core::mem::size_of::<K>() != 0;
        let info = self.validate_node(root, None, None, A::default(), check_keys);
        assert_eq!(info.count, self.len, "node count disagrees with len");

        // Depth bound: AVL height h needs at least F(h + 2) - 1 nodes;
        // red-black height is at most 2 * floor(log2(n + 1)).
        let height_limit = match self.balance {
            Balance::Avl => {
                let mut limit = 0;
                let (mut a, mut b) = (1_u64, 2_u64); // F(h + 2) - 1 for h = limit
                while a <= self.len as u64 {
                    limit += 1;
                    (a, b) = (b, a + b + 1);
                }
                limit
            }
            Balance::RedBlack => 2 * usize::try_from((self.len as u64 + 1).ilog2()).unwrap() + 1,
        };
        assert!(info.height <= height_limit, "height {} exceeds bound {height_limit}", info.height);

        // In-order positions strictly increase and stay within the extent.
        if A::HAS_X {
            let mut stack = self.walk_stack(true);
            let mut prev: Option<(i64, i64)> = None;
            while let Some((_, x, y)) = self.walk_next(&mut stack) {
                assert!(x >= 0, "negative position");
                assert!(x < self.extents.x(), "position {x} outside extent");
                if let Some((px, py)) = prev {
                    assert!(x > px, "positions not strictly increasing");
                    if A::HAS_Y {
                        assert!(y > py, "y positions not strictly increasing");
                    }
                }
                prev = Some((x, y));
            }
        }

        // Threads must describe exactly the in-order sequence.
        if self.threaded {
            let mut stack = self.walk_stack(true);
            let mut order: Vec<Handle> = Vec::new();
            while let Some((h, _, _)) = self.walk_next(&mut stack) {
                order.push(h);
            }
            for (i, &h) in order.iter().enumerate() {
                let next = self.thread_next(h);
                assert_eq!(next, order.get(i + 1).copied(), "bad successor link");
                let prev = self.thread_prev(h);
                assert_eq!(prev, if i > 0 { Some(order[i - 1]) } else { None }, "bad predecessor link");
            }
        }
    }

    fn node_color(&self, h: Handle) -> Color {
        match self.arena.get(h).meta {
            Meta::Color(color) => color,
            Meta::Factor(_) => panic!("factor meta in a red-black tree"),
        }
    }

    fn validate_node(
        &self,
        h: Handle,
        min: Option<&K>,
        max: Option<&K>,
        parent_abs: A,
        check_keys: bool,
    ) -> ValidationInfo {
        let node = self.arena.get(h);
        let abs = parent_abs.added(node.offsets);

        if check_keys {
            if let Some(min) = min {
                assert!(node.key > *min, "ordering violated on the left bound");
            }
            if let Some(max) = max {
                assert!(node.key < *max, "ordering violated on the right bound");
            }
        }

        let left = node
            .left
            .child()
            .map(|l| self.validate_node(l, min, Some(&node.key), abs, check_keys));
        let right = node
            .right
            .child()
            .map(|r| self.validate_node(r, Some(&node.key), max, abs, check_keys));

        let left_height = left.as_ref().map_or(0, |i| i.height);
        let right_height = right.as_ref().map_or(0, |i| i.height);
        let height = 1 + left_height.max(right_height);
        let count = 1 + left.as_ref().map_or(0, |i| i.count) + right.as_ref().map_or(0, |i| i.count);

        let black_height = match node.meta {
            Meta::Factor(factor) => {
                let expected = i64::try_from(right_height).unwrap() - i64::try_from(left_height).unwrap();
                assert_eq!(i64::from(factor), expected, "stored factor disagrees with heights");
                assert!((-1..=1).contains(&factor), "balance factor out of range");
                0
            }
            Meta::Color(color) => {
                let left_black = left.as_ref().map_or(1, |i| i.black_height);
                let right_black = right.as_ref().map_or(1, |i| i.black_height);
                assert_eq!(left_black, right_black, "black heights differ");
                if color == Color::Red {
                    for side in [node.left, node.right] {
                        if let Some(c) = side.child() {
                            assert_eq!(self.node_color(c), Color::Black, "red node with a red child");
                        }
                    }
                    left_black
                } else {
                    left_black + 1
                }
            }
        };

        ValidationInfo { height, black_height, count }
    }
}

#[cfg(test)]
struct ValidationInfo {
    height: usize,
    black_height: usize,
    count: usize,
}
