//! Height-balanced rebalancing: bottom-up factor propagation over the
//! recorded descent path, with the standard four-case rotation table.

use super::handle::Handle;
use super::node::{Axes, Link, Meta};
use super::tree::{PathStep, RawTree};

impl<K, V, A: Axes> RawTree<K, V, A> {
    fn factor(&self, h: Handle) -> i8 {
        match self.arena.get(h).meta {
            Meta::Factor(factor) => factor,
            Meta::Color(_) => unreachable!("color meta in a height-balanced tree"),
        }
    }

    fn set_factor(&mut self, h: Handle, factor: i8) {
        self.arena.get_mut(h).meta = Meta::Factor(factor);
    }

    /// Walks back up the insertion path adjusting factors. Stops as soon
    /// as a factor reaches 0 (subtree height unchanged) or one rotation
    /// restores the previous height.
    pub(crate) fn avl_rebalance_after_insert(&mut self, path: &[PathStep]) {
        let mut i = path.len();
        while i > 0 {
            i -= 1;
            let PathStep { node: h, went_right } = path[i];
            let factor = self.factor(h) + if went_right { 1 } else { -1 };
            self.set_factor(h, factor);
            match factor {
                0 => break,
                -1 | 1 => {}
                _ => {
                    let parent = if i > 0 { Some(path[i - 1]) } else { None };
                    let new_root = self.avl_rotate(h, factor);
                    self.set_link(parent, Link::Child(new_root));
                    break;
                }
            }
        }
    }

    /// Walks back up the removal path. A factor that becomes nonzero means
    /// the subtree height is unchanged and the walk stops; a rotation may
    /// still shrink the subtree, in which case the walk continues.
    pub(crate) fn avl_rebalance_after_remove(&mut self, path: &[PathStep]) {
        let mut i = path.len();
        while i > 0 {
            i -= 1;
            let PathStep { node: h, went_right } = path[i];
            let factor = self.factor(h) + if went_right { -1 } else { 1 };
            self.set_factor(h, factor);
            match factor {
                -1 | 1 => break,
                0 => {}
                _ => {
                    let parent = if i > 0 { Some(path[i - 1]) } else { None };
                    let new_root = self.avl_rotate(h, factor);
                    self.set_link(parent, Link::Child(new_root));
                    if self.factor(new_root) != 0 {
                        break;
                    }
                }
            }
        }
    }

    /// Repairs a transient factor of ±2, choosing a single or double
    /// rotation by the taller child's own factor sign. Returns the new
    /// subtree root; the caller re-points the parent link.
    fn avl_rotate(&mut self, h: Handle, factor: i8) -> Handle {
        if factor > 0 {
            let r = self.arena.get(h).right.child().expect("`avl_rotate()` - no right child!");
            let rf = self.factor(r);
            if rf >= 0 {
                let new_root = self.rotate_left(h);
                if rf == 1 {
                    self.set_factor(h, 0);
                    self.set_factor(r, 0);
                } else {
                    // Only reachable on removal.
                    self.set_factor(h, 1);
                    self.set_factor(r, -1);
                }
                new_root
            } else {
                let rl = self.arena.get(r).left.child().expect("`avl_rotate()` - no inner child!");
                let inner = self.factor(rl);
                let sub = self.rotate_right(r);
                self.arena.get_mut(h).right = Link::Child(sub);
                let new_root = self.rotate_left(h);
                self.set_factor(h, if inner == 1 { -1 } else { 0 });
                self.set_factor(r, if inner == -1 { 1 } else { 0 });
                self.set_factor(rl, 0);
                new_root
            }
        } else {
            let l = self.arena.get(h).left.child().expect("`avl_rotate()` - no left child!");
            let lf = self.factor(l);
            if lf <= 0 {
                let new_root = self.rotate_right(h);
                if lf == -1 {
                    self.set_factor(h, 0);
                    self.set_factor(l, 0);
                } else {
                    self.set_factor(h, -1);
                    self.set_factor(l, 1);
                }
                new_root
            } else {
                let lr = self.arena.get(l).right.child().expect("`avl_rotate()` - no inner child!");
                let inner = self.factor(lr);
                let sub = self.rotate_left(l);
                self.arena.get_mut(h).left = Link::Child(sub);
                let new_root = self.rotate_right(h);
                self.set_factor(h, if inner == -1 { 1 } else { 0 });
                self.set_factor(l, if inner == 1 { -1 } else { 0 });
                self.set_factor(lr, 0);
                new_root
            }
        }
    }
}
