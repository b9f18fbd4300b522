//! Color-balanced rebalancing over the recorded descent path: red-uncle
//! recoloring and orientation-selected rotations on insert, sibling
//! recolor/rotate repairs of the black-height deficit on removal. The
//! root is forced black after every operation.

use super::handle::Handle;
use super::node::{Axes, Color, Link, Meta};
use super::tree::{Path, PathStep, RawTree};

impl<K, V, A: Axes> RawTree<K, V, A> {
    fn color(&self, h: Handle) -> Color {
        match self.arena.get(h).meta {
            Meta::Color(color) => color,
            Meta::Factor(_) => unreachable!("factor meta in a red-black tree"),
        }
    }

    fn set_color(&mut self, h: Handle, color: Color) {
        self.arena.get_mut(h).meta = Meta::Color(color);
    }

    /// Absent children count as black.
    fn link_is_red(&self, link: Link) -> bool {
        link.child().is_some_and(|h| self.color(h) == Color::Red)
    }

    fn child_on(&self, h: Handle, right: bool) -> Link {
        let node = self.arena.get(h);
        if right { node.right } else { node.left }
    }

    fn set_child_on(&mut self, h: Handle, right: bool, link: Link) {
        let node = self.arena.get_mut(h);
        if right {
            node.right = link;
        } else {
            node.left = link;
        }
    }

    fn rotate_toward(&mut self, h: Handle, left: bool) -> Handle {
        if left { self.rotate_left(h) } else { self.rotate_right(h) }
    }

    /// The inserted node starts red; red-red violations are repaired
    /// walking up the path, recoloring past red uncles and otherwise
    /// rotating once (single or double, by parent/grandparent
    /// orientation).
    pub(crate) fn rb_rebalance_after_insert(&mut self, mut path: Path, inserted: Handle) {
        let mut z = inserted;
        loop {
            let Some(pstep) = path.pop() else {
                self.set_color(z, Color::Black);
                return;
            };
            let p = pstep.node;
            if self.color(p) == Color::Black {
                return;
            }
            // A red parent is never the root.
            let gstep = path.pop().expect("`rb_rebalance_after_insert()` - red root!");
            let g = gstep.node;
            let p_right = gstep.went_right;

            let uncle = self.child_on(g, !p_right);
            if let Some(u) = uncle.child() {
                if self.color(u) == Color::Red {
                    self.set_color(p, Color::Black);
                    self.set_color(u, Color::Black);
                    self.set_color(g, Color::Red);
                    z = g;
                    continue;
                }
            }

            let z_right = pstep.went_right;
            let new_root = if p_right {
                if !z_right {
                    let sub = self.rotate_right(p);
                    self.set_child_on(g, true, Link::Child(sub));
                }
                self.rotate_left(g)
            } else {
                if z_right {
                    let sub = self.rotate_left(p);
                    self.set_child_on(g, false, Link::Child(sub));
                }
                self.rotate_right(g)
            };
            self.set_color(new_root, Color::Black);
            self.set_color(g, Color::Red);
            self.set_link(path.last().copied(), Link::Child(new_root));
            return;
        }
    }

    /// Repairs the missing black after a black node was physically
    /// removed. `x` is the child that took the removed slot; the path
    /// leads to its parent.
    pub(crate) fn rb_rebalance_after_remove(&mut self, mut path: Path, mut x: Option<Handle>) {
        loop {
            if let Some(h) = x {
                if self.color(h) == Color::Red {
                    self.set_color(h, Color::Black);
                    return;
                }
            }
            let Some(step) = path.pop() else {
                // The deficit reached the root and applies uniformly.
                return;
            };
            let parent = step.node;
            let x_right = step.went_right;

            let mut w = self
                .child_on(parent, !x_right)
                .child()
                .expect("`rb_rebalance_after_remove()` - missing sibling!");

            if self.color(w) == Color::Red {
                // Red sibling: rotate it above the parent so the sibling
                // below is black.
                self.set_color(w, Color::Black);
                self.set_color(parent, Color::Red);
                let sub = self.rotate_toward(parent, !x_right);
                self.set_link(path.last().copied(), Link::Child(sub));
                path.push(PathStep { node: sub, went_right: x_right });
                w = self
                    .child_on(parent, !x_right)
                    .child()
                    .expect("`rb_rebalance_after_remove()` - missing sibling!");
            }

            let far = self.child_on(w, !x_right);
            let near = self.child_on(w, x_right);

            if !self.link_is_red(far) && !self.link_is_red(near) {
                // Black sibling with black children: push the deficit up.
                self.set_color(w, Color::Red);
                if self.color(parent) == Color::Red {
                    self.set_color(parent, Color::Black);
                    return;
                }
                x = Some(parent);
                continue;
            }

            let w = if self.link_is_red(far) {
                w
            } else {
                // Near child red, far child black: rotate it over the
                // sibling so the far child becomes red.
                let near_h = near.child().expect("`rb_rebalance_after_remove()` - near child!");
                self.set_color(near_h, Color::Black);
                self.set_color(w, Color::Red);
                let sub = self.rotate_toward(w, x_right);
                self.set_child_on(parent, !x_right, Link::Child(sub));
                sub
            };

            // Final rotation absorbs the deficit.
            let parent_color = self.color(parent);
            self.set_color(w, parent_color);
            self.set_color(parent, Color::Black);
            let far_h = self
                .child_on(w, !x_right)
                .child()
                .expect("`rb_rebalance_after_remove()` - far child!");
            self.set_color(far_h, Color::Black);
            let sub = self.rotate_toward(parent, !x_right);
            self.set_link(path.last().copied(), Link::Child(sub));
            return;
        }
    }
}
