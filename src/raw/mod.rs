//! The structural core: arena storage, augmented offsets, and the two
//! balancing engines, shared by every public map mode.

pub(crate) mod arena;
pub(crate) mod handle;
pub(crate) mod node;
pub(crate) mod tree;

mod avl;
mod rb;
