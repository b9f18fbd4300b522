//! Augmented balanced-search-tree maps for Rust.
//!
//! This crate provides four map types over one structural core: a
//! self-balancing binary search tree whose nodes carry relative offsets,
//! so a root-to-node offset sum is an absolute rank or position.
//!
//! - [`TreeMap`] - an ordered key/value dictionary, optionally threaded
//!   for O(1) amortized in-order traversal
//! - [`RankMap`] - order statistics with per-key multiplicity: rank
//!   queries, rank adjustment, nearest-rank search
//! - [`RangeMap`] - contiguous intervals on one axis, addressed by
//!   absolute start coordinate
//! - [`Range2Map`] - contiguous intervals on two independent axes at once
//!
//! # Example
//!
//! ```
//! use spantree::RangeMap;
//!
//! let mut rows = RangeMap::new();
//! rows.insert(0, 10, "header").unwrap();
//! rows.insert(10, 5, "body").unwrap();
//!
//! // Which interval covers position 12?
//! let (start, length, value) = rows.nearest_less_or_equal(12).unwrap();
//! assert_eq!((start, length, *value), (10, 5, "body"));
//! assert_eq!(rows.extent(), 15);
//!
//! // Inserting at an interval's start shifts it and everything after.
//! rows.insert(10, 3, "toolbar").unwrap();
//! assert_eq!(rows.nearest_less_or_equal(14).map(|(s, ..)| s), Some(13));
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library
//!   dependency
//! - **Two balancing strategies** - AVL or red-black, chosen per instance
//!   via [`Options`]; both use non-recursive insert/delete over an
//!   explicit path stack
//! - **Two storage backends** - a flat slab arena or individually boxed
//!   nodes, with preallocated-fixed, discard, or free-list allocation
//!   disciplines
//! - **Fast and robust cursors** - O(1)-amortized handle-based stepping
//!   with structural-version invalidation, or O(log n) re-querying
//!   stepping that survives concurrent edits
//!
//! # Implementation
//!
//! Positions are never stored absolutely. Each node holds its offset from
//! its parent; rotations rewrite offsets so every descendant keeps its
//! absolute position, and an insert or delete shifts all later positions
//! in a single O(log n) descent.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod cursor;
mod error;
mod options;
mod raw;

pub mod range2_map;
pub mod range_map;
pub mod rank_map;
pub mod tree_map;

pub use cursor::{CursorWrite, FastCursor, RobustCursor};
pub use error::Error;
pub use options::{AllocationMode, Axis, Balance, Direction, Options, Storage};
pub use range2_map::{Range2Map, Robust2Cursor, Span2};
pub use range_map::RangeMap;
pub use rank_map::RankMap;
pub use tree_map::TreeMap;
