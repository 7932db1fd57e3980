//! A 2-3-4 tree set for Rust.
//!
//! This crate provides [`TwoFourTreeSet`], an ordered set backed by a 2-3-4 tree:
//! a B-tree of fixed order 4 where every node holds 1 to 3 keys and, if internal,
//! exactly one more child than it has keys. Search, insertion, and removal are
//! O(log n), and the tree height changes only at the root.
//!
//! Beyond the usual set operations, the tree exposes two diagnostics:
//!
//! - [`check`](TwoFourTreeSet::check) / [`validate`](TwoFourTreeSet::validate) -
//!   an independent breadth-first walk that verifies every structural invariant
//!   (key ordering, subtree bounds, child/key parity, parent back-references,
//!   uniform leaf depth) and reports each violation it finds
//! - [`render`](TwoFourTreeSet::render) - a level-by-level text drawing of the
//!   tree with internal node labels centered over their subtrees
//!
//! # Example
//!
//! ```
//! use two_four_tree::TwoFourTreeSet;
//!
//! let mut set = TwoFourTreeSet::new();
//! for key in [10, 20, 5, 6, 12, 30, 7, 17] {
//!     assert!(set.insert(key));
//!     assert!(set.validate());
//! }
//!
//! assert!(set.contains(&12));
//! assert!(!set.insert(12)); // duplicates are reported, not inserted
//!
//! let sorted: Vec<i32> = set.iter().copied().collect();
//! assert_eq!(sorted, [5, 6, 7, 10, 12, 17, 20, 30]);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Handle-based structure** - Nodes live in an arena and refer to each other
//!   (including the non-owning parent back-reference) by index, never by address
//! - **Inline node storage** - Keys and child handles sit inline in each node
//!
//! # Concurrency
//!
//! The tree performs no internal locking. Shared read-only use (search,
//! iteration, validation, rendering) from several threads is safe exactly as
//! Rust's `&` rules state; any mutation requires `&mut` and therefore exclusive
//! access.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod raw;

pub mod two_four_tree;

pub use raw::Violation;
pub use two_four_tree::TwoFourTreeSet;
