//! An in-memory B+Tree ordered map for Rust.
//!
//! This crate provides [`BpTreeMap`], an ordered map built on a B+Tree: a
//! multi-level index supporting efficient point lookup and range scan over a
//! totally ordered key space. All key/value pairs live at the leaf level, and
//! leaves are linked in key order so range scans walk a chain instead of
//! re-descending the tree.
//!
//! Internal nodes hold divider keys using the *largest-left* convention: each
//! divider equals the largest key in its left subtree, so keys in the left
//! subtree compare `<=` the divider and keys in the right subtree compare `>`.
//!
//! # Example
//!
//! ```
//! use bptree::BpTreeMap;
//!
//! let mut index = BpTreeMap::new();
//! index.insert(41, "tuple @ page 7")?;
//! index.insert(17, "tuple @ page 2")?;
//! index.insert(93, "tuple @ page 4")?;
//!
//! assert_eq!(index.get(&41), Some(&"tuple @ page 7"));
//! assert_eq!(index.first_key()?, &17);
//! assert_eq!(index.last_key()?, &93);
//!
//! // Inserting an existing key is rejected; the stored value is retained.
//! assert!(index.insert(41, "shadow").is_err());
//! assert_eq!(index.get(&41), Some(&"tuple @ page 7"));
//! assert_eq!(index.len(), 3);
//! # Ok::<(), bptree::TreeError>(())
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Linked leaf chain** - Range scans and iteration walk leaves sequentially
//! - **Duplicate rejection** - Inserting a present key is a structured, recoverable
//!   error ([`TreeError::DuplicateKey`]); the map is never mutated by a rejected insert
//! - **Cache-efficient** - Contiguous node storage in an arena, binary search within nodes
//!
//! # Non-goals
//!
//! Key removal, disk persistence, and thread-safety are out of scope. The map
//! lives entirely in memory during a single process run; concurrent mutation
//! must be serialized by the caller.

#![no_std]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod raw;

pub mod bptree_map;

pub use bptree_map::BpTreeMap;
pub use error::TreeError;
