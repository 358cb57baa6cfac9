// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! B-Tree index engine.
//!
//! In-memory minimum-degree B-Tree mapping primary keys to heap-file offsets,
//! persisted wholesale to the table's index file.
//!
//! ## Features
//!
//! - **Comparator-Driven**: ordering supplied by the caller, not `Ord`
//! - **Full Deletion**: borrow/merge rebalancing, root collapse
//! - **Ordered Scans**: lazy in-order iteration
//! - **Persistence**: pre-order present-flag encoding over bincode
//!
//! ## Structure Invariants
//!
//! - every non-root node holds between `t - 1` and `2t - 1` keys
//! - every leaf sits at the same depth
//! - keys within a node are sorted by the comparator

mod iter;
mod node;
mod tree;


// Re-export public API
pub use iter::BTreeIter;
pub use node::BTreeNode;
pub use tree::{BTree, KeyComparator, MIN_DEGREE};
