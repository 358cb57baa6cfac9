// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! B-Tree node representation.
//!
//! Nodes own their children exclusively (`Vec<Box<BTreeNode>>`); the tree is
//! acyclic, so single ownership is direct. Keys and values sit side by side in
//! every node; this is a classic B-Tree, not a B+ variant with leaf-only
//! payloads.

/// A single B-Tree node.
///
/// A node with minimum degree `t` carries between `t - 1` and `2t - 1` keys
/// (the root may hold fewer) and, if internal, `keys.len() + 1` children.
/// `keys[i]` separates `children[i]` and `children[i + 1]`.
#[derive(Debug)]
pub struct BTreeNode<K, V> {
    /// Whether this node has no children.
    pub is_leaf: bool,

    /// Sorted keys, ordering defined by the tree's comparator.
    pub keys: Vec<K>,

    /// Value for `keys[i]` at position `i`.
    pub values: Vec<V>,

    /// Child subtrees; empty for leaves, `keys.len() + 1` entries otherwise.
    pub children: Vec<Box<BTreeNode<K, V>>>,
}

impl<K, V> BTreeNode<K, V> {
    /// Create an empty leaf node.
    pub fn new_leaf() -> Self {
        Self {
            is_leaf: true,
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create an empty internal node.
    pub fn new_internal() -> Self {
        Self {
            is_leaf: false,
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Whether the node holds the maximum `2t - 1` keys for degree `t`.
    pub fn is_full(&self, degree: usize) -> bool {
        self.keys.len() == 2 * degree - 1
    }
}
