// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! In-memory B-Tree index with wholesale persistence.
//!
//! Ordered mapping from a primary key to an opaque value (the table engine
//! stores heap-file byte offsets). Ordering is defined by a caller-supplied
//! comparator, not by `Ord`, so a table can index the same key type under
//! different collations.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ BTree                                       │
//! ├─────────────────────────────────────────────┤
//! │ - root: Option<Box<BTreeNode>>              │
//! │ - degree: t (minimum degree, >= 2)          │
//! │ - compare: fn(&K, &K) -> Ordering           │
//! │ - len: live key count                       │
//! └──────────────┬──────────────────────────────┘
//!                │ save() / load()
//!                ▼
//!     pre-order walk, per slot:
//!     [present: bool] [is_leaf, keys, values] [children…]
//! ```
//!
//! ## Operations
//!
//! - **Insert**: O(log n), pre-emptive split of full children on descent
//! - **Search**: O(log n), linear scan within a node
//! - **Delete**: O(log n), borrow/merge rebalancing on descent
//! - **Iteration**: in-order, ascending comparator order
//!
//! ## Example Usage
//!
//! ```rust
//! use rowbase::btree::BTree;
//!
//! let mut tree: BTree<u32, u64> = BTree::new(4, |a: &u32, b| a.cmp(b))?;
//! tree.insert(7, 0);
//! tree.insert(3, 64);
//! assert_eq!(tree.search(&3), Some(&64));
//! assert_eq!(tree.delete(&7), Some(0));
//! # Ok::<(), rowbase::RowError>(())
//! ```

use crate::btree::node::BTreeNode;
use crate::error::{RowError, RowResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Ordering;
use std::io::{Read, Write};

/// Comparator returning the ordering of `a` relative to `b`.
pub type KeyComparator<K> = fn(&K, &K) -> Ordering;

/// Smallest permitted minimum degree.
pub const MIN_DEGREE: usize = 2;

/// In-memory B-Tree keyed by a caller-supplied comparator.
pub struct BTree<K, V> {
    /// Root node; `None` for an empty tree.
    root: Option<Box<BTreeNode<K, V>>>,

    /// Minimum degree `t`; nodes hold at most `2t - 1` keys.
    degree: usize,

    /// Key ordering.
    compare: KeyComparator<K>,

    /// Number of distinct keys currently stored.
    len: usize,
}

impl<K, V> std::fmt::Debug for BTree<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BTree")
            .field("degree", &self.degree)
            .field("len", &self.len)
            .finish()
    }
}

impl<K, V> BTree<K, V> {
    /// Create an empty tree.
    ///
    /// ## Input
    /// - `degree`: minimum degree `t` (must be >= 2)
    /// - `compare`: total order over keys
    ///
    /// ## Output
    /// - `Ok(BTree)`: empty tree ready for use
    /// - `Err(RowError::InvalidDegree)`: degree below the minimum
    pub fn new(degree: usize, compare: KeyComparator<K>) -> RowResult<Self> {
        if degree < MIN_DEGREE {
            return Err(RowError::InvalidDegree {
                degree,
                min: MIN_DEGREE,
            });
        }
        Ok(Self {
            root: None,
            degree,
            compare,
            len: 0,
        })
    }

    /// Number of keys stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Minimum degree the tree was built with.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Drop every node, leaving an empty tree.
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// Point lookup.
    ///
    /// ## Output
    /// - `Some(&V)`: key present
    /// - `None`: key absent
    pub fn search(&self, key: &K) -> Option<&V> {
        let mut node = self.root.as_deref()?;
        loop {
            let pos = Self::scan(node, key, self.compare);
            if pos < node.keys.len() && (self.compare)(key, &node.keys[pos]) == Ordering::Equal {
                return Some(&node.values[pos]);
            }
            if node.is_leaf {
                return None;
            }
            node = &node.children[pos];
        }
    }

    /// Whether the key is present.
    pub fn contains(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    /// First key slot in `node` not ordered before `key`.
    fn scan(node: &BTreeNode<K, V>, key: &K, compare: KeyComparator<K>) -> usize {
        let mut pos = 0;
        while pos < node.keys.len() && compare(key, &node.keys[pos]) == Ordering::Greater {
            pos += 1;
        }
        pos
    }

    pub(crate) fn root_node(&self) -> Option<&BTreeNode<K, V>> {
        self.root.as_deref()
    }

    pub(crate) fn stored_len(&self) -> usize {
        self.len
    }
}

impl<K, V> BTree<K, V>
where
    K: Clone,
{
    /// Insert a key/value pair, overwriting the value of an existing key.
    ///
    /// Descent splits any full child before entering it, so no upward
    /// rebalancing is ever required.
    ///
    /// ## Performance
    /// - O(t log n) comparisons and element moves
    pub fn insert(&mut self, key: K, value: V) {
        let t = self.degree;
        match self.root.take() {
            None => {
                let mut node = BTreeNode::new_leaf();
                node.keys.push(key);
                node.values.push(value);
                self.root = Some(Box::new(node));
                self.len = 1;
            }
            Some(mut root) => {
                if root.is_full(t) {
                    let mut new_root = Box::new(BTreeNode::new_internal());
                    new_root.children.push(root);
                    Self::split_child(&mut new_root, 0, t);
                    root = new_root;
                }
                if Self::insert_non_full(&mut root, key, value, self.compare, t) {
                    self.len += 1;
                }
                self.root = Some(root);
            }
        }
    }

    /// Remove a key, returning its value.
    ///
    /// Standard B-Tree deletion: internal hits are replaced by the in-order
    /// predecessor (left child spares a key), the in-order successor (right
    /// child spares one), or resolved by merging both children around the
    /// separator. On the way down, any minimal child is first filled by
    /// borrowing from a sibling (left preferred) or merging. An emptied root
    /// is replaced by its only child.
    ///
    /// ## Output
    /// - `Some(V)`: key was present, value returned
    /// - `None`: key absent, tree unchanged
    pub fn delete(&mut self, key: &K) -> Option<V> {
        let mut root = self.root.take()?;
        let removed = Self::delete_from(&mut root, key, self.compare, self.degree);
        if root.keys.is_empty() {
            self.root = if root.is_leaf {
                None
            } else {
                Some(root.children.remove(0))
            };
        } else {
            self.root = Some(root);
        }
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Split the full child at `idx`, promoting its median into `parent`.
    fn split_child(parent: &mut BTreeNode<K, V>, idx: usize, t: usize) {
        let (mid_key, mid_value, sibling) = {
            let child = &mut parent.children[idx];
            let mut sibling = if child.is_leaf {
                BTreeNode::new_leaf()
            } else {
                BTreeNode::new_internal()
            };
            sibling.keys = child.keys.split_off(t);
            sibling.values = child.values.split_off(t);
            if !child.is_leaf {
                sibling.children = child.children.split_off(t);
            }
            let mid_key = child.keys.pop().unwrap();
            let mid_value = child.values.pop().unwrap();
            (mid_key, mid_value, sibling)
        };
        parent.keys.insert(idx, mid_key);
        parent.values.insert(idx, mid_value);
        parent.children.insert(idx + 1, Box::new(sibling));
    }

    /// Insert below a node known not to be full.
    ///
    /// Returns `true` when a new key was added, `false` on overwrite.
    fn insert_non_full(
        node: &mut BTreeNode<K, V>,
        key: K,
        value: V,
        compare: KeyComparator<K>,
        t: usize,
    ) -> bool {
        let mut pos = Self::scan(node, &key, compare);
        if pos < node.keys.len() && compare(&key, &node.keys[pos]) == Ordering::Equal {
            node.values[pos] = value;
            return false;
        }
        if node.is_leaf {
            node.keys.insert(pos, key);
            node.values.insert(pos, value);
            return true;
        }
        if node.children[pos].is_full(t) {
            Self::split_child(node, pos, t);
            match compare(&key, &node.keys[pos]) {
                Ordering::Greater => pos += 1,
                Ordering::Equal => {
                    node.values[pos] = value;
                    return false;
                }
                Ordering::Less => {}
            }
        }
        Self::insert_non_full(&mut node.children[pos], key, value, compare, t)
    }

    fn delete_from(
        node: &mut BTreeNode<K, V>,
        key: &K,
        compare: KeyComparator<K>,
        t: usize,
    ) -> Option<V> {
        let pos = Self::scan(node, key, compare);

        if pos < node.keys.len() && compare(key, &node.keys[pos]) == Ordering::Equal {
            if node.is_leaf {
                node.keys.remove(pos);
                return Some(node.values.remove(pos));
            }
            return Some(Self::delete_internal_key(node, pos, key, compare, t));
        }

        if node.is_leaf {
            return None;
        }

        // Fill a minimal child before descending into it.
        let mut child_idx = pos;
        if node.children[child_idx].keys.len() < t {
            child_idx = Self::fill_child(node, child_idx, t);
        }
        Self::delete_from(&mut node.children[child_idx], key, compare, t)
    }

    /// Remove `keys[pos]` from an internal node, returning its value.
    fn delete_internal_key(
        node: &mut BTreeNode<K, V>,
        pos: usize,
        key: &K,
        compare: KeyComparator<K>,
        t: usize,
    ) -> V {
        if node.children[pos].keys.len() >= t {
            let pred = Self::rightmost_key(&node.children[pos]);
            let pred_value = Self::delete_from(&mut node.children[pos], &pred, compare, t)
                .expect("predecessor key present in left subtree");
            node.keys[pos] = pred;
            std::mem::replace(&mut node.values[pos], pred_value)
        } else if node.children[pos + 1].keys.len() >= t {
            let succ = Self::leftmost_key(&node.children[pos + 1]);
            let succ_value = Self::delete_from(&mut node.children[pos + 1], &succ, compare, t)
                .expect("successor key present in right subtree");
            node.keys[pos] = succ;
            std::mem::replace(&mut node.values[pos], succ_value)
        } else {
            // Both neighbours minimal: merging moves the separator into the
            // merged child, where it is then removed.
            Self::merge_children(node, pos);
            Self::delete_from(&mut node.children[pos], key, compare, t)
                .expect("separator key present in merged child")
        }
    }

    /// Bring the child at `idx` up to `t` keys; returns the child's index
    /// afterwards (one less when it was merged into its left sibling).
    fn fill_child(node: &mut BTreeNode<K, V>, idx: usize, t: usize) -> usize {
        if idx > 0 && node.children[idx - 1].keys.len() >= t {
            Self::borrow_from_left(node, idx);
            idx
        } else if idx + 1 < node.children.len() && node.children[idx + 1].keys.len() >= t {
            Self::borrow_from_right(node, idx);
            idx
        } else if idx + 1 < node.children.len() {
            Self::merge_children(node, idx);
            idx
        } else {
            Self::merge_children(node, idx - 1);
            idx - 1
        }
    }

    /// Rotate the separator down into `children[idx]` and the left sibling's
    /// last key up into the parent.
    fn borrow_from_left(node: &mut BTreeNode<K, V>, idx: usize) {
        let (lk, lv, lc) = {
            let left = &mut node.children[idx - 1];
            let lk = left.keys.pop().unwrap();
            let lv = left.values.pop().unwrap();
            let lc = if left.is_leaf {
                None
            } else {
                Some(left.children.pop().unwrap())
            };
            (lk, lv, lc)
        };
        let sep_key = std::mem::replace(&mut node.keys[idx - 1], lk);
        let sep_value = std::mem::replace(&mut node.values[idx - 1], lv);
        let child = &mut node.children[idx];
        child.keys.insert(0, sep_key);
        child.values.insert(0, sep_value);
        if let Some(c) = lc {
            child.children.insert(0, c);
        }
    }

    /// Rotate the separator down into `children[idx]` and the right sibling's
    /// first key up into the parent.
    fn borrow_from_right(node: &mut BTreeNode<K, V>, idx: usize) {
        let (rk, rv, rc) = {
            let right = &mut node.children[idx + 1];
            let rk = right.keys.remove(0);
            let rv = right.values.remove(0);
            let rc = if right.is_leaf {
                None
            } else {
                Some(right.children.remove(0))
            };
            (rk, rv, rc)
        };
        let sep_key = std::mem::replace(&mut node.keys[idx], rk);
        let sep_value = std::mem::replace(&mut node.values[idx], rv);
        let child = &mut node.children[idx];
        child.keys.push(sep_key);
        child.values.push(sep_value);
        if let Some(c) = rc {
            child.children.push(c);
        }
    }

    /// Merge `children[idx + 1]` and the separator `keys[idx]` into
    /// `children[idx]`.
    fn merge_children(node: &mut BTreeNode<K, V>, idx: usize) {
        let sep_key = node.keys.remove(idx);
        let sep_value = node.values.remove(idx);
        let mut right = node.children.remove(idx + 1);
        let left = &mut node.children[idx];
        left.keys.push(sep_key);
        left.values.push(sep_value);
        left.keys.append(&mut right.keys);
        left.values.append(&mut right.values);
        left.children.append(&mut right.children);
    }

    /// Largest key in the subtree, cloned out.
    fn rightmost_key(node: &BTreeNode<K, V>) -> K {
        let mut cur = node;
        while !cur.is_leaf {
            cur = cur.children.last().unwrap();
        }
        cur.keys.last().unwrap().clone()
    }

    /// Smallest key in the subtree, cloned out.
    fn leftmost_key(node: &BTreeNode<K, V>) -> K {
        let mut cur = node;
        while !cur.is_leaf {
            cur = cur.children.first().unwrap();
        }
        cur.keys.first().unwrap().clone()
    }
}

impl<K, V> BTree<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Every (key, value) pair in ascending key order, cloned out eagerly.
    pub fn get_all(&self) -> Vec<(K, V)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl<K, V> BTree<K, V>
where
    K: Clone + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    /// Serialise the tree to `writer`.
    ///
    /// Depth-first pre-order walk: each slot emits a `bool` present flag and,
    /// when present, the node's `(is_leaf, keys, values)` payload followed by
    /// its child slots. The degree is a property of the table and is not part
    /// of the serialised form.
    ///
    /// ## Error Conditions
    /// - `RowError::SerializationError`: a key or value failed to encode
    /// - writer failures surface through the encoder
    pub fn save<W: Write>(&self, writer: &mut W) -> RowResult<()> {
        Self::save_node(self.root.as_deref(), writer)
    }

    fn save_node<W: Write>(node: Option<&BTreeNode<K, V>>, writer: &mut W) -> RowResult<()> {
        let encode_err = |e: bincode::Error| RowError::SerializationError {
            reason: e.to_string(),
        };
        match node {
            None => bincode::serialize_into(&mut *writer, &false).map_err(encode_err)?,
            Some(n) => {
                bincode::serialize_into(&mut *writer, &true).map_err(encode_err)?;
                bincode::serialize_into(&mut *writer, &(n.is_leaf, &n.keys, &n.values))
                    .map_err(encode_err)?;
                for child in &n.children {
                    Self::save_node(Some(child), writer)?;
                }
            }
        }
        Ok(())
    }

    /// Replace the tree's contents with the serialised form read from
    /// `reader`.
    ///
    /// Mirrors [`save`](Self::save) exactly. Malformed input fails with
    /// `RowError::CorruptedIndex` and leaves the tree untouched; a partial
    /// tree is never installed.
    pub fn load<R: Read>(&mut self, reader: &mut R) -> RowResult<()> {
        let root = Self::load_node(reader)?;
        self.len = root.as_deref().map(Self::count_keys).unwrap_or(0);
        self.root = root;
        Ok(())
    }

    fn load_node<R: Read>(reader: &mut R) -> RowResult<Option<Box<BTreeNode<K, V>>>> {
        let decode_err = |e: bincode::Error| RowError::CorruptedIndex {
            reason: e.to_string(),
        };
        let present: bool = bincode::deserialize_from(&mut *reader).map_err(decode_err)?;
        if !present {
            return Ok(None);
        }
        let (is_leaf, keys, values): (bool, Vec<K>, Vec<V>) =
            bincode::deserialize_from(&mut *reader).map_err(decode_err)?;
        if keys.len() != values.len() {
            return Err(RowError::CorruptedIndex {
                reason: format!("node carries {} keys but {} values", keys.len(), values.len()),
            });
        }
        if !is_leaf && keys.is_empty() {
            return Err(RowError::CorruptedIndex {
                reason: "internal node without keys".to_string(),
            });
        }
        let child_count = if is_leaf { 0 } else { keys.len() + 1 };
        let mut node = BTreeNode {
            is_leaf,
            keys,
            values,
            children: Vec::with_capacity(child_count),
        };
        for _ in 0..child_count {
            match Self::load_node(reader)? {
                Some(child) => node.children.push(child),
                None => {
                    return Err(RowError::CorruptedIndex {
                        reason: "missing child slot".to_string(),
                    })
                }
            }
        }
        Ok(Some(Box::new(node)))
    }

    fn count_keys(node: &BTreeNode<K, V>) -> usize {
        node.keys.len()
            + node
                .children
                .iter()
                .map(|c| Self::count_keys(c))
                .sum::<usize>()
    }
}
