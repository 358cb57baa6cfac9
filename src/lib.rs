// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! rowbase - embedded key/value storage engine with a relational surface.
//!
//! A single-process, file-backed table store: rows live in a heap file, an
//! in-memory B-Tree maps primary keys to byte offsets, a free-list recycles
//! the space deletions leave behind, and a fluent query builder composes
//! filter/project/update/delete pipelines over one table.
//!
//! ## Features
//!
//! - **Generic Tables**: any serde-serialisable key and struct payload
//! - **Comparator Ordering**: caller-defined key order, ordered scans
//! - **Space Reuse**: best-fit reallocation of deleted row slots
//! - **Compaction**: staged rewrite that drops tombstones and rebuilds the
//!   index
//! - **By-Name Projection**: narrow rows into caller-chosen column subsets
//!
//! ## Quick Start
//!
//! ```rust
//! use rowbase::query::Query;
//! use rowbase::table::{OpenOptions, Table};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct User {
//!     id: u32,
//!     name: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct IdOnly {
//!     id: u32,
//! }
//!
//! # let dir = tempfile::tempdir().unwrap();
//! let mut users: Table<u32, User> =
//!     Table::open(dir.path().join("users"), |a: &u32, b| a.cmp(b), OpenOptions::default())?;
//!
//! users.insert(1, User { id: 1, name: "ada".into() })?;
//! users.insert(2, User { id: 2, name: "grace".into() })?;
//!
//! let ids = Query::new(&mut users)
//!     .filter(|row| row.data.id > 1)
//!     .project::<IdOnly>()
//!     .execute()?;
//! assert_eq!(ids.rows.len(), 1);
//! # Ok::<(), rowbase::RowError>(())
//! ```
//!
//! ## Architecture
//!
//! rowbase is organised into modules:
//!
//! - **btree**: primary-key index (insert/search/delete, ordered iteration,
//!   wholesale persistence)
//! - **heap**: length-prefixed, checksummed row records in a random-access
//!   file
//! - **freelist**: best-fit reuse of deleted row slots
//! - **schema**: field-name extraction and by-name projection via serde
//! - **table**: the engine tying index, heap and free-list together
//! - **query**: fluent query builder
//! - **metrics**: in-memory performance samples
//!
//! The engine is single-threaded and a library only: no CLI, no network
//! surface, no environment variables.

pub mod btree;
pub mod error;
pub mod freelist;
pub mod heap;
pub mod metrics;
pub mod query;
pub mod schema;
pub mod table;

// Re-export commonly used types
pub use btree::{BTree, KeyComparator};
pub use error::{RowError, RowResult};
pub use heap::DataRow;
pub use query::{Query, QueryOutput};
pub use table::{OpenOptions, Table, TableStats};
