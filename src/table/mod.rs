// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Table engine: CRUD, scans, projection and compaction over one table.
//!
//! A table owns its three files exclusively for its lifetime (enforced by an
//! advisory lock on the data file). Two tables with distinct base names are
//! fully independent.
//!
//! ## Row Lifecycle
//!
//! ```text
//! absent ──insert──▶ live ──delete──▶ tombstoned
//!                      │                  │
//!                      └──update_with_*───┤
//!                                         └──compact──▶ absent
//! ```

#[allow(clippy::module_inception)]
mod table;
mod types;

#[cfg(test)]
mod table_test;

// Re-export public API
pub use crate::heap::DataRow;
pub use table::Table;
pub use types::{OpenOptions, TableStats, DEFAULT_DEGREE};
