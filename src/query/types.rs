// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Data structures for query execution results.

/// Timing and volume accounting for one executed query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryMetrics {
    /// Rows visited while evaluating the predicate (0 for explicit keys).
    pub rows_scanned: usize,

    /// Rows materialised by projection.
    pub rows_returned: usize,

    /// Wall-clock execution time in microseconds.
    pub execution_time_us: u64,
}

/// Result of one [`Query::execute`](crate::query::Query::execute).
#[derive(Debug)]
pub struct QueryOutput<K, T> {
    /// Projected rows; empty unless a projection target was set.
    pub rows: Vec<T>,

    /// Keys the query matched (explicit keys or predicate hits).
    pub keys: Vec<K>,

    /// Rows updated by `set` / `apply`.
    pub updated: usize,

    /// Rows deleted.
    pub deleted: usize,

    /// Execution accounting.
    pub metrics: QueryMetrics,
}
