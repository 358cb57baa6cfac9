// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Fluent query builder.
//!
//! Composes filter, projection, update and delete steps against one table
//! and executes them in a fixed order:
//!
//! 1. explicit keys (validated against the index), else predicate scan
//! 2. update-by-value for each matched key
//! 3. update-by-function for each matched key
//! 4. projection of the matched rows, **or**
//! 5. deletion of the matched keys (only when explicitly requested)
//!
//! Steps are optional; several effectful steps may run in one execute but
//! are not atomic across keys: a mid-sequence failure surfaces immediately
//! and leaves the effects so far visible.
//!
//! ## Example Usage
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
//! struct NameOnly {
//!     name: String,
//! }
//!
//! # let dir = tempfile::tempdir().unwrap();
//! let mut table: Table<u32, User> =
//!     Table::open(dir.path().join("users"), |a: &u32, b| a.cmp(b), OpenOptions::default())?;
//! table.insert(1, User { id: 1, name: "ada".into() })?;
//! table.insert(2, User { id: 2, name: "grace".into() })?;
//!
//! let output = Query::new(&mut table)
//!     .filter(|row| row.data.id > 1)
//!     .project::<NameOnly>()
//!     .execute()?;
//! assert_eq!(output.rows.len(), 1);
//! assert_eq!(output.rows[0].name, "grace");
//! # Ok::<(), rowbase::RowError>(())
//! ```

use crate::error::{RowError, RowResult};
use crate::heap::DataRow;
use crate::metrics::{Metric, MetricUnit, MetricsCollector};
use crate::query::types::{QueryMetrics, QueryOutput};
use crate::table::Table;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Instant;

/// One query against one table.
///
/// Borrows the table mutably for the query's lifetime; the type parameter
/// `T` is the projection target and defaults to the payload type itself.
pub struct Query<'a, K, V, T = V> {
    table: &'a mut Table<K, V>,
    keys: Option<Vec<K>>,
    predicate: Option<Box<dyn Fn(&DataRow<K, V>) -> bool + 'a>>,
    update_value: Option<V>,
    update_func: Option<Box<dyn Fn(V) -> V + 'a>>,
    delete: bool,
    project: bool,
    _target: PhantomData<fn() -> T>,
}

impl<'a, K, V> Query<'a, K, V, V> {
    /// Start a query against `table`.
    pub fn new(table: &'a mut Table<K, V>) -> Self {
        Self {
            table,
            keys: None,
            predicate: None,
            update_value: None,
            update_func: None,
            delete: false,
            project: false,
            _target: PhantomData,
        }
    }
}

impl<'a, K, V, T> Query<'a, K, V, T> {
    /// Operate on these exact keys instead of scanning with a predicate.
    pub fn keys(mut self, keys: Vec<K>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Match all live rows satisfying `predicate` (full scan).
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&DataRow<K, V>) -> bool + 'a,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Replace every matched row's payload with `value`.
    pub fn set(mut self, value: V) -> Self {
        self.update_value = Some(value);
        self
    }

    /// Transform every matched row's payload with `f`.
    pub fn apply<F>(mut self, f: F) -> Self
    where
        F: Fn(V) -> V + 'a,
    {
        self.update_func = Some(Box::new(f));
        self
    }

    /// Delete every matched row.
    pub fn delete(mut self) -> Self {
        self.delete = true;
        self
    }

    /// Project matched rows into `U`, narrowing fields by name.
    pub fn project<U>(self) -> Query<'a, K, V, U> {
        Query {
            table: self.table,
            keys: self.keys,
            predicate: self.predicate,
            update_value: self.update_value,
            update_func: self.update_func,
            delete: self.delete,
            project: true,
            _target: PhantomData,
        }
    }
}

impl<'a, K, V, T> Query<'a, K, V, T>
where
    K: Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
    T: DeserializeOwned,
{
    /// Run the query.
    ///
    /// ## Output
    /// - `Ok(QueryOutput)`: matched keys, projected rows, effect counts
    /// - `Err(RowError::KeyNotFound)`: an explicit key is absent
    /// - any table-level error from the steps, surfaced immediately;
    ///   effects applied before the failure remain visible
    pub fn execute(self) -> RowResult<QueryOutput<K, T>> {
        let Query {
            table,
            keys,
            predicate,
            update_value,
            update_func,
            delete,
            project,
            _target,
        } = self;

        let start = Instant::now();
        let mut metrics = QueryMetrics::default();

        let keys = match keys {
            Some(keys) => {
                // Explicit keys are validated up front.
                for key in &keys {
                    if !table.contains(key) {
                        return Err(RowError::KeyNotFound);
                    }
                }
                keys
            }
            None => match &predicate {
                Some(pred) => {
                    metrics.rows_scanned = table.len();
                    table.keys_where(|row| pred(row))?
                }
                None => Vec::new(),
            },
        };

        let mut updated = 0;
        if let Some(value) = update_value {
            for key in &keys {
                table.update_with_data(key.clone(), value.clone())?;
                updated += 1;
            }
        }
        if let Some(f) = update_func {
            for key in &keys {
                table.update_with_func(key.clone(), |data| f(data))?;
                updated += 1;
            }
        }

        let mut rows = Vec::new();
        let mut deleted = 0;
        if project {
            rows = table
                .select::<T>(keys.clone())
                .collect::<RowResult<Vec<T>>>()?;
            metrics.rows_returned = rows.len();
        } else if delete {
            for key in &keys {
                table.delete(key)?;
                deleted += 1;
            }
        }

        metrics.execution_time_us = start.elapsed().as_micros() as u64;
        MetricsCollector::global().record(
            Metric::new(
                "query_duration",
                metrics.execution_time_us as f64,
                MetricUnit::Microseconds,
            )
            .with_tag("operation", "execute"),
        );

        Ok(QueryOutput {
            rows,
            keys,
            updated,
            deleted,
            metrics,
        })
    }
}
