// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Table engine.
//!
//! One logical table = one B-Tree index + one heap file + one free-list,
//! bound to a base name on disk:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │ Table<K, V>                                           │
//! ├───────────────────────────────────────────────────────┤
//! │ columns: field names of V                             │
//! │ index:   BTree<K, u64>  (key → heap offset)           │
//! │ heap:    HeapFile       (row records)                 │
//! │ free:    FreeList       (reusable holes)              │
//! └───────┬──────────────────┬──────────────────┬─────────┘
//!         ▼                  ▼                  ▼
//!   <base>_index.bin   <base>_data.bin    <base>_free.bin
//! ```
//!
//! Inserts fill the smallest sufficient hole or append; deletes tombstone in
//! place and record the hole; compaction rewrites the heap to live rows only
//! and rebuilds the index. The index is persisted explicitly via
//! [`Table::save_index`] / [`Table::load_index`].
//!
//! ## Consistency
//!
//! Every offset reachable from the index decodes to a live row whose stored
//! primary key equals its indexing key. Updates are delete-then-insert and
//! deliberately not atomic: a failure between the steps leaves the old slot
//! tombstoned with no replacement row, and the caller retries or compacts.

use crate::btree::{BTree, KeyComparator};
use crate::error::{RowError, RowResult};
use crate::freelist::{FreeList, FreeNode};
use crate::heap::{self, DataRow, HeapFile};
use crate::metrics::{Metric, MetricUnit, MetricsCollector};
use crate::schema;
use crate::table::types::{OpenOptions, TableStats};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One logical table of rows keyed by `K` carrying payload `V`.
pub struct Table<K, V> {
    /// Base name the file paths were derived from.
    base: String,

    /// Column names declared by `V`.
    columns: Vec<String>,

    /// Primary-key index mapping keys to heap offsets.
    index: BTree<K, u64>,

    /// Row storage.
    heap: HeapFile,

    /// Reusable holes left by deletions.
    free: FreeList,

    /// Serialised-index location.
    index_path: PathBuf,

    /// B-Tree minimum degree, fixed at open.
    degree: usize,

    /// Mutating operations are rejected when set.
    read_only: bool,

    /// Operation counters.
    stats: TableStats,

    _payload: PhantomData<fn() -> V>,
}

impl<K, V> std::fmt::Debug for Table<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("base", &self.base)
            .field("columns", &self.columns)
            .field("rows", &self.index.len())
            .field("degree", &self.degree)
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl<K, V> Table<K, V>
where
    K: Clone + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    /// Open or create the table files derived from `base`.
    ///
    /// ## Input
    /// - `base`: base name; yields `<base>_data.bin`, `<base>_index.bin` and
    ///   `<base>_free.bin`
    /// - `compare`: total order over primary keys
    /// - `options`: degree, overwrite and read-only behaviour
    ///
    /// ## Output
    /// - `Ok(Table)`: files opened, free-list loaded, columns derived
    /// - `Err(RowError::NotAStruct)`: `V` declares no named fields
    /// - `Err(RowError::InvalidDegree)`: degree below 2
    /// - `Err(RowError::TableLocked)`: another instance owns these files
    ///
    /// ## Side Effects
    /// - Creates missing files (writable opens)
    /// - Takes an exclusive advisory lock on the data file
    ///
    /// The index starts empty; call [`load_index`](Self::load_index) to read
    /// a previously saved one.
    pub fn open<P: AsRef<Path>>(
        base: P,
        compare: KeyComparator<K>,
        options: OpenOptions,
    ) -> RowResult<Self> {
        if options.read_only && options.overwrite {
            return Err(RowError::ReadOnlyTable {
                operation: "overwrite".to_string(),
            });
        }

        let base = base.as_ref();
        let columns = schema::field_names::<V>()?;
        let index = BTree::new(options.degree, compare)?;

        let heap = HeapFile::open(
            suffixed_path(base, "data"),
            options.overwrite,
            options.read_only,
        )?;
        let free = FreeList::open(
            suffixed_path(base, "free"),
            options.overwrite,
            options.read_only,
        )?;
        let index_path = suffixed_path(base, "index");
        if options.overwrite {
            // A stale serialised index must not outlive truncated data.
            if index_path.exists() {
                fs::remove_file(&index_path).map_err(|e| RowError::IoError {
                    operation: "remove_index".to_string(),
                    reason: e.to_string(),
                })?;
            }
        }

        Ok(Self {
            base: base.display().to_string(),
            columns,
            index,
            heap,
            free,
            index_path,
            degree: options.degree,
            read_only: options.read_only,
            stats: TableStats::default(),
            _payload: PhantomData,
        })
    }

    /// Column names declared by the payload type, in declaration order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of live rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the table holds no live rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// B-Tree minimum degree the table was opened with.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Whether the table rejects mutations.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Operation counters.
    pub fn stats(&self) -> TableStats {
        self.stats
    }

    /// Holes currently available for reuse, smallest first.
    pub fn free_nodes(&self) -> &[FreeNode] {
        self.free.entries()
    }

    /// Current heap file length in bytes.
    pub fn heap_len(&self) -> RowResult<u64> {
        self.heap.len()
    }

    /// Insert a row.
    ///
    /// The row is encoded first, then space is taken from the smallest
    /// sufficient free hole (appending when none fits), and the index is
    /// updated last, so an encoding or I/O failure leaves index and heap
    /// unchanged. Inserting an existing key points the index at the new
    /// record and leaks the old one until compaction; use
    /// [`update_with_data`](Self::update_with_data) to reclaim it.
    pub fn insert(&mut self, primary_key: K, data: V) -> RowResult<()> {
        self.ensure_writable("insert")?;
        let row = DataRow::new(primary_key, data);
        let bytes = heap::encode_row(&row)?;
        let required = bytes.len() as u64;

        let offset = match self.free.best_fit(required) {
            Some((idx, offset)) => {
                self.heap.write_at(offset, &bytes)?;
                self.free.take(idx, required)?;
                offset
            }
            None => self.heap.append(&bytes)?,
        };

        self.index.insert(row.primary_key, offset);
        self.stats.inserts += 1;
        Ok(())
    }

    /// Look up a row by primary key.
    ///
    /// ## Output
    /// - `Ok(DataRow)`: live row
    /// - `Err(RowError::KeyNotFound)`: key absent from the index
    /// - `Err(RowError::CorruptedRecord)`: offset resolves to a tombstone or
    ///   an undecodable record
    pub fn search(&self, primary_key: &K) -> RowResult<DataRow<K, V>> {
        let offset = *self.index.search(primary_key).ok_or(RowError::KeyNotFound)?;
        let (row, _) = self.fetch(offset)?;
        Ok(row)
    }

    /// Whether a primary key is present.
    pub fn contains(&self, primary_key: &K) -> bool {
        self.index.contains(primary_key)
    }

    /// Delete a row, returning it.
    ///
    /// Removes the index entry, clears the record's validity flag in place
    /// and records the full encoded span as a reusable hole.
    ///
    /// ## Output
    /// - `Ok(DataRow)`: the deleted row, `is_valid` cleared
    /// - `Err(RowError::KeyNotFound)`: key absent
    pub fn delete(&mut self, primary_key: &K) -> RowResult<DataRow<K, V>> {
        self.ensure_writable("delete")?;
        let offset = self.index.delete(primary_key).ok_or(RowError::KeyNotFound)?;
        let (mut row, record_len) = self.heap.read_row(offset)?;
        self.heap.set_validity(offset, false)?;
        row.is_valid = false;
        self.free.release(FreeNode {
            offset,
            size: record_len,
        })?;
        self.stats.deletes += 1;
        Ok(row)
    }

    /// Replace a row's payload with a new value.
    ///
    /// Delete followed by insert; not atomic. A failure between the steps
    /// leaves the old slot tombstoned with no replacement; the caller
    /// retries with a fresh insert.
    pub fn update_with_data(&mut self, primary_key: K, data: V) -> RowResult<()> {
        self.ensure_writable("update")?;
        self.delete(&primary_key)?;
        self.insert(primary_key, data)?;
        self.stats.updates += 1;
        Ok(())
    }

    /// Replace a row's payload by applying `f` to the stored value.
    ///
    /// Same sequencing and atomicity caveat as
    /// [`update_with_data`](Self::update_with_data).
    pub fn update_with_func<F>(&mut self, primary_key: K, f: F) -> RowResult<()>
    where
        F: FnOnce(V) -> V,
    {
        self.ensure_writable("update")?;
        let old = self.delete(&primary_key)?;
        self.insert(primary_key, f(old.data))?;
        self.stats.updates += 1;
        Ok(())
    }

    /// Lazily yield every live row in ascending key order.
    pub fn get_all(&self) -> impl Iterator<Item = RowResult<DataRow<K, V>>> + '_ {
        self.index
            .iter()
            .map(move |(_, offset)| self.fetch(*offset).map(|(row, _)| row))
    }

    /// Keys of all live rows satisfying `predicate`, in ascending order.
    ///
    /// Full scan; there is no predicate pushdown.
    pub fn keys_where<F>(&self, predicate: F) -> RowResult<Vec<K>>
    where
        F: Fn(&DataRow<K, V>) -> bool,
    {
        let mut keys = Vec::new();
        for row in self.get_all() {
            let row = row?;
            if predicate(&row) {
                keys.push(row.primary_key);
            }
        }
        Ok(keys)
    }

    /// Fetch the rows for explicit keys, failing on the first absent one.
    pub fn rows_for(&self, keys: &[K]) -> RowResult<Vec<DataRow<K, V>>> {
        keys.iter().map(|key| self.search(key)).collect()
    }

    /// Lazily project the rows for `keys` into the target type `T`.
    ///
    /// Each row is fetched and narrowed by field name
    /// (see [`schema::project`]); an absent key or unmatched field surfaces
    /// as that element's error.
    pub fn select<T>(&self, keys: Vec<K>) -> impl Iterator<Item = RowResult<T>> + '_
    where
        T: DeserializeOwned,
    {
        keys.into_iter().map(move |key| {
            let row = self.search(&key)?;
            schema::project(&row.data)
        })
    }

    /// Write the serialised index to `<base>_index.bin`, wholesale.
    pub fn save_index(&self) -> RowResult<()> {
        self.ensure_writable("save_index")?;
        let file = fs::File::create(&self.index_path).map_err(|e| RowError::IoError {
            operation: "create_index".to_string(),
            reason: e.to_string(),
        })?;
        let mut writer = BufWriter::new(file);
        self.index.save(&mut writer)?;
        writer.flush().map_err(|e| RowError::IoError {
            operation: "flush_index".to_string(),
            reason: e.to_string(),
        })
    }

    /// Replace the in-memory index with the serialised one, wholesale.
    pub fn load_index(&mut self) -> RowResult<()> {
        let file = fs::File::open(&self.index_path).map_err(|e| RowError::IoError {
            operation: "open_index".to_string(),
            reason: e.to_string(),
        })?;
        let mut reader = BufReader::new(file);
        self.index.load(&mut reader)
    }

    /// Rewrite the heap to live rows only and rebuild the index.
    ///
    /// Live rows are streamed in ascending key order into `<data>.tmp`,
    /// which is then renamed over the data file; the index is rebuilt to the
    /// new offsets, saved, and the free-list truncated. A failure before the
    /// rename removes the temp file and changes nothing visible; after the
    /// rename, index and heap are consistent with an empty free-list.
    pub fn compact(&mut self) -> RowResult<()> {
        self.ensure_writable("compact")?;
        let start = Instant::now();
        let data_path = self.heap.path().to_path_buf();
        let tmp_path = {
            let mut p = data_path.clone().into_os_string();
            p.push(".tmp");
            PathBuf::from(p)
        };

        let new_offsets = match self.rewrite_live_rows(&tmp_path) {
            Ok(offsets) => offsets,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
        };

        fs::rename(&tmp_path, &data_path).map_err(|e| RowError::IoError {
            operation: "rename_heap".to_string(),
            reason: e.to_string(),
        })?;
        self.heap = HeapFile::open(&data_path, false, false)?;

        self.index.clear();
        for (key, offset) in new_offsets {
            self.index.insert(key, offset);
        }
        self.save_index()?;
        self.free.clear()?;
        self.stats.compactions += 1;

        MetricsCollector::global().record(
            Metric::new(
                "compact_duration",
                start.elapsed().as_micros() as f64,
                MetricUnit::Microseconds,
            )
            .with_tag("table", &self.base),
        );
        Ok(())
    }

    /// Stream live rows in key order into a fresh heap at `tmp_path`.
    fn rewrite_live_rows(&self, tmp_path: &Path) -> RowResult<Vec<(K, u64)>> {
        let mut tmp = HeapFile::open(tmp_path, true, false)?;
        let mut new_offsets = Vec::with_capacity(self.index.len());
        for (key, offset) in self.index.iter() {
            let (row, _) = self.fetch(*offset)?;
            let new_offset = tmp.write_row(&row, None)?;
            new_offsets.push((key.clone(), new_offset));
        }
        tmp.sync()?;
        Ok(new_offsets)
    }

    /// Read the row at `offset`, enforcing the index→heap invariant.
    fn fetch(&self, offset: u64) -> RowResult<(DataRow<K, V>, u64)> {
        let (row, len) = self.heap.read_row(offset)?;
        if !row.is_valid {
            return Err(RowError::CorruptedRecord {
                offset,
                reason: "tombstoned row reachable from index".to_string(),
            });
        }
        Ok((row, len))
    }

    fn ensure_writable(&self, operation: &str) -> RowResult<()> {
        if self.read_only {
            return Err(RowError::ReadOnlyTable {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }
}

/// Derive `<base>_<suffix>.bin` next to the base path.
fn suffixed_path(base: &Path, suffix: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(format!("_{}.bin", suffix));
    PathBuf::from(s)
}
