// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Free-list allocator for deleted heap regions.
//!
//! Deletion leaves a tombstoned record in the heap file; its full encoded
//! span is recorded here as a hole and offered back to later inserts. Entries
//! are kept sorted by size ascending, so a first-fit scan from the front is a
//! best-fit by size. The whole list is rewritten to its file on every
//! modification and read back when a table opens.
//!
//! Allocation happens in two steps: [`FreeList::best_fit`] *plans* a reuse
//! before the heap write, and [`FreeList::take`] *commits* it afterwards,
//! so an insert that fails mid-way leaves no phantom hole. `take` removes the
//! chosen entry on an exact fit and splits it in place otherwise; the caller
//! always writes exactly the planned number of bytes, so a reused hole can
//! never overflow into its neighbour.

use crate::error::{RowError, RowResult};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};


/// One reusable hole in the heap file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeNode {
    /// Byte offset of the hole within the heap file.
    pub offset: u64,

    /// Hole size in bytes (the full encoded span of the deleted record).
    pub size: u64,
}

/// Persisted ordered collection of free heap regions.
#[derive(Debug)]
pub struct FreeList {
    /// Holes sorted by size ascending, ties by offset.
    entries: Vec<FreeNode>,

    /// Backing file, rewritten wholesale on every change. `None` when the
    /// table was opened read-only.
    file: Option<File>,

    path: PathBuf,
}

impl FreeList {
    /// Open or create the free-list file, loading existing entries.
    ///
    /// ## Input
    /// - `path`: file location
    /// - `overwrite`: discard any existing entries
    /// - `read_only`: load entries without taking a writable handle; a
    ///   missing file simply means no recorded holes
    ///
    /// ## Output
    /// - `Ok(FreeList)`: list ready, entries loaded when the file is
    ///   non-empty
    /// - `Err(RowError::CorruptedFreeList)`: the file exists but does not
    ///   decode
    pub fn open<P: AsRef<Path>>(path: P, overwrite: bool, read_only: bool) -> RowResult<Self> {
        let path = path.as_ref().to_path_buf();

        if read_only {
            let entries = match File::open(&path) {
                Ok(mut file) => Self::read_entries(&mut file)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
                Err(e) => {
                    return Err(RowError::IoError {
                        operation: "open_freelist".to_string(),
                        reason: e.to_string(),
                    })
                }
            };
            return Ok(Self {
                entries,
                file: None,
                path,
            });
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(overwrite)
            .open(&path)
            .map_err(|e| RowError::IoError {
                operation: "open_freelist".to_string(),
                reason: e.to_string(),
            })?;

        let entries = Self::read_entries(&mut file)?;
        Ok(Self {
            entries,
            file: Some(file),
            path,
        })
    }

    fn read_entries(file: &mut File) -> RowResult<Vec<FreeNode>> {
        let size = file
            .metadata()
            .map_err(|e| RowError::IoError {
                operation: "stat_freelist".to_string(),
                reason: e.to_string(),
            })?
            .len();
        if size == 0 {
            return Ok(Vec::new());
        }
        bincode::deserialize_from(file).map_err(|e| RowError::CorruptedFreeList {
            reason: e.to_string(),
        })
    }

    /// Holes currently recorded, smallest first.
    pub fn entries(&self) -> &[FreeNode] {
        &self.entries
    }

    /// Number of holes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no holes are recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Plan a reuse: index and offset of the smallest hole that can take
    /// `required` bytes, or `None` when every hole is too small.
    ///
    /// Does not modify the list; commit the plan with [`take`](Self::take)
    /// once the write has succeeded.
    pub fn best_fit(&self, required: u64) -> Option<(usize, u64)> {
        self.entries
            .iter()
            .position(|node| node.size >= required)
            .map(|idx| (idx, self.entries[idx].offset))
    }

    /// Commit a planned reuse of `required` bytes from the hole at `idx`.
    ///
    /// An exact fit removes the entry at the chosen index; a larger hole is
    /// split in place, keeping the remainder `(offset + required,
    /// size - required)`. The list is re-sorted and persisted.
    pub fn take(&mut self, idx: usize, required: u64) -> RowResult<()> {
        let node = self.entries[idx];
        if node.size == required {
            self.entries.remove(idx);
        } else {
            self.entries[idx] = FreeNode {
                offset: node.offset + required,
                size: node.size - required,
            };
            Self::sort(&mut self.entries);
        }
        self.save()
    }

    /// Record a new hole and persist the list.
    pub fn release(&mut self, node: FreeNode) -> RowResult<()> {
        self.entries.push(node);
        Self::sort(&mut self.entries);
        self.save()
    }

    /// Drop every hole and truncate the backing file.
    pub fn clear(&mut self) -> RowResult<()> {
        self.entries.clear();
        let file = match self.file.as_mut() {
            Some(f) => f,
            None => {
                return Err(RowError::ReadOnlyTable {
                    operation: "truncate_freelist".to_string(),
                })
            }
        };
        file.set_len(0).map_err(|e| RowError::IoError {
            operation: "truncate_freelist".to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn sort(entries: &mut [FreeNode]) {
        entries.sort_by(|a, b| a.size.cmp(&b.size).then(a.offset.cmp(&b.offset)));
    }

    /// Rewrite the backing file from scratch.
    fn save(&mut self) -> RowResult<()> {
        let file = match self.file.as_mut() {
            Some(f) => f,
            None => {
                return Err(RowError::ReadOnlyTable {
                    operation: "persist_freelist".to_string(),
                })
            }
        };
        file.seek(SeekFrom::Start(0)).map_err(|e| RowError::IoError {
            operation: "seek_freelist".to_string(),
            reason: e.to_string(),
        })?;
        file.set_len(0).map_err(|e| RowError::IoError {
            operation: "truncate_freelist".to_string(),
            reason: e.to_string(),
        })?;
        bincode::serialize_into(&mut *file, &self.entries).map_err(|e| {
            RowError::SerializationError {
                reason: e.to_string(),
            }
        })?;
        file.flush().map_err(|e| RowError::IoError {
            operation: "flush_freelist".to_string(),
            reason: e.to_string(),
        })
    }
}
