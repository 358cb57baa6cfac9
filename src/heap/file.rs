// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Heap data file.
//!
//! Random-access binary file holding a concatenation of row records
//! (framing in [`crate::heap::record`]). Appends seek to the end and return
//! the starting offset; in-place writes seek to a caller-supplied offset.
//! Offsets are handed out by this module and stored in the B-Tree index.
//!
//! Writable opens take an exclusive advisory lock on the file so a second
//! table instance against the same base name fails fast instead of
//! interleaving writes.

use crate::error::{RowError, RowResult};
use crate::heap::record::{self, DataRow, HEADER_LEN};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Row heap backed by one random-access file.
#[derive(Debug)]
pub struct HeapFile {
    /// File handle; reads go through `&File` so they take `&self`.
    file: File,

    /// Path the file was opened at.
    path: PathBuf,
}

impl HeapFile {
    /// Open or create the heap file.
    ///
    /// ## Input
    /// - `path`: file location
    /// - `overwrite`: truncate any existing content
    /// - `read_only`: open without write access (no lock taken)
    ///
    /// ## Output
    /// - `Ok(HeapFile)`: file opened, exclusive lock held when writable
    /// - `Err(RowError::TableLocked)`: another instance holds the lock
    /// - `Err(RowError::IoError)`: open failed
    pub fn open<P: AsRef<Path>>(path: P, overwrite: bool, read_only: bool) -> RowResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = if read_only {
            OpenOptions::new()
                .read(true)
                .open(&path)
                .map_err(|e| RowError::IoError {
                    operation: "open_heap".to_string(),
                    reason: e.to_string(),
                })?
        } else {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(overwrite)
                .open(&path)
                .map_err(|e| RowError::IoError {
                    operation: "open_heap".to_string(),
                    reason: e.to_string(),
                })?;
            file.try_lock_exclusive()
                .map_err(|_| RowError::TableLocked {
                    path: path.display().to_string(),
                })?;
            file
        };
        Ok(Self { file, path })
    }

    /// Path the file was opened at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file length in bytes.
    pub fn len(&self) -> RowResult<u64> {
        Ok(self
            .file
            .metadata()
            .map_err(|e| RowError::IoError {
                operation: "stat_heap".to_string(),
                reason: e.to_string(),
            })?
            .len())
    }

    /// Whether the file holds no bytes.
    pub fn is_empty(&self) -> RowResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Flush file contents to stable storage.
    pub fn sync(&self) -> RowResult<()> {
        self.file.sync_all().map_err(|e| RowError::IoError {
            operation: "sync_heap".to_string(),
            reason: e.to_string(),
        })
    }

    /// Write a row record.
    ///
    /// ## Input
    /// - `row`: row to encode
    /// - `location`: `None` appends at the end; `Some(offset)` overwrites in
    ///   place (the caller guarantees the encoding fits the slot)
    ///
    /// ## Output
    /// - `Ok(offset)`: starting offset the record was written at
    pub fn write_row<K, V>(&mut self, row: &DataRow<K, V>, location: Option<u64>) -> RowResult<u64>
    where
        K: Serialize,
        V: Serialize,
    {
        let bytes = record::encode_row(row)?;
        match location {
            None => self.append(&bytes),
            Some(offset) => {
                self.write_at(offset, &bytes)?;
                Ok(offset)
            }
        }
    }

    /// Read and decode one row record at `offset`.
    ///
    /// ## Output
    /// - `Ok((row, record_len))`: decoded row and its total encoded length
    /// - `Err(RowError::CorruptedRecord)`: bad magic, truncation or CRC
    ///   mismatch
    pub fn read_row<K, V>(&self, offset: u64) -> RowResult<(DataRow<K, V>, u64)>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
    {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| RowError::IoError {
                operation: "seek_heap".to_string(),
                reason: e.to_string(),
            })?;

        let mut header_bytes = [0u8; HEADER_LEN];
        read_fully(&mut file, &mut header_bytes, offset, "record header")?;
        let header = record::decode_header(&header_bytes, offset)?;

        let mut payload = vec![0u8; header.payload_len as usize];
        read_fully(&mut file, &mut payload, offset, "record payload")?;
        let row = record::decode_payload(&header, &payload, offset)?;
        Ok((row, header.record_len()))
    }

    /// Rewrite the validity flag of the record at `offset`.
    ///
    /// The flag occupies a fixed header slot, so this writes exactly one byte
    /// and leaves the rest of the record untouched. The header is validated
    /// first so a stray offset cannot clobber foreign bytes.
    pub fn set_validity(&mut self, offset: u64, valid: bool) -> RowResult<()> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| RowError::IoError {
                operation: "seek_heap".to_string(),
                reason: e.to_string(),
            })?;
        let mut header_bytes = [0u8; HEADER_LEN];
        read_fully(&mut file, &mut header_bytes, offset, "record header")?;
        let header = record::decode_header(&header_bytes, offset)?;

        let flags = if valid {
            header.flags | record::FLAG_VALID
        } else {
            header.flags & !record::FLAG_VALID
        };
        self.write_at(offset + record::FLAGS_OFFSET, &[flags])
    }

    /// Append raw bytes at the end of the file, returning their offset.
    pub(crate) fn append(&mut self, bytes: &[u8]) -> RowResult<u64> {
        let offset = self
            .file
            .seek(SeekFrom::End(0))
            .map_err(|e| RowError::IoError {
                operation: "seek_heap_end".to_string(),
                reason: e.to_string(),
            })?;
        self.file.write_all(bytes).map_err(|e| RowError::IoError {
            operation: "append_record".to_string(),
            reason: e.to_string(),
        })?;
        Ok(offset)
    }

    /// Overwrite raw bytes at a known offset.
    pub(crate) fn write_at(&mut self, offset: u64, bytes: &[u8]) -> RowResult<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| RowError::IoError {
                operation: "seek_heap".to_string(),
                reason: e.to_string(),
            })?;
        self.file.write_all(bytes).map_err(|e| RowError::IoError {
            operation: "write_record".to_string(),
            reason: e.to_string(),
        })
    }
}

/// `read_exact` with truncation reported as record corruption.
fn read_fully(file: &mut &File, buf: &mut [u8], offset: u64, what: &str) -> RowResult<()> {
    file.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            RowError::CorruptedRecord {
                offset,
                reason: format!("truncated {}", what),
            }
        } else {
            RowError::IoError {
                operation: "read_record".to_string(),
                reason: e.to_string(),
            }
        }
    })
}
