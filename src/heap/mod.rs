// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Heap file storage for serialised rows.
//!
//! An append-oriented random-access file of length-prefixed, checksummed row
//! records, plus the framing that encodes and validates them. The table
//! engine addresses records by the byte offsets this module returns; nothing
//! here interprets offsets beyond seeking to them.

mod file;
mod record;


// Re-export public API
pub use file::HeapFile;
pub use record::{
    encode_row, encoded_size, DataRow, RecordHeader, FLAG_VALID, HEADER_LEN, RECORD_MAGIC,
};
