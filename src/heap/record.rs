// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Row record framing.
//!
//! Every row in the heap file is stored as one self-contained record:
//!
//! ```text
//! ┌──────────┬─────────────┬──────────┬───────────┬──────────────┐
//! │ magic u16│ payload_len │ flags u8 │ crc32 u32 │ payload…     │
//! │          │ u32         │          │           │ (bincode)    │
//! └──────────┴─────────────┴──────────┴───────────┴──────────────┘
//! ```
//!
//! The payload is the bincode encoding of `(primary_key, data)`. The validity
//! flag lives in the fixed `flags` slot of the header, never inside the
//! variable-length payload, so tombstoning a row rewrites exactly one byte
//! and cannot disturb the record that follows. The CRC32 covers the payload;
//! the decoder refuses records with a bad magic, an implausible length or a
//! checksum mismatch.

use crate::error::{RowError, RowResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Magic bytes opening every row record.
pub const RECORD_MAGIC: u16 = 0xBA5E;

/// Fixed header size in bytes: magic + payload length + flags + CRC32.
pub const HEADER_LEN: usize = 11;

/// Byte offset of the flags slot within a record.
pub const FLAGS_OFFSET: u64 = 6;

/// Flags bit 0: row is live (not tombstoned).
pub const FLAG_VALID: u8 = 0b0000_0001;

/// Upper bound on a single payload; lengths beyond this are treated as
/// corruption rather than honoured.
const MAX_PAYLOAD_LEN: u32 = 1 << 30;

/// One table row: primary key, structured payload, validity flag.
///
/// `is_valid` is `false` iff the row has been tombstoned by a delete; the
/// space it occupies is reclaimed by compaction.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow<K, V> {
    /// Caller-supplied comparable identifier.
    pub primary_key: K,

    /// Caller-supplied structured payload.
    pub data: V,

    /// Cleared when the row is tombstoned.
    pub is_valid: bool,
}

impl<K, V> DataRow<K, V> {
    /// Wrap a key/payload pair into a live row.
    pub fn new(primary_key: K, data: V) -> Self {
        Self {
            primary_key,
            data,
            is_valid: true,
        }
    }
}

/// Decoded record header.
#[derive(Debug, Clone, Copy)]
pub struct RecordHeader {
    pub payload_len: u32,
    pub flags: u8,
    pub crc: u32,
}

impl RecordHeader {
    /// Total record length including the header itself.
    pub fn record_len(&self) -> u64 {
        HEADER_LEN as u64 + u64::from(self.payload_len)
    }

    /// Validity flag from the flags slot.
    pub fn is_valid(&self) -> bool {
        self.flags & FLAG_VALID != 0
    }
}

/// Encode a row into its on-disk record form.
pub fn encode_row<K, V>(row: &DataRow<K, V>) -> RowResult<Vec<u8>>
where
    K: Serialize,
    V: Serialize,
{
    let payload = bincode::serialize(&(&row.primary_key, &row.data)).map_err(|e| {
        RowError::SerializationError {
            reason: e.to_string(),
        }
    })?;
    if payload.len() as u64 > u64::from(MAX_PAYLOAD_LEN) {
        return Err(RowError::SerializationError {
            reason: format!("payload of {} bytes exceeds record limit", payload.len()),
        });
    }

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&RECORD_MAGIC.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.push(if row.is_valid { FLAG_VALID } else { 0 });
    buf.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Total encoded record size of a row, without materialising the bytes.
pub fn encoded_size<K, V>(row: &DataRow<K, V>) -> RowResult<u64>
where
    K: Serialize,
    V: Serialize,
{
    let payload_len = bincode::serialized_size(&(&row.primary_key, &row.data)).map_err(|e| {
        RowError::SerializationError {
            reason: e.to_string(),
        }
    })?;
    Ok(HEADER_LEN as u64 + payload_len)
}

/// Parse and validate a record header read at `offset`.
pub fn decode_header(bytes: &[u8; HEADER_LEN], offset: u64) -> RowResult<RecordHeader> {
    let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
    if magic != RECORD_MAGIC {
        return Err(RowError::CorruptedRecord {
            offset,
            reason: format!("bad magic 0x{:04X}", magic),
        });
    }
    let payload_len = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(RowError::CorruptedRecord {
            offset,
            reason: format!("implausible payload length {}", payload_len),
        });
    }
    let flags = bytes[6];
    let crc = u32::from_le_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]);
    Ok(RecordHeader {
        payload_len,
        flags,
        crc,
    })
}

/// Decode a record payload against its validated header.
pub fn decode_payload<K, V>(
    header: &RecordHeader,
    payload: &[u8],
    offset: u64,
) -> RowResult<DataRow<K, V>>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    let actual = crc32fast::hash(payload);
    if actual != header.crc {
        return Err(RowError::CorruptedRecord {
            offset,
            reason: format!("CRC32 mismatch (stored {:#010X}, computed {:#010X})", header.crc, actual),
        });
    }
    let (primary_key, data): (K, V) =
        bincode::deserialize(payload).map_err(|e| RowError::DeserializationError {
            reason: e.to_string(),
        })?;
    Ok(DataRow {
        primary_key,
        data,
        is_valid: header.is_valid(),
    })
}
