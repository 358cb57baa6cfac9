// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Error types for rowbase operations.
//!
//! Provides structured error handling with detailed context for debugging.

use std::fmt;

/// Standard Result type for all rowbase operations.
pub type RowResult<T> = Result<T, RowError>;

/// Error types for rowbase operations.
#[derive(Debug, Clone)]
pub enum RowError {
    /// I/O error during file operations.
    IoError { operation: String, reason: String },

    /// Serialisation error.
    SerializationError { reason: String },

    /// Deserialisation error.
    DeserializationError { reason: String },

    /// Row record corrupted (bad magic, implausible length or CRC32 mismatch).
    CorruptedRecord { offset: u64, reason: String },

    /// Serialised index corrupted or truncated.
    CorruptedIndex { reason: String },

    /// Free-list file corrupted.
    CorruptedFreeList { reason: String },

    /// Primary key not present in the index.
    KeyNotFound,

    /// Payload type does not expose named fields.
    NotAStruct { type_name: String },

    /// Projection target declares a field the source row does not carry.
    UnknownField { field: String },

    /// Projection target field exists on the source but is not assignable.
    ProjectionMismatch { reason: String },

    /// Invalid B-Tree minimum degree.
    InvalidDegree { degree: usize, min: usize },

    /// Write operation attempted on a table opened read-only.
    ReadOnlyTable { operation: String },

    /// Another table instance holds the exclusive lock on these files.
    TableLocked { path: String },
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError { operation, reason } => {
                write!(f, "I/O error during '{}': {}", operation, reason)
            }
            Self::SerializationError { reason } => {
                write!(f, "Serialisation error: {}", reason)
            }
            Self::DeserializationError { reason } => {
                write!(f, "Deserialisation error: {}", reason)
            }
            Self::CorruptedRecord { offset, reason } => {
                write!(f, "Corrupted record at offset {}: {}", offset, reason)
            }
            Self::CorruptedIndex { reason } => {
                write!(f, "Corrupted index: {}", reason)
            }
            Self::CorruptedFreeList { reason } => {
                write!(f, "Corrupted free-list: {}", reason)
            }
            Self::KeyNotFound => {
                write!(f, "key not found")
            }
            Self::NotAStruct { type_name } => {
                write!(f, "Type '{}' is not a struct with named fields", type_name)
            }
            Self::UnknownField { field } => {
                write!(f, "Field '{}' not found in source row", field)
            }
            Self::ProjectionMismatch { reason } => {
                write!(f, "Projection type mismatch: {}", reason)
            }
            Self::InvalidDegree { degree, min } => {
                write!(f, "Invalid B-Tree degree: {} (minimum: {})", degree, min)
            }
            Self::ReadOnlyTable { operation } => {
                write!(f, "Operation '{}' rejected: table opened read-only", operation)
            }
            Self::TableLocked { path } => {
                write!(f, "Table files at '{}' are locked by another instance", path)
            }
        }
    }
}

impl std::error::Error for RowError {}

// Convenience conversion from std::io::Error
impl From<std::io::Error> for RowError {
    fn from(err: std::io::Error) -> Self {
        RowError::IoError {
            operation: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}
