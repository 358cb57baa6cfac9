// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Field-name extraction for payload types.
//!
//! A table's column list is the set of named fields its payload type
//! declares. Rather than reflecting over values at runtime, this module asks
//! serde: driving `T::deserialize` with a probing deserializer makes the
//! derived implementation announce its `fields` slice through
//! `deserialize_struct`, which the probe captures and returns through the
//! error channel without ever constructing a `T`. Types that request any
//! other shape (integers, sequences, maps, tuple structs) are rejected;
//! they declare no named fields.

use crate::error::{RowError, RowResult};
use serde::de::{self, DeserializeOwned, Visitor};
use std::fmt;

/// Outcome of a probe, smuggled through serde's error type.
#[derive(Debug)]
enum Probe {
    /// `deserialize_struct` announced these declared field names.
    Fields(&'static [&'static str]),

    /// The type requested a non-struct shape.
    NotAStruct,

    /// Error raised by the type's own `Deserialize` impl.
    Message(String),
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::Fields(fields) => write!(f, "captured {} field names", fields.len()),
            Probe::NotAStruct => write!(f, "type is not a struct with named fields"),
            Probe::Message(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Probe {}

impl de::Error for Probe {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Probe::Message(msg.to_string())
    }
}

/// Deserializer that never produces a value: it only records the shape the
/// probed type asks for.
struct FieldProbe;

impl<'de> de::Deserializer<'de> for FieldProbe {
    type Error = Probe;

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Probe>
    where
        V: Visitor<'de>,
    {
        Err(Probe::Fields(fields))
    }

    fn deserialize_any<V>(self, _visitor: V) -> Result<V::Value, Probe>
    where
        V: Visitor<'de>,
    {
        Err(Probe::NotAStruct)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

/// Declared field names of a payload type, in declaration order.
///
/// ## Output
/// - `Ok(Vec<String>)`: the named fields `T` declares
/// - `Err(RowError::NotAStruct)`: `T` is not a struct with named fields
pub fn field_names<T>() -> RowResult<Vec<String>>
where
    T: DeserializeOwned,
{
    match T::deserialize(FieldProbe) {
        Err(Probe::Fields(fields)) => Ok(fields.iter().map(|f| f.to_string()).collect()),
        // The probe always errors; a produced value or any other outcome
        // means the type did not announce named fields.
        _ => Err(RowError::NotAStruct {
            type_name: std::any::type_name::<T>().to_string(),
        }),
    }
}
