// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! By-name field projection between record types.
//!
//! Builds a target value whose fields are copied by name from a source
//! record. The source is serialised to a `serde_json::Value` object (serde as
//! the reflective façade), the target's declared fields are looked up by
//! name, and the narrowed object is deserialised into the target type. Every
//! field the target declares must exist on the source with a compatible
//! type; source fields the target does not declare are dropped.

use crate::error::{RowError, RowResult};
use crate::schema::fields::field_names;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Project `source` into a new `T`, copying fields by name.
///
/// ## Output
/// - `Ok(T)`: target built from the source's fields
/// - `Err(RowError::NotAStruct)`: source or target lacks named fields
/// - `Err(RowError::UnknownField)`: target declares a field the source
///   does not carry
/// - `Err(RowError::ProjectionMismatch)`: a field exists but its value does
///   not fit the target's type
///
/// ## Example
/// ```rust
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct User {
///     id: u32,
///     name: String,
///     email: String,
/// }
///
/// #[derive(Deserialize)]
/// struct IdOnly {
///     id: u32,
/// }
///
/// let user = User { id: 7, name: "ada".into(), email: "a@b".into() };
/// let narrow: IdOnly = rowbase::schema::project(&user)?;
/// assert_eq!(narrow.id, 7);
/// # Ok::<(), rowbase::RowError>(())
/// ```
pub fn project<S, T>(source: &S) -> RowResult<T>
where
    S: Serialize,
    T: DeserializeOwned,
{
    let value = serde_json::to_value(source).map_err(|e| RowError::SerializationError {
        reason: e.to_string(),
    })?;
    let src = match value {
        Value::Object(map) => map,
        _ => {
            return Err(RowError::NotAStruct {
                type_name: std::any::type_name::<S>().to_string(),
            })
        }
    };

    let wanted = field_names::<T>()?;
    let mut narrowed = Map::with_capacity(wanted.len());
    for field in wanted {
        match src.get(&field) {
            Some(v) => {
                narrowed.insert(field, v.clone());
            }
            None => return Err(RowError::UnknownField { field }),
        }
    }

    serde_json::from_value(Value::Object(narrowed)).map_err(|e| RowError::ProjectionMismatch {
        reason: e.to_string(),
    })
}
