// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tabular payload codec port and the default canonical columnar codec.

use ciborium::value::{Integer, Value as Cbor};
use serde_json::{Map, Number, Value};

use crate::canonical::{decode_value, encode_value, CanonError};
use crate::table::{Table, TableError};

/// Format marker written into every columnar payload.
pub const COLUMNAR_FORMAT: &str = "trellis-columnar/1";

/// Errors produced by tabular codecs.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// Canonical CBOR layer failure.
    #[error(transparent)]
    Canon(#[from] CanonError),
    /// The decoded columns do not form a table.
    #[error(transparent)]
    Table(#[from] TableError),
    /// Payload carries a different format marker.
    #[error("unsupported columnar format '{0}'")]
    Format(String),
    /// Payload structure does not match the columnar layout.
    #[error("malformed columnar payload: {0}")]
    Malformed(&'static str),
}

/// Converts tables to and from the byte form attached to chart messages.
///
/// Implementations must be deterministic: equal tables encode to equal
/// bytes, otherwise widget identities drift between script runs.
pub trait TabularCodec: Send + Sync {
    /// Encode a table.
    fn encode(&self, table: &Table) -> Result<Vec<u8>, CodecError>;
    /// Decode bytes produced by [`encode`](TabularCodec::encode).
    fn decode(&self, bytes: &[u8]) -> Result<Table, CodecError>;
}

/// Canonical CBOR columnar layout:
///
/// ```text
/// { "columns": [name, ...], "data": [[cell, ...], ...], "format": "trellis-columnar/1", "rows": n }
/// ```
///
/// Integral floats come back as integers, and record cells come back with
/// their keys in sorted order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalColumnarCodec;

impl TabularCodec for CanonicalColumnarCodec {
    fn encode(&self, table: &Table) -> Result<Vec<u8>, CodecError> {
        let names = table
            .column_names()
            .map(|name| Cbor::Text(name.to_owned()))
            .collect();
        let data = table
            .columns()
            .iter()
            .map(|c| Cbor::Array(c.values.iter().map(json_to_cbor).collect()))
            .collect();
        let payload = Cbor::Map(vec![
            (text("format"), text(COLUMNAR_FORMAT)),
            (text("columns"), Cbor::Array(names)),
            (text("rows"), Cbor::Integer(Integer::from(table.num_rows() as u64))),
            (text("data"), Cbor::Array(data)),
        ]);
        Ok(encode_value(&payload)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Table, CodecError> {
        let Cbor::Map(entries) = decode_value(bytes)? else {
            return Err(CodecError::Malformed("top level is not a map"));
        };
        let field = |key: &str| {
            entries
                .iter()
                .find(|(k, _)| k.as_text() == Some(key))
                .map(|(_, v)| v)
        };
        match field("format").and_then(Cbor::as_text) {
            Some(COLUMNAR_FORMAT) => {}
            Some(other) => return Err(CodecError::Format(other.to_owned())),
            None => return Err(CodecError::Malformed("missing format")),
        }
        let names = field("columns")
            .and_then(Cbor::as_array)
            .ok_or(CodecError::Malformed("missing columns"))?;
        let data = field("data")
            .and_then(Cbor::as_array)
            .ok_or(CodecError::Malformed("missing data"))?;
        let rows = field("rows")
            .and_then(Cbor::as_integer)
            .and_then(|n| usize::try_from(i128::from(n)).ok())
            .ok_or(CodecError::Malformed("missing rows"))?;
        if names.len() != data.len() {
            return Err(CodecError::Malformed("column count mismatch"));
        }

        let mut table = Table::new();
        for (name, cells) in names.iter().zip(data) {
            let name = name
                .as_text()
                .ok_or(CodecError::Malformed("column name is not text"))?;
            let cells = cells
                .as_array()
                .ok_or(CodecError::Malformed("column is not an array"))?;
            if cells.len() != rows {
                return Err(CodecError::Malformed("column length disagrees with rows"));
            }
            let values = cells.iter().map(cbor_to_json).collect::<Result<_, _>>()?;
            table.push_column(name, values)?;
        }
        Ok(table)
    }
}

fn text(s: &str) -> Cbor {
    Cbor::Text(s.to_owned())
}

fn json_to_cbor(value: &Value) -> Cbor {
    match value {
        Value::Null => Cbor::Null,
        Value::Bool(b) => Cbor::Bool(*b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Cbor::Integer(Integer::from(u))
            } else if let Some(i) = n.as_i64() {
                Cbor::Integer(Integer::from(i))
            } else {
                Cbor::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Cbor::Text(s.clone()),
        Value::Array(items) => Cbor::Array(items.iter().map(json_to_cbor).collect()),
        Value::Object(map) => Cbor::Map(
            map.iter()
                .map(|(k, v)| (Cbor::Text(k.clone()), json_to_cbor(v)))
                .collect(),
        ),
    }
}

fn cbor_to_json(value: &Cbor) -> Result<Value, CodecError> {
    Ok(match value {
        Cbor::Null => Value::Null,
        Cbor::Bool(b) => Value::Bool(*b),
        Cbor::Integer(n) => {
            let wide = i128::from(*n);
            if let Ok(i) = i64::try_from(wide) {
                Value::from(i)
            } else if let Ok(u) = u64::try_from(wide) {
                Value::from(u)
            } else {
                return Err(CodecError::Malformed("integer outside 64-bit range"));
            }
        }
        // NaN and infinities have no JSON form.
        Cbor::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Cbor::Text(s) => Value::String(s.clone()),
        Cbor::Array(items) => Value::Array(items.iter().map(cbor_to_json).collect::<Result<_, _>>()?),
        Cbor::Map(entries) => {
            let mut object = Map::new();
            for (k, v) in entries {
                let key = k
                    .as_text()
                    .ok_or(CodecError::Malformed("record key is not text"))?;
                object.insert(key.to_owned(), cbor_to_json(v)?);
            }
            Value::Object(object)
        }
        _ => return Err(CodecError::Malformed("unsupported cell type")),
    })
}
