// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical CBOR form of [`ChartMessage`].
//!
//! Field layout (map keys, canonical order applied by the encoder):
//!
//! `spec`, `use_container_width`, `theme`, `is_select_enabled`, `form_id`,
//! `id`, `data` (byte string, omitted when absent), `datasets` (array of
//! `{name, has_name, data}`).

use ciborium::value::Value;
use trellis_tabular::canonical::{decode_value, encode_value, CanonError};

use crate::{ChartMessage, DataPayload, NamedDataset};

/// Errors decoding a chart message from the wire.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    /// Canonical CBOR layer failure.
    #[error(transparent)]
    Canon(#[from] CanonError),
    /// A required field is missing.
    #[error("missing field '{0}'")]
    Missing(&'static str),
    /// A field has the wrong CBOR type.
    #[error("field '{0}' has the wrong type")]
    Type(&'static str),
}

/// Encode a message as canonical CBOR.
pub fn encode_message(msg: &ChartMessage) -> Result<Vec<u8>, CanonError> {
    let mut fields = vec![
        (text("spec"), text(&msg.spec)),
        (text("use_container_width"), Value::Bool(msg.use_container_width)),
        (text("theme"), text(&msg.theme)),
        (text("is_select_enabled"), Value::Bool(msg.is_select_enabled)),
        (text("form_id"), text(&msg.form_id)),
        (text("id"), text(&msg.id)),
    ];
    if let Some(payload) = &msg.data {
        fields.push((text("data"), Value::Bytes(payload.data.clone())));
    }
    let datasets = msg
        .datasets
        .iter()
        .map(|d| {
            Value::Map(vec![
                (text("name"), text(&d.name)),
                (text("has_name"), Value::Bool(d.has_name)),
                (text("data"), Value::Bytes(d.data.data.clone())),
            ])
        })
        .collect();
    fields.push((text("datasets"), Value::Array(datasets)));
    encode_value(&Value::Map(fields))
}

/// Decode a message produced by [`encode_message`].
pub fn decode_message(bytes: &[u8]) -> Result<ChartMessage, WireError> {
    let Value::Map(fields) = decode_value(bytes)? else {
        return Err(WireError::Type("message"));
    };
    let data = match field(&fields, "data") {
        Some(Value::Bytes(b)) => Some(DataPayload { data: b.clone() }),
        Some(_) => return Err(WireError::Type("data")),
        None => None,
    };
    let datasets = match field(&fields, "datasets") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                let Value::Map(entry) = item else {
                    return Err(WireError::Type("datasets"));
                };
                Ok(NamedDataset {
                    name: req_text(entry, "name")?,
                    has_name: req_bool(entry, "has_name")?,
                    data: DataPayload {
                        data: match field(entry, "data") {
                            Some(Value::Bytes(b)) => b.clone(),
                            Some(_) => return Err(WireError::Type("data")),
                            None => return Err(WireError::Missing("data")),
                        },
                    },
                })
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(WireError::Type("datasets")),
        None => Vec::new(),
    };
    Ok(ChartMessage {
        spec: req_text(&fields, "spec")?,
        use_container_width: req_bool(&fields, "use_container_width")?,
        theme: req_text(&fields, "theme")?,
        is_select_enabled: req_bool(&fields, "is_select_enabled")?,
        form_id: req_text(&fields, "form_id")?,
        id: req_text(&fields, "id")?,
        data,
        datasets,
    })
}

fn text(s: &str) -> Value {
    Value::Text(s.to_owned())
}

fn field<'a>(fields: &'a [(Value, Value)], name: &str) -> Option<&'a Value> {
    fields
        .iter()
        .find(|(k, _)| k.as_text() == Some(name))
        .map(|(_, v)| v)
}

fn req_text(fields: &[(Value, Value)], name: &'static str) -> Result<String, WireError> {
    field(fields, name)
        .ok_or(WireError::Missing(name))?
        .as_text()
        .map(str::to_owned)
        .ok_or(WireError::Type(name))
}

fn req_bool(fields: &[(Value, Value)], name: &'static str) -> Result<bool, WireError> {
    field(fields, name)
        .ok_or(WireError::Missing(name))?
        .as_bool()
        .ok_or(WireError::Type(name))
}
