// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire schema for the Vega-Lite chart element.
//!
//! A [`ChartMessage`] is what the chart layer hands to the rendering boundary:
//! the stabilized spec text, presentation flags, the widget identity when
//! selections are enabled, and the tabular payloads pulled out of the spec.
//! Payload bytes are opaque here; they are produced by a
//! `trellis_tabular::TabularCodec`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod wire;

/// Element type tag used when enqueueing and when hashing widget ids.
pub const ELEMENT_TYPE: &str = "arrow_vega_lite_chart";

/// Encoded tabular payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPayload {
    /// Codec output.
    #[serde(serialize_with = "hex_bytes", deserialize_with = "bytes_from_hex")]
    pub data: Vec<u8>,
}

/// Payload referenced from the spec by name (`{"data": {"name": ...}}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedDataset {
    /// Dataset name as it appears in the spec.
    pub name: String,
    /// Always true for datasets produced by the chart layer.
    pub has_name: bool,
    /// Encoded payload.
    pub data: DataPayload,
}

/// A dataset name was attached twice to the same message.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("dataset '{0}' is already attached to this chart")]
pub struct DuplicateDataset(pub String);

/// Outgoing Vega-Lite chart element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartMessage {
    /// Stabilized Vega-Lite spec as JSON text.
    pub spec: String,
    /// Stretch the chart to the container width.
    pub use_container_width: bool,
    /// Theme name; empty means the library default.
    pub theme: String,
    /// Selections are wired back to the script.
    pub is_select_enabled: bool,
    /// Enclosing form id; empty outside forms.
    pub form_id: String,
    /// Widget identity; empty unless selections are enabled.
    pub id: String,
    /// Inline payload (`data.data`), absent when the spec has none.
    pub data: Option<DataPayload>,
    /// Named payloads in attachment order.
    pub datasets: Vec<NamedDataset>,
}

impl ChartMessage {
    /// Attaches a named payload, refusing a name that is already present.
    pub fn push_dataset(
        &mut self,
        name: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<(), DuplicateDataset> {
        let name = name.into();
        if self.datasets.iter().any(|d| d.name == name) {
            return Err(DuplicateDataset(name));
        }
        self.datasets.push(NamedDataset {
            name,
            has_name: true,
            data: DataPayload { data },
        });
        Ok(())
    }

    /// Names of the attached datasets, in attachment order.
    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.iter().map(|d| d.name.as_str())
    }

    /// Inline payload bytes, or an empty slice when absent.
    pub fn data_bytes(&self) -> &[u8] {
        match &self.data {
            Some(payload) => &payload.data,
            None => &[],
        }
    }
}

fn hex_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

fn bytes_from_hex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let text = String::deserialize(deserializer)?;
    hex::decode(text).map_err(serde::de::Error::custom)
}
