// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Data extractor: moves tabular payloads out of a spec and onto the message.
//!
//! A spec may carry data in three places: the `datasets` map, the top-level
//! `data` key, and the caller's standalone argument. Every payload leaves the
//! spec as codec bytes so that the spec text stays small and stable.

use serde_json::Value;
use tracing::{debug, instrument};
use trellis_chart_proto::{ChartMessage, DataPayload};
use trellis_tabular::{Table, TabularCodec};

use crate::error::{ChartError, Result};
use crate::Spec;

/// A tabular payload on its way to the message.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    /// Bytes already produced by the codec; attached verbatim.
    Encoded(Vec<u8>),
    /// A shaped table.
    Table(Table),
    /// Raw JSON in any shape [`Table::from_json`] accepts. `null` means no payload.
    Json(Value),
}

impl Data {
    /// True when the payload carries nothing to attach.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Json(Value::Null))
    }

    /// Codec bytes for this payload.
    pub fn encode(&self, codec: &dyn TabularCodec) -> Result<Vec<u8>> {
        match self {
            Self::Encoded(bytes) => Ok(bytes.clone()),
            Self::Table(table) => Ok(codec.encode(table)?),
            Self::Json(value) => Ok(codec.encode(&Table::from_json(value)?)?),
        }
    }
}

impl From<Table> for Data {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

impl From<Value> for Data {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Extracts every payload from `spec` onto `msg`.
///
/// Order of operations:
///
/// 1. The `datasets` map, then `extra` (datasets produced outside the spec,
///    e.g. by a declarative conversion), are attached by name and `datasets`
///    is removed. A repeated name fails with `DuplicateDataset`.
/// 2. A dataset name that is also a top-level key of `spec` fails with
///    `DatasetCollision`.
/// 3. `data` holding `{"values": ...}` or a non-object becomes the inline
///    payload and is removed; it overrides the `data` argument. Any other
///    object (`url`, `name`) is an external reference and stays.
/// 4. The resolved inline payload, if any, is encoded into `msg.data`.
#[instrument(skip_all, fields(extra = extra.len()))]
pub fn marshall_chart_data(
    msg: &mut ChartMessage,
    spec: &mut Spec,
    extra: Vec<(String, Data)>,
    data: Option<Data>,
    codec: &dyn TabularCodec,
) -> Result<()> {
    if let Some(datasets) = spec.shift_remove("datasets") {
        let Value::Object(datasets) = datasets else {
            return Err(ChartError::InvalidArgument(
                "'datasets' must be an object mapping names to data".into(),
            ));
        };
        for (name, value) in datasets {
            let bytes = Data::Json(value).encode(codec)?;
            msg.push_dataset(name, bytes)?;
        }
    }
    for (name, payload) in extra {
        let bytes = payload.encode(codec)?;
        msg.push_dataset(name, bytes)?;
    }

    if let Some(name) = msg.dataset_names().find(|name| spec.contains_key(*name)) {
        return Err(ChartError::DatasetCollision {
            name: name.to_owned(),
        });
    }

    let mut data = data;
    match spec.get_mut("data") {
        Some(Value::Object(reference)) => {
            if let Some(values) = reference.shift_remove("values") {
                data = Some(Data::Json(values));
                spec.shift_remove("data");
            }
        }
        Some(_) => {
            data = spec.shift_remove("data").map(Data::Json);
        }
        None => {}
    }

    if let Some(payload) = data.filter(|d| !d.is_absent()) {
        let bytes = payload.encode(codec)?;
        debug!(bytes = bytes.len(), "attached inline payload");
        msg.data = Some(DataPayload { data: bytes });
    }
    debug!(datasets = msg.datasets.len(), "extracted chart data");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;
    use trellis_tabular::CanonicalColumnarCodec;

    fn spec(value: Value) -> Spec {
        value.as_object().cloned().unwrap()
    }

    fn encoded(value: &Value) -> Vec<u8> {
        CanonicalColumnarCodec
            .encode(&Table::from_json(value).unwrap())
            .unwrap()
    }

    #[test]
    fn datasets_are_attached_in_order_and_removed() {
        let mut msg = ChartMessage::default();
        let mut s = spec(json!({
            "mark": "bar",
            "datasets": {"b": [{"v": 1}], "a": [{"v": 2}]}
        }));
        marshall_chart_data(&mut msg, &mut s, Vec::new(), None, &CanonicalColumnarCodec).unwrap();
        assert!(!s.contains_key("datasets"));
        assert_eq!(msg.dataset_names().collect::<Vec<_>>(), ["b", "a"]);
        assert_eq!(msg.datasets[0].data.data, encoded(&json!([{"v": 1}])));
        assert!(msg.data.is_none());
    }

    #[test]
    fn inline_values_become_the_payload() {
        let mut msg = ChartMessage::default();
        let mut s = spec(json!({"data": {"values": [{"x": 1}]}, "mark": "point"}));
        marshall_chart_data(&mut msg, &mut s, Vec::new(), None, &CanonicalColumnarCodec).unwrap();
        assert!(!s.contains_key("data"));
        assert_eq!(msg.data_bytes(), encoded(&json!([{"x": 1}])));
    }

    #[test]
    fn non_object_data_becomes_the_payload() {
        let mut msg = ChartMessage::default();
        let mut s = spec(json!({"data": [1, 2, 3]}));
        marshall_chart_data(&mut msg, &mut s, Vec::new(), None, &CanonicalColumnarCodec).unwrap();
        assert!(s.is_empty());
        assert_eq!(msg.data_bytes(), encoded(&json!([1, 2, 3])));
    }

    #[test]
    fn external_references_stay_in_the_spec() {
        for reference in [json!({"url": "cars.json"}), json!({"name": "source"})] {
            let mut msg = ChartMessage::default();
            let mut s = spec(json!({"data": reference.clone()}));
            marshall_chart_data(&mut msg, &mut s, Vec::new(), None, &CanonicalColumnarCodec)
                .unwrap();
            assert_eq!(s["data"], reference);
            assert!(msg.data.is_none());
        }
    }

    #[test]
    fn spec_payload_overrides_the_argument() {
        let mut msg = ChartMessage::default();
        let mut s = spec(json!({"data": {"values": [7]}}));
        let arg = Data::Json(json!([1]));
        marshall_chart_data(&mut msg, &mut s, Vec::new(), Some(arg), &CanonicalColumnarCodec)
            .unwrap();
        assert_eq!(msg.data_bytes(), encoded(&json!([7])));
    }

    #[test]
    fn argument_payload_is_used_without_spec_data() {
        let mut msg = ChartMessage::default();
        let mut s = spec(json!({"mark": "bar"}));
        let arg = Data::Encoded(vec![0xa0]);
        marshall_chart_data(&mut msg, &mut s, Vec::new(), Some(arg), &CanonicalColumnarCodec)
            .unwrap();
        assert_eq!(msg.data_bytes(), [0xa0]);
    }

    #[test]
    fn null_payload_attaches_nothing() {
        let mut msg = ChartMessage::default();
        let mut s = spec(json!({"data": null, "mark": "bar"}));
        marshall_chart_data(&mut msg, &mut s, Vec::new(), None, &CanonicalColumnarCodec).unwrap();
        assert!(!s.contains_key("data"));
        assert!(msg.data.is_none());
    }

    #[test]
    fn dataset_named_like_a_spec_key_collides() {
        let mut msg = ChartMessage::default();
        let mut s = spec(json!({"data": {"name": "data"}, "datasets": {"data": [1]}}));
        let err = marshall_chart_data(&mut msg, &mut s, Vec::new(), None, &CanonicalColumnarCodec)
            .unwrap_err();
        assert!(matches!(err, ChartError::DatasetCollision { ref name } if name == "data"));
    }

    #[test]
    fn repeated_dataset_name_is_rejected() {
        let mut msg = ChartMessage::default();
        let mut s = spec(json!({"datasets": {"shared": [1]}}));
        let extra = vec![("shared".to_owned(), Data::Encoded(vec![1]))];
        let err = marshall_chart_data(&mut msg, &mut s, extra, None, &CanonicalColumnarCodec)
            .unwrap_err();
        assert!(matches!(err, ChartError::DuplicateDataset { ref name } if name == "shared"));
    }

    #[test]
    fn extra_datasets_are_attached_verbatim() {
        let mut msg = ChartMessage::default();
        let mut s = spec(json!({"data": {"name": "abc"}}));
        let extra = vec![("abc".to_owned(), Data::Encoded(vec![1, 2]))];
        marshall_chart_data(&mut msg, &mut s, extra, None, &CanonicalColumnarCodec).unwrap();
        assert_eq!(msg.datasets[0].data.data, [1, 2]);
    }

    #[test]
    fn non_tabular_payload_is_reported() {
        let mut msg = ChartMessage::default();
        let mut s = spec(json!({"data": "nope"}));
        let err = marshall_chart_data(&mut msg, &mut s, Vec::new(), None, &CanonicalColumnarCodec)
            .unwrap_err();
        assert!(matches!(err, ChartError::Table(_)));
    }
}
