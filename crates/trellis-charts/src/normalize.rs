// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Spec normalizer: keyword merging, emptiness check, default autosize.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{ChartError, Result};
use crate::Spec;

/// Vega-Lite encoding channels. Keyword arguments with one of these names are
/// nested under `encoding` by [`unflatten`].
pub const ENCODING_CHANNELS: [&str; 26] = [
    "x",
    "y",
    "x2",
    "y2",
    "xError",
    "xError2",
    "yError",
    "yError2",
    "longitude",
    "latitude",
    "color",
    "opacity",
    "fillOpacity",
    "strokeOpacity",
    "strokeWidth",
    "size",
    "shape",
    "text",
    "tooltip",
    "href",
    "key",
    "order",
    "detail",
    "facet",
    "row",
    "column",
];

/// Keys whose array items are nested view specs.
const VIEW_ARRAYS: [&str; 4] = ["layer", "concat", "hconcat", "vconcat"];

/// Expands `a_b_c`-style keys into nested objects and moves encoding channels
/// under an `encoding` object.
///
/// Channels move only on view levels: the top level, the items of `layer` and
/// the concat arrays, and the object under `spec`. Property objects such as
/// `title` or `axis` keep members named like channels (`title.text`). Members
/// of an explicit `encoding` object are never moved again.
pub fn unflatten(flat: &Spec, channels: &[&str]) -> Spec {
    nest_level(split_keys(flat.clone()), channels, true)
}

fn split_keys(flat: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (path, value) in flat {
        let parts: Vec<&str> = path.split('_').collect();
        insert_path(&mut out, &parts, value);
    }
    out
}

fn insert_path(level: &mut Map<String, Value>, parts: &[&str], value: Value) {
    match parts {
        [] => {}
        [leaf] => {
            level.insert((*leaf).to_owned(), value);
        }
        [head, rest @ ..] => {
            if let Some(child) = object_slot(level, head) {
                insert_path(child, rest, value);
            }
        }
    }
}

fn nest_level(
    level: Map<String, Value>,
    channels: &[&str],
    view_level: bool,
) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in level {
        let value = match value {
            Value::Object(child) => {
                Value::Object(nest_level(split_keys(child), channels, key == "spec"))
            }
            Value::Array(items) => {
                let views = VIEW_ARRAYS.contains(&key.as_str());
                Value::Array(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Value::Object(child) => {
                                Value::Object(nest_level(split_keys(child), channels, views))
                            }
                            other => other,
                        })
                        .collect(),
                )
            }
            other => other,
        };
        if view_level && channels.contains(&key.as_str()) {
            if let Some(encoding) = object_slot(&mut out, "encoding") {
                encoding.insert(key, value);
            }
            continue;
        }
        match value {
            // channels moved earlier on this level already opened `encoding`
            Value::Object(mut merged) if key == "encoding" && out.contains_key("encoding") => {
                let moved = out
                    .get_mut("encoding")
                    .and_then(Value::as_object_mut)
                    .map(std::mem::take)
                    .unwrap_or_default();
                merged.extend(moved);
                out.insert(key, Value::Object(merged));
            }
            value => {
                out.insert(key, value);
            }
        }
    }
    out
}

/// Object stored under `key`, replacing any non-object value found there.
/// The key keeps its position when it already exists.
fn object_slot<'m>(
    level: &'m mut Map<String, Value>,
    key: &str,
) -> Option<&'m mut Map<String, Value>> {
    if !level.get(key).is_some_and(Value::is_object) {
        level.insert(key.to_owned(), Value::Object(Map::new()));
    }
    level.get_mut(key).and_then(Value::as_object_mut)
}

/// Builds the working spec for one chart call.
///
/// Keyword arguments are unflattened and shallow-merged over `spec`, winning
/// on conflicts. An empty result is rejected. A missing `autosize` defaults to
/// `fit-x` for container-width `vconcat` charts and `fit` otherwise.
pub fn prepare_spec(
    spec: Option<Spec>,
    use_container_width: bool,
    kwargs: &Spec,
) -> Result<Spec> {
    let mut spec = spec.unwrap_or_default();
    if !kwargs.is_empty() {
        let nested = unflatten(kwargs, &ENCODING_CHANNELS);
        debug!(keys = nested.len(), "merging keyword arguments into spec");
        spec.extend(nested);
    }
    if spec.is_empty() {
        return Err(ChartError::EmptySpec);
    }
    if !spec.contains_key("autosize") {
        let fit = if spec.contains_key("vconcat") && use_container_width {
            "fit-x"
        } else {
            "fit"
        };
        spec.insert("autosize".into(), json!({"type": fit, "contains": "padding"}));
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn obj(value: Value) -> Spec {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn unflatten_nests_paths_and_channels() {
        let flat = obj(json!({
            "mark": "bar",
            "x_field": "a",
            "x_type": "quantitative",
            "title_text": "t"
        }));
        let nested = unflatten(&flat, &ENCODING_CHANNELS);
        assert_eq!(
            Value::Object(nested),
            json!({
                "mark": "bar",
                "encoding": {"x": {"field": "a", "type": "quantitative"}},
                "title": {"text": "t"}
            })
        );
    }

    #[test]
    fn unflatten_recurses_into_arrays() {
        let flat = obj(json!({"layer": [{"mark": "line", "y_field": "v"}, 3]}));
        let nested = unflatten(&flat, &ENCODING_CHANNELS);
        assert_eq!(
            Value::Object(nested),
            json!({"layer": [{"mark": "line", "encoding": {"y": {"field": "v"}}}, 3]})
        );
    }

    #[test]
    fn unflatten_leaves_property_objects_alone() {
        let flat = obj(json!({
            "title_text": "Sales",
            "title_color": "gray",
            "mark_type": "bar",
            "mark_color": "red",
            "text_value": "label",
            "spec_mark": "point",
            "spec_size_value": 20
        }));
        let nested = unflatten(&flat, &ENCODING_CHANNELS);
        assert_eq!(
            Value::Object(nested),
            json!({
                "title": {"text": "Sales", "color": "gray"},
                "mark": {"type": "bar", "color": "red"},
                "encoding": {"text": {"value": "label"}},
                "spec": {"mark": "point", "encoding": {"size": {"value": 20}}}
            })
        );
    }

    #[test]
    fn unflatten_keeps_existing_encoding_members_in_place() {
        let flat = obj(json!({"color_value": "red", "encoding": {"x": {"field": "a"}}}));
        let nested = unflatten(&flat, &ENCODING_CHANNELS);
        assert_eq!(
            Value::Object(nested),
            json!({"encoding": {"x": {"field": "a"}, "color": {"value": "red"}}})
        );
    }

    #[test]
    fn unflatten_replaces_scalars_on_a_path() {
        let flat = obj(json!({"title": "plain", "title_fontSize": 12}));
        let nested = unflatten(&flat, &[]);
        assert_eq!(Value::Object(nested), json!({"title": {"fontSize": 12}}));
    }

    #[test]
    fn empty_spec_is_rejected() {
        let err = prepare_spec(None, false, &Spec::new()).unwrap_err();
        assert!(matches!(err, ChartError::EmptySpec));
        assert!(err.to_string().starts_with("[CHART_EMPTY_SPEC]"));
    }

    #[test]
    fn kwargs_win_over_spec() {
        let spec = obj(json!({"mark": "bar", "width": 100}));
        let kwargs = obj(json!({"width": 300}));
        let out = prepare_spec(Some(spec), false, &kwargs).unwrap();
        assert_eq!(out["width"], 300);
        assert_eq!(out["mark"], "bar");
    }

    #[test]
    fn autosize_defaults() {
        let vconcat = obj(json!({"vconcat": []}));
        let out = prepare_spec(Some(vconcat.clone()), true, &Spec::new()).unwrap();
        assert_eq!(out["autosize"], json!({"type": "fit-x", "contains": "padding"}));

        let out = prepare_spec(Some(vconcat), false, &Spec::new()).unwrap();
        assert_eq!(out["autosize"], json!({"type": "fit", "contains": "padding"}));

        let plain = obj(json!({"mark": "point"}));
        let out = prepare_spec(Some(plain), true, &Spec::new()).unwrap();
        assert_eq!(out["autosize"], json!({"type": "fit", "contains": "padding"}));
    }

    #[test]
    fn explicit_autosize_is_untouched() {
        let spec = obj(json!({"vconcat": [], "autosize": "none"}));
        let out = prepare_spec(Some(spec), true, &Spec::new()).unwrap();
        assert_eq!(out["autosize"], "none");
    }
}
