// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canned specs and tables.

use serde_json::{json, Value};
use trellis_charts::Spec;
use trellis_tabular::Table;

/// Object members of `value`; anything else gives an empty spec.
pub fn spec(value: Value) -> Spec {
    match value {
        Value::Object(map) => map,
        _ => Spec::new(),
    }
}

/// Point chart with one named interval selection.
pub fn interval_selection_spec() -> Spec {
    spec(json!({
        "mark": "point",
        "params": [{"name": "brush", "select": {"type": "interval"}}],
        "encoding": {
            "x": {"field": "month", "type": "ordinal"},
            "y": {"field": "sales", "type": "quantitative"},
        },
    }))
}

/// Two-layer chart whose views and params carry generated names.
pub fn layered_view_spec() -> Spec {
    spec(json!({
        "params": [{
            "name": "param_7",
            "select": {"type": "point"},
            "views": ["view_12"],
        }],
        "layer": [
            {"name": "view_12", "mark": "bar"},
            {"name": "view_3", "mark": "rule"},
        ],
    }))
}

/// Three months of sales.
pub fn sales_table() -> Table {
    Table::from_columns([
        ("month", vec![json!("jan"), json!("feb"), json!("mar")]),
        ("sales", vec![json!(10), json!(25), json!(17)]),
    ])
    .unwrap_or_default()
}
