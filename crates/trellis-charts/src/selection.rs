// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Selection state and its wire (de)serialization.

use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ChartError, Result};
use crate::session::{WidgetCallback, WidgetSerde};
use crate::Spec;

static NULL: Value = Value::Null;

/// Decoded selection events for one chart.
///
/// Holds exactly one key, `select`, mapping selection parameter names to the
/// event attributes reported by the front end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    select: Map<String, Value>,
}

impl SelectionState {
    /// `{"select": {}}`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a state from a `select` object.
    pub fn from_select(select: Map<String, Value>) -> Self {
        Self { select }
    }

    /// Attribute view over the `select` object.
    pub fn select(&self) -> Attr<'_> {
        Attr(Some(&self.select))
    }

    /// The raw `select` object.
    pub fn select_map(&self) -> &Map<String, Value> {
        &self.select
    }

    /// Keyed access; `"select"` is the only recognized key.
    pub fn get(&self, key: &str) -> Option<Attr<'_>> {
        (key == "select").then(|| self.select())
    }

    /// True when no selection parameter has reported an event.
    pub fn is_empty(&self) -> bool {
        self.select.is_empty()
    }

    /// JSON form, `{"select": {...}}`.
    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        root.insert("select".into(), Value::Object(self.select.clone()));
        Value::Object(root)
    }
}

impl Index<&str> for SelectionState {
    type Output = Map<String, Value>;

    /// `state["select"]`; any other key yields an empty object.
    fn index(&self, key: &str) -> &Self::Output {
        static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
        if key == "select" {
            &self.select
        } else {
            EMPTY.get_or_init(Map::new)
        }
    }
}

/// Read-only attribute path into a selection object.
///
/// `state.select().attr("brush").attr("x")` walks objects by member name;
/// a missing member yields an absent view instead of failing.
#[derive(Debug, Clone, Copy)]
pub struct Attr<'a>(Option<&'a Map<String, Value>>);

impl<'a> Attr<'a> {
    /// Member `name`, when this view is an object containing it.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.0.and_then(|map| map.get(name))
    }

    /// Nested attribute view. Non-object members yield an absent view.
    pub fn attr(&self, name: &str) -> Attr<'a> {
        Attr(self.get(name).and_then(Value::as_object))
    }

    /// Member names, in wire order.
    pub fn names(&self) -> impl Iterator<Item = &'a str> {
        self.0.into_iter().flat_map(|map| map.keys().map(String::as_str))
    }

    /// True when the view points at an object.
    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }
}

impl<'a> Index<&str> for Attr<'a> {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        self.get(name).unwrap_or(&NULL)
    }
}

/// Converts between wire text and [`SelectionState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionSerde;

impl WidgetSerde for SelectionSerde {
    type Value = SelectionState;

    /// Absent input, malformed JSON, and a missing or non-object `select`
    /// all decode to the empty state. Other top-level keys are dropped.
    fn deserialize(&self, ui_value: Option<&str>) -> SelectionState {
        let Some(text) = ui_value else {
            return SelectionState::empty();
        };
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(mut root)) => match root.remove("select") {
                Some(Value::Object(select)) => SelectionState::from_select(select),
                _ => {
                    warn!("selection state has no select object; using empty state");
                    SelectionState::empty()
                }
            },
            Ok(_) => {
                warn!("selection state is not an object; using empty state");
                SelectionState::empty()
            }
            Err(err) => {
                warn!(error = %err, "discarding malformed selection state");
                SelectionState::empty()
            }
        }
    }

    fn serialize(&self, value: &SelectionState) -> String {
        value.to_value().to_string()
    }
}

/// What happens when the user makes a selection.
#[derive(Clone, Default)]
pub enum OnSelect {
    /// Selections are not wired back to the script.
    #[default]
    Ignore,
    /// Rerun the script; the call returns the decoded state.
    Rerun,
    /// Invoke the callback before the rerun.
    Callback(WidgetCallback),
}

impl OnSelect {
    /// True unless selections are ignored.
    pub fn is_engaged(&self) -> bool {
        !matches!(self, Self::Ignore)
    }

    /// The callback, if any.
    pub fn callback(&self) -> Option<&WidgetCallback> {
        match self {
            Self::Callback(cb) => Some(cb),
            _ => None,
        }
    }
}

impl fmt::Debug for OnSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => f.write_str("Ignore"),
            Self::Rerun => f.write_str("Rerun"),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl FromStr for OnSelect {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ignore" => Ok(Self::Ignore),
            "rerun" => Ok(Self::Rerun),
            other => Err(ChartError::UnsupportedOnSelect {
                value: other.to_owned(),
            }),
        }
    }
}

/// Requires at least one param with a `name` and an object `select` carrying
/// a `type`.
pub fn check_spec_for_selections(spec: &Spec) -> Result<()> {
    let found = spec
        .get("params")
        .and_then(Value::as_array)
        .is_some_and(|params| {
            params.iter().filter_map(Value::as_object).any(|param| {
                param.contains_key("name")
                    && param
                        .get("select")
                        .and_then(Value::as_object)
                        .is_some_and(|select| select.contains_key("type"))
            })
        });
    if found {
        Ok(())
    } else {
        Err(ChartError::MissingSelection)
    }
}
