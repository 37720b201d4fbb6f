// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Vega-Lite chart marshalling for Trellis scripts.
//!
//! A chart call moves one spec through four stages before it reaches the
//! rendering boundary:
//!
//! 1. [`normalize`]: keyword arguments are merged and autosize is defaulted.
//! 2. [`extract`]: tabular payloads leave the spec as codec bytes.
//! 3. [`stabilize`]: generated `param_`/`view_` ids are renumbered so that
//!    rebuilding the same chart yields the same text.
//! 4. [`selection`]: when selections are on, the chart is registered as a
//!    widget under a content-derived [`WidgetId`] and its state is decoded.
//!
//! [`Charts`] wires the stages to a [`ScriptSession`].
#![forbid(unsafe_code)]

pub mod builtin;
pub mod charts;
pub mod declarative;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod selection;
pub mod session;
pub mod stabilize;
pub mod widget;

/// A Vega-Lite spec: a JSON object with insertion order preserved.
pub type Spec = serde_json::Map<String, serde_json::Value>;

pub use builtin::{generate_chart, BuiltinArgs, BuiltinChart, ChartType, ColorArg, SizeArg};
pub use charts::{ChartOptions, ChartOutput, Charts, DEFAULT_THEME};
pub use declarative::{
    convert_declarative_chart, ConvertedChart, DataTransformer, DeclarativeChart, IdTransformer,
};
pub use error::{ChartError, ErrorKind};
pub use extract::{marshall_chart_data, Data};
pub use normalize::{prepare_spec, unflatten, ENCODING_CHANNELS};
pub use selection::{check_spec_for_selections, Attr, OnSelect, SelectionSerde, SelectionState};
pub use session::{
    check_widget_policies, ElementHandle, ScriptSession, WidgetCallback, WidgetRegistration,
    WidgetSerde,
};
pub use stabilize::{stabilize_json_spec, stabilize_spec, StableIds};
pub use widget::{WidgetId, WidgetIdentity};
