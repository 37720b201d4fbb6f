// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Chart entry points.
//!
//! Every entry point runs the same pipeline: normalize the spec, extract its
//! data, stabilize generated identifiers, and then either enqueue a plain
//! element or register a selection widget and return its state.

use serde_json::Value;
use tracing::{debug, instrument};
use trellis_app_core::prefs::ChartPrefs;
use trellis_chart_proto::{ChartMessage, ELEMENT_TYPE};
use trellis_tabular::{CanonicalColumnarCodec, Table, TabularCodec};

use crate::builtin::{generate_chart, BuiltinArgs, ChartType};
use crate::declarative::{check_selection_support, convert_declarative_chart, DeclarativeChart};
use crate::error::{ChartError, Result};
use crate::extract::{marshall_chart_data, Data};
use crate::normalize::prepare_spec;
use crate::selection::{check_spec_for_selections, OnSelect, SelectionSerde, SelectionState};
use crate::session::{check_widget_policies, ElementHandle, ScriptSession, WidgetRegistration};
use crate::stabilize::{stabilize_json_spec, stabilize_spec};
use crate::widget::WidgetIdentity;
use crate::Spec;

/// The framework's own chart theme.
pub const DEFAULT_THEME: &str = "trellis";

/// Per-call presentation and interactivity options.
#[derive(Debug, Clone)]
pub struct ChartOptions {
    /// Stretch the chart to the container width.
    pub use_container_width: bool,
    /// `Some("trellis")` or `None` for the library default.
    pub theme: Option<String>,
    /// Widget key.
    pub key: Option<String>,
    /// Selection behaviour.
    pub on_select: OnSelect,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            use_container_width: false,
            theme: Some(DEFAULT_THEME.to_owned()),
            key: None,
            on_select: OnSelect::Ignore,
        }
    }
}

impl ChartOptions {
    /// Options seeded from stored preferences.
    pub fn from_prefs(prefs: &ChartPrefs) -> Self {
        Self {
            use_container_width: prefs.use_container_width,
            theme: prefs.theme.clone(),
            ..Self::default()
        }
    }

    /// Sets the widget key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the selection behaviour.
    pub fn with_on_select(mut self, on_select: OnSelect) -> Self {
        self.on_select = on_select;
        self
    }
}

/// Result of a chart call.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutput {
    /// Selections were ignored; the enqueued element.
    Element(ElementHandle),
    /// Selections are active; the current decoded selection.
    Selection(SelectionState),
}

impl ChartOutput {
    /// The selection, when selections are active.
    pub fn selection(&self) -> Option<&SelectionState> {
        match self {
            Self::Selection(state) => Some(state),
            Self::Element(_) => None,
        }
    }

    /// The element handle, when selections are ignored.
    pub fn element(&self) -> Option<ElementHandle> {
        match self {
            Self::Element(handle) => Some(*handle),
            Self::Selection(_) => None,
        }
    }
}

/// Chart commands bound to one script session.
pub struct Charts<'s, S: ScriptSession + ?Sized> {
    session: &'s mut S,
    codec: &'s dyn TabularCodec,
}

impl<'s, S: ScriptSession + ?Sized> Charts<'s, S> {
    /// Commands writing payloads with [`CanonicalColumnarCodec`].
    pub fn new(session: &'s mut S) -> Self {
        Self {
            session,
            codec: &CanonicalColumnarCodec,
        }
    }

    /// Commands writing payloads with `codec`.
    pub fn with_codec(session: &'s mut S, codec: &'s dyn TabularCodec) -> Self {
        Self { session, codec }
    }

    /// Draws a chart from a raw Vega-Lite spec.
    ///
    /// `data` is the standalone payload; a JSON object passed as `data`
    /// without a `spec` is taken as the spec itself. `kwargs` are flat
    /// `a_b`-style keys merged over the spec.
    pub fn vega_lite_chart(
        &mut self,
        data: Option<Data>,
        spec: Option<Spec>,
        options: &ChartOptions,
        kwargs: &Spec,
    ) -> Result<ChartOutput> {
        let (data, spec) = match (data, spec) {
            (Some(Data::Json(Value::Object(as_spec))), None) => (None, Some(as_spec)),
            other => other,
        };
        self.marshall(data, spec, Vec::new(), options, kwargs)
    }

    /// Draws a chart from a declarative chart object.
    pub fn declarative_chart(
        &mut self,
        chart: &dyn DeclarativeChart,
        options: &ChartOptions,
    ) -> Result<ChartOutput> {
        if options.on_select.is_engaged() {
            check_selection_support(chart)?;
        }
        let converted = convert_declarative_chart(chart, self.codec)?;
        let datasets = converted.dataset_payloads();
        self.marshall(None, Some(converted.spec), datasets, options, &Spec::new())
    }

    /// Line chart.
    pub fn line_chart(
        &mut self,
        table: &Table,
        args: BuiltinArgs,
        use_container_width: bool,
    ) -> Result<ElementHandle> {
        self.builtin(ChartType::Line, table, args, use_container_width)
    }

    /// Area chart.
    pub fn area_chart(
        &mut self,
        table: &Table,
        args: BuiltinArgs,
        use_container_width: bool,
    ) -> Result<ElementHandle> {
        self.builtin(ChartType::Area, table, args, use_container_width)
    }

    /// Bar chart.
    pub fn bar_chart(
        &mut self,
        table: &Table,
        args: BuiltinArgs,
        use_container_width: bool,
    ) -> Result<ElementHandle> {
        self.builtin(ChartType::Bar, table, args, use_container_width)
    }

    /// Scatter chart.
    pub fn scatter_chart(
        &mut self,
        table: &Table,
        args: BuiltinArgs,
        use_container_width: bool,
    ) -> Result<ElementHandle> {
        self.builtin(ChartType::Scatter, table, args, use_container_width)
    }

    fn builtin(
        &mut self,
        chart_type: ChartType,
        table: &Table,
        args: BuiltinArgs,
        use_container_width: bool,
    ) -> Result<ElementHandle> {
        let chart = generate_chart(chart_type, table, args)?;
        let converted = convert_declarative_chart(&chart, self.codec)?;
        let datasets = converted.dataset_payloads();
        let options = ChartOptions {
            use_container_width,
            ..ChartOptions::default()
        };
        let (_, msg) =
            self.build_message(None, Some(converted.spec), datasets, &options, &Spec::new())?;
        debug!(chart = chart_type.command(), "enqueueing built-in chart");
        Ok(self.session.enqueue(ELEMENT_TYPE, msg))
    }

    #[instrument(skip_all, fields(key = ?options.key, on_select = ?options.on_select))]
    fn marshall(
        &mut self,
        data: Option<Data>,
        spec: Option<Spec>,
        extra: Vec<(String, Data)>,
        options: &ChartOptions,
        kwargs: &Spec,
    ) -> Result<ChartOutput> {
        if let Some(theme) = options.theme.as_deref().filter(|t| *t != DEFAULT_THEME) {
            return Err(ChartError::UnsupportedTheme {
                theme: theme.to_owned(),
            });
        }
        let key = options.key.as_deref();
        let selecting = options.on_select.is_engaged();
        if selecting {
            check_widget_policies(&*self.session, &options.on_select, key)?;
        }

        let (spec, mut msg) = self.build_message(data, spec, extra, options, kwargs)?;
        if !selecting {
            return Ok(ChartOutput::Element(self.session.enqueue(ELEMENT_TYPE, msg)));
        }

        check_spec_for_selections(&spec)?;
        msg.is_select_enabled = true;
        msg.form_id = self.session.current_form_id().unwrap_or_default();
        let page_script_hash = self.session.page_script_hash();
        let id = {
            let names: Vec<&str> = msg.dataset_names().collect();
            WidgetIdentity::for_message(&msg, ELEMENT_TYPE, key, &names, &page_script_hash)
                .compute()
        };
        msg.id = id.to_string();
        debug!(id = %id, "registering chart selection widget");

        let state = self.session.register_widget(WidgetRegistration {
            id,
            element_type: ELEMENT_TYPE,
            key: options.key.clone(),
            form_id: msg.form_id.clone(),
            page_script_hash,
            serde: SelectionSerde,
            on_change: options.on_select.callback().cloned(),
        });
        self.session.enqueue(ELEMENT_TYPE, msg);
        Ok(ChartOutput::Selection(state))
    }

    /// Normalized spec plus the message carrying its extracted data.
    fn build_message(
        &self,
        data: Option<Data>,
        spec: Option<Spec>,
        extra: Vec<(String, Data)>,
        options: &ChartOptions,
        kwargs: &Spec,
    ) -> Result<(Spec, ChartMessage)> {
        let mut spec = prepare_spec(spec, options.use_container_width, kwargs)?;
        let mut msg = ChartMessage::default();
        marshall_chart_data(&mut msg, &mut spec, extra, data, self.codec)?;
        stabilize_spec(&mut spec);
        msg.spec = stabilize_json_spec(&serde_json::to_string(&spec)?);
        msg.use_container_width = options.use_container_width;
        msg.theme = options.theme.clone().unwrap_or_default();
        Ok((spec, msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_stored_prefs() {
        let prefs = ChartPrefs {
            theme: None,
            use_container_width: true,
            builtin_use_container_width: false,
        };
        let options = ChartOptions::from_prefs(&prefs).with_key("k");
        assert!(options.use_container_width);
        assert!(options.theme.is_none());
        assert_eq!(options.key.as_deref(), Some("k"));
        assert!(!options.on_select.is_engaged());
    }

    #[test]
    fn output_accessors() {
        let handle = ElementHandle {
            element_type: ELEMENT_TYPE,
            index: 3,
        };
        assert_eq!(ChartOutput::Element(handle).element(), Some(handle));
        assert!(ChartOutput::Element(handle).selection().is_none());
        let state = ChartOutput::Selection(SelectionState::empty());
        assert!(state.element().is_none());
        assert!(state.selection().is_some_and(SelectionState::is_empty));
    }
}
