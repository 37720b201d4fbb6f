// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! One-shot script session backing the `marshall` command.

use trellis_chart_proto::ChartMessage;
use trellis_charts::{
    ElementHandle, ScriptSession, SelectionState, WidgetRegistration, WidgetSerde,
};

/// Session for a single chart call run from the command line.
///
/// There is no cache, no form and no script state; the only inbound value is
/// the optional selection blob passed with `--ui-value`.
#[derive(Debug, Default)]
pub struct CliSession {
    ui_value: Option<String>,
    widget_id: Option<String>,
    output: Vec<(&'static str, ChartMessage)>,
}

impl CliSession {
    /// Session answering widget registrations with `ui_value`.
    pub fn new(ui_value: Option<String>) -> Self {
        Self {
            ui_value,
            ..Self::default()
        }
    }

    /// Id of the widget registered during the call, if any.
    pub fn widget_id(&self) -> Option<&str> {
        self.widget_id.as_deref()
    }

    /// Takes the last enqueued message.
    pub fn take_message(&mut self) -> Option<(&'static str, ChartMessage)> {
        self.output.pop()
    }
}

impl ScriptSession for CliSession {
    fn in_cached_replay(&self) -> bool {
        false
    }

    fn current_form_id(&self) -> Option<String> {
        None
    }

    fn page_script_hash(&self) -> String {
        "cli".to_owned()
    }

    fn has_user_state(&self, _key: &str) -> bool {
        false
    }

    fn register_widget(&mut self, registration: WidgetRegistration) -> SelectionState {
        self.widget_id = Some(registration.id.to_string());
        registration.serde.deserialize(self.ui_value.as_deref())
    }

    fn enqueue(&mut self, element_type: &'static str, msg: ChartMessage) -> ElementHandle {
        self.output.push((element_type, msg));
        ElementHandle {
            element_type,
            index: self.output.len() - 1,
        }
    }
}
