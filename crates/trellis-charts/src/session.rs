// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Port to the script-run and widget-registry machinery.
//!
//! The chart layer never owns session state. It asks the session about the
//! current run (cached replay, enclosing form, page), registers interactive
//! widgets, and hands finished messages to [`ScriptSession::enqueue`].

use std::fmt;
use std::sync::Arc;

use trellis_chart_proto::ChartMessage;

use crate::error::{ChartError, Result};
use crate::selection::{OnSelect, SelectionSerde, SelectionState};
use crate::widget::WidgetId;

/// Callback invoked when a widget value changes, before the script reruns.
pub type WidgetCallback = Arc<dyn Fn() + Send + Sync>;

/// Converts a widget value to and from its wire text.
pub trait WidgetSerde: Send + Sync {
    /// Script-side value.
    type Value;
    /// Decodes the wire value; `None` means the front end sent nothing yet.
    fn deserialize(&self, ui_value: Option<&str>) -> Self::Value;
    /// Encodes a value for the wire.
    fn serialize(&self, value: &Self::Value) -> String;
}

/// Everything the registry needs to track one chart widget.
#[derive(Clone)]
pub struct WidgetRegistration {
    /// Widget identity.
    pub id: WidgetId,
    /// Element type tag.
    pub element_type: &'static str,
    /// Caller key, if any.
    pub key: Option<String>,
    /// Enclosing form; empty outside forms.
    pub form_id: String,
    /// Page the widget lives on.
    pub page_script_hash: String,
    /// Value (de)serializer.
    pub serde: SelectionSerde,
    /// Change callback.
    pub on_change: Option<WidgetCallback>,
}

impl fmt::Debug for WidgetRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetRegistration")
            .field("id", &self.id)
            .field("element_type", &self.element_type)
            .field("key", &self.key)
            .field("form_id", &self.form_id)
            .field("page_script_hash", &self.page_script_hash)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

/// Opaque reference to an enqueued element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    /// Element type tag the message was enqueued under.
    pub element_type: &'static str,
    /// Position of the element in the run's output.
    pub index: usize,
}

/// The running script, as seen by chart calls.
pub trait ScriptSession {
    /// True while a cached function's recorded output is being replayed.
    fn in_cached_replay(&self) -> bool;
    /// Id of the enclosing form, if the call happens inside one.
    fn current_form_id(&self) -> Option<String>;
    /// Hash of the current page script.
    fn page_script_hash(&self) -> String;
    /// True when the script itself assigned a session-state value under `key`.
    fn has_user_state(&self, key: &str) -> bool;
    /// Registers a widget and returns its current decoded value.
    fn register_widget(&mut self, registration: WidgetRegistration) -> SelectionState;
    /// Hands a finished message to the rendering boundary.
    fn enqueue(&mut self, element_type: &'static str, msg: ChartMessage) -> ElementHandle;
}

/// Checks that selections may be wired up in the current run.
///
/// Nothing is checked when `on_select` is [`OnSelect::Ignore`]. Otherwise the
/// call must not run during a cached replay, a callback must not be attached
/// inside a form, and the script must not have written session state under
/// `key`.
pub fn check_widget_policies<S: ScriptSession + ?Sized>(
    session: &S,
    on_select: &OnSelect,
    key: Option<&str>,
) -> Result<()> {
    if !on_select.is_engaged() {
        return Ok(());
    }
    if session.in_cached_replay() {
        return Err(ChartError::CachedReplay);
    }
    if on_select.callback().is_some() && session.current_form_id().is_some() {
        return Err(ChartError::CallbackInForm);
    }
    if let Some(key) = key {
        if session.has_user_state(key) {
            return Err(ChartError::StateWriteNotAllowed {
                key: key.to_owned(),
            });
        }
    }
    Ok(())
}
