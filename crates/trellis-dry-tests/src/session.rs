// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scripted [`ScriptSession`] fake.
//!
//! Records every registration and enqueued message, and answers session
//! queries from flags the test sets up front. Wire values for widgets are
//! seeded with [`FakeSession::set_ui_value`] and survive [`FakeSession::rerun`].

use std::collections::{HashMap, HashSet};

use trellis_chart_proto::ChartMessage;
use trellis_charts::{
    ElementHandle, ScriptSession, SelectionState, WidgetRegistration, WidgetSerde,
};

/// In-memory script session.
#[derive(Debug, Default)]
pub struct FakeSession {
    cached_replay: bool,
    form_id: Option<String>,
    page_script_hash: String,
    user_state: HashSet<String>,
    ui_values: HashMap<String, String>,
    registrations: Vec<WidgetRegistration>,
    enqueued: Vec<(&'static str, ChartMessage)>,
}

impl FakeSession {
    /// Session on page `"main"`, outside forms and replays.
    pub fn new() -> Self {
        Self {
            page_script_hash: "main".to_owned(),
            ..Self::default()
        }
    }

    /// Simulate a cached-function replay.
    pub fn set_cached_replay(&mut self, replay: bool) {
        self.cached_replay = replay;
    }

    /// Place subsequent calls inside form `id`.
    pub fn set_form(&mut self, id: Option<&str>) {
        self.form_id = id.map(str::to_owned);
    }

    /// Switch to another page.
    pub fn set_page(&mut self, hash: &str) {
        hash.clone_into(&mut self.page_script_hash);
    }

    /// Simulate the script assigning session state under `key`.
    pub fn set_user_state(&mut self, key: &str) {
        self.user_state.insert(key.to_owned());
    }

    /// Seed the wire value the front end reports for widget `id`.
    pub fn set_ui_value(&mut self, id: &str, json: &str) {
        self.ui_values.insert(id.to_owned(), json.to_owned());
    }

    /// Forget the previous run's output, keeping widget values.
    pub fn rerun(&mut self) {
        self.registrations.clear();
        self.enqueued.clear();
    }

    /// Widgets registered in this run.
    pub fn registrations(&self) -> &[WidgetRegistration] {
        &self.registrations
    }

    /// Messages enqueued in this run.
    pub fn enqueued(&self) -> &[(&'static str, ChartMessage)] {
        &self.enqueued
    }

    /// The most recently enqueued message.
    pub fn last_message(&self) -> Option<&ChartMessage> {
        self.enqueued.last().map(|(_, msg)| msg)
    }

    /// Invokes the change callback of every registered widget that has one.
    pub fn fire_callbacks(&self) -> usize {
        let mut fired = 0;
        for callback in self.registrations.iter().filter_map(|r| r.on_change.as_ref()) {
            callback();
            fired += 1;
        }
        fired
    }
}

impl ScriptSession for FakeSession {
    fn in_cached_replay(&self) -> bool {
        self.cached_replay
    }

    fn current_form_id(&self) -> Option<String> {
        self.form_id.clone()
    }

    fn page_script_hash(&self) -> String {
        self.page_script_hash.clone()
    }

    fn has_user_state(&self, key: &str) -> bool {
        self.user_state.contains(key)
    }

    fn register_widget(&mut self, registration: WidgetRegistration) -> SelectionState {
        let wire = self
            .ui_values
            .get(registration.id.as_str())
            .map(String::as_str);
        let value = registration.serde.deserialize(wire);
        self.registrations.push(registration);
        value
    }

    fn enqueue(&mut self, element_type: &'static str, msg: ChartMessage) -> ElementHandle {
        self.enqueued.push((element_type, msg));
        ElementHandle {
            element_type,
            index: self.enqueued.len() - 1,
        }
    }
}
