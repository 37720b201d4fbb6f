// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier stabilization.
//!
//! The declarative library names unnamed parameters `param_<n>` and sub-views
//! `view_<n>` from process-wide counters, so rebuilding the same chart twice
//! yields different names and therefore a different widget id. Two passes undo
//! that:
//!
//! - [`stabilize_spec`] (tree pass) renames matching parameters to
//!   `selection_<k>` and their views to `view_<k>` in encounter order, then
//!   rewrites every reference in the composition keys.
//! - [`stabilize_json_spec`] (text pass) renumbers every quoted `"param_<n>"`
//!   and `"view_<n>"` token in the serialized spec, sorting tokens as strings.
//!   The string sort is intentional and only dense for up to nine tokens per
//!   family; see the tests for the ten-or-more case.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::Spec;

/// Spec keys whose sub-trees may reference view ids.
pub const COMPOSITION_KEYS: [&str; 5] = ["layer", "hconcat", "vconcat", "encoding", "data"];

/// Counter-based prefixes renumbered by the text pass, in processing order.
pub const COUNTER_PREFIXES: [&str; 2] = ["param_", "view_"];

/// Renames applied by one [`stabilize_spec`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StableIds {
    /// Parameter renames, in encounter order.
    pub params: Vec<(String, String)>,
    /// Old view id to stable view id. Only ids whose name changed are present.
    pub views: BTreeMap<String, String>,
}

impl StableIds {
    /// True when the call renamed nothing.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.views.is_empty()
    }
}

fn unnamed_param() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"^param_\d+$").expect("static pattern"))
}

fn quoted_tokens() -> &'static [Regex; 2] {
    static RE: OnceLock<[Regex; 2]> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        COUNTER_PREFIXES.map(|prefix| {
            Regex::new(&format!(r#""{prefix}\d+""#)).expect("static pattern")
        })
    })
}

/// True for names the declarative library generated for unnamed parameters.
pub fn is_unnamed_param(name: &str) -> bool {
    unnamed_param().is_match(name)
}

/// Tree pass. Renames generated parameter and view ids in place.
///
/// Only parameters whose name matches `^param_\d+$` are renamed, and only
/// their views pick new ids. Views share one counter across the whole call,
/// and a view id seen twice keeps the name it got first. A named parameter
/// listing a renamed view follows the rename.
#[instrument(skip_all)]
pub fn stabilize_spec(spec: &mut Spec) -> StableIds {
    let mut ids = StableIds::default();
    let Some(Value::Array(params)) = spec.get_mut("params") else {
        return ids;
    };

    let mut assigned: BTreeMap<String, String> = BTreeMap::new();
    let mut selection = 0usize;
    let mut named: Vec<usize> = Vec::new();
    for (index, param) in params.iter_mut().enumerate() {
        let Some(param) = param.as_object_mut() else {
            continue;
        };
        let Some(old) = param.get("name").and_then(Value::as_str) else {
            named.push(index);
            continue;
        };
        if !is_unnamed_param(old) {
            named.push(index);
            continue;
        }
        selection += 1;
        let stable = format!("selection_{selection}");
        ids.params.push((old.to_owned(), stable.clone()));
        param.insert("name".into(), Value::String(stable));

        let Some(Value::Array(views)) = param.get_mut("views") else {
            continue;
        };
        for view in views.iter_mut() {
            let Value::String(old_view) = view else {
                continue;
            };
            let next = assigned.len() + 1;
            let stable_view = assigned
                .entry(old_view.clone())
                .or_insert_with(|| format!("view_{next}"))
                .clone();
            if stable_view != *old_view {
                ids.views.insert(old_view.clone(), stable_view.clone());
                *view = Value::String(stable_view);
            }
        }
    }

    if !ids.views.is_empty() {
        for index in named {
            if let Some(views) = params.get_mut(index).and_then(|p| p.get_mut("views")) {
                replace_ids(views, &ids.views);
            }
        }
        for key in COMPOSITION_KEYS {
            if let Some(tree) = spec.get_mut(key) {
                replace_ids(tree, &ids.views);
            }
        }
    }
    debug!(
        params = ids.params.len(),
        views = ids.views.len(),
        "stabilized spec identifiers"
    );
    ids
}

/// Replaces every string scalar equal to a mapped id, at any depth.
fn replace_ids(value: &mut Value, map: &BTreeMap<String, String>) {
    match value {
        Value::String(s) => {
            if let Some(stable) = map.get(s.as_str()) {
                s.clone_from(stable);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|item| replace_ids(item, map)),
        Value::Object(members) => members.values_mut().for_each(|item| replace_ids(item, map)),
        _ => {}
    }
}

/// Text pass. Renumbers quoted counter tokens in serialized spec text.
///
/// For `param_` and then `view_`, the distinct `"prefix<digits>"` tokens are
/// sorted as strings and renamed `"prefix1"` .. `"prefixN"` in that order. All
/// substitutions for a prefix happen in one scan, so a rename never merges
/// with a token that already carries the target name.
pub fn stabilize_json_spec(json: &str) -> String {
    let mut text = json.to_owned();
    for (prefix, pattern) in COUNTER_PREFIXES.iter().zip(quoted_tokens()) {
        text = {
            let tokens: BTreeSet<&str> = pattern.find_iter(&text).map(|m| m.as_str()).collect();
            if tokens.is_empty() {
                continue;
            }
            let renames: BTreeMap<&str, String> = tokens
                .into_iter()
                .enumerate()
                .map(|(i, token)| (token, format!("\"{prefix}{}\"", i + 1)))
                .collect();
            pattern
                .replace_all(&text, |caps: &Captures<'_>| {
                    renames
                        .get(&caps[0])
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_owned())
                })
                .into_owned()
        };
    }
    text
}
