// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Content-derived widget identity.
use std::fmt;

use blake3::Hasher;
use trellis_chart_proto::ChartMessage;

/// Prefix of every generated widget id.
pub const WIDGET_ID_PREFIX: &str = "$$WIDGET_ID";

/// Stable id of an interactive chart, `$$WIDGET_ID-<blake3 hex>[-<key>]`.
///
/// Equal inputs across two script runs produce equal ids, which is what lets
/// the session registry hand the previous selection back to the rerun.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct WidgetId(String);

impl WidgetId {
    /// The id as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inputs hashed into a [`WidgetId`].
#[derive(Debug, Clone, Copy)]
pub struct WidgetIdentity<'a> {
    /// Element type tag.
    pub element_type: &'a str,
    /// Caller-supplied key.
    pub user_key: Option<&'a str>,
    /// Stabilized spec text.
    pub spec: &'a str,
    /// Inline payload bytes; empty when absent.
    pub data: &'a [u8],
    /// Dataset names, any order; hashed sorted.
    pub dataset_names: &'a [&'a str],
    /// Theme; empty for the library default.
    pub theme: &'a str,
    /// Enclosing form id; empty outside forms.
    pub form_id: &'a str,
    /// Container-width flag.
    pub use_container_width: bool,
    /// Selection flag.
    pub is_select_enabled: bool,
    /// Hash of the page script the widget lives on.
    pub page_script_hash: &'a str,
}

impl<'a> WidgetIdentity<'a> {
    /// Identity inputs taken from a finished message.
    pub fn for_message(
        msg: &'a ChartMessage,
        element_type: &'a str,
        user_key: Option<&'a str>,
        dataset_names: &'a [&'a str],
        page_script_hash: &'a str,
    ) -> Self {
        Self {
            element_type,
            user_key,
            spec: &msg.spec,
            data: msg.data_bytes(),
            dataset_names,
            theme: &msg.theme,
            form_id: &msg.form_id,
            use_container_width: msg.use_container_width,
            is_select_enabled: msg.is_select_enabled,
            page_script_hash,
        }
    }

    /// Hashes the inputs.
    ///
    /// `blake3("widget:" || fields)`, each variable-length field prefixed with
    /// its little-endian `u64` length so adjacent fields cannot alias.
    pub fn compute(&self) -> WidgetId {
        let mut hasher = Hasher::new();
        hasher.update(b"widget:");
        put(&mut hasher, self.element_type.as_bytes());
        match self.user_key {
            Some(key) => {
                hasher.update(&[1]);
                put(&mut hasher, key.as_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        put(&mut hasher, self.spec.as_bytes());
        put(&mut hasher, self.data);
        let mut names = self.dataset_names.to_vec();
        names.sort_unstable();
        hasher.update(&(names.len() as u64).to_le_bytes());
        for name in names {
            put(&mut hasher, name.as_bytes());
        }
        put(&mut hasher, self.theme.as_bytes());
        put(&mut hasher, self.form_id.as_bytes());
        hasher.update(&[
            u8::from(self.use_container_width),
            u8::from(self.is_select_enabled),
        ]);
        put(&mut hasher, self.page_script_hash.as_bytes());

        let digest = hasher.finalize().to_hex();
        WidgetId(match self.user_key {
            Some(key) => format!("{WIDGET_ID_PREFIX}-{digest}-{key}"),
            None => format!("{WIDGET_ID_PREFIX}-{digest}"),
        })
    }
}

fn put(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> WidgetIdentity<'static> {
        WidgetIdentity {
            element_type: "arrow_vega_lite_chart",
            user_key: None,
            spec: r#"{"mark":"bar"}"#,
            data: &[1, 2, 3],
            dataset_names: &["b", "a"],
            theme: "trellis",
            form_id: "",
            use_container_width: false,
            is_select_enabled: true,
            page_script_hash: "page",
        }
    }

    #[test]
    fn identical_inputs_give_identical_ids() {
        assert_eq!(base().compute(), base().compute());
        assert!(base().compute().as_str().starts_with("$$WIDGET_ID-"));
    }

    #[test]
    fn dataset_order_does_not_matter() {
        let reordered = WidgetIdentity {
            dataset_names: &["a", "b"],
            ..base()
        };
        assert_eq!(reordered.compute(), base().compute());
    }

    #[test]
    fn each_presentation_input_changes_the_id() {
        let id = base().compute();
        let variants = [
            WidgetIdentity { theme: "", ..base() },
            WidgetIdentity { form_id: "form", ..base() },
            WidgetIdentity { use_container_width: true, ..base() },
            WidgetIdentity { is_select_enabled: false, ..base() },
            WidgetIdentity { spec: "{}", ..base() },
            WidgetIdentity { data: &[], ..base() },
            WidgetIdentity { page_script_hash: "other", ..base() },
        ];
        for variant in variants {
            assert_ne!(variant.compute(), id);
        }
    }

    #[test]
    fn user_key_is_appended() {
        let keyed = WidgetIdentity {
            user_key: Some("sales"),
            ..base()
        };
        let id = keyed.compute();
        assert!(id.as_str().ends_with("-sales"));
        assert_ne!(id, base().compute());
    }

    #[test]
    fn field_boundaries_do_not_alias() {
        let a = WidgetIdentity { theme: "ab", form_id: "c", ..base() };
        let b = WidgetIdentity { theme: "a", form_id: "bc", ..base() };
        assert_ne!(a.compute(), b.compute());
    }
}
