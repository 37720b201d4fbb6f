// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Saved chart preferences used by Trellis tools.

use serde::{Deserialize, Serialize};

/// Config key under which [`ChartPrefs`] are stored.
pub const CHART_PREFS_KEY: &str = "chart_prefs";

/// Defaults applied to chart calls that do not say otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartPrefs {
    /// Theme name; `None` falls back to the chart library's default theme.
    pub theme: Option<String>,
    /// Stretch raw-spec charts to the container width.
    pub use_container_width: bool,
    /// Stretch built-in line/area/bar/scatter charts to the container width.
    pub builtin_use_container_width: bool,
}

impl Default for ChartPrefs {
    fn default() -> Self {
        Self {
            theme: Some("trellis".to_owned()),
            use_container_width: false,
            builtin_use_container_width: true,
        }
    }
}
