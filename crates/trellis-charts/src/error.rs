// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The single user-facing error surface of the chart layer.

use trellis_chart_proto::DuplicateDataset;
use trellis_tabular::{CodecError, TableError};

/// Coarse classification of a [`ChartError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The spec or call arguments are invalid.
    SpecValidation,
    /// Selections were requested where they are not allowed.
    Interactivity,
    /// The declarative library is too old for the requested feature.
    LibraryIncompatible,
}

/// Every failure a chart call can report. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    /// Spec was empty after merging keyword arguments.
    #[error("[CHART_EMPTY_SPEC] Vega-Lite charts require a non-empty spec object")]
    EmptySpec,
    /// A dataset name is also a top-level key of the spec.
    #[error("[CHART_DATASET_COLLISION] dataset '{name}' is defined in both datasets and spec")]
    DatasetCollision {
        /// Colliding dataset name.
        name: String,
    },
    /// Two datasets with the same name were attached.
    #[error("[CHART_DUPLICATE_DATASET] dataset '{name}' is defined more than once")]
    DuplicateDataset {
        /// Duplicated dataset name.
        name: String,
    },
    /// Theme other than the framework theme or none.
    #[error(
        "[CHART_UNSUPPORTED_THEME] theme \"{theme}\" is not supported; use \"trellis\" or no theme to fall back to the library default"
    )]
    UnsupportedTheme {
        /// Theme requested by the caller.
        theme: String,
    },
    /// `on_select` value that is neither a mode nor a callback.
    #[error(
        "[CHART_UNSUPPORTED_ON_SELECT] on_select \"{value}\" is not supported; use \"ignore\", \"rerun\" or a callback"
    )]
    UnsupportedOnSelect {
        /// Value passed by the caller.
        value: String,
    },
    /// Selections requested but the spec declares none.
    #[error(
        "[CHART_NO_SELECTIONS] selections are activated, but the chart spec does not define any selection parameter \
         (a param with a name and a select.type); see https://vega.github.io/vega-lite/docs/selection.html"
    )]
    MissingSelection,
    /// Widget used while a cached function result is being replayed.
    #[error(
        "[CHART_CACHED_REPLAY] chart selections cannot be used inside a cached function; move the chart call outside of it"
    )]
    CachedReplay,
    /// Callback registered on a chart inside a form.
    #[error("[CHART_CALLBACK_IN_FORM] inside a form, callbacks can only be defined on the form submit button")]
    CallbackInForm,
    /// The session state key was assigned by the script before the widget.
    #[error(
        "[CHART_STATE_WRITE] the selection state of chart '{key}' cannot be set through session state"
    )]
    StateWriteNotAllowed {
        /// Widget key.
        key: String,
    },
    /// Declarative library version lacks selection support.
    #[error(
        "[CHART_LIBRARY_VERSION] selections require declarative library version 5 or newer (found {version}); please upgrade"
    )]
    IncompatibleLibrary {
        /// Version reported by the chart object.
        version: String,
    },
    /// Invalid argument to a built-in chart command.
    #[error("[CHART_INVALID_ARGUMENT] {0}")]
    InvalidArgument(String),
    /// Payload could not be shaped into a table.
    #[error("[CHART_INVALID_DATA] {0}")]
    Table(#[from] TableError),
    /// Payload could not be encoded.
    #[error("[CHART_CODEC] {0}")]
    Codec(#[from] CodecError),
    /// Spec could not be serialized.
    #[error("[CHART_SERIALIZE] {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ChartError {
    /// Taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CachedReplay | Self::CallbackInForm | Self::StateWriteNotAllowed { .. } => {
                ErrorKind::Interactivity
            }
            Self::IncompatibleLibrary { .. } => ErrorKind::LibraryIncompatible,
            _ => ErrorKind::SpecValidation,
        }
    }
}

impl From<DuplicateDataset> for ChartError {
    fn from(err: DuplicateDataset) -> Self {
        Self::DuplicateDataset { name: err.0 }
    }
}

/// Result alias for chart operations.
pub type Result<T, E = ChartError> = std::result::Result<T, E>;
