// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Port to a declarative chart library and the guarded conversion into a spec.
//!
//! Declarative chart objects number their unnamed parameters and views from
//! process-wide counters. [`convert_declarative_chart`] holds one process-wide
//! lock around [`DeclarativeChart::to_spec`] so two conversions never
//! interleave their counter increments. The lock covers that call only.

use std::sync::{Mutex, PoisonError};

use serde_json::{json, Value};
use tracing::{debug, instrument};
use trellis_tabular::TabularCodec;

use crate::error::{ChartError, Result};
use crate::extract::Data;
use crate::Spec;

static CONVERSION_LOCK: Mutex<()> = Mutex::new(());

/// Oldest library major version with selection support.
pub const MIN_SELECTION_MAJOR: u64 = 5;

/// Replaces data payloads met during conversion with spec references.
pub trait DataTransformer {
    /// Takes one payload and returns the JSON that stands in for it.
    fn transform(&mut self, data: Data) -> Result<Value>;
}

/// A chart object from a declarative charting library.
pub trait DeclarativeChart {
    /// Library version, e.g. `"5.3.0"`.
    fn library_version(&self) -> &str;

    /// Converts the chart to a Vega-Lite spec, routing every data payload
    /// through `transformer`.
    fn to_spec(&self, transformer: &mut dyn DataTransformer) -> Result<Spec>;
}

/// Transformer that encodes each payload and names it by content.
///
/// The payload is replaced by `{"name": <blake3 hex of the bytes>}` and the
/// bytes are kept aside as a named dataset. Equal payloads share one dataset.
pub struct IdTransformer<'c> {
    codec: &'c dyn TabularCodec,
    datasets: Vec<(String, Vec<u8>)>,
}

impl<'c> IdTransformer<'c> {
    /// New transformer writing through `codec`.
    pub fn new(codec: &'c dyn TabularCodec) -> Self {
        Self {
            codec,
            datasets: Vec::new(),
        }
    }

    /// Datasets collected so far, in first-seen order.
    pub fn into_datasets(self) -> Vec<(String, Vec<u8>)> {
        self.datasets
    }
}

impl DataTransformer for IdTransformer<'_> {
    fn transform(&mut self, data: Data) -> Result<Value> {
        let bytes = data.encode(self.codec)?;
        let name = blake3::hash(&bytes).to_hex().to_string();
        if !self.datasets.iter().any(|(existing, _)| *existing == name) {
            self.datasets.push((name.clone(), bytes));
        }
        Ok(json!({ "name": name }))
    }
}

/// Output of a declarative conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedChart {
    /// Spec with payloads replaced by named references.
    pub spec: Spec,
    /// Encoded payloads keyed by content name.
    pub datasets: Vec<(String, Vec<u8>)>,
}

impl ConvertedChart {
    /// Datasets as extractor input.
    pub fn dataset_payloads(&self) -> Vec<(String, Data)> {
        self.datasets
            .iter()
            .map(|(name, bytes)| (name.clone(), Data::Encoded(bytes.clone())))
            .collect()
    }
}

/// Runs `chart.to_spec` under the conversion lock.
#[instrument(skip_all, fields(version = chart.library_version()))]
pub fn convert_declarative_chart(
    chart: &dyn DeclarativeChart,
    codec: &dyn TabularCodec,
) -> Result<ConvertedChart> {
    let mut transformer = IdTransformer::new(codec);
    let spec = {
        let _guard = CONVERSION_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        chart.to_spec(&mut transformer)?
    };
    let datasets = transformer.into_datasets();
    debug!(datasets = datasets.len(), "converted declarative chart");
    Ok(ConvertedChart { spec, datasets })
}

/// Leading integer of a dotted version string.
pub fn library_major_version(version: &str) -> Option<u64> {
    version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
}

/// Rejects selections for libraries older than [`MIN_SELECTION_MAJOR`].
///
/// An unparseable version is treated as too old.
pub fn check_selection_support(chart: &dyn DeclarativeChart) -> Result<()> {
    match library_major_version(chart.library_version()) {
        Some(major) if major >= MIN_SELECTION_MAJOR => Ok(()),
        _ => Err(ChartError::IncompatibleLibrary {
            version: chart.library_version().to_owned(),
        }),
    }
}
