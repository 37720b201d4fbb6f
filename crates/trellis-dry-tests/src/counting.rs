// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Declarative chart fake that numbers params and views from global counters.
//!
//! Real declarative libraries hand out `param_N` and `view_N` names from
//! process-wide counters, so building the same chart twice yields different
//! names. [`CountingChart`] reproduces that so tests can check that chart
//! output stays stable across reruns.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{json, Value};
use trellis_charts::error::Result;
use trellis_charts::{DataTransformer, DeclarativeChart, Spec};
use trellis_tabular::Table;

use crate::fixtures::sales_table;

static PARAM_COUNTER: AtomicUsize = AtomicUsize::new(0);
static VIEW_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Resets both name counters to zero.
pub fn reset_counters() {
    PARAM_COUNTER.store(0, Ordering::SeqCst);
    VIEW_COUNTER.store(0, Ordering::SeqCst);
}

fn next(counter: &AtomicUsize) -> usize {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

/// Layered line chart with an interval selection on `x`.
#[derive(Debug, Clone)]
pub struct CountingChart {
    version: String,
    table: Table,
}

impl Default for CountingChart {
    fn default() -> Self {
        Self::new(sales_table())
    }
}

impl CountingChart {
    /// Chart over `table`, reporting library version `5.x`.
    pub fn new(table: Table) -> Self {
        Self {
            version: "5.x".to_owned(),
            table,
        }
    }

    /// Overrides the reported library version.
    pub fn with_version(mut self, version: &str) -> Self {
        version.clone_into(&mut self.version);
        self
    }
}

impl DeclarativeChart for CountingChart {
    fn library_version(&self) -> &str {
        &self.version
    }

    fn to_spec(&self, transformer: &mut dyn DataTransformer) -> Result<Spec> {
        let param = format!("param_{}", next(&PARAM_COUNTER));
        let view = format!("view_{}", next(&VIEW_COUNTER));
        let data = transformer.transform(self.table.clone().into())?;
        let encoding = json!({
            "x": {"field": "month", "type": "ordinal"},
            "y": {"field": "sales", "type": "quantitative"},
        });
        let spec = json!({
            "params": [{
                "name": param,
                "select": {"type": "interval", "encodings": ["x"]},
                "views": [view],
            }],
            "data": data,
            "layer": [
                {"name": view, "mark": "point", "encoding": encoding},
                {"mark": "line", "encoding": encoding},
            ],
        });
        Ok(match spec {
            Value::Object(map) => map,
            _ => Spec::new(),
        })
    }
}
