// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Built-in line, area, bar and scatter charts.
//!
//! [`generate_chart`] reshapes a table for the requested columns and wraps it
//! in a [`BuiltinChart`], a [`DeclarativeChart`] that goes through the same
//! conversion path as third-party chart objects.

use serde_json::{json, Map, Value};
use trellis_tabular::Table;

use crate::declarative::{DataTransformer, DeclarativeChart};
use crate::error::{ChartError, Result};
use crate::extract::Data;
use crate::Spec;

/// Generated x column when the caller names none.
pub const INDEX_COLUMN: &str = "(index)";
/// Source column name after melting several y columns.
pub const VARIABLE_COLUMN: &str = "(variable)";
/// Cell value after melting several y columns.
pub const VALUE_COLUMN: &str = "(value)";
/// Declarative library version reported by built-in charts.
pub const BUILTIN_LIBRARY_VERSION: &str = "5.0.0";

/// Built-in chart kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartType {
    /// Line chart.
    Line,
    /// Area chart.
    Area,
    /// Bar chart.
    Bar,
    /// Scatter chart.
    Scatter,
}

impl ChartType {
    /// Vega-Lite mark type.
    pub fn mark(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Area => "area",
            Self::Bar => "bar",
            Self::Scatter => "circle",
        }
    }

    /// Command name, used in error messages.
    pub fn command(self) -> &'static str {
        match self {
            Self::Line => "line_chart",
            Self::Area => "area_chart",
            Self::Bar => "bar_chart",
            Self::Scatter => "scatter_chart",
        }
    }
}

/// `color` argument of a built-in chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorArg {
    /// Color series by the values of a column.
    Column(String),
    /// One constant `#rgb`/`#rrggbb` color for every series.
    Constant(String),
    /// One constant color per y column.
    PerSeries(Vec<String>),
}

/// `size` argument of a scatter chart.
#[derive(Debug, Clone, PartialEq)]
pub enum SizeArg {
    /// Point size from a column.
    Column(String),
    /// Constant point size.
    Constant(f64),
}

/// Arguments shared by the built-in chart commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltinArgs {
    /// X column; `None` plots against the row index.
    pub x: Option<String>,
    /// Y columns; empty plots every remaining column.
    pub y: Vec<String>,
    /// Series color.
    pub color: Option<ColorArg>,
    /// Point size, scatter charts only.
    pub size: Option<SizeArg>,
    /// Width in pixels; zero leaves it to the container.
    pub width: u32,
    /// Height in pixels; zero uses the front-end default.
    pub height: u32,
}

/// A built-in chart ready for conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinChart {
    chart_type: ChartType,
    table: Table,
    encoding: Map<String, Value>,
    width: u32,
    height: u32,
}

impl BuiltinChart {
    /// Chart kind.
    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    /// The reshaped table that will be sent as the chart's dataset.
    pub fn table(&self) -> &Table {
        &self.table
    }
}

impl DeclarativeChart for BuiltinChart {
    fn library_version(&self) -> &str {
        BUILTIN_LIBRARY_VERSION
    }

    fn to_spec(&self, transformer: &mut dyn DataTransformer) -> Result<Spec> {
        let data = transformer.transform(Data::Table(self.table.clone()))?;
        let mut spec = Map::new();
        spec.insert("data".into(), data);
        spec.insert(
            "mark".into(),
            json!({"type": self.chart_type.mark(), "tooltip": true}),
        );
        spec.insert("encoding".into(), Value::Object(self.encoding.clone()));
        if self.width > 0 {
            spec.insert("width".into(), json!(self.width));
        }
        if self.height > 0 {
            spec.insert("height".into(), json!(self.height));
        }
        Ok(spec)
    }
}

/// Builds a built-in chart from `table` and `args`.
///
/// Several y columns are melted into long form with [`VARIABLE_COLUMN`] and
/// [`VALUE_COLUMN`] and colored by series. Unknown columns, a size on a
/// non-scatter chart, malformed colors, and a color column combined with
/// several y columns are rejected.
pub fn generate_chart(
    chart_type: ChartType,
    table: &Table,
    args: BuiltinArgs,
) -> Result<BuiltinChart> {
    let invalid =
        |msg: String| ChartError::InvalidArgument(format!("{}: {msg}", chart_type.command()));

    for name in args.x.iter().chain(&args.y) {
        require_column(table, name).map_err(invalid)?;
    }
    if let Some(ColorArg::Column(name)) = &args.color {
        require_column(table, name).map_err(invalid)?;
    }
    match &args.size {
        Some(_) if chart_type != ChartType::Scatter => {
            return Err(invalid("size is only supported by scatter charts".into()));
        }
        Some(SizeArg::Column(name)) => require_column(table, name).map_err(invalid)?,
        _ => {}
    }
    match &args.color {
        Some(ColorArg::Constant(color)) => check_color(color).map_err(invalid)?,
        Some(ColorArg::PerSeries(colors)) => {
            for color in colors {
                check_color(color).map_err(invalid)?;
            }
        }
        _ => {}
    }

    let color_column = match &args.color {
        Some(ColorArg::Column(name)) => Some(name.as_str()),
        _ => None,
    };
    let size_column = match &args.size {
        Some(SizeArg::Column(name)) => Some(name.as_str()),
        _ => None,
    };

    let x_name = args.x.clone().unwrap_or_else(|| INDEX_COLUMN.to_owned());
    let x_values = match &args.x {
        Some(name) => column_values(table, name),
        None => (0..table.num_rows()).map(|i| json!(i)).collect(),
    };
    let y: Vec<String> = if args.y.is_empty() {
        table
            .column_names()
            .filter(|name| {
                Some(*name) != args.x.as_deref()
                    && Some(*name) != color_column
                    && Some(*name) != size_column
            })
            .map(str::to_owned)
            .collect()
    } else {
        args.y.clone()
    };

    let mut encoding = Map::new();
    encoding.insert("x".into(), field_encoding(&x_name, &x_values));

    let mut columns: Vec<(String, Vec<Value>)> = vec![(x_name.clone(), x_values)];
    let mut tooltip = vec![json!({"field": x_name})];

    if y.len() > 1 {
        if color_column.is_some() {
            return Err(invalid(
                "a color column cannot be combined with several y columns".into(),
            ));
        }
        if let Some(ColorArg::PerSeries(colors)) = &args.color {
            if colors.len() != y.len() {
                return Err(invalid(format!(
                    "expected {} colors, one per y column, got {}",
                    y.len(),
                    colors.len()
                )));
            }
        }
        let rows = table.num_rows();
        let x_cells = columns[0].1.clone();
        let mut melted_x = Vec::with_capacity(rows * y.len());
        let mut variable = Vec::with_capacity(rows * y.len());
        let mut value = Vec::with_capacity(rows * y.len());
        let mut size_cells = Vec::new();
        let sizes = size_column.map(|name| column_values(table, name));
        let series: Vec<Vec<Value>> = y.iter().map(|name| column_values(table, name)).collect();
        for (row, x) in x_cells.iter().enumerate() {
            for (name, cells) in y.iter().zip(&series) {
                melted_x.push(x.clone());
                variable.push(json!(name));
                value.push(cells[row].clone());
                if let Some(sizes) = &sizes {
                    size_cells.push(sizes[row].clone());
                }
            }
        }
        columns[0].1 = melted_x;
        encoding.insert("y".into(), field_encoding(VALUE_COLUMN, &value));
        encoding.insert("color".into(), series_color(args.color.as_ref(), &y));
        tooltip.push(json!({"field": VARIABLE_COLUMN}));
        tooltip.push(json!({"field": VALUE_COLUMN}));
        columns.push((VARIABLE_COLUMN.to_owned(), variable));
        columns.push((VALUE_COLUMN.to_owned(), value));
        if let Some(name) = size_column {
            columns.push((name.to_owned(), size_cells));
        }
    } else {
        if let Some(name) = y.first() {
            let cells = column_values(table, name);
            encoding.insert("y".into(), field_encoding(name, &cells));
            tooltip.push(json!({"field": name}));
            push_unique(&mut columns, name, cells);
        }
        match &args.color {
            Some(ColorArg::Column(name)) => {
                let cells = column_values(table, name);
                encoding.insert(
                    "color".into(),
                    json!({"field": name, "type": "nominal", "title": " "}),
                );
                tooltip.push(json!({"field": name}));
                push_unique(&mut columns, name, cells);
            }
            Some(ColorArg::Constant(color)) => {
                encoding.insert("color".into(), json!({"value": color}));
            }
            Some(ColorArg::PerSeries(colors)) => match colors.as_slice() {
                [color] => {
                    encoding.insert("color".into(), json!({"value": color}));
                }
                _ => {
                    return Err(invalid(format!(
                        "expected 1 color, one per y column, got {}",
                        colors.len()
                    )));
                }
            },
            None => {}
        }
        if let Some(name) = size_column {
            push_unique(&mut columns, name, column_values(table, name));
        }
    }

    match &args.size {
        Some(SizeArg::Column(name)) => {
            let cells = column_values(table, name);
            encoding.insert("size".into(), field_encoding(name, &cells));
            tooltip.push(json!({"field": name}));
        }
        Some(SizeArg::Constant(size)) => {
            encoding.insert("size".into(), json!({"value": size}));
        }
        None => {}
    }
    encoding.insert("tooltip".into(), Value::Array(tooltip));

    let table = Table::from_columns(columns)?;
    Ok(BuiltinChart {
        chart_type,
        table,
        encoding,
        width: args.width,
        height: args.height,
    })
}

fn require_column(table: &Table, name: &str) -> std::result::Result<(), String> {
    if table.column(name).is_some() {
        Ok(())
    } else {
        let known: Vec<&str> = table.column_names().collect();
        Err(format!("column '{name}' not found; available columns: {known:?}"))
    }
}

fn column_values(table: &Table, name: &str) -> Vec<Value> {
    table
        .column(name)
        .map(|c| c.values.clone())
        .unwrap_or_default()
}

fn push_unique(columns: &mut Vec<(String, Vec<Value>)>, name: &str, cells: Vec<Value>) {
    if !columns.iter().any(|(existing, _)| existing == name) {
        columns.push((name.to_owned(), cells));
    }
}

fn check_color(color: &str) -> std::result::Result<(), String> {
    let hex = color.strip_prefix('#').unwrap_or("");
    let valid = matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(format!("'{color}' is not a #rgb or #rrggbb color"))
    }
}

/// Vega-Lite measurement type for a column's cells.
fn infer_type(cells: &[Value]) -> &'static str {
    let mut present = cells.iter().filter(|v| !v.is_null()).peekable();
    if present.peek().is_some() && present.all(Value::is_number) {
        "quantitative"
    } else {
        "nominal"
    }
}

fn field_encoding(name: &str, cells: &[Value]) -> Value {
    json!({"field": name, "type": infer_type(cells), "title": name})
}

fn series_color(color: Option<&ColorArg>, y: &[String]) -> Value {
    let mut encoding = json!({"field": VARIABLE_COLUMN, "type": "nominal", "title": " "});
    let range = match color {
        Some(ColorArg::Constant(c)) => Some(vec![c.clone(); y.len()]),
        Some(ColorArg::PerSeries(colors)) => Some(colors.clone()),
        _ => None,
    };
    if let Some(range) = range {
        encoding["scale"] = json!({"domain": y, "range": range});
    }
    encoding
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn sales() -> Table {
        Table::from_json(&json!({
            "month": ["jan", "feb"],
            "north": [1, 2],
            "south": [3, 4],
            "region": ["a", "b"]
        }))
        .unwrap()
    }

    #[test]
    fn single_y_keeps_wide_form() {
        let args = BuiltinArgs {
            x: Some("month".into()),
            y: vec!["north".into()],
            ..BuiltinArgs::default()
        };
        let chart = generate_chart(ChartType::Line, &sales(), args).unwrap();
        assert_eq!(chart.table().column_names().collect::<Vec<_>>(), ["month", "north"]);
        assert_eq!(chart.encoding["x"]["type"], "nominal");
        assert_eq!(chart.encoding["y"]["type"], "quantitative");
    }

    #[test]
    fn several_y_columns_are_melted() {
        let args = BuiltinArgs {
            x: Some("month".into()),
            y: vec!["north".into(), "south".into()],
            ..BuiltinArgs::default()
        };
        let chart = generate_chart(ChartType::Bar, &sales(), args).unwrap();
        let table = chart.table();
        assert_eq!(table.num_rows(), 4);
        assert_eq!(
            table.column(VARIABLE_COLUMN).unwrap().values,
            [json!("north"), json!("south"), json!("north"), json!("south")]
        );
        assert_eq!(
            table.column(VALUE_COLUMN).unwrap().values,
            [json!(1), json!(3), json!(2), json!(4)]
        );
        assert_eq!(chart.encoding["color"]["field"], VARIABLE_COLUMN);
    }

    #[test]
    fn missing_x_uses_the_row_index() {
        let table = Table::from_json(&json!({"v": [5, 6, 7]})).unwrap();
        let chart = generate_chart(ChartType::Area, &table, BuiltinArgs::default()).unwrap();
        assert_eq!(
            chart.table().column(INDEX_COLUMN).unwrap().values,
            [json!(0), json!(1), json!(2)]
        );
        assert_eq!(chart.encoding["y"]["field"], "v");
    }

    #[test]
    fn default_y_skips_x_and_color_columns() {
        let args = BuiltinArgs {
            x: Some("month".into()),
            color: Some(ColorArg::Column("region".into())),
            ..BuiltinArgs::default()
        };
        let err = generate_chart(ChartType::Line, &sales(), args).unwrap_err();
        // north and south remain, which cannot be combined with a color column
        assert!(matches!(err, ChartError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let args = BuiltinArgs {
            y: vec!["west".into()],
            ..BuiltinArgs::default()
        };
        let err = generate_chart(ChartType::Line, &sales(), args).unwrap_err();
        assert!(err.to_string().contains("line_chart: column 'west' not found"));
    }

    #[test]
    fn size_is_scatter_only() {
        let args = BuiltinArgs {
            size: Some(SizeArg::Constant(20.0)),
            ..BuiltinArgs::default()
        };
        assert!(generate_chart(ChartType::Bar, &sales(), args.clone()).is_err());
        let chart = generate_chart(ChartType::Scatter, &sales(), args).unwrap();
        assert_eq!(chart.encoding["size"], json!({"value": 20.0}));
    }

    #[test]
    fn colors_are_validated() {
        let args = BuiltinArgs {
            y: vec!["north".into()],
            color: Some(ColorArg::Constant("red".into())),
            ..BuiltinArgs::default()
        };
        assert!(generate_chart(ChartType::Line, &sales(), args).is_err());

        let args = BuiltinArgs {
            y: vec!["north".into(), "south".into()],
            color: Some(ColorArg::PerSeries(vec!["#f00".into(), "#00ff00".into()])),
            ..BuiltinArgs::default()
        };
        let chart = generate_chart(ChartType::Line, &sales(), args).unwrap();
        assert_eq!(chart.encoding["color"]["scale"]["range"], json!(["#f00", "#00ff00"]));
    }

    #[test]
    fn width_and_height_only_when_set() {
        struct Keep;
        impl DataTransformer for Keep {
            fn transform(&mut self, _data: Data) -> Result<Value> {
                Ok(json!({"name": "t"}))
            }
        }
        let args = BuiltinArgs {
            y: vec!["north".into()],
            width: 300,
            ..BuiltinArgs::default()
        };
        let spec = generate_chart(ChartType::Line, &sales(), args)
            .unwrap()
            .to_spec(&mut Keep)
            .unwrap();
        assert_eq!(spec["width"], 300);
        assert!(!spec.contains_key("height"));
        assert_eq!(spec["mark"]["type"], "line");
        assert_eq!(spec["data"], json!({"name": "t"}));
    }
}
