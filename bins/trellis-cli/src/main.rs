// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Trellis developer CLI.
//!
//! Runs the chart pipeline over spec files so a spec can be inspected the way
//! the front end would receive it.

mod session;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use trellis_app_core::config::ConfigService;
use trellis_app_core::prefs::ChartPrefs;
use trellis_chart_proto::wire::encode_message;
use trellis_charts::{
    stabilize_json_spec, stabilize_spec, BuiltinArgs, ChartOptions, ChartOutput, Charts, ColorArg,
    Data, OnSelect, SelectionSerde, Spec, WidgetSerde,
};
use trellis_config_fs::FsConfigStore;
use trellis_tabular::Table;

use crate::session::CliSession;

#[derive(Parser, Debug)]
#[command(author, version, about = "Trellis chart marshalling tools")]
struct Args {
    /// Config directory (defaults to the platform config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Marshall a Vega-Lite spec into a chart message
    Marshall(MarshallArgs),
    /// Draw a built-in chart from a table file
    Plot(PlotArgs),
    /// Print the stabilized JSON text of a spec
    Stabilize {
        /// Spec file
        spec: PathBuf,
    },
    /// Decode a selection blob as the front end would send it
    DecodeSelection {
        /// JSON text; omitted means nothing was sent yet
        json: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct MarshallArgs {
    /// Spec file
    spec: PathBuf,
    /// Standalone data payload (JSON file)
    #[arg(long)]
    data: Option<PathBuf>,
    /// Stretch the chart to the container width
    #[arg(long)]
    container_width: bool,
    /// Theme name
    #[arg(long, conflicts_with = "no_theme")]
    theme: Option<String>,
    /// Use the library default theme
    #[arg(long)]
    no_theme: bool,
    /// Selection behaviour (`ignore` or `rerun`)
    #[arg(long, default_value = "ignore")]
    on_select: String,
    /// Widget key
    #[arg(long)]
    key: Option<String>,
    /// Flat `a_b=value` overrides merged into the spec; values parse as JSON
    /// when they can
    #[arg(long = "set", value_name = "KEY=VALUE")]
    sets: Vec<String>,
    /// Selection blob the widget reports back
    #[arg(long)]
    ui_value: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
}

#[derive(clap::Args, Debug)]
struct PlotArgs {
    /// Chart kind
    #[arg(value_enum)]
    kind: Kind,
    /// Table file: records, scalars, or an object of columns
    data: PathBuf,
    /// X column
    #[arg(long)]
    x: Option<String>,
    /// Y column (repeatable)
    #[arg(long)]
    y: Vec<String>,
    /// Color column
    #[arg(long)]
    color: Option<String>,
    /// Width in pixels
    #[arg(long, default_value_t = 0)]
    width: u32,
    /// Height in pixels
    #[arg(long, default_value_t = 0)]
    height: u32,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Line,
    Area,
    Bar,
    Scatter,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    /// Message as JSON, payload bytes in hex
    Json,
    /// Canonical CBOR message as one hex line
    CborHex,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    match args.cmd {
        Command::Marshall(marshall) => {
            let prefs = load_prefs(args.config_dir.as_deref())?;
            run_marshall(&marshall, &prefs)
        }
        Command::Plot(plot) => {
            let prefs = load_prefs(args.config_dir.as_deref())?;
            run_plot(plot, &prefs)
        }
        Command::Stabilize { spec } => {
            let mut spec = read_spec(&spec)?;
            let renamed = stabilize_spec(&mut spec);
            debug!(params = renamed.params.len(), views = renamed.views.len(), "tree pass");
            println!("{}", stabilize_json_spec(&serde_json::to_string(&spec)?));
            Ok(())
        }
        Command::DecodeSelection { json } => {
            let state = SelectionSerde.deserialize(json.as_deref());
            println!("{}", serde_json::to_string_pretty(&state.to_value())?);
            Ok(())
        }
    }
}

fn load_prefs(config_dir: Option<&Path>) -> Result<ChartPrefs> {
    let store = match config_dir {
        Some(dir) => FsConfigStore::at(dir)?,
        None => FsConfigStore::new()?,
    };
    debug!(dir = %store.base().display(), "loading chart prefs");
    Ok(ConfigService::new(store).chart_prefs()?)
}

fn run_marshall(args: &MarshallArgs, prefs: &ChartPrefs) -> Result<()> {
    let spec = read_spec(&args.spec)?;
    let data = args
        .data
        .as_deref()
        .map(read_json)
        .transpose()?
        .map(Data::Json);

    let mut options =
        ChartOptions::from_prefs(prefs).with_on_select(args.on_select.parse::<OnSelect>()?);
    options.use_container_width |= args.container_width;
    if args.no_theme {
        options.theme = None;
    } else if let Some(theme) = &args.theme {
        options.theme = Some(theme.clone());
    }
    if let Some(key) = &args.key {
        options = options.with_key(key.clone());
    }
    let kwargs = parse_sets(&args.sets)?;

    let mut session = CliSession::new(args.ui_value.clone());
    let output = Charts::new(&mut session).vega_lite_chart(data, Some(spec), &options, &kwargs)?;
    let (element_type, msg) = session
        .take_message()
        .ok_or_else(|| anyhow!("chart call enqueued nothing"))?;
    info!(element_type, datasets = msg.datasets.len(), "marshalled chart");

    match args.format {
        Format::Json => {
            let selection = match &output {
                ChartOutput::Selection(state) => state.to_value(),
                ChartOutput::Element(_) => Value::Null,
            };
            let out = json!({
                "element_type": element_type,
                "widget_id": session.widget_id(),
                "message": msg,
                "selection": selection,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::CborHex => println!("{}", hex::encode(encode_message(&msg)?)),
    }
    Ok(())
}

fn run_plot(args: PlotArgs, prefs: &ChartPrefs) -> Result<()> {
    let table = Table::from_json(&read_json(&args.data)?)?;
    let builtin = BuiltinArgs {
        x: args.x,
        y: args.y,
        color: args.color.map(ColorArg::Column),
        width: args.width,
        height: args.height,
        ..BuiltinArgs::default()
    };
    let wide = prefs.builtin_use_container_width;
    let mut session = CliSession::new(None);
    let mut charts = Charts::new(&mut session);
    match args.kind {
        Kind::Line => charts.line_chart(&table, builtin, wide)?,
        Kind::Area => charts.area_chart(&table, builtin, wide)?,
        Kind::Bar => charts.bar_chart(&table, builtin, wide)?,
        Kind::Scatter => charts.scatter_chart(&table, builtin, wide)?,
    };
    let (_, msg) = session
        .take_message()
        .ok_or_else(|| anyhow!("chart call enqueued nothing"))?;
    println!("{}", serde_json::to_string_pretty(&msg)?);
    Ok(())
}

fn parse_sets(sets: &[String]) -> Result<Spec> {
    let mut kwargs = Spec::new();
    for set in sets {
        let (key, raw) = set
            .split_once('=')
            .ok_or_else(|| anyhow!("--set expects KEY=VALUE, got '{set}'"))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()));
        kwargs.insert(key.to_owned(), value);
    }
    Ok(kwargs)
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

fn read_spec(path: &Path) -> Result<Spec> {
    match read_json(path)? {
        Value::Object(spec) => Ok(spec),
        _ => Err(anyhow!("{}: spec must be a JSON object", path.display())),
    }
}
