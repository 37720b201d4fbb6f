// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::panic)]
use serde_json::{json, Value};
use trellis_charts::{
    convert_declarative_chart, BuiltinArgs, ChartError, ChartOptions, Charts, ColorArg,
    DeclarativeChart, ErrorKind, OnSelect, SizeArg,
};
use trellis_dry_tests::{sales_table, CountingChart, FakeSession};
use trellis_tabular::{CanonicalColumnarCodec, Table};

fn selecting() -> ChartOptions {
    ChartOptions::default().with_on_select(OnSelect::Rerun)
}

fn sent_spec(session: &FakeSession) -> Value {
    serde_json::from_str(&session.last_message().unwrap().spec).unwrap()
}

#[test]
fn rebuilt_chart_keeps_its_spec_and_widget_id() {
    let chart = CountingChart::default();
    let mut session = FakeSession::new();

    Charts::new(&mut session)
        .declarative_chart(&chart, &selecting())
        .unwrap();
    let first = session.last_message().unwrap().clone();

    // A rerun rebuilds the chart; the library hands out fresh counter values.
    session.rerun();
    Charts::new(&mut session)
        .declarative_chart(&chart, &selecting())
        .unwrap();
    let second = session.last_message().unwrap();

    assert_eq!(first.spec, second.spec);
    assert_eq!(first.id, second.id);
    assert!(!second.id.is_empty());

    let sent = sent_spec(&session);
    assert_eq!(sent["params"][0]["name"], "selection_1");
    assert_eq!(sent["params"][0]["views"], json!(["view_1"]));
    assert_eq!(sent["layer"][0]["name"], "view_1");
}

#[test]
fn payloads_become_content_named_datasets() {
    let mut session = FakeSession::new();
    Charts::new(&mut session)
        .declarative_chart(&CountingChart::default(), &ChartOptions::default())
        .unwrap();

    let msg = session.last_message().unwrap();
    assert_eq!(msg.datasets.len(), 1);
    assert!(msg.data.is_none());
    let name = &msg.datasets[0].name;
    assert_eq!(name.len(), 64);
    assert_eq!(sent_spec(&session)["data"], json!({"name": name}));
}

#[test]
fn equal_payloads_share_a_dataset() {
    struct Twice;

    impl DeclarativeChart for Twice {
        fn library_version(&self) -> &str {
            "5.2.0"
        }

        fn to_spec(
            &self,
            transformer: &mut dyn trellis_charts::DataTransformer,
        ) -> trellis_charts::error::Result<trellis_charts::Spec> {
            let a = transformer.transform(sales_table().into())?;
            let b = transformer.transform(sales_table().into())?;
            let other = transformer.transform(Table::new().into())?;
            let mut spec = trellis_charts::Spec::new();
            spec.insert("hconcat".into(), json!([{"data": a}, {"data": b}, {"data": other}]));
            Ok(spec)
        }
    }

    let converted = convert_declarative_chart(&Twice, &CanonicalColumnarCodec).unwrap();
    assert_eq!(converted.datasets.len(), 2);
    assert_eq!(
        converted.spec["hconcat"][0]["data"],
        converted.spec["hconcat"][1]["data"]
    );
    assert_ne!(
        converted.spec["hconcat"][0]["data"],
        converted.spec["hconcat"][2]["data"]
    );
}

#[test]
fn old_library_versions_cannot_select() {
    let chart = CountingChart::default().with_version("4.17.0");
    let mut session = FakeSession::new();

    let err = Charts::new(&mut session)
        .declarative_chart(&chart, &selecting())
        .unwrap_err();
    match &err {
        ChartError::IncompatibleLibrary { version } => assert_eq!(version, "4.17.0"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::LibraryIncompatible);

    // Without selections the version does not matter.
    Charts::new(&mut session)
        .declarative_chart(&chart, &ChartOptions::default())
        .unwrap();
    assert_eq!(session.enqueued().len(), 1);
}

#[test]
fn builtin_line_chart_melts_several_series() {
    let table = Table::from_columns([
        ("day", vec![json!(1), json!(2)]),
        ("a", vec![json!(10), json!(20)]),
        ("b", vec![json!(30), json!(40)]),
    ])
    .unwrap();
    let mut session = FakeSession::new();
    let args = BuiltinArgs {
        x: Some("day".into()),
        ..BuiltinArgs::default()
    };
    let handle = Charts::new(&mut session)
        .line_chart(&table, args, true)
        .unwrap();
    assert_eq!(handle.index, 0);

    let msg = session.last_message().unwrap();
    assert!(msg.use_container_width);
    assert!(!msg.is_select_enabled);
    let sent = sent_spec(&session);
    assert_eq!(sent["mark"], json!({"type": "line", "tooltip": true}));
    assert_eq!(sent["encoding"]["x"]["field"], "day");
    assert_eq!(sent["encoding"]["y"]["field"], "(value)");
    assert_eq!(sent["encoding"]["color"]["field"], "(variable)");
}

#[test]
fn builtin_charts_map_to_marks() {
    let table = sales_table();
    let mut session = FakeSession::new();
    let args = || BuiltinArgs {
        x: Some("month".into()),
        y: vec!["sales".into()],
        ..BuiltinArgs::default()
    };

    let mut charts = Charts::new(&mut session);
    charts.area_chart(&table, args(), true).unwrap();
    charts.bar_chart(&table, args(), true).unwrap();
    charts
        .scatter_chart(
            &table,
            BuiltinArgs {
                size: Some(SizeArg::Constant(40.0)),
                color: Some(ColorArg::Constant("#ff0000".into())),
                ..args()
            },
            false,
        )
        .unwrap();

    let marks: Vec<Value> = session
        .enqueued()
        .iter()
        .map(|(_, msg)| {
            let spec: Value = serde_json::from_str(&msg.spec).unwrap();
            spec["mark"]["type"].clone()
        })
        .collect();
    assert_eq!(marks, [json!("area"), json!("bar"), json!("circle")]);

    let scatter: Value = serde_json::from_str(&session.enqueued()[2].1.spec).unwrap();
    assert_eq!(scatter["encoding"]["size"], json!({"value": 40.0}));
    assert_eq!(scatter["encoding"]["color"], json!({"value": "#ff0000"}));
}

#[test]
fn builtin_argument_errors() {
    let table = sales_table();
    let mut session = FakeSession::new();
    let mut charts = Charts::new(&mut session);

    let unknown = BuiltinArgs {
        y: vec!["profit".into()],
        ..BuiltinArgs::default()
    };
    let err = charts.bar_chart(&table, unknown, true).unwrap_err();
    assert!(matches!(err, ChartError::InvalidArgument(ref msg) if msg.contains("profit")));

    let sized_line = BuiltinArgs {
        size: Some(SizeArg::Constant(3.0)),
        ..BuiltinArgs::default()
    };
    assert!(charts.line_chart(&table, sized_line, true).is_err());

    let bad_color = BuiltinArgs {
        color: Some(ColorArg::Constant("red".into())),
        ..BuiltinArgs::default()
    };
    assert!(charts.area_chart(&table, bad_color, true).is_err());
    assert!(session.enqueued().is_empty());
}
