// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used)]
//! End-to-end runs of the `trellis` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

fn trellis(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("trellis").unwrap();
    cmd.arg("--config-dir").arg(config_dir);
    cmd
}

fn write_json(dir: &Path, name: &str, value: &Value) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec(value).unwrap()).unwrap();
    path
}

fn stdout_json(cmd: &mut Command) -> Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

#[test]
fn marshall_extracts_inline_values() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write_json(
        dir.path(),
        "spec.json",
        &json!({"mark": "bar", "data": {"values": [{"a": 1}, {"a": 2}]}}),
    );

    let out = stdout_json(trellis(dir.path()).arg("marshall").arg(&spec));
    assert_eq!(out["element_type"], "arrow_vega_lite_chart");
    assert_eq!(out["selection"], Value::Null);
    let msg = &out["message"];
    assert!(msg["data"]["data"].as_str().is_some_and(|hex| !hex.is_empty()));
    assert!(!msg["spec"].as_str().unwrap().contains("values"));
    assert_eq!(msg["theme"], "trellis");
    assert_eq!(msg["is_select_enabled"], false);
}

#[test]
fn marshall_returns_the_reported_selection() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write_json(
        dir.path(),
        "spec.json",
        &json!({
            "mark": "point",
            "params": [{"name": "brush", "select": {"type": "interval"}}],
        }),
    );

    let out = stdout_json(
        trellis(dir.path())
            .arg("marshall")
            .arg(&spec)
            .args(["--on-select", "rerun", "--key", "sales"])
            .args(["--ui-value", r#"{"select": {"brush": {"x": [1, 5]}}}"#]),
    );
    assert_eq!(out["selection"], json!({"select": {"brush": {"x": [1, 5]}}}));
    assert_eq!(out["message"]["is_select_enabled"], true);
    let id = out["widget_id"].as_str().unwrap();
    assert!(id.starts_with("$$WIDGET_ID-"));
    assert!(id.ends_with("-sales"));
    assert_eq!(out["message"]["id"], id);
}

#[test]
fn marshall_rejects_selections_without_params() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write_json(dir.path(), "spec.json", &json!({"mark": "point"}));

    trellis(dir.path())
        .arg("marshall")
        .arg(&spec)
        .args(["--on-select", "rerun"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[CHART_NO_SELECTIONS]"));
}

#[test]
fn marshall_honours_stored_prefs() {
    let dir = tempfile::tempdir().unwrap();
    write_json(
        dir.path(),
        "chart_prefs.json",
        &json!({"theme": null, "use_container_width": true}),
    );
    let spec = write_json(dir.path(), "spec.json", &json!({"mark": "line"}));

    let out = stdout_json(trellis(dir.path()).arg("marshall").arg(&spec));
    assert_eq!(out["message"]["theme"], "");
    assert_eq!(out["message"]["use_container_width"], true);
}

#[test]
fn marshall_cbor_hex_is_one_hex_line() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write_json(dir.path(), "spec.json", &json!({"mark": "line"}));

    trellis(dir.path())
        .arg("marshall")
        .arg(&spec)
        .args(["--format", "cbor-hex"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[0-9a-f]+\n$").unwrap());
}

#[test]
fn stabilize_renumbers_generated_names() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write_json(
        dir.path(),
        "spec.json",
        &json!({
            "params": [{"name": "param_9", "select": {"type": "point"}, "views": ["view_4"]}],
            "layer": [{"name": "view_4", "mark": "bar"}],
        }),
    );

    let out = stdout_json(trellis(dir.path()).arg("stabilize").arg(&spec));
    assert_eq!(out["params"][0]["name"], "selection_1");
    assert_eq!(out["params"][0]["views"], json!(["view_1"]));
    assert_eq!(out["layer"][0]["name"], "view_1");
}

#[test]
fn decode_selection_defaults_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    let out = stdout_json(trellis(dir.path()).arg("decode-selection"));
    assert_eq!(out, json!({"select": {}}));

    let out = stdout_json(trellis(dir.path()).args(["decode-selection", "not json"]));
    assert_eq!(out, json!({"select": {}}));
}

#[test]
fn plot_draws_a_builtin_chart_with_container_width_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_json(
        dir.path(),
        "table.json",
        &json!({"month": ["jan", "feb"], "sales": [3, 4]}),
    );

    let msg = stdout_json(
        trellis(dir.path())
            .args(["plot", "bar"])
            .arg(&data)
            .args(["--x", "month", "--y", "sales"]),
    );
    assert_eq!(msg["use_container_width"], true);
    assert_eq!(msg["datasets"].as_array().unwrap().len(), 1);
    let spec: Value = serde_json::from_str(msg["spec"].as_str().unwrap()).unwrap();
    assert_eq!(spec["mark"]["type"], "bar");
    assert_eq!(spec["encoding"]["y"]["field"], "sales");
}
