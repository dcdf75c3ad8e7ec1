//! CLI contract: exit codes and machine-readable output shape.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn write_schema(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("jsonsub-cli-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write schema file");
    path
}

fn run_jsonsub(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_jsonsub"))
        .args(args)
        .output()
        .expect("failed to execute jsonsub")
}

#[test]
fn compatible_pair_exits_zero() {
    let producer = write_schema("p_int.json", r#"{"type":"integer"}"#);
    let consumer = write_schema("c_num.json", r#"{"type":"number"}"#);
    let output = run_jsonsub(&[
        producer.to_str().unwrap(),
        consumer.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("compatible"));
}

#[test]
fn incompatible_pair_exits_one_with_witness() {
    let producer = write_schema("p_num.json", r#"{"type":"number"}"#);
    let consumer = write_schema("c_int.json", r#"{"type":"integer"}"#);
    let output = run_jsonsub(&[
        producer.to_str().unwrap(),
        consumer.to_str().unwrap(),
        "--output-format",
        "minimal",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("incompatible"));
}

#[test]
fn json_output_has_the_contract_shape() {
    let producer = write_schema("p_wide.json", r#"{"type":["string","number"]}"#);
    let consumer = write_schema("c_str.json", r#"{"type":"string"}"#);
    let output = run_jsonsub(&[
        producer.to_str().unwrap(),
        consumer.to_str().unwrap(),
        "--output-format",
        "json",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(parsed["compatible"], serde_json::json!(false));
    assert!(!parsed["counterexample"].is_null());
    assert!(parsed["solver_time"].is_number());
    assert!(parsed["failed_constraints"].is_array());
}

#[test]
fn json_output_for_compatible_pair_has_null_counterexample() {
    let producer = write_schema("p_str5.json", r#"{"type":"string","minLength":5}"#);
    let consumer = write_schema("c_anystr.json", r#"{"type":"string"}"#);
    let output = run_jsonsub(&[
        producer.to_str().unwrap(),
        consumer.to_str().unwrap(),
        "--output-format",
        "json",
    ]);
    assert_eq!(output.status.code(), Some(0));
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(parsed["compatible"], serde_json::json!(true));
    assert!(parsed["counterexample"].is_null());
}

#[test]
fn cyclic_schema_exits_two_with_hint() {
    let producer = write_schema(
        "p_cyclic.json",
        r##"{"$ref":"#/$defs/N","$defs":{"N":{"properties":{"n":{"$ref":"#/$defs/N"}}}}}"##,
    );
    let consumer = write_schema("c_true.json", "true");
    let output = run_jsonsub(&[
        producer.to_str().unwrap(),
        consumer.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cyclic"));
    assert!(stderr.contains("simulation"));
}

#[test]
fn missing_file_exits_two() {
    let consumer = write_schema("c_exists.json", "true");
    let output = run_jsonsub(&[
        "/nonexistent/producer.json",
        consumer.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn invalid_json_exits_two() {
    let producer = write_schema("p_bad.json", "{not json");
    let consumer = write_schema("c_ok.json", "true");
    let output = run_jsonsub(&[
        producer.to_str().unwrap(),
        consumer.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn counterexample_file_is_written() {
    let producer = write_schema("p_n.json", r#"{"type":"number"}"#);
    let consumer = write_schema("c_i.json", r#"{"type":"integer"}"#);
    let out_path = std::env::temp_dir().join(format!(
        "jsonsub-cli-{}-witness.json",
        std::process::id()
    ));
    let output = run_jsonsub(&[
        producer.to_str().unwrap(),
        consumer.to_str().unwrap(),
        "--counterexample-file",
        out_path.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let saved = fs::read_to_string(&out_path).expect("witness file written");
    let witness: serde_json::Value = serde_json::from_str(&saved).expect("witness is JSON");
    assert!(witness.is_number());
}

#[test]
fn unknown_output_format_exits_two() {
    let producer = write_schema("p_fmt.json", "true");
    let consumer = write_schema("c_fmt.json", "true");
    let output = run_jsonsub(&[
        producer.to_str().unwrap(),
        consumer.to_str().unwrap(),
        "--output-format",
        "yaml",
    ]);
    assert_eq!(output.status.code(), Some(2));
}
