use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn cargo_bin() -> PathBuf {
    if let Ok(path) = env::var("CARGO_BIN_EXE_edi") {
        return PathBuf::from(path);
    }

    let target_dir = env::var("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| repo_root().join("target"));
    let executable_name = format!("edi{}", std::env::consts::EXE_SUFFIX);
    let fallback = target_dir.join("debug").join(executable_name);

    if fallback.exists() {
        return fallback;
    }

    panic!(
        "CARGO_BIN_EXE_edi is not set and fallback binary was not found at {}",
        fallback.display()
    );
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn testdata(path: &str) -> String {
    repo_root()
        .join("testdata")
        .join(path)
        .to_string_lossy()
        .into_owned()
}

fn unique_temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time after epoch")
        .as_nanos();
    let counter = TEMP_DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    env::temp_dir().join(format!(
        "edi-cli-{name}-{}-{nanos}-{counter}",
        std::process::id()
    ))
}

fn run_edi(args: &[&str]) -> Output {
    Command::new(cargo_bin())
        .args(args)
        .env_remove("EDI_SUBSCRIPTION_ID")
        .env_remove("EDI_RESOURCE_GROUP")
        .env_remove("EDI_ACCOUNT_NAME")
        .env("RUST_LOG", "warn")
        .output()
        .expect("run edi")
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "expected {what} to succeed; stdout: {}; stderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn route_prints_one_line_per_shipment() {
    let input = testdata("x12/load_tender_two_shipments.x12");
    let agreements = testdata("agreements/agreements.json");

    let output = run_edi(&["route", &input, "--session", "sess-42", "--agreements", &agreements]);
    assert_success(&output, "route");

    let stdout = String::from_utf8(output.stdout).expect("stdout should be UTF-8");
    let lines: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is JSON"))
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["partition_key"], "sess-42+SHP100");
    assert_eq!(lines[1]["partition_key"], "sess-42+SHP200");
    assert_eq!(lines[1]["index"], 1);
    assert_eq!(lines[0]["agreement"], "ACME-WIDGETCO-001");
    assert!(lines[0]["bytes"].as_u64().unwrap_or(0) > 0);
}

#[test]
fn route_writes_payloads_to_output_dir() {
    let input = testdata("x12/load_tender_two_shipments.x12");
    let agreements = testdata("agreements/agreements.json");
    let config = testdata("config/router.yaml");
    let out = unique_temp_dir("route-out");
    let out_arg = out.to_string_lossy().into_owned();

    let output = run_edi(&[
        "--config",
        &config,
        "route",
        &input,
        "--session",
        "sess-42",
        "--agreements",
        &agreements,
        "--output-dir",
        &out_arg,
        "--message-id",
        "msg-0001",
    ]);
    assert_success(&output, "route with output dir");

    let first = fs::read_to_string(out.join("000-sess-42+SHP100.xml")).expect("first payload written");
    let second = fs::read_to_string(out.join("001-sess-42+SHP200.xml")).expect("second payload written");

    assert!(first.starts_with("<?xml"));
    assert!(first.contains("<ShipmentIdentificationNumber_04>SHP100</ShipmentIdentificationNumber_04>"));
    assert!(second.contains("<TS204>"));
    assert!(!second.contains("SHP100"));

    let _ = fs::remove_dir_all(out);
}

#[test]
fn route_unknown_partner_fails() {
    let input = testdata("x12/load_tender_unknown_partner.x12");
    let agreements = testdata("agreements/agreements.json");

    let output = run_edi(&["route", &input, "--session", "sess-9", "--agreements", &agreements]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("agreement_not_found"), "stderr: {stderr}");
    assert!(stderr.contains("GLOBEX"), "stderr: {stderr}");
}

#[test]
fn route_blank_session_fails() {
    let input = testdata("x12/load_tender_two_shipments.x12");
    let agreements = testdata("agreements/agreements.json");

    let output = run_edi(&["route", &input, "--session", "  ", "--agreements", &agreements]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing_session_id"), "stderr: {stderr}");
}

#[test]
fn decompose_reports_identity_and_shipments() {
    let input = testdata("x12/load_tender_two_shipments.x12");

    let output = run_edi(&["decompose", &input]);
    assert_success(&output, "decompose");

    let json: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(json["identity"]["sender_id"], "ACME");
    assert_eq!(json["identity"]["receiver_id"], "WIDGETCO");
    assert_eq!(json["control_number"], "000000042");
    assert_eq!(json["prepared_at"], "2024-03-15T09:30:00");

    let shipments = json["shipments"].as_array().expect("shipments array");
    assert_eq!(shipments.len(), 2);
    assert_eq!(shipments[0]["control_number"], "0001");
    assert_eq!(shipments[1]["shipment_id"], "SHP200");
}

#[test]
fn decompose_rejects_stacked_envelopes() {
    let mut body = fs::read(testdata("x12/load_tender_two_shipments.x12")).expect("fixture readable");
    body.extend(fs::read(testdata("x12/load_tender_unknown_partner.x12")).expect("fixture readable"));
    let dir = unique_temp_dir("stacked");
    fs::create_dir_all(&dir).expect("temp dir");
    let input = dir.join("stacked.x12");
    fs::write(&input, body).expect("temp input writable");

    let output = run_edi(&["decompose", input.to_string_lossy().as_ref()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("multiple_interchanges"), "stderr: {stderr}");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn agreements_resolves_identity() {
    let agreements = testdata("agreements/agreements.json");

    let output = run_edi(&[
        "agreements",
        "--agreements",
        &agreements,
        "--sender-qualifier",
        "01",
        "--sender-id",
        "123456789",
        "--receiver-qualifier",
        "ZZ",
        "--receiver-id",
        "WIDGETCO",
    ]);
    assert_success(&output, "agreements resolve");

    let json: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(json["name"], "INITECH-WIDGETCO-004");
}

#[test]
fn agreements_rejects_partial_identity() {
    let agreements = testdata("agreements/agreements.json");

    let output = run_edi(&["agreements", "--agreements", &agreements, "--sender-id", "ACME"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--receiver-id"), "stderr: {stderr}");
}
