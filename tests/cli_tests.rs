//! CLI integration tests
//!
//! These tests run the built binary against the fixture schemas.

#![cfg(feature = "cli")]

mod fixture_facts;

use fixture_facts::{fixture, RecordFacts};
use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_xmlschema-template"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ============================================================================
// Inspect Command Tests
// ============================================================================

#[test]
fn test_cli_inspect_lists_definitions_per_namespace() {
    let output = run(&["inspect", &fixture("record/record.xsd")]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "inspect should succeed");
    assert!(stdout.contains("xmlschema-template v"), "should show version");
    assert!(stdout.contains(&format!("Root element: {}", RecordFacts::ROOT)));
    assert!(stdout.contains("=== urn:dc ==="), "{}", stdout);
    assert!(stdout.contains("  recordType (complexType)"), "{}", stdout);
}

#[test]
fn test_cli_inspect_json_filtered_by_kind() {
    let output = run(&[
        "inspect",
        "--json",
        "--kind",
        "simpleType",
        &fixture("media.xsd"),
    ]);
    assert!(output.status.success(), "inspect --json should succeed");

    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("Output should be valid JSON");
    let summaries = json.as_array().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["name"], "formatType");
    assert_eq!(summaries[0]["kind"], "simpleType");
}

#[test]
fn test_cli_inspect_unknown_kind_fails() {
    let output = run(&["inspect", "--kind", "widget", &fixture("media.xsd")]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown definition kind"));
}

// ============================================================================
// Template Command Tests
// ============================================================================

#[test]
fn test_cli_template_minimal() {
    let output = run(&["template", "--minimal", &fixture("catalog.xsd")]);
    let stdout = stdout(&output);

    assert!(output.status.success());
    assert!(stdout.contains("<title/>"), "{}", stdout);
    assert!(!stdout.contains("<tag"), "{}", stdout);
}

#[test]
fn test_cli_template_ambiguous_root_needs_a_name() {
    let path = fixture("substitution.xsd");
    let output = run(&["template", &path]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Error:"));

    let output = run(&["template", "--root", "shelf", &path]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("<publication/>"));
}

// ============================================================================
// Nodes Command Tests
// ============================================================================

#[test]
fn test_cli_nodes_flags_recursion() {
    let output = run(&["nodes", &fixture("tree.xsd")]);
    let stdout = stdout(&output);

    assert!(output.status.success());
    assert!(stdout.contains("/node [1..1] treeType ()"), "{}", stdout);
    assert!(
        stdout.contains("/node/node/node/node/node [0..unbounded] treeType () (recursive)"),
        "{}",
        stdout
    );
}

#[test]
fn test_cli_recursion_bound_option() {
    let output = run(&["--recursion-bound", "1", "nodes", &fixture("tree.xsd")]);
    let stdout = stdout(&output);

    assert!(output.status.success());
    assert!(stdout.contains("/node/node [0..unbounded] treeType () (recursive)"), "{}", stdout);
    assert!(!stdout.contains("/node/node/node"), "{}", stdout);
}

// ============================================================================
// Insert Command Tests
// ============================================================================

#[test]
fn test_cli_insert_places_element_in_sequence() {
    let dir = TempDir::new().unwrap();
    let document = dir.path().join("catalog.xml");
    fs::write(&document, "<catalog><tag>a</tag></catalog>").unwrap();

    let output = run(&[
        "insert",
        &fixture("catalog.xsd"),
        document.to_str().unwrap(),
        "/catalog/title",
    ]);
    let stdout = stdout(&output);

    assert!(output.status.success());
    let title = stdout.find("<title").expect("title inserted");
    let tag = stdout.find("<tag").unwrap();
    assert!(title < tag, "{}", stdout);
}
