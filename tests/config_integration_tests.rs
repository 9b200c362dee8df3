//! Integration tests for config loading from fixture files.
//!
//! These tests verify that the sample config file matches the keys the organizer understands.

use std::fs;
use std::path::Path;

/// Read the sample config file content.
fn read_sample_config() -> String {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    fs::read_to_string(config_path).expect("Failed to read sample config file")
}

fn fitsorg_section() -> toml::Value {
    let value: toml::Value = toml::from_str(&read_sample_config()).expect("should parse");
    value.get("fitsorg").expect("should have fitsorg section").clone()
}

#[test]
fn sample_config_file_exists() {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    assert!(config_path.exists(), "Sample config file should exist");
}

#[test]
fn sample_config_is_valid_toml() {
    let config_content = read_sample_config();
    let result: Result<toml::Value, _> = toml::from_str(&config_content);
    assert!(result.is_ok(), "Sample config should be valid TOML: {:?}", result.err());
}

#[test]
fn fitsorg_section_has_expected_structure() {
    let fitsorg = fitsorg_section();
    for key in [
        "dryrun",
        "recurse",
        "flat",
        "keep_object",
        "date_only",
        "unknown_threshold",
        "no_threshold",
        "log_file",
        "log_dir",
        "output",
        "verbose",
        "debug",
    ] {
        assert!(fitsorg.get(key).is_some(), "fitsorg should have {key}");
    }
}

#[test]
fn fitsorg_section_has_expected_types() {
    let fitsorg = fitsorg_section();
    for key in ["dryrun", "recurse", "flat", "keep_object", "date_only", "no_threshold", "log_file"] {
        assert!(fitsorg.get(key).and_then(toml::Value::as_bool).is_some(), "{key} should be a bool");
    }
    assert_eq!(fitsorg.get("unknown_threshold").and_then(toml::Value::as_integer), Some(2));
    assert!(fitsorg.get("output").and_then(toml::Value::as_str).is_some());
}

#[test]
fn sample_config_has_no_unknown_sections() {
    let value: toml::Value = toml::from_str(&read_sample_config()).expect("should parse");
    let table = value.as_table().expect("should be a table");
    assert_eq!(table.keys().collect::<Vec<_>>(), vec!["fitsorg"]);
}
