// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

mod common;

use anyhow::Result;
use app_jwt_issuer::config::{Config, CONFIG_SCHEMA};
use app_jwt_issuer::AssertionError;
use std::fs;
use tempfile::tempdir;

fn assert_rejected(yaml: &str, expected: &str) {
    let error = Config::from_yaml_str(yaml).expect_err("Configuration should be rejected");
    let message = format!("{:#}", error);
    assert!(
        message.contains(expected),
        "Expected {:?} in error, got {:?}",
        expected,
        message
    );
}

#[test]
fn test_invalid_yaml_is_rejected() {
    common::setup();
    assert_rejected("issuer: [unterminated", "Failed to parse YAML");
}

#[test]
fn test_schema_rejects_unknown_fields() {
    common::setup();
    assert_rejected("issuer:\n  app_id: 1\n  audience: api\n", "validation failed");
    assert_rejected("visualization:\n  port: 8080\n", "validation failed");
}

#[test]
fn test_schema_rejects_wrong_types() {
    common::setup();
    assert_rejected("issuer:\n  ttl: \"ten minutes\"\n", "validation failed");
    assert_rejected("issuer:\n  ttl: 0\n", "validation failed");
    assert_rejected("issuer:\n  algorithm: HS256\n", "validation failed");
    assert_rejected("policy:\n  clock_skew: -5\n", "validation failed");
}

#[test]
fn test_ttl_above_max_is_rejected() {
    common::setup();
    assert_rejected("issuer:\n  ttl: 601\n", "exceeds policy.max_ttl");
    assert!(Config::from_yaml_str("issuer:\n  ttl: 900\npolicy:\n  max_ttl: 900\n").is_ok());
}

#[test]
fn test_lifetime_errors_are_policy_violations() {
    common::setup();
    for yaml in [
        "issuer:\n  ttl: 601\n",
        "issuer:\n  ttl: 30\npolicy:\n  clock_skew: 30\n",
    ] {
        let error = Config::from_yaml_str(yaml).unwrap_err();
        let violation = error.downcast_ref::<AssertionError>();
        assert!(
            matches!(violation, Some(AssertionError::PolicyViolation { .. })),
            "{:?} should be a policy violation, got {:#}",
            yaml,
            error
        );
        assert_eq!(violation.map(AssertionError::exit_code), Some(3));
    }
}

#[test]
fn test_multiple_key_sources_are_rejected() {
    common::setup();
    assert_rejected(
        "key:\n  path: /a.pem\n  secret_path: /run/secrets\n",
        "Only one of",
    );
}

#[test]
fn test_invalid_base64_key_is_rejected() {
    common::setup();
    assert_rejected("key:\n  pem_base64: \"%%%\"\n", "not valid base64");
}

#[test]
fn test_blank_app_id_is_rejected() {
    common::setup();
    assert!(Config::from_yaml_str("issuer:\n  app_id: \"  \"\n").is_err());
}

#[test]
fn test_error_names_the_file() -> Result<()> {
    common::setup();
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("broken.yaml");
    fs::write(&path, "issuer:\n  ttl: 601\n")?;

    let error = Config::from_file(&path).unwrap_err();
    assert!(format!("{:#}", error).contains("broken.yaml"));
    Ok(())
}

#[test]
fn test_embedded_schema_is_json() -> Result<()> {
    let schema: serde_json::Value = serde_json::from_str(CONFIG_SCHEMA)?;
    assert_eq!(schema["type"], "object");
    assert!(schema["properties"]["issuer"].is_object());
    assert!(schema["properties"]["key"].is_object());
    Ok(())
}
