// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use base64::Engine;
use log::debug;

use super::Config;
use crate::error::AssertionError;

/// JSON schema the YAML configuration is validated against
pub const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Build the validator for the embedded configuration schema.
///
/// The schema follows JSON Schema draft 2020-12 and format assertions are
/// enabled.
///
/// # Returns
///
/// * `Ok(jsonschema::Validator)` ready to validate a configuration converted to JSON
/// * `Err(anyhow::Error)` if the embedded schema is not valid JSON or not a valid schema
pub(crate) fn schema_validator() -> Result<jsonschema::Validator> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    jsonschema::draft202012::options()
        .should_validate_formats(true)
        .build(&schema)
        .map_err(|e| anyhow::anyhow!("Failed to build JSON schema validator: {}", e))
}

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line. It prints the full JSON schema of the configuration
/// file to stdout, formatted for readability.
///
/// # Returns
///
/// * `Ok(())` once the schema has been printed
/// * `Err(anyhow::Error)` if the embedded schema cannot be parsed or formatted
///
/// # Example
///
/// ```bash
/// ./app_jwt_issuer --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Validates the configuration against rules that aren't covered by the JSON schema.
///
/// This function runs after schema validation and deserialization, and again
/// after environment and command line overrides have been applied.
///
/// # Arguments
///
/// * `config` - The configuration object to validate
///
/// # Returns
///
/// * `Ok(())` if all validations pass
/// * `Err(anyhow::Error)` with a descriptive message if any validation fails.
///   Lifetime and policy problems carry an [`AssertionError::PolicyViolation`],
///   the same error the issuer raises for them.
///
/// # Validation Rules
///
/// - **Policy**: `max_ttl` is positive and the clock skew leaves a live window
/// - **TTL**: the configured lifetime is positive and does not exceed `policy.max_ttl`
/// - **Key source**: at most one of `path`, `pem_base64`, `secret_path` is set,
///   and `pem_base64` is valid base64
/// - **Issuer**: a configured `app_id` is not blank
///
/// A missing issuer id or key source is not an error here, since both can
/// still be supplied through the environment or the command line.
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    check_lifetime(config).context("Invalid issuance lifetime")?;

    if config.key.configured_sources() > 1 {
        anyhow::bail!("Only one of key.path, key.pem_base64 and key.secret_path may be set");
    }

    if let Some(encoded) = &config.key.pem_base64 {
        let compact: String = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let _ = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .context("key.pem_base64 is not valid base64")?;
    }

    if config.issuer.app_id.is_some() {
        config.issuer.issuer_id()?;
    }

    Ok(())
}

/// Policy and TTL checks, reported as policy violations
fn check_lifetime(config: &Config) -> std::result::Result<(), AssertionError> {
    config.policy.validate()?;

    let ttl = config.issuer.ttl;
    if ttl == 0 {
        return Err(AssertionError::policy("issuer.ttl must be positive"));
    }
    if ttl > config.policy.max_ttl {
        return Err(AssertionError::policy(format!(
            "issuer.ttl ({}) exceeds policy.max_ttl ({})",
            ttl, config.policy.max_ttl
        )));
    }
    if config.policy.clock_skew >= ttl {
        return Err(AssertionError::policy(format!(
            "policy.clock_skew ({}) must be smaller than issuer.ttl ({})",
            config.policy.clock_skew, ttl
        )));
    }
    Ok(())
}
