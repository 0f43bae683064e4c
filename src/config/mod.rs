// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the assertion issuer
//!
//! This module loads, validates and layers the settings used to issue
//! assertions. The configuration file is YAML, validated against an embedded
//! JSON schema before it is deserialized, then checked against rules the
//! schema cannot express.
//!
//! ## Configuration Structure
//!
//! - `issuer`: issuer id, assertion lifetime and signing algorithm
//! - `policy`: maximum lifetime and clock skew backdate
//! - `key`: where the private key is read from
//!
//! ## Precedence
//!
//! Command line arguments override environment variables, which override
//! the file, which overrides the defaults:
//!
//! ```no_run
//! use app_jwt_issuer::config::Config;
//! use std::path::Path;
//!
//! let mut config = Config::from_file(Path::new("issuer.yaml")).unwrap();
//! config.apply_env().unwrap();
//! config.apply_args(Some("4385".parse().unwrap()), Some(540), None, None);
//! config.validate().unwrap();
//! ```

pub mod issuer;
pub mod key;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::algorithm::SigningAlgorithm;
use crate::claims::IssuerId;
use crate::issuer::AssertionIssuer;
use crate::policy::IssuancePolicy;

pub use issuer::IssuerConfig;
pub use key::KeyConfig;
pub use utils::{output_config_schema, CONFIG_SCHEMA};

/// Environment variable holding the issuer id
pub const ENV_APPLICATION_ID: &str = "APPLICATION_ID";
/// Environment variable naming a directory of mounted secrets
pub const ENV_SECRET_PATH: &str = "SECRET_PATH";
/// Environment variable naming the private key file
pub const ENV_PRIVATE_KEY_PATH: &str = "PRIVATE_KEY_PATH";

/// Lowercase names used by OpenFaaS style deployments, read when the
/// uppercase variable is unset or empty
pub const ENV_APPLICATION_ID_LOWER: &str = "application_id";
pub const ENV_SECRET_PATH_LOWER: &str = "secret_path";

/// Root configuration structure
///
/// Every section falls back to its defaults when absent, so an empty file is
/// valid; the issuer id and key source can then come from the environment or
/// the command line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub issuer: IssuerConfig,

    #[serde(default)]
    pub policy: IssuancePolicy,

    #[serde(default)]
    pub key: KeyConfig,
}

impl Config {
    /// Load configuration from a file
    ///
    /// Reads the whole file, then parses and validates it with
    /// [`Config::from_yaml_str`]. Unlike an unset `--config`, a missing file
    /// is an error.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` if the file was read and passed validation
    /// * `Err(anyhow::Error)` naming the file if it cannot be read or is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Parse, schema-validate and check a YAML document
    ///
    /// The document is converted to JSON and validated against
    /// [`CONFIG_SCHEMA`] before it is deserialized, then checked with
    /// [`utils::validate_specific_rules`]. An empty document yields the
    /// defaults.
    ///
    /// # Arguments
    ///
    /// * `contents` - YAML text
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` if the document is valid
    /// * `Err(anyhow::Error)` describing the first parse, schema or rule failure
    ///
    /// # Example
    ///
    /// ```
    /// use app_jwt_issuer::config::Config;
    ///
    /// let config = Config::from_yaml_str("issuer:\n  app_id: 4385\n  ttl: 540\n").unwrap();
    /// assert_eq!(config.issuer.ttl, 540);
    /// assert!(Config::from_yaml_str("issuer:\n  ttl: 601\n").is_err());
    /// ```
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        // An empty document deserializes to null
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;

        let json_value =
            serde_json::to_value(&yaml_value).context("Failed to convert YAML to JSON for validation")?;

        let validator = utils::schema_validator()?;
        debug!("Validating configuration against schema");
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config =
            serde_yml::from_str(contents).context("Failed to deserialize configuration")?;

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            return Err(err);
        }

        Ok(config)
    }

    /// Load the file when given, otherwise start from the defaults
    ///
    /// # Arguments
    ///
    /// * `path` - Optional configuration file, usually from `--config`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                debug!("No configuration file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Save the configuration to a file
    ///
    /// The file is written as YAML and can be loaded back with
    /// [`Config::from_file`]. Used by `--write-sample-config`.
    ///
    /// # Arguments
    ///
    /// * `path` - Destination file, created or truncated
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the file was written
    /// * `Err(anyhow::Error)` if serialization or the write fails
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply the process environment
    ///
    /// See [`Config::apply_env_with`] for the variables read.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Apply environment overrides read through `lookup`
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the value of an environment variable, `None` when unset
    ///
    /// # Variables
    ///
    /// * `APPLICATION_ID` (or `application_id`) - issuer id
    /// * `SECRET_PATH` (or `secret_path`) - secrets directory holding `key.secret_file`
    /// * `PRIVATE_KEY_PATH` - private key file, wins over `SECRET_PATH` when both are set
    ///
    /// Empty values are ignored. The uppercase name wins when both spellings
    /// are set.
    ///
    /// # Returns
    ///
    /// * `Ok(())` once the overrides are applied
    /// * `Err(anyhow::Error)` if the issuer id variable does not parse
    ///
    /// # Example
    ///
    /// ```
    /// use app_jwt_issuer::config::Config;
    /// use app_jwt_issuer::claims::IssuerId;
    ///
    /// let mut config = Config::default();
    /// config
    ///     .apply_env_with(|name| match name {
    ///         "application_id" => Some("4385".to_string()),
    ///         "secret_path" => Some("/var/openfaas/secrets".to_string()),
    ///         _ => None,
    ///     })
    ///     .unwrap();
    /// assert_eq!(config.issuer.issuer_id().unwrap(), IssuerId::Numeric(4385));
    /// ```
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some((name, app_id)) =
            first_non_empty(&lookup, &[ENV_APPLICATION_ID, ENV_APPLICATION_ID_LOWER])
        {
            debug!("Overriding issuer id from {}", name);
            let id = app_id
                .parse::<IssuerId>()
                .with_context(|| format!("Invalid {}", name))?;
            self.issuer.app_id = Some(id);
        }

        if let Some((name, dir)) =
            first_non_empty(&lookup, &[ENV_SECRET_PATH, ENV_SECRET_PATH_LOWER])
        {
            debug!("Overriding key source from {}: {}", name, dir);
            self.key.set_secret_path(PathBuf::from(dir));
        }

        if let Some((name, path)) = first_non_empty(&lookup, &[ENV_PRIVATE_KEY_PATH]) {
            debug!("Overriding key source from {}: {}", name, path);
            self.key.set_path(PathBuf::from(path));
        }

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values that are provided override the existing configuration.
    /// Nothing is validated here; call [`Config::validate`] afterwards.
    ///
    /// # Parameters
    ///
    /// * `app_id` - Issuer id placed in the `iss` claim
    /// * `ttl` - Assertion lifetime in seconds
    /// * `key_path` - Private key file, replacing any other key source
    /// * `algorithm` - Signing algorithm
    ///
    /// # Example
    ///
    /// ```
    /// use app_jwt_issuer::config::Config;
    /// use app_jwt_issuer::SigningAlgorithm;
    ///
    /// let mut config = Config::default();
    /// config.apply_args(
    ///     Some("4385".parse().unwrap()),     // Issuer id
    ///     Some(300),                         // TTL
    ///     Some("app.private-key.pem".into()), // Key file
    ///     Some(SigningAlgorithm::PS256),     // Algorithm
    /// );
    /// assert_eq!(config.issuer.ttl, 300);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn apply_args(
        &mut self,
        app_id: Option<IssuerId>,
        ttl: Option<u64>,
        key_path: Option<PathBuf>,
        algorithm: Option<SigningAlgorithm>,
    ) {
        if let Some(app_id) = app_id {
            debug!("Overriding issuer id from command line: {}", app_id);
            self.issuer.app_id = Some(app_id);
        }
        if let Some(ttl) = ttl {
            debug!("Overriding ttl from command line: {}", ttl);
            self.issuer.ttl = ttl;
        }
        if let Some(path) = key_path {
            debug!("Overriding key path from command line: {:?}", path);
            self.key.set_path(path);
        }
        if let Some(algorithm) = algorithm {
            debug!("Overriding algorithm from command line: {}", algorithm);
            self.issuer.algorithm = algorithm;
        }
    }

    /// Re-run the specific rules after overrides were applied
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the layered configuration is consistent
    /// * `Err(anyhow::Error)` otherwise; lifetime problems downcast to
    ///   [`crate::AssertionError::PolicyViolation`]
    pub fn validate(&self) -> Result<()> {
        utils::validate_specific_rules(self)
    }

    /// Issuer configured with this algorithm and policy
    pub fn assertion_issuer(&self) -> AssertionIssuer {
        AssertionIssuer::new(self.issuer.algorithm).with_policy(self.policy)
    }
}

/// First variable among `names` with a non-blank value
fn first_non_empty<F>(lookup: &F, names: &[&'static str]) -> Option<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    names.iter().find_map(|name| {
        lookup(name)
            .filter(|value| !value.trim().is_empty())
            .map(|value| (*name, value))
    })
}
