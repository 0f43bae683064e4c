// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Key section of the configuration
//!
//! Exactly one of `path`, `pem_base64` or `secret_path` selects where the
//! private key is read from. The key itself is only read by
//! [`crate::key::KeySource::load`].

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::key::{KeySource, DEFAULT_SECRET_FILE};

fn default_secret_file() -> String {
    DEFAULT_SECRET_FILE.to_string()
}

/// Where the signing key is read from
///
/// # Secrets directories
///
/// With `secret_path`, the key is `<secret_path>/<secret_file>`. The file
/// name defaults to `private-key`; deployments that mount the key under
/// another name, such as `derek-private-key`, set `secret_file` accordingly.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// PEM file on disk
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Base64 encoded PEM (`cat app.private-key.pem | base64`)
    #[serde(default)]
    pub pem_base64: Option<String>,

    /// Directory of mounted secrets, such as `/run/secrets` or `/var/openfaas/secrets`
    #[serde(default)]
    pub secret_path: Option<PathBuf>,

    /// File name of the key inside `secret_path`
    #[serde(default = "default_secret_file")]
    pub secret_file: String,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            path: None,
            pem_base64: None,
            secret_path: None,
            secret_file: default_secret_file(),
        }
    }
}

impl std::fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyConfig")
            .field("path", &self.path)
            .field("pem_base64", &self.pem_base64.as_ref().map(|_| "<redacted>"))
            .field("secret_path", &self.secret_path)
            .field("secret_file", &self.secret_file)
            .finish()
    }
}

impl KeyConfig {
    /// Number of key sources configured
    pub fn configured_sources(&self) -> usize {
        [
            self.path.is_some(),
            self.pem_base64.is_some(),
            self.secret_path.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Point at a key file, replacing any other source
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
        self.pem_base64 = None;
        self.secret_path = None;
    }

    /// Point at a secrets directory, replacing any other source
    pub fn set_secret_path(&mut self, dir: PathBuf) {
        self.secret_path = Some(dir);
        self.path = None;
        self.pem_base64 = None;
    }

    /// Resolve the configured source
    ///
    /// # Returns
    ///
    /// * `Ok(KeySource)` for the single configured source
    /// * `Err(anyhow::Error)` if no source or more than one source is configured
    pub fn source(&self) -> Result<KeySource> {
        match self.configured_sources() {
            0 => anyhow::bail!(
                "No private key configured: set key.path, key.pem_base64, key.secret_path, \
                 PRIVATE_KEY_PATH, SECRET_PATH or --key"
            ),
            1 => {}
            n => anyhow::bail!(
                "{} private key sources configured, only one of key.path, key.pem_base64 and key.secret_path may be set",
                n
            ),
        }

        if let Some(path) = &self.path {
            return Ok(KeySource::File(path.clone()));
        }
        if let Some(encoded) = &self.pem_base64 {
            return Ok(KeySource::Base64(encoded.clone()));
        }
        match &self.secret_path {
            Some(dir) => Ok(KeySource::SecretsDir {
                dir: dir.clone(),
                file_name: self.secret_file.clone(),
            }),
            None => anyhow::bail!("No private key configured"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_source_is_an_error() {
        assert!(KeyConfig::default().source().is_err());
    }

    #[test]
    fn test_secret_path_uses_secret_file() {
        let mut key = KeyConfig::default();
        key.set_secret_path(PathBuf::from("/run/secrets"));
        assert_eq!(
            key.source().unwrap(),
            KeySource::SecretsDir {
                dir: PathBuf::from("/run/secrets"),
                file_name: "private-key".to_string(),
            }
        );
    }

    #[test]
    fn test_setters_replace_other_sources() {
        let mut key = KeyConfig {
            pem_base64: Some("AAAA".to_string()),
            ..KeyConfig::default()
        };
        key.set_path(PathBuf::from("/etc/app/key.pem"));
        assert_eq!(key.configured_sources(), 1);
        assert_eq!(
            key.source().unwrap(),
            KeySource::File(PathBuf::from("/etc/app/key.pem"))
        );
    }

    #[test]
    fn test_multiple_sources_rejected() {
        let key = KeyConfig {
            path: Some(PathBuf::from("/a.pem")),
            pem_base64: Some("AAAA".to_string()),
            ..KeyConfig::default()
        };
        assert!(key.source().is_err());
    }

    #[test]
    fn test_debug_redacts_base64_key() {
        let key = KeyConfig {
            pem_base64: Some("c2VjcmV0".to_string()),
            ..KeyConfig::default()
        };
        let debug = format!("{:?}", key);
        assert!(!debug.contains("c2VjcmV0"));
        assert!(debug.contains("<redacted>"));
    }
}
