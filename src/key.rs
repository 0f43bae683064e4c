// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Private key loading
//!
//! This module is the only place that touches key material on disk or in
//! configuration. A [`KeySource`] is read in one call, parsed into a
//! [`SigningKey`] and the raw bytes are dropped before returning. Key bytes
//! are never logged; only the source description is.
//!
//! Supported encodings:
//! - RSA: PKCS#1 (`RSA PRIVATE KEY`, the format GitHub hands out) or PKCS#8
//! - EC P-256/P-384 and Ed25519: PKCS#8 (`PRIVATE KEY`)

use std::fmt;
use std::fs;
use std::path::PathBuf;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use jsonwebtoken::EncodingKey;
use log::debug;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::pkcs8::DecodePrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::algorithm::{KeyFamily, SigningAlgorithm};
use crate::error::AssertionError;

/// Default key file name inside a secrets directory
pub const DEFAULT_SECRET_FILE: &str = "private-key";

/// Where the private key comes from
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    /// PEM file on disk
    File(PathBuf),
    /// Mounted secrets directory (`/run/secrets`, `/var/openfaas/secrets`) and file name
    SecretsDir { dir: PathBuf, file_name: String },
    /// Base64 encoded PEM, as stored in the configuration file
    Base64(String),
    /// PEM bytes already in memory
    Pem(Vec<u8>),
}

impl KeySource {
    /// Description safe to log or show in errors
    pub fn describe(&self) -> String {
        match self {
            KeySource::File(path) => format!("file {}", path.display()),
            KeySource::SecretsDir { dir, file_name } => {
                format!("secret {}", dir.join(file_name).display())
            }
            KeySource::Base64(_) => "base64 configuration value".to_string(),
            KeySource::Pem(_) => "in-memory PEM".to_string(),
        }
    }

    /// Read the raw PEM bytes; the file handle is closed before returning
    fn read_pem(&self) -> Result<Vec<u8>, AssertionError> {
        match self {
            KeySource::File(path) => {
                fs::read(path).map_err(|e| AssertionError::key_load(self.describe(), e))
            }
            KeySource::SecretsDir { dir, file_name } => fs::read(dir.join(file_name))
                .map_err(|e| AssertionError::key_load(self.describe(), e)),
            KeySource::Base64(encoded) => {
                // `base64` wraps its output at 76 columns
                let compact: String = encoded
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                BASE64_STANDARD.decode(compact).map_err(|e| {
                    AssertionError::key_load(self.describe(), format!("invalid base64: {}", e))
                })
            }
            KeySource::Pem(bytes) => Ok(bytes.clone()),
        }
    }

    /// Read and parse the key
    pub fn load(&self) -> Result<SigningKey, AssertionError> {
        let description = self.describe();
        debug!("Loading signing key from {}", description);
        let pem = self.read_pem()?;
        let key = SigningKey::parse(&description, &pem)?;
        debug!("Loaded {} signing key from {}", key.family(), description);
        Ok(key)
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Parsed private key ready for signing
pub struct SigningKey {
    family: KeyFamily,
    encoding_key: EncodingKey,
    rsa_public_key: Option<RsaPublicKey>,
}

impl SigningKey {
    /// Parse a PEM encoded private key
    pub fn from_pem(pem: &[u8]) -> Result<Self, AssertionError> {
        Self::parse("in-memory PEM", pem)
    }

    fn parse(source_name: &str, pem: &[u8]) -> Result<Self, AssertionError> {
        let fail = |reason: &dyn fmt::Display| AssertionError::key_load(source_name, reason);

        let text = std::str::from_utf8(pem)
            .map_err(|_| fail(&"key material is not PEM text"))?
            .trim();
        if text.is_empty() {
            return Err(fail(&"key material is empty"));
        }

        let label = pem_label(text).ok_or_else(|| fail(&"no PEM block found"))?;
        if label.contains("PUBLIC KEY") || label == "CERTIFICATE" {
            return Err(fail(&format!(
                "expected a private key, found {}",
                label
            )));
        }

        match label {
            "RSA PRIVATE KEY" => {
                let key = RsaPrivateKey::from_pkcs1_pem(text).map_err(|e| fail(&e))?;
                Self::rsa(source_name, text, key)
            }
            "PRIVATE KEY" => {
                if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(text) {
                    return Self::rsa(source_name, text, key);
                }
                if let Ok(encoding_key) = EncodingKey::from_ec_pem(text.as_bytes()) {
                    return Ok(SigningKey {
                        family: KeyFamily::Ec,
                        encoding_key,
                        rsa_public_key: None,
                    });
                }
                if let Ok(encoding_key) = EncodingKey::from_ed_pem(text.as_bytes()) {
                    return Ok(SigningKey {
                        family: KeyFamily::Ed,
                        encoding_key,
                        rsa_public_key: None,
                    });
                }
                Err(fail(&"unsupported or corrupt PKCS#8 private key"))
            }
            other => Err(fail(&format!("unsupported PEM block {}", other))),
        }
    }

    fn rsa(source_name: &str, text: &str, key: RsaPrivateKey) -> Result<Self, AssertionError> {
        let encoding_key = EncodingKey::from_rsa_pem(text.as_bytes())
            .map_err(|e| AssertionError::key_load(source_name, e))?;
        Ok(SigningKey {
            family: KeyFamily::Rsa,
            encoding_key,
            rsa_public_key: Some(RsaPublicKey::from(&key)),
        })
    }

    pub fn family(&self) -> KeyFamily {
        self.family
    }

    /// Whether this key can sign with `algorithm`
    pub fn supports(&self, algorithm: SigningAlgorithm) -> bool {
        self.family == algorithm.family()
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// PKCS#1 PEM of the public counterpart, for RSA keys
    pub fn public_key_pem(&self) -> Option<Result<String, AssertionError>> {
        self.rsa_public_key.as_ref().map(|public_key| {
            public_key
                .to_pkcs1_pem(LineEnding::LF)
                .map_err(|e| AssertionError::signing(format!("public key encoding: {}", e)))
        })
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

/// Label of the first `-----BEGIN <label>-----` line
fn pem_label(text: &str) -> Option<&str> {
    let start = text.find("-----BEGIN ")? + "-----BEGIN ".len();
    let rest = &text[start..];
    let end = rest.find("-----")?;
    Some(rest[..end].trim())
}
