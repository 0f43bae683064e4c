// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Asymmetric JWS algorithms accepted for signing assertions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AssertionError;

/// Family of an asymmetric private key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
    Ec,
    Ed,
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyFamily::Rsa => "RSA",
            KeyFamily::Ec => "EC",
            KeyFamily::Ed => "Ed25519",
        };
        f.write_str(name)
    }
}

/// Supported signing algorithms
///
/// GitHub Apps only accept `RS256`, which is the default. The other variants
/// are available for consumers that verify other asymmetric schemes.
///
/// # Examples
///
/// ```
/// use app_jwt_issuer::algorithm::{KeyFamily, SigningAlgorithm};
/// use std::str::FromStr;
///
/// let algo = SigningAlgorithm::from_str("RS256").unwrap();
/// assert_eq!(algo.as_str(), "RS256");
/// assert_eq!(algo.family(), KeyFamily::Rsa);
/// assert_eq!(algo.to_jsonwebtoken_algorithm(), jsonwebtoken::Algorithm::RS256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    #[default]
    RS256,
    RS384,
    RS512,
    /// RSASSA-PSS using SHA-256
    PS256,
    PS384,
    PS512,
    /// ECDSA using P-256 and SHA-256
    ES256,
    ES384,
    /// Ed25519
    EdDSA,
}

impl SigningAlgorithm {
    pub const ALL: [SigningAlgorithm; 9] = [
        SigningAlgorithm::RS256,
        SigningAlgorithm::RS384,
        SigningAlgorithm::RS512,
        SigningAlgorithm::PS256,
        SigningAlgorithm::PS384,
        SigningAlgorithm::PS512,
        SigningAlgorithm::ES256,
        SigningAlgorithm::ES384,
        SigningAlgorithm::EdDSA,
    ];

    pub fn to_jsonwebtoken_algorithm(&self) -> jsonwebtoken::Algorithm {
        match self {
            SigningAlgorithm::RS256 => jsonwebtoken::Algorithm::RS256,
            SigningAlgorithm::RS384 => jsonwebtoken::Algorithm::RS384,
            SigningAlgorithm::RS512 => jsonwebtoken::Algorithm::RS512,
            SigningAlgorithm::PS256 => jsonwebtoken::Algorithm::PS256,
            SigningAlgorithm::PS384 => jsonwebtoken::Algorithm::PS384,
            SigningAlgorithm::PS512 => jsonwebtoken::Algorithm::PS512,
            SigningAlgorithm::ES256 => jsonwebtoken::Algorithm::ES256,
            SigningAlgorithm::ES384 => jsonwebtoken::Algorithm::ES384,
            SigningAlgorithm::EdDSA => jsonwebtoken::Algorithm::EdDSA,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SigningAlgorithm::RS256 => "RS256",
            SigningAlgorithm::RS384 => "RS384",
            SigningAlgorithm::RS512 => "RS512",
            SigningAlgorithm::PS256 => "PS256",
            SigningAlgorithm::PS384 => "PS384",
            SigningAlgorithm::PS512 => "PS512",
            SigningAlgorithm::ES256 => "ES256",
            SigningAlgorithm::ES384 => "ES384",
            SigningAlgorithm::EdDSA => "EdDSA",
        }
    }

    /// Key family a private key must belong to for this algorithm
    pub fn family(&self) -> KeyFamily {
        match self {
            SigningAlgorithm::RS256
            | SigningAlgorithm::RS384
            | SigningAlgorithm::RS512
            | SigningAlgorithm::PS256
            | SigningAlgorithm::PS384
            | SigningAlgorithm::PS512 => KeyFamily::Rsa,
            SigningAlgorithm::ES256 | SigningAlgorithm::ES384 => KeyFamily::Ec,
            SigningAlgorithm::EdDSA => KeyFamily::Ed,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = AssertionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SigningAlgorithm::ALL
            .iter()
            .copied()
            .find(|algo| algo.as_str() == s)
            .ok_or_else(|| AssertionError::signing(format!("Unsupported algorithm: {}", s)))
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
