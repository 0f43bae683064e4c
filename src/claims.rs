// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Claim set and compact assertion types

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::Header;
use serde::{Deserialize, Serialize};

use crate::error::AssertionError;

/// Identifier of the entity on whose behalf an assertion is issued
///
/// GitHub App ids are numeric and serialize as JSON numbers; anything else
/// is kept verbatim as a string.
///
/// ```
/// use app_jwt_issuer::claims::IssuerId;
///
/// let id: IssuerId = "4385".parse().unwrap();
/// assert_eq!(id, IssuerId::Numeric(4385));
/// assert_eq!(serde_json::to_string(&id).unwrap(), "4385");
///
/// let id: IssuerId = "Iv1.8a61f9b3a7aba766".parse().unwrap();
/// assert_eq!(serde_json::to_string(&id).unwrap(), "\"Iv1.8a61f9b3a7aba766\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssuerId {
    Numeric(u64),
    Text(String),
}

impl IssuerId {
    pub fn is_empty(&self) -> bool {
        match self {
            IssuerId::Numeric(_) => false,
            IssuerId::Text(text) => text.trim().is_empty(),
        }
    }
}

impl FromStr for IssuerId {
    type Err = AssertionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AssertionError::policy("issuer id must not be empty"));
        }
        Ok(canonical_number(s)
            .map(IssuerId::Numeric)
            .unwrap_or_else(|| IssuerId::Text(s.to_string())))
    }
}

/// All-digit text without leading zeros that fits in a `u64`
///
/// Leading zeros would not survive the numeric round trip.
fn canonical_number(s: &str) -> Option<u64> {
    let s = s.trim();
    let digits = !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if digits && (s.len() == 1 || !s.starts_with('0')) {
        s.parse().ok()
    } else {
        None
    }
}

impl From<u64> for IssuerId {
    fn from(id: u64) -> Self {
        IssuerId::Numeric(id)
    }
}

/// Same normalization as `parse`, except that blank text is kept as is
/// (and later rejected by the policy)
impl From<&str> for IssuerId {
    fn from(id: &str) -> Self {
        canonical_number(id)
            .map(IssuerId::Numeric)
            .unwrap_or_else(|| IssuerId::Text(id.to_string()))
    }
}

impl From<String> for IssuerId {
    fn from(id: String) -> Self {
        match canonical_number(&id) {
            Some(number) => IssuerId::Numeric(number),
            None => IssuerId::Text(id),
        }
    }
}

impl fmt::Display for IssuerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssuerId::Numeric(id) => write!(f, "{}", id),
            IssuerId::Text(id) => f.write_str(id),
        }
    }
}

/// Registered claims carried by an assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration time (Unix seconds)
    pub exp: i64,
    /// Issuer identifier
    pub iss: IssuerId,
}

impl AssertionClaims {
    /// Lifetime of the assertion in seconds
    ///
    /// `None` when the difference does not fit in an `i64`, which only
    /// happens for forged or corrupt timestamps.
    pub fn ttl(&self) -> Option<i64> {
        self.exp.checked_sub(self.iat)
    }
}

/// Compact serialized JWT: `header.payload.signature`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAssertion(String);

impl SignedAssertion {
    pub(crate) fn new(token: String) -> Self {
        SignedAssertion(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Decode the header and claims without checking the signature
    pub fn inspect(&self) -> Result<(Header, AssertionClaims), AssertionError> {
        inspect(&self.0)
    }
}

impl fmt::Display for SignedAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SignedAssertion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn malformed(reason: impl Into<String>) -> AssertionError {
    AssertionError::MalformedAssertion {
        reason: reason.into(),
    }
}

/// Decode the header and claims of a compact token without verifying it
///
/// Only use the result for display or debugging; trust requires
/// [`crate::verify::Verifier`].
pub fn inspect(token: &str) -> Result<(Header, AssertionClaims), AssertionError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(malformed(format!(
            "expected 3 non-empty segments, found {}",
            segments.len()
        )));
    }

    let header = jsonwebtoken::decode_header(token.trim())
        .map_err(|e| malformed(format!("header: {}", e)))?;

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1])
        .map_err(|e| malformed(format!("payload is not base64url: {}", e)))?;
    let claims: AssertionClaims = serde_json::from_slice(&payload)
        .map_err(|e| malformed(format!("payload is not a claim set: {}", e)))?;

    Ok((header, claims))
}
