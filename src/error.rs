// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error taxonomy for assertion issuance
//!
//! Every failure is fatal to the current invocation: no variant is retried
//! and no partial assertion is ever returned alongside an error.

use thiserror::Error;

/// Errors raised while loading keys, issuing or checking assertions
#[derive(Error, Debug)]
pub enum AssertionError {
    /// Key material is absent, unreadable or cannot be parsed
    #[error("Failed to load signing key from {source_name}: {reason}")]
    KeyLoad { source_name: String, reason: String },

    /// The request violates a static issuance policy (TTL bounds, empty issuer)
    #[error("Issuance policy violation: {reason}")]
    PolicyViolation { reason: String },

    /// The cryptographic operation failed, including algorithm/key mismatches
    #[error("Signing failed: {reason}")]
    Signing { reason: String },

    /// The token is not a well-formed compact assertion
    #[error("Malformed assertion: {reason}")]
    MalformedAssertion { reason: String },

    /// The signature or registered claims did not verify
    #[error("Assertion verification failed: {reason}")]
    Verification { reason: String },
}

impl AssertionError {
    pub(crate) fn key_load(source_name: impl Into<String>, reason: impl ToString) -> Self {
        AssertionError::KeyLoad {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn policy(reason: impl Into<String>) -> Self {
        AssertionError::PolicyViolation {
            reason: reason.into(),
        }
    }

    pub(crate) fn signing(reason: impl ToString) -> Self {
        AssertionError::Signing {
            reason: reason.to_string(),
        }
    }

    /// Process exit code for this error; 1 is reserved for configuration failures
    pub fn exit_code(&self) -> i32 {
        match self {
            AssertionError::KeyLoad { .. } => 2,
            AssertionError::PolicyViolation { .. } => 3,
            AssertionError::Signing { .. } => 4,
            AssertionError::MalformedAssertion { .. } => 5,
            AssertionError::Verification { .. } => 5,
        }
    }
}
