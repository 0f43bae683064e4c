// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Static issuance policy

use serde::{Deserialize, Serialize};

use crate::claims::{AssertionClaims, IssuerId};
use crate::error::AssertionError;

/// Longest lifetime GitHub accepts for an App JWT
pub const DEFAULT_MAX_TTL_SECONDS: u64 = 600;

/// Bounds applied to every assertion before it is signed
///
/// Requests outside the bounds are rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuancePolicy {
    /// Maximum `exp - iat` in seconds
    #[serde(default = "default_max_ttl")]
    pub max_ttl: u64,

    /// Seconds subtracted from `iat` to tolerate a consumer clock running behind
    #[serde(default)]
    pub clock_skew: u64,
}

fn default_max_ttl() -> u64 {
    DEFAULT_MAX_TTL_SECONDS
}

impl Default for IssuancePolicy {
    fn default() -> Self {
        Self {
            max_ttl: DEFAULT_MAX_TTL_SECONDS,
            clock_skew: 0,
        }
    }
}

impl IssuancePolicy {
    /// Check that the policy itself is usable
    pub fn validate(&self) -> Result<(), AssertionError> {
        if self.max_ttl == 0 {
            return Err(AssertionError::policy("max_ttl must be positive"));
        }
        if self.max_ttl > i64::MAX as u64 || self.clock_skew > i64::MAX as u64 {
            return Err(AssertionError::policy("policy values out of range"));
        }
        Ok(())
    }

    /// Check a requested issuer id and TTL
    pub fn check_request(&self, issuer_id: &IssuerId, ttl_seconds: u64) -> Result<(), AssertionError> {
        self.check_bounds(issuer_id, ttl_seconds)?;
        if self.clock_skew >= ttl_seconds {
            return Err(AssertionError::policy(format!(
                "clock skew of {} seconds would leave an assertion of {} seconds already expired",
                self.clock_skew, ttl_seconds
            )));
        }
        Ok(())
    }

    fn check_bounds(&self, issuer_id: &IssuerId, ttl_seconds: u64) -> Result<(), AssertionError> {
        self.validate()?;
        if issuer_id.is_empty() {
            return Err(AssertionError::policy("issuer id must not be empty"));
        }
        if ttl_seconds == 0 {
            return Err(AssertionError::policy("ttl must be positive"));
        }
        if ttl_seconds > self.max_ttl {
            return Err(AssertionError::policy(format!(
                "ttl of {} seconds exceeds the maximum of {} seconds",
                ttl_seconds, self.max_ttl
            )));
        }
        Ok(())
    }

    /// Check a fully formed claim set
    pub fn check_claims(&self, claims: &AssertionClaims) -> Result<(), AssertionError> {
        if claims.exp <= claims.iat {
            return Err(AssertionError::policy(format!(
                "exp ({}) must be after iat ({})",
                claims.exp, claims.iat
            )));
        }
        let ttl = claims
            .ttl()
            .and_then(|ttl| u64::try_from(ttl).ok())
            .ok_or_else(|| {
                AssertionError::policy(format!(
                    "lifetime between iat ({}) and exp ({}) is out of range",
                    claims.iat, claims.exp
                ))
            })?;
        self.check_bounds(&claims.iss, ttl)
    }
}
