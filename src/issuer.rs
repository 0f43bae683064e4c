// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Assertion issuer
//!
//! [`AssertionIssuer`] turns `(key, issuer id, ttl)` into a compact signed
//! JWT. It holds no key and no mutable state; the key is passed in by the
//! caller on every call, and the clock is read once per assertion so that
//! `iat` and `exp` derive from the same instant.
//!
//! ```no_run
//! use app_jwt_issuer::algorithm::SigningAlgorithm;
//! use app_jwt_issuer::claims::IssuerId;
//! use app_jwt_issuer::issuer::AssertionIssuer;
//! use app_jwt_issuer::key::KeySource;
//!
//! let key = KeySource::File("app.private-key.pem".into()).load().unwrap();
//! let issuer = AssertionIssuer::new(SigningAlgorithm::RS256);
//! let jwt = issuer.issue(&key, &IssuerId::Numeric(4385), 600).unwrap();
//! println!("{}", jwt);
//! ```

use jsonwebtoken::Header;
use log::debug;

use crate::algorithm::SigningAlgorithm;
use crate::claims::{AssertionClaims, IssuerId, SignedAssertion};
use crate::clock::{Clock, SystemClock};
use crate::error::AssertionError;
use crate::key::SigningKey;
use crate::policy::IssuancePolicy;

/// Stateless issuer of short-lived signed assertions
#[derive(Debug, Clone)]
pub struct AssertionIssuer<C: Clock = SystemClock> {
    algorithm: SigningAlgorithm,
    policy: IssuancePolicy,
    clock: C,
}

impl AssertionIssuer<SystemClock> {
    /// Create an issuer using the wall clock and the default policy
    pub fn new(algorithm: SigningAlgorithm) -> Self {
        AssertionIssuer {
            algorithm,
            policy: IssuancePolicy::default(),
            clock: SystemClock,
        }
    }
}

impl Default for AssertionIssuer<SystemClock> {
    fn default() -> Self {
        Self::new(SigningAlgorithm::default())
    }
}

impl<C: Clock> AssertionIssuer<C> {
    /// Replace the issuance policy
    pub fn with_policy(mut self, policy: IssuancePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the time source
    pub fn with_clock<D: Clock>(self, clock: D) -> AssertionIssuer<D> {
        AssertionIssuer {
            algorithm: self.algorithm,
            policy: self.policy,
            clock,
        }
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    pub fn policy(&self) -> &IssuancePolicy {
        &self.policy
    }

    /// Build the claim set for a request, reading the clock once
    pub fn build_claims(
        &self,
        issuer_id: &IssuerId,
        ttl_seconds: u64,
    ) -> Result<AssertionClaims, AssertionError> {
        self.policy.check_request(issuer_id, ttl_seconds)?;

        let now = self.clock.now();
        let iat = now
            .checked_sub(self.policy.clock_skew as i64)
            .ok_or_else(|| AssertionError::policy("issued-at timestamp out of range"))?;
        let exp = iat
            .checked_add(ttl_seconds as i64)
            .ok_or_else(|| AssertionError::policy("expiry timestamp out of range"))?;

        Ok(AssertionClaims {
            iat,
            exp,
            iss: issuer_id.clone(),
        })
    }

    /// Issue an assertion for `issuer_id` valid for `ttl_seconds`
    ///
    /// # Errors
    ///
    /// * `PolicyViolation` if the issuer id is empty or the TTL is outside `(0, max_ttl]`
    /// * `Signing` if the key cannot sign with the configured algorithm
    pub fn issue(
        &self,
        key: &SigningKey,
        issuer_id: &IssuerId,
        ttl_seconds: u64,
    ) -> Result<SignedAssertion, AssertionError> {
        self.policy.check_request(issuer_id, ttl_seconds)?;
        self.check_key(key)?;
        let claims = self.build_claims(issuer_id, ttl_seconds)?;
        self.sign(key, &claims)
    }

    /// Sign an explicit claim set, still subject to the policy
    pub fn issue_claims(
        &self,
        key: &SigningKey,
        claims: &AssertionClaims,
    ) -> Result<SignedAssertion, AssertionError> {
        self.policy.check_claims(claims)?;
        self.check_key(key)?;
        self.sign(key, claims)
    }

    fn check_key(&self, key: &SigningKey) -> Result<(), AssertionError> {
        if !key.supports(self.algorithm) {
            return Err(AssertionError::signing(format!(
                "{} key cannot sign with {}",
                key.family(),
                self.algorithm
            )));
        }
        Ok(())
    }

    fn sign(
        &self,
        key: &SigningKey,
        claims: &AssertionClaims,
    ) -> Result<SignedAssertion, AssertionError> {
        debug!(
            "Signing {} assertion for issuer {} (iat={}, exp={})",
            self.algorithm, claims.iss, claims.iat, claims.exp
        );
        let header = Header::new(self.algorithm.to_jsonwebtoken_algorithm());
        let token = jsonwebtoken::encode(&header, claims, key.encoding_key())
            .map_err(AssertionError::signing)?;
        Ok(SignedAssertion::new(token))
    }
}
