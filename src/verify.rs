// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Assertion verification against a public key

use jsonwebtoken::{DecodingKey, Validation};
use log::debug;

use crate::algorithm::{KeyFamily, SigningAlgorithm};
use crate::claims::{self, AssertionClaims, IssuerId};
use crate::error::AssertionError;
use crate::key::SigningKey;

fn verification(reason: impl ToString) -> AssertionError {
    AssertionError::Verification {
        reason: reason.to_string(),
    }
}

/// Checks signature, expiry and issuer of assertions
pub struct Verifier {
    algorithm: SigningAlgorithm,
    decoding_key: DecodingKey,
    expected_issuer: Option<IssuerId>,
    validate_expiry: bool,
    leeway: u64,
}

impl Verifier {
    /// Build a verifier from a PEM public key (PKCS#1 or SPKI)
    pub fn from_public_pem(pem: &[u8], algorithm: SigningAlgorithm) -> Result<Self, AssertionError> {
        let decoding_key = match algorithm.family() {
            KeyFamily::Rsa => DecodingKey::from_rsa_pem(pem),
            KeyFamily::Ec => DecodingKey::from_ec_pem(pem),
            KeyFamily::Ed => DecodingKey::from_ed_pem(pem),
        }
        .map_err(|e| verification(format!("invalid {} public key: {}", algorithm, e)))?;

        Ok(Verifier {
            algorithm,
            decoding_key,
            expected_issuer: None,
            validate_expiry: true,
            leeway: 0,
        })
    }

    /// Build a verifier from the public half of an RSA signing key
    pub fn for_signing_key(
        key: &SigningKey,
        algorithm: SigningAlgorithm,
    ) -> Result<Self, AssertionError> {
        let public_pem = key.public_key_pem().ok_or_else(|| {
            verification(format!(
                "cannot derive a public key from a {} key, pass it explicitly",
                key.family()
            ))
        })??;
        Self::from_public_pem(public_pem.as_bytes(), algorithm)
    }

    /// Require the `iss` claim to equal `issuer`
    pub fn with_issuer(mut self, issuer: IssuerId) -> Self {
        self.expected_issuer = Some(issuer);
        self
    }

    /// Skip the `exp` check, for inspecting assertions issued in the past
    pub fn without_expiry_check(mut self) -> Self {
        self.validate_expiry = false;
        self
    }

    /// Tolerance in seconds applied to the `exp` check
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway = seconds;
        self
    }

    /// Verify `token` and return its claims
    pub fn verify(&self, token: &str) -> Result<AssertionClaims, AssertionError> {
        let token = token.trim();
        // Structural problems are reported as such rather than as bad signatures
        claims::inspect(token)?;

        let mut validation = Validation::new(self.algorithm.to_jsonwebtoken_algorithm());
        validation.validate_exp = self.validate_expiry;
        validation.validate_aud = false;
        validation.leeway = self.leeway;

        let data = jsonwebtoken::decode::<AssertionClaims>(token, &self.decoding_key, &validation)
            .map_err(verification)?;
        let claims = data.claims;

        if let Some(expected) = &self.expected_issuer {
            if &claims.iss != expected {
                return Err(verification(format!(
                    "issuer {} does not match expected {}",
                    claims.iss, expected
                )));
            }
        }

        debug!(
            "Verified {} assertion from issuer {} (exp={})",
            self.algorithm, claims.iss, claims.exp
        );
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::issuer::AssertionIssuer;
    use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
    use std::sync::OnceLock;

    fn generate_key() -> SigningKey {
        let mut rng = rsa::rand_core::OsRng;
        let private_key =
            rsa::RsaPrivateKey::new(&mut rng, 2048).expect("Failed to generate RSA private key");
        let pem = private_key.to_pkcs1_pem(LineEnding::LF).unwrap();
        SigningKey::from_pem(pem.as_bytes()).unwrap()
    }

    fn test_keys() -> &'static (SigningKey, SigningKey) {
        static KEYS: OnceLock<(SigningKey, SigningKey)> = OnceLock::new();
        KEYS.get_or_init(|| (generate_key(), generate_key()))
    }

    #[test]
    fn test_verify_round_trip_and_wrong_key() {
        let (key, other_key) = test_keys();
        let token = AssertionIssuer::default()
            .issue(key, &IssuerId::Numeric(4385), 600)
            .unwrap();

        let claims = Verifier::for_signing_key(key, SigningAlgorithm::RS256)
            .unwrap()
            .with_issuer(IssuerId::Numeric(4385))
            .verify(token.as_str())
            .unwrap();
        assert_eq!(claims.ttl(), Some(600));

        let result = Verifier::for_signing_key(other_key, SigningAlgorithm::RS256)
            .unwrap()
            .verify(token.as_str());
        assert!(matches!(result, Err(AssertionError::Verification { .. })));
    }

    #[test]
    fn test_issuer_mismatch() {
        let (key, _) = test_keys();
        let token = AssertionIssuer::default()
            .issue(key, &IssuerId::from("app-a"), 60)
            .unwrap();
        let result = Verifier::for_signing_key(key, SigningAlgorithm::RS256)
            .unwrap()
            .with_issuer(IssuerId::from("app-b"))
            .verify(token.as_str());
        assert!(matches!(result, Err(AssertionError::Verification { .. })));
    }

    #[test]
    fn test_expired_assertion() {
        let (key, _) = test_keys();
        let token = AssertionIssuer::default()
            .with_clock(FixedClock::new(1_000_000_000))
            .issue(key, &IssuerId::Numeric(4385), 600)
            .unwrap();
        let verifier = Verifier::for_signing_key(key, SigningAlgorithm::RS256).unwrap();

        assert!(verifier.verify(token.as_str()).is_err());

        let claims = verifier.without_expiry_check().verify(token.as_str()).unwrap();
        assert_eq!(claims.iat, 1_000_000_000);
    }

    #[test]
    fn test_malformed_token() {
        let (key, _) = test_keys();
        let verifier = Verifier::for_signing_key(key, SigningAlgorithm::RS256).unwrap();
        assert!(matches!(
            verifier.verify("not-a-jwt"),
            Err(AssertionError::MalformedAssertion { .. })
        ));
    }

    #[test]
    fn test_invalid_public_key() {
        let result = Verifier::from_public_pem(b"garbage", SigningAlgorithm::RS256);
        assert!(matches!(result, Err(AssertionError::Verification { .. })));
    }
}
