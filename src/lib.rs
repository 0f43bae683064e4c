// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! App JWT issuer library
//!
//! This library issues short-lived signed assertions (JWTs) identifying an
//! application, such as the token a GitHub App presents to obtain an
//! installation access token.
//!
//! The issuer never reads files or the environment: [`key::KeySource`] and
//! [`config::Config`] resolve those and hand a parsed [`key::SigningKey`] to
//! [`issuer::AssertionIssuer`].

pub mod algorithm;
pub mod claims;
pub mod clock;
pub mod config;
pub mod error;
pub mod issuer;
pub mod key;
pub mod policy;
pub mod verify;

pub use algorithm::SigningAlgorithm;
pub use claims::{AssertionClaims, IssuerId, SignedAssertion};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::AssertionError;
pub use issuer::AssertionIssuer;
pub use key::{KeySource, SigningKey};
pub use policy::IssuancePolicy;
pub use verify::Verifier;
