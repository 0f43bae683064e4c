// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Issuer section of the configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::algorithm::SigningAlgorithm;
use crate::claims::IssuerId;
use crate::policy::DEFAULT_MAX_TTL_SECONDS;

fn default_ttl() -> u64 {
    DEFAULT_MAX_TTL_SECONDS
}

/// What to put in the claim set and how to sign it
///
/// # Example
///
/// ```
/// use app_jwt_issuer::config::IssuerConfig;
/// use app_jwt_issuer::claims::IssuerId;
///
/// let issuer: IssuerConfig = serde_yml::from_str("app_id: 4385\nttl: 540").unwrap();
/// assert_eq!(issuer.issuer_id().unwrap(), IssuerId::Numeric(4385));
/// assert_eq!(issuer.ttl, 540);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Issuer identifier, the GitHub App id for GitHub Apps
    ///
    /// Required before an assertion can be issued; may come from the
    /// `APPLICATION_ID` environment variable or `--app-id` instead.
    #[serde(default)]
    pub app_id: Option<IssuerId>,

    /// Lifetime of issued assertions in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u64,

    #[serde(default)]
    pub algorithm: SigningAlgorithm,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            ttl: default_ttl(),
            algorithm: SigningAlgorithm::default(),
        }
    }
}

impl IssuerConfig {
    /// The configured issuer id, with all-digit strings normalized to numbers
    ///
    /// # Returns
    ///
    /// * `Ok(IssuerId)` if `app_id` is set and not blank
    /// * `Err(anyhow::Error)` naming every place the id can come from otherwise
    pub fn issuer_id(&self) -> Result<IssuerId> {
        match &self.app_id {
            Some(IssuerId::Text(text)) => text
                .parse::<IssuerId>()
                .context("Invalid issuer app_id"),
            Some(id) => Ok(id.clone()),
            None => anyhow::bail!(
                "No issuer id configured: set issuer.app_id, APPLICATION_ID or --app-id"
            ),
        }
    }
}
