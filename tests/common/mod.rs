// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};

use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

static INIT: Once = Once::new();

/// Setup function to initialize logger for tests
pub fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

fn generate_rsa_key() -> RsaPrivateKey {
    let mut rng = rsa::rand_core::OsRng;
    RsaPrivateKey::new(&mut rng, 2048).expect("Failed to generate RSA private key")
}

/// RSA key shared by every test in a binary
pub fn rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(generate_rsa_key)
}

/// A second, unrelated RSA key
pub fn other_rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(generate_rsa_key)
}

pub fn private_pem(key: &RsaPrivateKey) -> String {
    key.to_pkcs1_pem(LineEnding::LF)
        .expect("Failed to encode private key")
        .to_string()
}

pub fn public_pem(key: &RsaPrivateKey) -> String {
    RsaPublicKey::from(key)
        .to_pkcs1_pem(LineEnding::LF)
        .expect("Failed to encode public key")
}

/// Write the shared key as `app.private-key.pem` in `dir`
pub fn write_private_key(dir: &Path) -> PathBuf {
    let path = dir.join("app.private-key.pem");
    std::fs::write(&path, private_pem(rsa_key())).expect("Failed to write key file");
    path
}
