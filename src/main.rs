// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the app-jwt-issuer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # App JWT issuer
//!
//! Prints a signed JWT identifying an application (for example a GitHub App),
//! valid for at most ten minutes.
//!
//! ## Usage
//!
//! ```text
//! app_jwt_issuer --app-id 4385 --key app.private-key.pem
//! APPLICATION_ID=4385 SECRET_PATH=/run/secrets app_jwt_issuer
//! app_jwt_issuer --config issuer.yaml --details
//! app_jwt_issuer --inspect "$TOKEN"
//! app_jwt_issuer --config issuer.yaml --verify "$TOKEN"
//! ```
//!
//! Only the assertion is written to standard output; logs and details go to
//! standard error. The exit code is 0 on success, 1 for configuration errors,
//! 2 when the key cannot be loaded, 3 for policy violations, 4 for signing
//! failures and 5 when an assertion does not inspect or verify.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

use app_jwt_issuer::claims::{self, IssuerId};
use app_jwt_issuer::config::{self, Config};
use app_jwt_issuer::{AssertionError, SigningAlgorithm, SignedAssertion, Verifier};

/// Issue short-lived signed assertions (JWT) for GitHub Apps
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Issuer id placed in the iss claim (overrides config and APPLICATION_ID)
    #[arg(long, value_name = "ID")]
    app_id: Option<String>,

    /// Assertion lifetime in seconds, at most the policy maximum (600 by default)
    #[arg(long, value_name = "SECONDS")]
    ttl: Option<u64>,

    /// PEM private key file (overrides config, SECRET_PATH and PRIVATE_KEY_PATH)
    #[arg(short, long, value_name = "FILE")]
    key: Option<PathBuf>,

    /// JWT signing algorithm
    #[arg(
        short,
        long,
        value_name = "ALGORITHM",
        value_parser = ["RS256", "RS384", "RS512", "PS256", "PS384", "PS512", "ES256", "ES384", "EdDSA"]
    )]
    algorithm: Option<String>,

    /// Print issuer, algorithm and validity window to standard error
    #[arg(long)]
    details: bool,

    /// Decode a token without verifying it ("-" reads standard input)
    #[arg(long, value_name = "TOKEN", conflicts_with = "verify")]
    inspect: Option<String>,

    /// Verify a token against the public key ("-" reads standard input)
    #[arg(long, value_name = "TOKEN")]
    verify: Option<String>,

    /// Public key used by --verify; derived from the private key when omitted
    #[arg(long, value_name = "FILE", requires = "verify")]
    public_key: Option<PathBuf>,

    /// Print the public key of the configured RSA private key
    #[arg(long)]
    print_public_key: bool,

    /// Output the configuration JSON schema
    #[arg(long)]
    show_config_schema: bool,

    /// Write a sample configuration file and exit
    #[arg(long, value_name = "FILE")]
    write_sample_config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        process::exit(exit_code(&e));
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<AssertionError>()
        .map(AssertionError::exit_code)
        .unwrap_or(1)
}

fn run(args: &Args) -> Result<()> {
    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(path) = &args.write_sample_config {
        return write_sample_config(path);
    }

    if let Some(token) = &args.inspect {
        return inspect(&read_token(token, io::stdin().lock())?);
    }

    let config = resolve_config(args, |name| std::env::var(name).ok())?;

    if let Some(token) = &args.verify {
        let token = read_token(token, io::stdin().lock())?;
        return verify(&config, &token, args.public_key.as_deref());
    }

    if args.print_public_key {
        return print_public_key(&config);
    }

    issue(&config, args.details, &mut io::stdout().lock())
}

/// Layer file, environment and command line, then re-check the result
fn resolve_config<F>(args: &Args, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = Config::load(args.config.as_deref())?;
    config.apply_env_with(env)?;

    let app_id = args
        .app_id
        .as_deref()
        .map(IssuerId::from_str)
        .transpose()
        .context("Invalid --app-id")?;
    let algorithm = args
        .algorithm
        .as_deref()
        .map(SigningAlgorithm::from_str)
        .transpose()?;
    config.apply_args(app_id, args.ttl, args.key.clone(), algorithm);
    config.validate()?;

    debug!("Resolved configuration: {:?}", config);
    Ok(config)
}

/// Issue one assertion and write it, alone on its line, to `out`
fn issue<W: Write>(config: &Config, details: bool, out: &mut W) -> Result<()> {
    let issuer_id = config.issuer.issuer_id()?;
    let key = config.key.source()?.load()?;

    let assertion = config
        .assertion_issuer()
        .issue(&key, &issuer_id, config.issuer.ttl)?;

    writeln!(out, "{}", assertion).context("Failed to write assertion")?;

    if details {
        print_details(&assertion)?;
    }
    Ok(())
}

fn print_details(assertion: &SignedAssertion) -> Result<()> {
    let (header, claims) = assertion.inspect()?;
    let expires = chrono::DateTime::from_timestamp(claims.exp, 0)
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| claims.exp.to_string());

    eprintln!("Issuer: {}", claims.iss);
    eprintln!("Algorithm: {:?}", header.alg);
    eprintln!("Issued at: {}", claims.iat);
    eprintln!("Expires at: {} ({})", claims.exp, expires);
    if let Some(ttl) = claims.ttl() {
        eprintln!("Valid for: {} seconds", ttl);
    }
    Ok(())
}

fn inspect(token: &str) -> Result<()> {
    let (header, claims) = claims::inspect(token)?;
    let output = serde_json::json!({
        "header": header,
        "claims": claims,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn verify(config: &Config, token: &str, public_key: Option<&Path>) -> Result<()> {
    let algorithm = config.issuer.algorithm;
    let mut verifier = match public_key {
        Some(path) => {
            let pem = fs::read(path)
                .with_context(|| format!("Failed to read public key at {:?}", path))?;
            Verifier::from_public_pem(&pem, algorithm)?
        }
        None => {
            let key = config.key.source()?.load()?;
            Verifier::for_signing_key(&key, algorithm)?
        }
    };
    if config.issuer.app_id.is_some() {
        verifier = verifier.with_issuer(config.issuer.issuer_id()?);
    }

    let claims = verifier.verify(token)?;
    println!("{}", serde_json::to_string_pretty(&claims)?);
    Ok(())
}

fn print_public_key(config: &Config) -> Result<()> {
    let key = config.key.source()?.load()?;
    let pem = key.public_key_pem().ok_or_else(|| {
        anyhow::anyhow!("Public key derivation is only supported for RSA keys")
    })??;
    print!("{}", pem);
    Ok(())
}

fn write_sample_config(path: &Path) -> Result<()> {
    let mut sample = Config::default();
    sample.key.path = Some(PathBuf::from("app.private-key.pem"));
    sample.save_to_file(path)?;
    eprintln!("Sample configuration written to {}", path.display());
    Ok(())
}

/// The token argument, or `input` when it is `-`
fn read_token<R: Read>(token: &str, mut input: R) -> Result<String> {
    if token != "-" {
        return Ok(token.trim().to_string());
    }
    let mut buffer = String::new();
    input
        .read_to_string(&mut buffer)
        .context("Failed to read token from standard input")?;
    Ok(buffer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::OnceLock;

    use app_jwt_issuer::claims::inspect as inspect_token;
    use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
    use tempfile::TempDir;

    fn parse_args(args: &[&str]) -> Args {
        let mut argv = vec!["app_jwt_issuer"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn test_key_pem() -> &'static str {
        static PEM: OnceLock<String> = OnceLock::new();
        PEM.get_or_init(|| {
            let mut rng = rsa::rand_core::OsRng;
            let key = rsa::RsaPrivateKey::new(&mut rng, 2048)
                .expect("Failed to generate RSA private key");
            key.to_pkcs1_pem(LineEnding::LF).unwrap().to_string()
        })
    }

    /// Creates a configuration file and a key file in a temporary directory
    fn create_test_config(yaml: &str) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("issuer.yaml");
        std::fs::write(&config_path, yaml).unwrap();
        std::fs::write(temp_dir.path().join("private-key"), test_key_pem()).unwrap();
        (temp_dir, config_path)
    }

    #[test]
    fn test_error_exit_codes() {
        let key_load: anyhow::Error = AssertionError::KeyLoad {
            source_name: "file app.pem".to_string(),
            reason: "No such file or directory".to_string(),
        }
        .into();
        assert_eq!(exit_code(&key_load.context("Failed to issue")), 2);

        let policy = Err::<(), _>(AssertionError::PolicyViolation {
            reason: "ttl too long".to_string(),
        })
        .context("Invalid issuance lifetime")
        .unwrap_err();
        assert_eq!(exit_code(&policy.context("Invalid configuration")), 3);

        let signing: anyhow::Error = AssertionError::Signing {
            reason: "Ec key cannot sign with RS256".to_string(),
        }
        .into();
        assert_eq!(exit_code(&signing.context("Failed to issue")), 4);

        let verification: anyhow::Error = AssertionError::Verification {
            reason: "InvalidSignature".to_string(),
        }
        .into();
        assert_eq!(exit_code(&verification), 5);

        let config_error = anyhow::anyhow!("Failed to parse YAML configuration");
        assert_eq!(exit_code(&config_error.context("Invalid configuration")), 1);
    }

    #[test]
    fn test_read_token() {
        let empty: &[u8] = b"";
        assert_eq!(read_token(" a.b.c ", empty).unwrap(), "a.b.c");
        assert_eq!(read_token("-", &b"x.y.z\n"[..]).unwrap(), "x.y.z");
    }

    #[test]
    fn test_resolve_config_precedence() {
        let (temp_dir, config_path) =
            create_test_config("issuer:\n  app_id: 1\n  ttl: 300\n");
        let config_arg = config_path.to_str().unwrap();
        let secrets = temp_dir.path().to_str().unwrap();

        // File only
        let config = resolve_config(&parse_args(&["--config", config_arg]), no_env).unwrap();
        assert_eq!(config.issuer.issuer_id().unwrap(), IssuerId::Numeric(1));
        assert_eq!(config.issuer.ttl, 300);

        // Environment over file
        let vars = env(&[("application_id", "2"), ("secret_path", secrets)]);
        let config = resolve_config(&parse_args(&["--config", config_arg]), vars).unwrap();
        assert_eq!(config.issuer.issuer_id().unwrap(), IssuerId::Numeric(2));
        assert_eq!(config.key.secret_path.as_deref(), Some(temp_dir.path()));

        // Command line over environment
        let vars = env(&[("APPLICATION_ID", "2")]);
        let args = parse_args(&[
            "--config", config_arg, "--app-id", "3", "--ttl", "120", "--key", "/etc/app.pem",
            "-a", "PS256",
        ]);
        let config = resolve_config(&args, vars).unwrap();
        assert_eq!(config.issuer.issuer_id().unwrap(), IssuerId::Numeric(3));
        assert_eq!(config.issuer.ttl, 120);
        assert_eq!(config.issuer.algorithm, SigningAlgorithm::PS256);
        assert_eq!(config.key.path, Some(PathBuf::from("/etc/app.pem")));
    }

    #[test]
    fn test_ttl_override_above_max_is_a_policy_violation() {
        let (_temp_dir, config_path) = create_test_config("issuer:\n  app_id: 4385\n");
        let args = parse_args(&["--config", config_path.to_str().unwrap(), "--ttl", "601"]);

        let error = resolve_config(&args, no_env).unwrap_err();
        assert_eq!(exit_code(&error), 3);

        // Same class as the value coming from the file
        let (_temp_dir, config_path) = create_test_config("issuer:\n  ttl: 601\n");
        let args = parse_args(&["--config", config_path.to_str().unwrap()]);
        let error = resolve_config(&args, no_env).unwrap_err();
        assert_eq!(exit_code(&error), 3);
    }

    #[test]
    fn test_issue_writes_only_the_assertion() {
        let (temp_dir, _config_path) = create_test_config("");
        let vars = env(&[
            ("APPLICATION_ID", "4385"),
            ("SECRET_PATH", temp_dir.path().to_str().unwrap()),
        ]);
        let config = resolve_config(&parse_args(&["--ttl", "540"]), vars).unwrap();

        let mut out = Vec::new();
        issue(&config, true, &mut out).unwrap();

        let output = String::from_utf8(out).unwrap();
        assert!(output.ends_with('\n'));
        assert_eq!(output.lines().count(), 1);

        let (_, claims) = inspect_token(output.trim_end()).unwrap();
        assert_eq!(claims.iss, IssuerId::Numeric(4385));
        assert_eq!(claims.ttl(), Some(540));
    }

    #[test]
    fn test_issue_without_key_writes_nothing() {
        let config = resolve_config(&parse_args(&["--app-id", "4385"]), no_env).unwrap();
        let mut out = Vec::new();
        let error = issue(&config, false, &mut out).unwrap_err();
        assert_eq!(exit_code(&error), 1);
        assert!(out.is_empty());

        let args = parse_args(&["--app-id", "4385", "--key", "/nonexistent/app.pem"]);
        let config = resolve_config(&args, no_env).unwrap();
        let error = issue(&config, false, &mut out).unwrap_err();
        assert_eq!(exit_code(&error), 2);
        assert!(out.is_empty());
    }
}
