//! TKey-LUKS CLI binary.
//!
//! Derives a LUKS key from a challenge with the TKey app, optionally checks
//! it against known secret material, and writes it to the requested sinks.
//! With no sink given, the key is printed to stdout as hex.
//!
//! Log output goes to stderr; the level comes from `TKEY_LOG`
//! (default `info`, `debug` with `--verbose`).

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use thiserror::Error;
use tracing::{info, trace, warn};
use tracing_subscriber::EnvFilter;

use tkey_luks::client::{AppIdentity, ClientConfigBuilder, derive_once};
use tkey_luks::core::{DEFAULT_SPEED, TkeyError};
use tkey_luks::crypto::{CryptoError, DerivedKey, KeyFiles, SecretMaterial, write_raw};
use tkey_luks::transport::{DetectError, detect_port};

#[derive(Parser)]
#[command(name = "tkey-luks")]
#[command(version)]
#[command(about = "Derive a LUKS key from a challenge with a TKey", long_about = None)]
#[command(group(ArgGroup::new("input").required(true).args(["challenge", "challenge_from_stdin"])))]
struct Cli {
    /// Challenge string sent to the device
    #[arg(short, long)]
    challenge: Option<String>,

    /// Read the challenge bytes from stdin (trailing whitespace is trimmed)
    #[arg(long)]
    challenge_from_stdin: bool,

    /// Serial device node of the TKey [default: auto-detect]
    #[arg(short, long)]
    port: Option<PathBuf>,

    /// Line speed in baud
    #[arg(long, default_value_t = DEFAULT_SPEED)]
    speed: u32,

    /// Seconds to wait for the touch confirmation
    #[arg(long, default_value_t = 35)]
    touch_timeout: u64,

    /// Save the key as BASE.bin and BASE.hex
    #[arg(long, value_name = "BASE")]
    save_key: Option<PathBuf>,

    /// Write the raw key to FILE (`-` for stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Check the key against this 64-byte secret (128 hex characters)
    #[arg(long, value_name = "HEX")]
    verify_secret: Option<String>,

    /// Accept any device app instead of requiring the LUKS app
    #[arg(long)]
    no_verify_app: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Tkey(#[from] TkeyError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error("failed to read challenge from stdin: {0}")]
    Stdin(io::Error),

    #[error("failed to write key: {0}")]
    Output(io::Error),

    #[error("empty challenge")]
    EmptyChallenge,

    #[error("derived key does not match the reference derivation")]
    KeyMismatch,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TKEY_LOG").unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if let CliError::Tkey(inner) = &e {
                if inner.is_touch_timeout() {
                    eprintln!("Hint: touch the TKey when it starts flashing");
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let challenge = read_challenge(&cli)?;
    log_challenge(&challenge);

    // Parse before touching the device so a typo does not cost a touch
    let secret = cli
        .verify_secret
        .as_deref()
        .map(SecretMaterial::from_hex)
        .transpose()?;

    let expected_app = if cli.no_verify_app {
        warn!("device app identity is not verified");
        None
    } else {
        Some(AppIdentity::LUKS)
    };

    let port = match &cli.port {
        Some(port) => port.clone(),
        None => detect_port()?,
    };

    let config = ClientConfigBuilder::new()
        .device(port)
        .speed(cli.speed)
        .touch_timeout(Duration::from_secs(cli.touch_timeout))
        .expected_app(expected_app)
        .build()?;

    let key = derive_once(&config, &challenge, || {
        eprintln!("Touch the TKey to continue...");
    })?;

    if let Some(secret) = &secret {
        if !key.matches_reference(secret, &challenge)? {
            return Err(CliError::KeyMismatch);
        }
        info!("key matches the reference derivation");
    }

    write_outputs(&cli, &key)
}

fn read_challenge(cli: &Cli) -> Result<Vec<u8>, CliError> {
    let challenge = if cli.challenge_from_stdin {
        let mut input = Vec::new();
        io::stdin()
            .read_to_end(&mut input)
            .map_err(CliError::Stdin)?;
        trim_trailing_whitespace(input)
    } else {
        cli.challenge.clone().unwrap_or_default().into_bytes()
    };

    if challenge.is_empty() {
        return Err(CliError::EmptyChallenge);
    }
    Ok(challenge)
}

/// The challenge unlocks a volume: only its length is logged above `trace`.
fn log_challenge(challenge: &[u8]) {
    info!(bytes = challenge.len(), "using challenge");
    trace!(challenge = %hex::encode(challenge), "challenge bytes");
}

/// Drop the newline (and any other ASCII whitespace) a shell pipe leaves.
fn trim_trailing_whitespace(mut bytes: Vec<u8>) -> Vec<u8> {
    let len = bytes.trim_ascii_end().len();
    bytes.truncate(len);
    bytes
}

fn write_outputs(cli: &Cli, key: &DerivedKey) -> Result<(), CliError> {
    if let Some(path) = &cli.output {
        write_raw(path, key).map_err(CliError::Output)?;
    }
    if let Some(base) = &cli.save_key {
        KeyFiles::new(base).write(key).map_err(CliError::Output)?;
    }
    if cli.output.is_none() && cli.save_key.is_none() {
        println!("{}", key.to_hex());
    }
    Ok(())
}
