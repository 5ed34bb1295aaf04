// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

//! Operator CLI: key generation, statement signing for test rigs, and
//! offline replay of recorded capture bundles through the engine.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;

use trueframe_attest::{
    sign_statement, AttestationStatement, AttestationVerifier, InMemoryCounterStore,
    ReplayCounterStore, TrustedAttestationKeys,
};
use trueframe_core::attestation::KeyProtectionLevel;
use trueframe_core::signal::{DetectorResult, MethodId};
use trueframe_engine::{
    AttestationInput, CaptureInput, ConfidenceEngine, Detector, EngineConfig, Telemetry,
};

#[derive(Debug, Parser)]
#[command(name = "trueframectl")]
struct Cli {
    /// Log filter, e.g. `info` or `trueframe_engine=debug`.
    #[arg(long, default_value = "info")]
    log: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate a fresh ed25519 signing key and print its public half.
    GenKey {
        #[arg(long)]
        out: PathBuf,
    },
    /// Sign an unsigned statement JSON for a test device.
    SignStatement {
        #[arg(long)]
        r#in: PathBuf,
        #[arg(long)]
        key: PathBuf,
        /// Verifier challenge, hex encoded.
        #[arg(long)]
        challenge: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Replay a recorded capture bundle through the engine and print the
    /// wire-format result.
    Evaluate {
        #[arg(long)]
        bundle: PathBuf,
        #[arg(long)]
        trusted_keys: PathBuf,
        /// Pre-seed the replay counter store, e.g. to reproduce a replay
        /// rejection.
        #[arg(long)]
        stored_counter: Option<u64>,
    },
}

/// Fields a device would assemble before signing.
#[derive(Debug, Deserialize)]
struct UnsignedStatement {
    platform: String,
    key_id: String,
    key_protection: KeyProtectionLevel,
    counter: u64,
}

/// A recorded capture: per-method detector results plus optional
/// attestation material, as captured by a test rig.
#[derive(Debug, Deserialize)]
struct CaptureBundle {
    capture_id: String,
    #[serde(default)]
    captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    payload_b64: Option<String>,
    #[serde(default)]
    challenge_hex: Option<String>,
    #[serde(default)]
    attestation_b64: Option<String>,
    #[serde(default)]
    results: Vec<DetectorResult>,
}

/// Replays one recorded result as if the detector had produced it live.
struct ReplayDetector {
    result: DetectorResult,
}

#[async_trait]
impl Detector for ReplayDetector {
    fn method(&self) -> MethodId {
        self.result.method
    }

    async fn analyze(&self, _input: &CaptureInput) -> DetectorResult {
        self.result.clone()
    }
}

fn read_signing_key(path: &PathBuf) -> Result<SigningKey> {
    let key_hex = std::fs::read_to_string(path)
        .with_context(|| format!("reading signing key {}", path.display()))?;
    let raw = hex::decode(key_hex.trim()).context("signing key must be hex")?;
    let bytes: [u8; 32] = raw
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("signing key must be 32-byte hex"))?;
    Ok(SigningKey::from_bytes(&bytes))
}

fn key_id_for(verifying_key_bytes: &[u8; 32]) -> String {
    hex::encode(&Sha256::digest(verifying_key_bytes)[..8])
}

fn gen_key(out: PathBuf) -> Result<()> {
    let signing = SigningKey::generate(&mut OsRng);
    let verifying = signing.verifying_key().to_bytes();
    std::fs::write(&out, hex::encode(signing.to_bytes()))
        .with_context(|| format!("writing {}", out.display()))?;
    println!("verifying_key: {}", hex::encode(verifying));
    println!("key_id: {}", key_id_for(&verifying));
    Ok(())
}

fn sign_statement_cmd(input: PathBuf, key: PathBuf, challenge: String, out: PathBuf) -> Result<()> {
    let bytes = std::fs::read(&input)
        .with_context(|| format!("reading statement {}", input.display()))?;
    let unsigned: UnsignedStatement =
        serde_json::from_slice(&bytes).context("statement JSON")?;
    let challenge = hex::decode(challenge.trim()).context("challenge must be hex")?;
    let signing = read_signing_key(&key)?;

    let statement = sign_statement(
        &signing,
        unsigned.platform,
        unsigned.key_id,
        unsigned.key_protection,
        unsigned.counter,
        &challenge,
    );
    std::fs::write(&out, serde_json::to_vec_pretty(&statement)?)
        .with_context(|| format!("writing {}", out.display()))?;
    println!("{}", statement.encode_b64()?);
    Ok(())
}

async fn evaluate(
    bundle_path: PathBuf,
    trusted_keys: PathBuf,
    stored_counter: Option<u64>,
) -> Result<()> {
    let bytes = std::fs::read(&bundle_path)
        .with_context(|| format!("reading bundle {}", bundle_path.display()))?;
    let bundle: CaptureBundle = serde_json::from_slice(&bytes).context("bundle JSON")?;

    let trusted = TrustedAttestationKeys::load(&trusted_keys)
        .with_context(|| format!("loading trusted keys {}", trusted_keys.display()))?;
    let counters = InMemoryCounterStore::default();
    if let (Some(counter), Some(blob)) = (stored_counter, bundle.attestation_b64.as_deref()) {
        let statement = AttestationStatement::decode_b64(blob)
            .ok_or_else(|| anyhow!("bundle attestation_b64 does not decode"))?;
        counters.advance(&statement.key_id, counter);
    }
    let verifier = AttestationVerifier::new(trusted, counters);

    let detectors: Vec<Arc<dyn Detector>> = bundle
        .results
        .iter()
        .map(|result| {
            Arc::new(ReplayDetector {
                result: result.clone(),
            }) as Arc<dyn Detector>
        })
        .collect();

    let attestation = match (&bundle.attestation_b64, &bundle.challenge_hex) {
        (Some(blob), Some(challenge_hex)) => Some(AttestationInput {
            statement_b64: blob.clone(),
            challenge: hex::decode(challenge_hex.trim()).context("challenge_hex must be hex")?,
        }),
        (Some(_), None) => return Err(anyhow!("bundle has attestation_b64 but no challenge_hex")),
        _ => None,
    };

    let payload = match &bundle.payload_b64 {
        Some(b64) => {
            use base64::Engine as _;
            base64::engine::general_purpose::STANDARD
                .decode(b64)
                .context("payload_b64 must be base64")?
        }
        None => Vec::new(),
    };
    let capture = CaptureInput {
        capture_id: bundle.capture_id,
        payload,
        captured_at: bundle.captured_at.unwrap_or_else(Utc::now),
    };

    let config = EngineConfig::from_env();
    let telemetry = Telemetry::new();
    if let Some(addr) = config.metrics_addr {
        Arc::new(telemetry.clone())
            .spawn_metrics_server(addr)
            .await
            .context("starting metrics listener")?;
    }
    let engine = ConfidenceEngine::new(config, detectors, verifier, telemetry);
    let result = engine.evaluate(capture, attestation).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    eprintln!("summary_digest: {}", result.summary_digest_hex()?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cli.log.clone()))
        .init();

    match cli.command {
        Commands::GenKey { out } => gen_key(out),
        Commands::SignStatement {
            r#in,
            key,
            challenge,
            out,
        } => sign_statement_cmd(r#in, key, challenge, out),
        Commands::Evaluate {
            bundle,
            trusted_keys,
            stored_counter,
        } => evaluate(bundle, trusted_keys, stored_counter).await,
    }
}
