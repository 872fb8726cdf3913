/// Wallet keypair loading

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use solana_sdk::signature::Keypair;
use tracing::warn;

use crate::config::Settings;

/// Loads the trading keypair: a JSON byte-array file (Solana CLI format)
/// when `KEYPAIR_PATH` points at one, otherwise a base58 `PRIVATE_KEY`
/// environment variable.
pub fn load_keypair(settings: &Settings) -> Result<Keypair> {
    if let Some(path) = &settings.keypair_path {
        if Path::new(path).exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read keypair file {path}"))?;
            let bytes: Vec<u8> = serde_json::from_str(&raw)
                .with_context(|| format!("keypair file {path} is not a JSON byte array"))?;
            return Keypair::from_bytes(&bytes)
                .map_err(|error| anyhow!("invalid keypair bytes in {path}: {error}"));
        }
        warn!(path = %path, "keypair file not found, falling back to PRIVATE_KEY");
    }

    if let Ok(base58) = env::var("PRIVATE_KEY") {
        let bytes = bs58::decode(base58.trim())
            .into_vec()
            .context("PRIVATE_KEY is not valid base58")?;
        return Keypair::from_bytes(&bytes)
            .map_err(|error| anyhow!("invalid keypair bytes in PRIVATE_KEY: {error}"));
    }

    bail!("no wallet configured: set KEYPAIR_PATH or PRIVATE_KEY");
}
