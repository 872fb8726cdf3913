/// Environment-driven settings

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use tracing::warn;

use crate::trader::TradePolicy;

const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
const DEFAULT_CACHE_FILE: &str = ".cache/trend_tokens.json";
const DEFAULT_BUY_AMOUNT_LAMPORTS: u64 = 50_000_000; // 0.05 SOL
const DEFAULT_MAX_SWAP_ATTEMPTS: u32 = 5;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const MIN_ENTRY_MARGIN_MINUTES: i64 = 25;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Trend-alert feed endpoint; required by `run`, unused elsewhere.
    pub api_url: Option<String>,
    /// Bearer token for the alert feed.
    pub api_token: Option<String>,
    /// Slack webhook for status notifications; notifications are dropped
    /// when unset.
    pub slack_webhook: Option<String>,
    pub rpc_url: String,
    /// Path to a JSON byte-array keypair file; `PRIVATE_KEY` (base58) is the
    /// fallback.
    pub keypair_path: Option<String>,
    pub cache_file: PathBuf,
    pub buy_amount_lamports: u64,
    pub max_swap_attempts: u32,
    pub poll_interval: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_url: env::var("API_URL").ok(),
            api_token: env::var("API_TOKEN").ok(),
            slack_webhook: env::var("SLACK_WEBHOOK").ok(),
            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),
            keypair_path: env::var("KEYPAIR_PATH").ok(),
            cache_file: env::var("TREND_CACHE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_FILE)),
            buy_amount_lamports: env_number("BUY_AMOUNT_LAMPORTS", DEFAULT_BUY_AMOUNT_LAMPORTS),
            max_swap_attempts: env_number("MAX_SWAP_ATTEMPTS", DEFAULT_MAX_SWAP_ATTEMPTS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        })
    }

    pub fn rpc_client(&self) -> Arc<RpcClient> {
        Arc::new(RpcClient::new_with_commitment(
            self.rpc_url.clone(),
            CommitmentConfig::confirmed(),
        ))
    }

    pub fn trade_policy(&self) -> TradePolicy {
        TradePolicy {
            buy_amount_lamports: self.buy_amount_lamports,
            max_swap_attempts: self.max_swap_attempts,
            min_entry_margin: chrono::Duration::minutes(MIN_ENTRY_MARGIN_MINUTES),
        }
    }
}

fn env_number<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "could not parse environment override, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_number_falls_back_on_garbage() {
        env::set_var("MAGPIE_TEST_NUM", "not-a-number");
        assert_eq!(env_number("MAGPIE_TEST_NUM", 7u32), 7);
        env::remove_var("MAGPIE_TEST_NUM");
    }

    #[test]
    fn env_number_parses_overrides() {
        env::set_var("MAGPIE_TEST_NUM2", "42");
        assert_eq!(env_number("MAGPIE_TEST_NUM2", 7u32), 42);
        env::remove_var("MAGPIE_TEST_NUM2");
    }
}
