use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Signature;
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::UiTransactionEncoding;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use magpie::alerts::{AlertFeedClient, AlertPoller};
use magpie::config::{load_keypair, Settings};
use magpie::notify::Notifier;
use magpie::registry::TokenRegistry;
use magpie::swap::SwapExecutor;
use magpie::trader::TrendTrader;

#[derive(Parser)]
#[command(name = "magpie", version, about = "Trend-alert trading agent for Raydium")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the alert feed and trade trending tokens (default)
    Run,
    /// Manually buy a token (not implemented)
    Buy,
    /// Sell the wallet's entire balance of a mint back to SOL
    Sell { mint: String },
    /// Inspect a past transaction and print its error logs if it failed
    Get { signature: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_agent(settings).await,
        Command::Buy => {
            warn!("manual buy is not implemented");
            Ok(())
        }
        Command::Sell { mint } => sell_all(settings, mint).await,
        Command::Get { signature } => inspect_transaction(settings, signature).await,
    }
}

fn init_tracing() -> Result<()> {
    std::fs::create_dir_all("logs")?;
    let file_appender = tracing_appender::rolling::daily("logs", "magpie.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = tracing_subscriber::fmt::layer().with_target(true).compact();
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .json()
        .with_current_span(false)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Keep the file appender alive for the life of the process.
    std::mem::forget(guard);
    Ok(())
}

async fn run_agent(settings: Settings) -> Result<()> {
    let api_url = settings.api_url.clone().context("API_URL is not set")?;
    let api_token = settings.api_token.clone().context("API_TOKEN is not set")?;

    let keypair = load_keypair(&settings)?;
    let rpc = settings.rpc_client();
    let registry = Arc::new(TokenRegistry::load(&settings.cache_file)?);
    let notifier = Notifier::new(settings.slack_webhook.clone());
    let executor = Arc::new(SwapExecutor::new(rpc, keypair));
    let trader = TrendTrader::new(
        Arc::clone(&registry),
        executor,
        notifier,
        settings.trade_policy(),
    );

    info!(
        wallet = %trader.wallet(),
        tracked_tokens = registry.len(),
        "magpie starting"
    );

    let rearmed = trader.rearm_pending_sells().await;
    if rearmed > 0 {
        info!(rearmed, "re-armed pending sells from persisted state");
    }

    let poller = AlertPoller::new(
        AlertFeedClient::new(api_url, api_token),
        registry,
        trader,
        settings.poll_interval,
    );

    info!(interval = ?settings.poll_interval, "polling alert feed");
    tokio::select! {
        result = poller.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}

async fn sell_all(settings: Settings, mint: String) -> Result<()> {
    let keypair = load_keypair(&settings)?;
    let rpc = settings.rpc_client();
    let executor = SwapExecutor::new(rpc, keypair);
    let native_mint = spl_token::native_mint::id().to_string();

    info!("Swap `{mint}` to `SOL`");
    executor.swap(&mint, &native_mint, u64::MAX).await?;
    info!("sell completed");
    Ok(())
}

async fn inspect_transaction(settings: Settings, signature: String) -> Result<()> {
    let rpc = settings.rpc_client();
    let signature = Signature::from_str(&signature).context("invalid transaction signature")?;

    let config = solana_client::rpc_config::RpcTransactionConfig {
        encoding: Some(UiTransactionEncoding::Json),
        commitment: Some(CommitmentConfig::confirmed()),
        max_supported_transaction_version: Some(0),
    };
    let transaction = rpc
        .get_transaction_with_config(&signature, config)
        .await
        .context("failed to fetch transaction")?;

    match transaction.transaction.meta {
        Some(meta) => {
            if let Some(err) = meta.err {
                error!("transaction failed: {err:?}");
                if let OptionSerializer::Some(logs) = meta.log_messages {
                    let tail = logs.len().saturating_sub(3);
                    for line in &logs[tail..] {
                        error!("{line}");
                    }
                }
            } else {
                info!("transaction confirmed without error");
            }
        }
        None => warn!("transaction has no metadata"),
    }
    Ok(())
}
