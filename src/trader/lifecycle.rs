/// Per-token buy/sell state machine
///
/// Discovered -> BoughtIn -> SellScheduled -> SoldOut, with the too-late and
/// buy-failed branches recorded as `bought_in = Some(false)`. A token enters
/// the buy path at most once and the sell path at most once; the tri-state
/// flags in the registry are the guards.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use crate::core::error::SwapError;
use crate::core::types::TrendToken;
use crate::notify::Notifier;
use crate::registry::TokenRegistry;
use crate::swap::SwapExecutor;

#[derive(Debug, Clone)]
pub struct TradePolicy {
    /// Lamports spent on each entry.
    pub buy_amount_lamports: u64,
    /// Attempt bound shared by the buy and sell paths.
    pub max_swap_attempts: u32,
    /// Entries with less window left than this are skipped outright.
    pub min_entry_margin: Duration,
}

impl Default for TradePolicy {
    fn default() -> Self {
        Self {
            buy_amount_lamports: 50_000_000,
            max_swap_attempts: 5,
            min_entry_margin: Duration::minutes(25),
        }
    }
}

#[derive(Clone)]
pub struct TrendTrader {
    pub(crate) registry: Arc<TokenRegistry>,
    pub(crate) executor: Arc<SwapExecutor>,
    pub(crate) notifier: Notifier,
    pub(crate) policy: TradePolicy,
}

impl TrendTrader {
    pub fn new(
        registry: Arc<TokenRegistry>,
        executor: Arc<SwapExecutor>,
        notifier: Notifier,
        policy: TradePolicy,
    ) -> Self {
        Self {
            registry,
            executor,
            notifier,
            policy,
        }
    }

    pub fn wallet(&self) -> solana_sdk::pubkey::Pubkey {
        self.executor.wallet()
    }

    /// Walks the registry once: decides entries for tokens that have never
    /// been evaluated, then arms sells for fresh buys.
    pub async fn process_cycle(&self) {
        for token in self.registry.snapshot() {
            if token.needs_buy_decision() {
                self.evaluate_entry(&token).await;
            }
        }

        for token in self.registry.snapshot() {
            if token.awaiting_sell_schedule() {
                self.schedule_sell(&token).await;
            }
        }
    }

    async fn evaluate_entry(&self, token: &TrendToken) {
        if too_late_to_buy(token, Utc::now(), self.policy.min_entry_margin) {
            let message = format!("Time too late to buy in `{}`", token.token_name);
            warn!(address = %token.token_address, "{message}");
            self.notifier.send(&message).await;
            self.registry
                .update(&token.token_address, |t| t.bought_in = Some(false));
            return;
        }

        if self.buy_in(token).await {
            let message = format!("Bought in `{}`", token.token_name);
            info!(address = %token.token_address, "{message}");
            self.notifier.send(&message).await;
            self.registry
                .update(&token.token_address, |t| t.bought_in = Some(true));
        } else {
            let message = format!("Failed to buy in `{}`", token.token_name);
            error!(address = %token.token_address, "{message}");
            self.notifier.send(&message).await;
            self.registry
                .update(&token.token_address, |t| t.bought_in = Some(false));
        }
    }

    async fn buy_in(&self, token: &TrendToken) -> bool {
        let message = format!(
            "Swap `SOL` to `{}`[{}]",
            token.token_name, token.token_address
        );
        info!("{message}");
        self.notifier.send(&message).await;

        let native_mint = spl_token::native_mint::id().to_string();
        self.swap_with_retries(
            &native_mint,
            &token.token_address,
            self.policy.buy_amount_lamports,
            "buy",
        )
        .await
    }

    /// Swaps the wallet's entire balance of the token back to SOL.
    pub(crate) async fn sell_out(&self, token_name: &str, token_address: &str) -> bool {
        let message = format!("Swap `{token_name}`[{token_address}] to `SOL`");
        info!("{message}");
        self.notifier.send(&message).await;

        let native_mint = spl_token::native_mint::id().to_string();
        self.swap_with_retries(token_address, &native_mint, u64::MAX, "sell")
            .await
    }

    async fn swap_with_retries(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        side: &'static str,
    ) -> bool {
        let executor = Arc::clone(&self.executor);
        let input = input_mint.to_string();
        let output = output_mint.to_string();
        run_with_retries(self.policy.max_swap_attempts, side, move || {
            let executor = Arc::clone(&executor);
            let input = input.clone();
            let output = output.clone();
            async move { executor.swap(&input, &output, amount).await }
        })
        .await
    }
}

/// A token is skipped when less than the minimum margin remains before its
/// window closes; a deadline already in the past counts as zero margin.
pub(crate) fn too_late_to_buy(
    token: &TrendToken,
    now: DateTime<Utc>,
    min_margin: Duration,
) -> bool {
    token.entry_margin(now) < min_margin
}

/// Retries `attempt_swap` up to `max_attempts` times with no backoff,
/// stopping early on the first non-retryable error.
pub(crate) async fn run_with_retries<F, Fut>(
    max_attempts: u32,
    side: &str,
    mut attempt_swap: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), SwapError>>,
{
    for attempt in 1..=max_attempts {
        match attempt_swap().await {
            Ok(()) => return true,
            Err(error) if !error.is_retryable() => {
                error!(%error, attempt, side, "swap failed with a terminal error, giving up");
                return false;
            }
            Err(error) => {
                warn!(%error, attempt, side, "swap attempt failed");
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU32, Ordering};
    use crate::core::types::TREND_WINDOW_MINUTES;

    fn token_created_at(create_time: DateTime<Utc>) -> TrendToken {
        TrendToken {
            id: 1,
            token_name: "WIF2".to_string(),
            liquidity: 1000.0,
            token_address: "addr".to_string(),
            initial_price: 1.0,
            m1_price: 1.0,
            create_time,
            close_deadline: create_time + Duration::minutes(TREND_WINDOW_MINUTES),
            bought_in: None,
            sold_out: None,
        }
    }

    #[test]
    fn fresh_token_is_inside_the_margin() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let token = token_created_at(created);

        // Seen 4 minutes in: 26 minutes of window left.
        let now = created + Duration::minutes(4);
        assert!(!too_late_to_buy(&token, now, Duration::minutes(25)));
    }

    #[test]
    fn stale_token_is_skipped() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let token = token_created_at(created);

        // Seen 6 minutes in: only 24 minutes left.
        let now = created + Duration::minutes(6);
        assert!(too_late_to_buy(&token, now, Duration::minutes(25)));
    }

    #[test]
    fn exact_margin_is_still_tradable() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let token = token_created_at(created);

        let now = created + Duration::minutes(5);
        assert!(!too_late_to_buy(&token, now, Duration::minutes(25)));
    }

    #[test]
    fn past_deadline_is_always_too_late() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let token = token_created_at(created);

        let now = token.close_deadline + Duration::minutes(10);
        assert!(too_late_to_buy(&token, now, Duration::minutes(25)));
    }

    #[tokio::test]
    async fn terminal_error_stops_retries_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let success = run_with_retries(5, "sell", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SwapError::InputAccountNotFound {
                    mint: "mint".to_string(),
                })
            }
        })
        .await;

        assert!(!success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_errors_retry_up_to_the_bound() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let success = run_with_retries(5, "sell", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SwapError::TransactionFailed {
                    reason: "blockhash expired".to_string(),
                })
            }
        })
        .await;

        assert!(!success);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn success_ends_the_retry_loop() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let success = run_with_retries(5, "buy", move || {
            let counter = Arc::clone(&counter);
            async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err(SwapError::PriorityFeeFetch {
                        reason: "503".to_string(),
                    })
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(success);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
