/// Deferred sell execution
///
/// Sells are armed as independent timed tasks that fire at the token's
/// window close. The pending state (`sold_out = Some(false)`) is persisted
/// when the task is armed, so a restarted process can re-derive and re-arm
/// every sell that was still in flight.

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::core::types::TrendToken;
use crate::trader::lifecycle::TrendTrader;

impl TrendTrader {
    /// Arms a timed task that sells the token back to SOL at window close.
    /// The completion flag is set whether or not the swap succeeded; it marks
    /// the sell as resolved, not as profitable.
    pub async fn schedule_sell(&self, token: &TrendToken) {
        self.registry
            .update(&token.token_address, |t| t.sold_out = Some(false));

        let trader = self.clone();
        let token_name = token.token_name.clone();
        let token_address = token.token_address.clone();
        let deadline = token.close_deadline;

        tokio::spawn(async move {
            tokio::time::sleep(sell_delay(deadline, Utc::now())).await;

            let success = trader.sell_out(&token_name, &token_address).await;
            let message = if success {
                format!("Sold out `{token_name}`")
            } else {
                format!("Failed to sell out `{token_name}`")
            };
            if success {
                info!(address = %token_address, "{message}");
            } else {
                error!(address = %token_address, "{message}");
            }
            trader.notifier.send(&message).await;
            trader
                .registry
                .update(&token_address, |t| t.sold_out = Some(true));
        });

        let message = format!(
            "Scheduled sell out `{}` at {}",
            token.token_name, token.close_deadline
        );
        info!(address = %token.token_address, "{message}");
        self.notifier.send(&message).await;
    }

    /// Re-arms sells lost to a restart: every token that was bought but never
    /// resolved gets a fresh timer, firing immediately when its deadline has
    /// already passed. Returns how many sells were re-armed.
    pub async fn rearm_pending_sells(&self) -> usize {
        let pending = pending_sells(&self.registry.snapshot());
        for token in &pending {
            info!(
                name = %token.token_name,
                address = %token.token_address,
                deadline = %token.close_deadline,
                "re-arming sell from persisted state"
            );
            self.schedule_sell(token).await;
        }
        pending.len()
    }
}

/// Tokens whose sell is still owed: bought in, not yet resolved.
pub(crate) fn pending_sells(tokens: &[TrendToken]) -> Vec<TrendToken> {
    tokens
        .iter()
        .filter(|token| token.has_unresolved_sell())
        .cloned()
        .collect()
}

/// Delay until the deadline, zero when it is already past.
pub(crate) fn sell_delay(deadline: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    (deadline - now).to_std().unwrap_or(std::time::Duration::ZERO)
}
