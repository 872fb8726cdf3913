/// Polling loop over the trend-alert feed

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::alerts::client::{AlertFeedClient, AlertItem};
use crate::core::types::TrendToken;
use crate::registry::TokenRegistry;
use crate::trader::TrendTrader;

pub struct AlertPoller {
    client: AlertFeedClient,
    registry: Arc<TokenRegistry>,
    trader: TrendTrader,
    poll_interval: Duration,
}

impl AlertPoller {
    pub fn new(
        client: AlertFeedClient,
        registry: Arc<TokenRegistry>,
        trader: TrendTrader,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            registry,
            trader,
            poll_interval,
        }
    }

    /// Runs poll cycles forever. Each cycle fully completes (including any
    /// buy attempt) before the next one is scheduled; armed sell timers run
    /// independently in the background.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.poll_cycle().await;
        }
    }

    pub async fn poll_cycle(&self) {
        let items = match self.client.fetch_trending().await {
            Ok(items) => items,
            Err(error) => {
                warn!(%error, "alert feed fetch failed, treating cycle as empty");
                Vec::new()
            }
        };

        admit_first_unseen(&self.registry, items);
        self.trader.process_cycle().await;

        if let Err(error) = self.registry.save() {
            error!(%error, "failed to persist token registry");
        }
    }
}

/// Admits at most one token per cycle: the feed is newest-first, so the list
/// is walked in reverse and the first address the registry has never seen is
/// recorded. Remaining entries wait for later cycles.
pub(crate) fn admit_first_unseen(
    registry: &TokenRegistry,
    items: Vec<AlertItem>,
) -> Option<String> {
    for item in items.into_iter().rev() {
        if registry.contains(&item.token_address) {
            continue;
        }

        let token = TrendToken::from(item);
        info!(
            id = token.id,
            name = %token.token_name,
            liquidity = token.liquidity,
            address = %token.token_address,
            change = format!("{:.2}%", token.price_change_percent()),
            created = %token.create_time,
            "new trending token"
        );
        let address = token.token_address.clone();
        registry.insert(token);
        return Some(address);
    }
    None
}
