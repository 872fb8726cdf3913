/// Trend token state, persisted across polling cycles

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a trending token stays tradable after its first sighting.
pub const TREND_WINDOW_MINUTES: i64 = 30;

/// A token admitted from the alert feed, tracked through its buy/sell window.
///
/// `bought_in` and `sold_out` are tri-state: `None` means the path has not
/// been entered yet, `Some(false)` means it was entered and is pending or
/// failed, `Some(true)` means it resolved. `None` is persisted as an absent
/// field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendToken {
    pub id: u64,
    pub token_name: String,
    pub liquidity: f64,
    pub token_address: String,
    pub initial_price: f64,
    pub m1_price: f64,
    pub create_time: DateTime<Utc>,
    pub close_deadline: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bought_in: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_out: Option<bool>,
}

impl TrendToken {
    /// Price movement between the initial sighting and the one-minute mark.
    pub fn price_change_percent(&self) -> f64 {
        (self.m1_price - self.initial_price) / self.initial_price * 100.0
    }

    /// Time left until the trend window closes. Negative once the window is past.
    pub fn entry_margin(&self, now: DateTime<Utc>) -> Duration {
        self.close_deadline - now
    }

    pub fn needs_buy_decision(&self) -> bool {
        self.bought_in.is_none()
    }

    pub fn awaiting_sell_schedule(&self) -> bool {
        self.bought_in == Some(true) && self.sold_out.is_none()
    }

    /// Bought but not yet resolved: the sell is either pending or was lost
    /// to a restart and must be re-armed.
    pub fn has_unresolved_sell(&self) -> bool {
        self.bought_in == Some(true) && self.sold_out != Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_token() -> TrendToken {
        let create_time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        TrendToken {
            id: 7,
            token_name: "WIF2".to_string(),
            liquidity: 125_000.0,
            token_address: "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM".to_string(),
            initial_price: 0.002,
            m1_price: 0.003,
            create_time,
            close_deadline: create_time + Duration::minutes(TREND_WINDOW_MINUTES),
            bought_in: None,
            sold_out: None,
        }
    }

    #[test]
    fn price_change_is_relative_to_initial() {
        let token = sample_token();
        assert!((token.price_change_percent() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn entry_margin_goes_negative_past_deadline() {
        let token = sample_token();
        let late = token.close_deadline + Duration::minutes(1);
        assert!(token.entry_margin(late) < Duration::zero());
    }

    #[test]
    fn unset_flags_are_omitted_from_json() {
        let token = sample_token();
        let json = serde_json::to_string(&token).unwrap();
        assert!(!json.contains("boughtIn"));
        assert!(!json.contains("soldOut"));

        let restored: TrendToken = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, token);
    }

    #[test]
    fn set_flags_round_trip() {
        let mut token = sample_token();
        token.bought_in = Some(true);
        token.sold_out = Some(false);

        let json = serde_json::to_string(&token).unwrap();
        assert!(json.contains("\"boughtIn\":true"));
        assert!(json.contains("\"soldOut\":false"));

        let restored: TrendToken = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.bought_in, Some(true));
        assert_eq!(restored.sold_out, Some(false));
        assert!(restored.has_unresolved_sell());
    }

    #[test]
    fn lifecycle_guards() {
        let mut token = sample_token();
        assert!(token.needs_buy_decision());
        assert!(!token.awaiting_sell_schedule());

        token.bought_in = Some(false);
        assert!(!token.needs_buy_decision());
        assert!(!token.awaiting_sell_schedule());

        token.bought_in = Some(true);
        assert!(token.awaiting_sell_schedule());

        token.sold_out = Some(true);
        assert!(!token.awaiting_sell_schedule());
        assert!(!token.has_unresolved_sell());
    }
}
