/// HTTP client for the trend-alert feed

use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer};

use crate::core::types::{TrendToken, TREND_WINDOW_MINUTES};

const FEED_TIMEOUT_SECS: u64 = 15;

/// One entry of the trending-token list, newest-first as the feed returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertItem {
    pub id: u64,
    pub token_name: String,
    pub liquidity: f64,
    pub token_address: String,
    pub initial_price: f64,
    pub m1_price: f64,
    #[serde(deserialize_with = "flexible_time")]
    pub create_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AlertFeedResponse {
    data: AlertFeedData,
}

#[derive(Debug, Deserialize)]
struct AlertFeedData {
    list: Vec<AlertItem>,
}

impl From<AlertItem> for TrendToken {
    fn from(item: AlertItem) -> Self {
        let close_deadline = item.create_time + chrono::Duration::minutes(TREND_WINDOW_MINUTES);
        Self {
            id: item.id,
            token_name: item.token_name,
            liquidity: item.liquidity,
            token_address: item.token_address,
            initial_price: item.initial_price,
            m1_price: item.m1_price,
            create_time: item.create_time,
            close_deadline,
            bought_in: None,
            sold_out: None,
        }
    }
}

/// The feed emits `createTime` either as an RFC-3339 string or as epoch
/// milliseconds depending on the endpoint version; accept both.
fn flexible_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Millis(millis) => Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| serde::de::Error::custom("createTime out of range")),
        Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|parsed| parsed.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S")
                    .map(|naive| Utc.from_utc_datetime(&naive))
            })
            .map_err(serde::de::Error::custom),
    }
}

pub struct AlertFeedClient {
    client: Client,
    api_url: String,
    api_token: String,
}

impl AlertFeedClient {
    pub fn new(api_url: String, api_token: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(FEED_TIMEOUT_SECS))
                .build()
                .expect("failed to create alert feed HTTP client"),
            api_url,
            api_token,
        }
    }

    /// Fetches the current trending list, newest-first.
    pub async fn fetch_trending(&self) -> Result<Vec<AlertItem>> {
        let response = self
            .client
            .get(&self.api_url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("alert feed returned status {}", response.status());
        }

        let feed: AlertFeedResponse = response.json().await?;
        Ok(feed.data.list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feed_with_rfc3339_create_time() {
        let body = r#"{
            "data": {
                "list": [
                    {
                        "id": 42,
                        "tokenName": "BONK2",
                        "liquidity": 51234.5,
                        "tokenAddress": "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZgRv4P2FpF",
                        "initialPrice": 0.00021,
                        "m1Price": 0.00034,
                        "createTime": "2024-05-01T12:00:00Z"
                    }
                ]
            }
        }"#;

        let feed: AlertFeedResponse = serde_json::from_str(body).unwrap();
        let item = &feed.data.list[0];
        assert_eq!(item.id, 42);
        assert_eq!(item.token_name, "BONK2");
        assert_eq!(item.create_time.timestamp(), 1_714_564_800);
    }

    #[test]
    fn parses_feed_with_epoch_millis_create_time() {
        let body = r#"{
            "data": {
                "list": [
                    {
                        "id": 43,
                        "tokenName": "PEPE3",
                        "liquidity": 9000.0,
                        "tokenAddress": "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM",
                        "initialPrice": 0.5,
                        "m1Price": 0.25,
                        "createTime": 1714564800000
                    }
                ]
            }
        }"#;

        let feed: AlertFeedResponse = serde_json::from_str(body).unwrap();
        assert_eq!(feed.data.list[0].create_time.timestamp(), 1_714_564_800);
    }

    #[test]
    fn alert_item_becomes_token_with_deadline_at_window_close() {
        let item = AlertItem {
            id: 1,
            token_name: "WIF2".to_string(),
            liquidity: 1.0,
            token_address: "addr".to_string(),
            initial_price: 1.0,
            m1_price: 2.0,
            create_time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };

        let token = TrendToken::from(item);
        assert_eq!(
            token.close_deadline - token.create_time,
            chrono::Duration::minutes(TREND_WINDOW_MINUTES)
        );
        assert!(token.bought_in.is_none());
        assert!(token.sold_out.is_none());
    }
}
