/// Raydium trade API client
///
/// Three endpoints drive a swap: the priority-fee estimate, the route quote
/// (`compute/swap-base-in`), and the transaction builder
/// (`transaction/swap-base-in`) which returns unsigned serialized
/// transactions for the quoted route.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::error::SwapError;

const BASE_HOST: &str = "https://api-v3.raydium.io";
const SWAP_HOST: &str = "https://transaction-v1.raydium.io";
const API_TIMEOUT_SECS: u64 = 30;

/// Statistical priority-fee tiers in micro-lamports: very high, high, medium.
#[derive(Debug, Clone, Deserialize)]
pub struct PriorityFeeTiers {
    pub vh: u64,
    pub h: u64,
    pub m: u64,
}

#[derive(Debug, Deserialize)]
struct PriorityFeeResponse {
    pub id: String,
    pub success: bool,
    pub data: Option<PriorityFeeData>,
}

#[derive(Debug, Deserialize)]
struct PriorityFeeData {
    pub default: PriorityFeeTiers,
}

/// Route quote response. Kept intact (including fields this client never
/// reads) because the build endpoint wants the whole quote echoed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapQuote {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SwapQuoteData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuoteData {
    pub swap_type: String,
    pub input_mint: String,
    pub input_amount: String,
    pub output_mint: String,
    pub output_amount: String,
    pub other_amount_threshold: String,
    pub slippage_bps: u16,
    pub price_impact_pct: f64,
    pub route_plan: Vec<RoutePlanStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanStep {
    pub pool_id: String,
    pub input_mint: String,
    pub output_mint: String,
    pub fee_mint: String,
    pub fee_rate: f64,
    pub fee_amount: String,
}

impl SwapQuote {
    /// Quoted output in the output mint's base units, 0 when absent.
    pub fn output_amount(&self) -> u64 {
        self.data
            .as_ref()
            .and_then(|data| data.output_amount.parse().ok())
            .unwrap_or(0)
    }
}

/// Build request: the quote echoed back plus wallet and fee choices. The
/// account fields are omitted for the native-SOL side, which the API wraps
/// and unwraps itself.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTransactionRequest {
    pub compute_unit_price_micro_lamports: String,
    pub swap_response: SwapQuote,
    pub tx_version: String,
    pub wallet: String,
    pub wrap_sol: bool,
    pub unwrap_sol: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_account: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SwapTransactionsResponse {
    pub id: String,
    pub version: String,
    pub success: bool,
    pub data: Vec<SwapTransactionEntry>,
}

#[derive(Debug, Deserialize)]
struct SwapTransactionEntry {
    pub transaction: String,
}

pub struct TradeApiClient {
    client: Client,
    base_host: String,
    swap_host: String,
}

impl TradeApiClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(API_TIMEOUT_SECS))
                .build()
                .expect("failed to create trade API HTTP client"),
            base_host: BASE_HOST.to_string(),
            swap_host: SWAP_HOST.to_string(),
        }
    }

    /// Fetches the current priority-fee tiers.
    pub async fn priority_fee(&self) -> Result<PriorityFeeTiers, SwapError> {
        let url = format!("{}/main/auto-fee", self.base_host);
        let response: PriorityFeeResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.success {
            return Err(SwapError::PriorityFeeFetch {
                reason: format!("fee endpoint reported failure (id {})", response.id),
            });
        }
        response
            .data
            .map(|data| data.default)
            .ok_or(SwapError::PriorityFeeFetch {
                reason: "fee endpoint returned no tiers".to_string(),
            })
    }

    /// Requests a swap-base-in route quote.
    pub async fn compute_swap(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
        tx_version: &str,
    ) -> Result<SwapQuote, SwapError> {
        let url = format!(
            "{}/compute/swap-base-in?inputMint={}&outputMint={}&amount={}&slippageBps={}&txVersion={}",
            self.swap_host, input_mint, output_mint, amount, slippage_bps, tx_version
        );
        let quote: SwapQuote = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !quote.success {
            return Err(SwapError::RouteCompute {
                reason: quote.msg.unwrap_or_else(|| "no message".to_string()),
            });
        }
        Ok(quote)
    }

    /// Asks the API to build unsigned transactions for a quoted route.
    /// Returns the base64-encoded transactions in submission order.
    pub async fn build_swap_transactions(
        &self,
        request: &SwapTransactionRequest,
    ) -> Result<Vec<String>, SwapError> {
        let url = format!("{}/transaction/swap-base-in", self.swap_host);
        let response: SwapTransactionsResponse = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.success {
            return Err(SwapError::RouteCompute {
                reason: format!(
                    "transaction build rejected (id {}, version {})",
                    response.id, response.version
                ),
            });
        }
        Ok(response
            .data
            .into_iter()
            .map(|entry| entry.transaction)
            .collect())
    }
}

impl Default for TradeApiClient {
    fn default() -> Self {
        Self::new()
    }
}
