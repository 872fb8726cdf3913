/// Swap orchestration: resolve accounts, quote, build, sign, submit, confirm

use std::str::FromStr;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::VersionedTransaction,
};
use spl_associated_token_account::get_associated_token_address;
use tracing::{info, instrument};

use crate::core::error::SwapError;
use crate::swap::api::{SwapTransactionRequest, TradeApiClient};

/// Fixed 0.5% slippage tolerance.
pub const SLIPPAGE_BPS: u16 = 50;

/// Quotes below 0.01 SOL of output are rejected as bad routes.
pub const MIN_QUOTED_OUTPUT_LAMPORTS: u64 = 10_000_000;

const TX_VERSION: &str = "V0";

/// Executes swaps between two mints through the trade API, signing and
/// submitting the transactions it returns.
///
/// Callers express "sell everything" by passing `u64::MAX`: the requested
/// amount is clamped to the input account's actual balance before quoting.
pub struct SwapExecutor {
    rpc: Arc<RpcClient>,
    keypair: Keypair,
    api: TradeApiClient,
}

impl SwapExecutor {
    pub fn new(rpc: Arc<RpcClient>, keypair: Keypair) -> Self {
        Self {
            rpc,
            keypair,
            api: TradeApiClient::new(),
        }
    }

    pub fn wallet(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Swaps `amount` base units of `input_mint` into `output_mint`.
    ///
    /// Once a transaction is submitted there is no rollback: a failure in the
    /// middle of a multi-transaction route leaves the earlier legs on chain.
    #[instrument(skip(self), fields(wallet = %self.keypair.pubkey()))]
    pub async fn swap(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
    ) -> Result<(), SwapError> {
        let native_mint = spl_token::native_mint::id().to_string();
        let is_input_sol = input_mint == native_mint;
        let is_output_sol = output_mint == native_mint;
        let owner = self.keypair.pubkey();

        let mut amount = amount;
        let mut input_account = None;
        if !is_input_sol {
            let (account, balance) = self.resolve_input_account(input_mint).await?;
            let clamped = clamp_to_balance(amount, balance);
            if clamped != amount {
                info!(requested = amount, balance, "input amount exceeds balance, clamped to max");
            }
            amount = clamped;
            input_account = Some(account.to_string());
        }

        let mut output_account = None;
        if !is_output_sol {
            let mint = parse_mint(output_mint)?;
            let account = get_associated_token_address(&owner, &mint);
            // Only pass an output account that already exists; the build API
            // creates one otherwise.
            if self.rpc.get_token_account_balance(&account).await.is_ok() {
                output_account = Some(account.to_string());
            }
        }

        let fees = self.api.priority_fee().await?;
        let quote = self
            .api
            .compute_swap(input_mint, output_mint, amount, SLIPPAGE_BPS, TX_VERSION)
            .await?;
        ensure_min_output(quote.output_amount())?;

        let request = SwapTransactionRequest {
            compute_unit_price_micro_lamports: fees.h.to_string(),
            swap_response: quote,
            tx_version: TX_VERSION.to_string(),
            wallet: owner.to_string(),
            wrap_sol: is_input_sol,
            unwrap_sol: is_output_sol,
            input_account,
            output_account,
        };
        let encoded_transactions = self.api.build_swap_transactions(&request).await?;

        info!(
            count = encoded_transactions.len(),
            "signing and submitting swap transactions"
        );
        for (index, encoded) in encoded_transactions.iter().enumerate() {
            self.sign_and_submit(index + 1, encoded).await?;
        }
        Ok(())
    }

    /// Resolves the owner's associated token account for a mint and its
    /// current balance, failing when the account does not exist on chain.
    async fn resolve_input_account(&self, mint: &str) -> Result<(Pubkey, u64), SwapError> {
        let mint_key = parse_mint(mint)?;
        let account = get_associated_token_address(&self.keypair.pubkey(), &mint_key);
        let balance = self
            .rpc
            .get_token_account_balance(&account)
            .await
            .map_err(|_| SwapError::InputAccountNotFound {
                mint: mint.to_string(),
            })?;
        Ok((account, balance.amount.parse().unwrap_or(0)))
    }

    async fn sign_and_submit(&self, index: usize, encoded: &str) -> Result<(), SwapError> {
        let transaction_bytes =
            general_purpose::STANDARD
                .decode(encoded)
                .map_err(|error| SwapError::TransactionFailed {
                    reason: format!("base64 decode: {error}"),
                })?;
        let unsigned: VersionedTransaction =
            bincode::deserialize(&transaction_bytes).map_err(|error| {
                SwapError::TransactionFailed {
                    reason: format!("transaction deserialize: {error}"),
                }
            })?;
        let signed = VersionedTransaction::try_new(unsigned.message, &[&self.keypair]).map_err(
            |error| SwapError::TransactionFailed {
                reason: format!("signing: {error}"),
            },
        )?;

        let signature = self
            .rpc
            .send_transaction_with_config(
                &signed,
                RpcSendTransactionConfig {
                    skip_preflight: true,
                    ..Default::default()
                },
            )
            .await?;
        info!(index, %signature, "transaction sent, awaiting confirmation");

        let (blockhash, _) = self
            .rpc
            .get_latest_blockhash_with_commitment(CommitmentConfig::finalized())
            .await?;
        self.rpc
            .confirm_transaction_with_spinner(&signature, &blockhash, CommitmentConfig::confirmed())
            .await
            .map_err(|error| SwapError::TransactionFailed {
                reason: error.to_string(),
            })?;
        info!(index, %signature, "transaction confirmed");
        Ok(())
    }
}

fn parse_mint(address: &str) -> Result<Pubkey, SwapError> {
    Pubkey::from_str(address).map_err(|_| SwapError::InvalidMint {
        address: address.to_string(),
    })
}

pub(crate) fn clamp_to_balance(requested: u64, balance: u64) -> u64 {
    requested.min(balance)
}

pub(crate) fn ensure_min_output(quoted_lamports: u64) -> Result<(), SwapError> {
    if quoted_lamports < MIN_QUOTED_OUTPUT_LAMPORTS {
        return Err(SwapError::OutputAmountTooLow {
            quoted_lamports,
            min_lamports: MIN_QUOTED_OUTPUT_LAMPORTS,
        });
    }
    Ok(())
}
