/// Swap failure taxonomy
///
/// Every way a swap can fail is a typed kind, and each kind knows whether a
/// retry can possibly help. Account resolution, route computation and the
/// output floor are properties of the swap itself: if they fail once they
/// fail every time, so retrying them only burns the entry window.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("no input token account for mint {mint}")]
    InputAccountNotFound { mint: String },

    #[error("mint address is not a valid pubkey: {address}")]
    InvalidMint { address: String },

    #[error("priority fee fetch failed: {reason}")]
    PriorityFeeFetch { reason: String },

    #[error("compute swap failed: {reason}")]
    RouteCompute { reason: String },

    #[error("quoted output {quoted_lamports} lamports is below the {min_lamports} lamport floor")]
    OutputAmountTooLow {
        quoted_lamports: u64,
        min_lamports: u64,
    },

    #[error("transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("rpc error: {0}")]
    Rpc(#[from] solana_client::client_error::ClientError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SwapError {
    /// Whether another attempt at the same swap can succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::InputAccountNotFound { .. }
                | Self::InvalidMint { .. }
                | Self::RouteCompute { .. }
                | Self::OutputAmountTooLow { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_kinds_are_not_retryable() {
        let terminal = [
            SwapError::InputAccountNotFound {
                mint: "mint".to_string(),
            },
            SwapError::InvalidMint {
                address: "???".to_string(),
            },
            SwapError::RouteCompute {
                reason: "no route".to_string(),
            },
            SwapError::OutputAmountTooLow {
                quoted_lamports: 5_000_000,
                min_lamports: 10_000_000,
            },
        ];
        for error in terminal {
            assert!(!error.is_retryable(), "{error} should be terminal");
        }
    }

    #[test]
    fn transient_kinds_are_retryable() {
        let transient = [
            SwapError::PriorityFeeFetch {
                reason: "503".to_string(),
            },
            SwapError::TransactionFailed {
                reason: "blockhash expired".to_string(),
            },
        ];
        for error in transient {
            assert!(error.is_retryable(), "{error} should be retryable");
        }
    }
}
