// Core domain types and errors
pub mod core;

// Trend-alert ingestion
pub mod alerts;

// Runtime configuration and wallet loading
pub mod config;

// Slack webhook notifications
pub mod notify;

// Persisted token registry
pub mod registry;

// Raydium trade API swap execution
pub mod swap;

// Buy/sell lifecycle tracking
pub mod trader;

// Re-export commonly used types for convenience
pub use self::core::error::SwapError;
pub use self::core::types::TrendToken;
pub use self::registry::TokenRegistry;
