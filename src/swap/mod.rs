/// Swap execution through the Raydium trade API

pub mod api;
pub mod executor;

pub use api::TradeApiClient;
pub use executor::SwapExecutor;
