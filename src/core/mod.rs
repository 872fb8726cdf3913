/// Core domain types shared across the agent

pub mod error;
pub mod types;

pub use error::SwapError;
pub use types::TrendToken;
