/// Trend-alert feed ingestion

pub mod client;
pub mod poller;

pub use client::{AlertFeedClient, AlertItem};
pub use poller::AlertPoller;
