pub mod fear_greed;
pub mod history;
pub mod news;
pub mod price_series;
pub mod quotes;

// Re-export the main types for convenient access (e.g. `use crate::market_data::PriceSeries`).
pub use fear_greed::FearGreedClient;
pub use history::HistoryClient;
pub use news::{HeadlineDigest, NewsClient};
pub use price_series::PriceSeries;
pub use quotes::QuoteClient;
