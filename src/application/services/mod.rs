pub mod portfolio_ledger;
pub mod price_feed;
pub mod watchlist_service;

pub use portfolio_ledger::PortfolioLedger;
pub use price_feed::PriceFeed;
pub use watchlist_service::WatchlistService;
