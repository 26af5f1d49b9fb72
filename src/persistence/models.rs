//! Database Models
//!
//! Persistent data structures for the wallet, holdings, transactions,
//! watchlist, and the stock catalog.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Wallet record in database (singleton, id = 1)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WalletRecord {
    pub id: i64,
    pub balance: f64,
}

/// Holding record in database, one per currently-owned stock
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HoldingRecord {
    pub id: i64,
    pub stock_id: i64,
    pub quantity: i64,
    pub total_price_bought: f64,
    pub total_current_value: f64,
    pub profit_loss: f64,
    pub profit_loss_percentage: f64,
}

impl HoldingRecord {
    /// Average buy price, always derived from the cost basis.
    pub fn average_buy_price(&self) -> f64 {
        self.total_price_bought / self.quantity as f64
    }
}

/// Holding joined with stock metadata for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HoldingRow {
    pub stock_id: i64,
    pub symbol: String,
    pub name: String,
    pub quantity: i64,
    pub total_price_bought: f64,
    pub total_current_value: f64,
    pub profit_loss: f64,
    pub profit_loss_percentage: f64,
}

/// Transaction record in database (append-only, immutable once written)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionRecord {
    pub id: i64,
    pub stock_id: i64,
    pub transaction_type: String, // "buy" or "sell"
    pub quantity: i64,
    pub price: f64,
    pub total_price: f64,
    pub executed_at: DateTime<Utc>,
}

/// Transaction joined with stock metadata for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionRow {
    pub id: i64,
    pub stock_id: i64,
    pub symbol: String,
    pub name: String,
    pub transaction_type: String,
    pub quantity: i64,
    pub price: f64,
    pub total_price: f64,
    pub executed_at: DateTime<Utc>,
}

/// Watchlist entry joined with stock metadata and the latest close
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WatchlistRow {
    pub stock_id: i64,
    pub stock_name: String,
    pub symbol: String,
    pub name: String,
    pub added_at: DateTime<Utc>,
    pub current_price: Option<f64>,
}

/// Stock catalog record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockRecord {
    pub id: i64,
    pub symbol: String,
    pub name: String,
}

/// Stock with its latest closing price (0.0 when no history exists)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockQuote {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
}

/// Daily closing price record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PriceRecord {
    pub stock_id: i64,
    pub date: NaiveDate,
    pub close: f64,
}

/// Aggregates over all holdings; all zero when nothing is held
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PortfolioSummary {
    pub total_value: f64,
    pub total_invested: f64,
    pub total_profit_loss: f64,
    pub avg_profit_loss_percentage: f64,
}

/// Append-transaction input
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub stock_id: i64,
    pub transaction_type: String,
    pub quantity: i64,
    pub price: f64,
    pub total_price: f64,
}
