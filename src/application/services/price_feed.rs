//! Price Feed
//!
//! Read-only access to the stock catalog and its closing-price history.
//! The ledger never writes these tables; trade prices are supplied by the
//! caller after querying this feed.

use tracing::error;

use crate::domain::errors::LedgerError;
use crate::persistence::models::{PriceRecord, StockQuote, StockRecord};
use crate::persistence::{DatabaseError, DbPool};

/// Default number of daily closes returned for a price history query.
pub const DEFAULT_HISTORY_LIMIT: i64 = 30;

pub struct PriceFeed {
    pool: DbPool,
}

impl PriceFeed {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Full catalog ordered by symbol
    pub async fn list_stocks(&self) -> Result<Vec<StockRecord>, LedgerError> {
        let records = sqlx::query_as::<_, StockRecord>("SELECT * FROM stocks ORDER BY symbol")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to list stocks: {}", e);
                DatabaseError::QueryError(format!("Failed to list stocks: {}", e))
            })?;

        Ok(records)
    }

    /// Search the catalog by symbol or name substring
    pub async fn search(&self, query: &str) -> Result<Vec<StockRecord>, LedgerError> {
        let pattern = format!("%{}%", query);
        let records = sqlx::query_as::<_, StockRecord>(
            "SELECT * FROM stocks WHERE symbol LIKE ?1 OR name LIKE ?1 ORDER BY symbol",
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to search stocks for {:?}: {}", query, e);
            DatabaseError::QueryError(format!("Failed to search stocks: {}", e))
        })?;

        Ok(records)
    }

    /// Stock metadata with its latest close; `NotFound` for an unknown id.
    /// A stock with no price history quotes at 0.
    pub async fn get_stock(&self, stock_id: i64) -> Result<StockQuote, LedgerError> {
        let stock = sqlx::query_as::<_, StockRecord>("SELECT * FROM stocks WHERE id = ?1")
            .bind(stock_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get stock {}: {}", stock_id, e);
                DatabaseError::QueryError(format!("Failed to get stock: {}", e))
            })?
            .ok_or(LedgerError::NotFound(stock_id))?;

        let current_price = self.get_latest_price(stock_id).await?.unwrap_or(0.0);

        Ok(StockQuote {
            id: stock.id,
            symbol: stock.symbol,
            name: stock.name,
            current_price,
        })
    }

    /// Latest close for a stock, or None when no history exists
    pub async fn get_latest_price(&self, stock_id: i64) -> Result<Option<f64>, LedgerError> {
        let row: Option<(f64,)> = sqlx::query_as(
            "SELECT close FROM stock_prices WHERE stock_id = ?1 ORDER BY date DESC LIMIT 1",
        )
        .bind(stock_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get latest price for stock {}: {}", stock_id, e);
            DatabaseError::QueryError(format!("Failed to get latest price: {}", e))
        })?;

        Ok(row.map(|(close,)| close))
    }

    /// Closing-price history, most recent first
    pub async fn get_price_history(
        &self,
        stock_id: i64,
        limit: i64,
    ) -> Result<Vec<PriceRecord>, LedgerError> {
        let records = sqlx::query_as::<_, PriceRecord>(
            "SELECT stock_id, date, close FROM stock_prices \
             WHERE stock_id = ?1 ORDER BY date DESC LIMIT ?2",
        )
        .bind(stock_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get price history for stock {}: {}", stock_id, e);
            DatabaseError::QueryError(format!("Failed to get price history: {}", e))
        })?;

        Ok(records)
    }
}
