//! Ledger Store
//!
//! Data access layer for the wallet, holdings, transaction log, and
//! watchlist. Row-level operations that must commit together (the balance
//! check, holding upsert, and transaction append of a buy or sell) take a
//! `&mut SqliteConnection` so they can share one unit of work obtained from
//! [`LedgerStore::begin`]; read-only listings run directly on the pool.

use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::{debug, error};

use super::models::*;
use super::{DatabaseError, DbPool};

/// Store owning all persisted ledger rows
#[derive(Clone)]
pub struct LedgerStore {
    pool: DbPool,
}

impl LedgerStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open an atomic unit of work. All mutations performed through the
    /// returned transaction commit together; dropping it without committing
    /// rolls every one of them back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, DatabaseError> {
        self.pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            DatabaseError::QueryError(format!("Failed to begin transaction: {}", e))
        })
    }

    /// Fetch the singleton wallet row, creating it with a zero balance on
    /// first access.
    pub async fn fetch_wallet(conn: &mut SqliteConnection) -> Result<WalletRecord, DatabaseError> {
        let existing = sqlx::query_as::<_, WalletRecord>("SELECT * FROM wallet WHERE id = 1")
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                error!("Failed to fetch wallet: {}", e);
                DatabaseError::QueryError(format!("Failed to fetch wallet: {}", e))
            })?;

        if let Some(wallet) = existing {
            return Ok(wallet);
        }

        let created = sqlx::query_as::<_, WalletRecord>(
            "INSERT INTO wallet (id, balance) VALUES (1, 0) RETURNING *",
        )
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            error!("Failed to create wallet: {}", e);
            DatabaseError::QueryError(format!("Failed to create wallet: {}", e))
        })?;

        debug!("Created wallet with zero balance");
        Ok(created)
    }

    /// Apply a signed delta to the wallet balance. The wallet row must
    /// already exist (callers fetch it first to read the current balance).
    pub async fn adjust_balance(
        conn: &mut SqliteConnection,
        delta: f64,
    ) -> Result<WalletRecord, DatabaseError> {
        let updated = sqlx::query_as::<_, WalletRecord>(
            "UPDATE wallet SET balance = balance + ?1 WHERE id = 1 RETURNING *",
        )
        .bind(delta)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            error!("Failed to update wallet balance: {}", e);
            DatabaseError::QueryError(format!("Failed to update wallet balance: {}", e))
        })?;

        updated.ok_or_else(|| DatabaseError::QueryError("Wallet row missing".to_string()))
    }

    /// Get the holding for a stock, if any
    pub async fn holding(
        conn: &mut SqliteConnection,
        stock_id: i64,
    ) -> Result<Option<HoldingRecord>, DatabaseError> {
        sqlx::query_as::<_, HoldingRecord>("SELECT * FROM holdings WHERE stock_id = ?1")
            .bind(stock_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                error!("Failed to get holding for stock {}: {}", stock_id, e);
                DatabaseError::QueryError(format!("Failed to get holding: {}", e))
            })
    }

    /// Create a new holding row
    pub async fn insert_holding(
        conn: &mut SqliteConnection,
        stock_id: i64,
        quantity: i64,
        total_price_bought: f64,
        total_current_value: f64,
        profit_loss: f64,
        profit_loss_percentage: f64,
    ) -> Result<HoldingRecord, DatabaseError> {
        let record = sqlx::query_as::<_, HoldingRecord>(
            r#"
            INSERT INTO holdings (
                stock_id, quantity, total_price_bought, total_current_value,
                profit_loss, profit_loss_percentage
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING *
            "#,
        )
        .bind(stock_id)
        .bind(quantity)
        .bind(total_price_bought)
        .bind(total_current_value)
        .bind(profit_loss)
        .bind(profit_loss_percentage)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            error!("Failed to insert holding for stock {}: {}", stock_id, e);
            DatabaseError::QueryError(format!("Failed to insert holding: {}", e))
        })?;

        debug!("Created holding for stock {}", stock_id);
        Ok(record)
    }

    /// Overwrite the quantity and valuation of an existing holding
    pub async fn update_holding(
        conn: &mut SqliteConnection,
        stock_id: i64,
        quantity: i64,
        total_price_bought: f64,
        total_current_value: f64,
        profit_loss: f64,
        profit_loss_percentage: f64,
    ) -> Result<HoldingRecord, DatabaseError> {
        let updated = sqlx::query_as::<_, HoldingRecord>(
            r#"
            UPDATE holdings
            SET quantity = ?1, total_price_bought = ?2, total_current_value = ?3,
                profit_loss = ?4, profit_loss_percentage = ?5
            WHERE stock_id = ?6
            RETURNING *
            "#,
        )
        .bind(quantity)
        .bind(total_price_bought)
        .bind(total_current_value)
        .bind(profit_loss)
        .bind(profit_loss_percentage)
        .bind(stock_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            error!("Failed to update holding for stock {}: {}", stock_id, e);
            DatabaseError::QueryError(format!("Failed to update holding: {}", e))
        })?;

        updated.ok_or_else(|| {
            DatabaseError::QueryError(format!("Holding not found for stock {}", stock_id))
        })
    }

    /// Delete a holding (position fully closed)
    pub async fn delete_holding(
        conn: &mut SqliteConnection,
        stock_id: i64,
    ) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM holdings WHERE stock_id = ?1")
            .bind(stock_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                error!("Failed to delete holding for stock {}: {}", stock_id, e);
                DatabaseError::QueryError(format!("Failed to delete holding: {}", e))
            })?;

        debug!("Deleted holding for stock {}", stock_id);
        Ok(())
    }

    /// Append an immutable row to the transaction log
    pub async fn append_transaction(
        conn: &mut SqliteConnection,
        input: NewTransaction,
    ) -> Result<TransactionRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, TransactionRecord>(
            r#"
            INSERT INTO transactions (
                stock_id, transaction_type, quantity, price, total_price, executed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING *
            "#,
        )
        .bind(input.stock_id)
        .bind(&input.transaction_type)
        .bind(input.quantity)
        .bind(input.price)
        .bind(input.total_price)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            error!("Failed to append transaction: {}", e);
            DatabaseError::QueryError(format!("Failed to append transaction: {}", e))
        })?;

        debug!(
            "Appended {} transaction for stock {}",
            record.transaction_type, record.stock_id
        );
        Ok(record)
    }

    /// Check whether a stock id exists in the catalog
    pub async fn stock_exists(
        conn: &mut SqliteConnection,
        stock_id: i64,
    ) -> Result<bool, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stocks WHERE id = ?1")
            .bind(stock_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| {
                error!("Failed to look up stock {}: {}", stock_id, e);
                DatabaseError::QueryError(format!("Failed to look up stock: {}", e))
            })?;

        Ok(row.0 > 0)
    }

    /// Fetch the wallet outside a trade (creating it on first access)
    pub async fn wallet(&self) -> Result<WalletRecord, DatabaseError> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            error!("Failed to acquire connection: {}", e);
            DatabaseError::QueryError(format!("Failed to acquire connection: {}", e))
        })?;
        Self::fetch_wallet(&mut conn).await
    }

    /// All holdings joined with stock metadata, largest position first
    pub async fn holdings(&self) -> Result<Vec<HoldingRow>, DatabaseError> {
        sqlx::query_as::<_, HoldingRow>(
            r#"
            SELECT h.stock_id, s.symbol, s.name, h.quantity, h.total_price_bought,
                   h.total_current_value, h.profit_loss, h.profit_loss_percentage
            FROM holdings h
            JOIN stocks s ON h.stock_id = s.id
            ORDER BY h.total_current_value DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list holdings: {}", e);
            DatabaseError::QueryError(format!("Failed to list holdings: {}", e))
        })
    }

    /// Aggregate valuation over all holdings; zero holdings yield all zeros
    pub async fn summary(&self) -> Result<PortfolioSummary, DatabaseError> {
        sqlx::query_as::<_, PortfolioSummary>(
            r#"
            SELECT
                COALESCE(SUM(total_current_value), 0.0) AS total_value,
                COALESCE(SUM(total_price_bought), 0.0) AS total_invested,
                COALESCE(SUM(profit_loss), 0.0) AS total_profit_loss,
                COALESCE(AVG(profit_loss_percentage), 0.0) AS avg_profit_loss_percentage
            FROM holdings
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to compute portfolio summary: {}", e);
            DatabaseError::QueryError(format!("Failed to compute summary: {}", e))
        })
    }

    /// Full transaction history joined with stock metadata, newest first
    pub async fn transactions(&self) -> Result<Vec<TransactionRow>, DatabaseError> {
        sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT t.id, t.stock_id, s.symbol, s.name, t.transaction_type,
                   t.quantity, t.price, t.total_price, t.executed_at
            FROM transactions t
            JOIN stocks s ON t.stock_id = s.id
            ORDER BY t.executed_at DESC, t.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list transactions: {}", e);
            DatabaseError::QueryError(format!("Failed to list transactions: {}", e))
        })
    }

    /// Look up a stock by id
    pub async fn find_stock(&self, stock_id: i64) -> Result<Option<StockRecord>, DatabaseError> {
        sqlx::query_as::<_, StockRecord>("SELECT * FROM stocks WHERE id = ?1")
            .bind(stock_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to find stock {}: {}", stock_id, e);
                DatabaseError::QueryError(format!("Failed to find stock: {}", e))
            })
    }

    /// Check whether a stock is already on the watchlist
    pub async fn is_watched(&self, stock_id: i64) -> Result<bool, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM watchlist WHERE stock_id = ?1")
            .bind(stock_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to check watchlist for stock {}: {}", stock_id, e);
                DatabaseError::QueryError(format!("Failed to check watchlist: {}", e))
            })?;

        Ok(row.0 > 0)
    }

    /// Add a stock to the watchlist
    pub async fn watch_insert(&self, stock_id: i64, stock_name: &str) -> Result<(), DatabaseError> {
        let now = Utc::now();
        sqlx::query("INSERT INTO watchlist (stock_id, stock_name, added_at) VALUES (?1, ?2, ?3)")
            .bind(stock_id)
            .bind(stock_name)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to add stock {} to watchlist: {}", stock_id, e);
                DatabaseError::QueryError(format!("Failed to add to watchlist: {}", e))
            })?;

        debug!("Added stock {} to watchlist", stock_id);
        Ok(())
    }

    /// Remove a stock from the watchlist; removing an absent entry is a no-op
    pub async fn watch_remove(&self, stock_id: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM watchlist WHERE stock_id = ?1")
            .bind(stock_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to remove stock {} from watchlist: {}", stock_id, e);
                DatabaseError::QueryError(format!("Failed to remove from watchlist: {}", e))
            })?;

        Ok(result.rows_affected())
    }

    /// Watchlist entries joined with stock metadata and the latest close,
    /// most recently added first
    pub async fn watch_list(&self) -> Result<Vec<WatchlistRow>, DatabaseError> {
        sqlx::query_as::<_, WatchlistRow>(
            r#"
            SELECT w.stock_id, w.stock_name, s.symbol, s.name, w.added_at,
                   (SELECT close FROM stock_prices sp
                    WHERE sp.stock_id = w.stock_id
                    ORDER BY date DESC LIMIT 1) AS current_price
            FROM watchlist w
            JOIN stocks s ON w.stock_id = s.id
            ORDER BY w.added_at DESC, w.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list watchlist: {}", e);
            DatabaseError::QueryError(format!("Failed to list watchlist: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;

    async fn store_with_stock() -> LedgerStore {
        let pool = init_database("sqlite::memory:").await.unwrap();
        sqlx::query("INSERT INTO stocks (id, symbol, name) VALUES (1, 'TEST', 'Test Corp')")
            .execute(&pool)
            .await
            .unwrap();
        LedgerStore::new(pool)
    }

    #[tokio::test]
    async fn test_wallet_created_on_first_access() {
        let store = store_with_stock().await;
        let wallet = store.wallet().await.unwrap();
        assert_eq!(wallet.id, 1);
        assert_eq!(wallet.balance, 0.0);

        // Second access returns the same singleton row
        let again = store.wallet().await.unwrap();
        assert_eq!(again.id, 1);
    }

    #[tokio::test]
    async fn test_adjust_balance() {
        let store = store_with_stock().await;
        store.wallet().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let after = LedgerStore::adjust_balance(&mut tx, 150.0).await.unwrap();
        assert_eq!(after.balance, 150.0);
        let after = LedgerStore::adjust_balance(&mut tx, -50.0).await.unwrap();
        assert_eq!(after.balance, 100.0);
        tx.commit().await.unwrap();

        assert_eq!(store.wallet().await.unwrap().balance, 100.0);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = store_with_stock().await;
        store.wallet().await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            LedgerStore::adjust_balance(&mut tx, 999.0).await.unwrap();
            // Dropped without commit
        }

        assert_eq!(store.wallet().await.unwrap().balance, 0.0);
    }

    #[tokio::test]
    async fn test_holding_crud() {
        let store = store_with_stock().await;

        let mut tx = store.begin().await.unwrap();
        assert!(LedgerStore::holding(&mut tx, 1).await.unwrap().is_none());

        let created = LedgerStore::insert_holding(&mut tx, 1, 10, 500.0, 500.0, 0.0, 0.0)
            .await
            .unwrap();
        assert_eq!(created.quantity, 10);
        assert_eq!(created.average_buy_price(), 50.0);

        let updated = LedgerStore::update_holding(&mut tx, 1, 6, 300.0, 360.0, 60.0, 20.0)
            .await
            .unwrap();
        assert_eq!(updated.quantity, 6);
        assert_eq!(updated.profit_loss_percentage, 20.0);

        LedgerStore::delete_holding(&mut tx, 1).await.unwrap();
        assert!(LedgerStore::holding(&mut tx, 1).await.unwrap().is_none());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_append_transaction() {
        let store = store_with_stock().await;

        let mut tx = store.begin().await.unwrap();
        let record = LedgerStore::append_transaction(
            &mut tx,
            NewTransaction {
                stock_id: 1,
                transaction_type: "buy".to_string(),
                quantity: 10,
                price: 50.0,
                total_price: 500.0,
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(record.transaction_type, "buy");
        assert_eq!(record.total_price, 500.0);

        let history = store.transactions().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].symbol, "TEST");
    }

    #[tokio::test]
    async fn test_summary_empty_is_all_zero() {
        let store = store_with_stock().await;
        let summary = store.summary().await.unwrap();
        assert_eq!(summary.total_value, 0.0);
        assert_eq!(summary.total_invested, 0.0);
        assert_eq!(summary.total_profit_loss, 0.0);
        assert_eq!(summary.avg_profit_loss_percentage, 0.0);
    }

    #[tokio::test]
    async fn test_watchlist_crud() {
        let store = store_with_stock().await;

        assert!(!store.is_watched(1).await.unwrap());
        store.watch_insert(1, "Test Corp").await.unwrap();
        assert!(store.is_watched(1).await.unwrap());

        let entries = store.watch_list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].symbol, "TEST");
        assert_eq!(entries[0].current_price, None);

        assert_eq!(store.watch_remove(1).await.unwrap(), 1);
        assert_eq!(store.watch_remove(1).await.unwrap(), 0);
    }
}
