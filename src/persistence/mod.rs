//! Persistence Layer
//!
//! This module provides database persistence for the wallet, holdings,
//! transaction log, watchlist, and the stock catalog. Uses SQLite for local
//! storage with async operations via sqlx.
//!
//! # Database Schema
//!
//! ## Wallet Table
//! - id: Always 1 (singleton row)
//! - balance: REAL, never negative
//!
//! ## Stocks / Stock Prices Tables
//! - Read-only catalog queried by the price feed; the ledger never writes them
//!
//! ## Holdings Table
//! - stock_id: Unique, one row per owned stock
//! - quantity: INTEGER, row exists iff quantity > 0
//! - total_price_bought: Cumulative cost basis
//! - total_current_value / profit_loss / profit_loss_percentage: Valuation
//!   at the last trade price
//!
//! ## Transactions Table
//! - Append-only trade log: side, quantity, price, total_price, executed_at
//!
//! ## Watchlist Table
//! - stock_id: Unique
//! - added_at: Timestamp, listings are newest-first

pub mod models;
pub mod store;

use chrono::{Days, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Database connection pool
pub type DbPool = SqlitePool;

/// Database initialization error
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Query error: {0}")]
    QueryError(String),
}

/// Initialize the database connection pool
///
/// # Arguments
/// - `database_url`: Path to SQLite database file (e.g., "sqlite://data/papertrade.db")
///
/// # Returns
/// Database connection pool ready for use
///
/// # Errors
/// Returns error if database connection fails or migrations fail
pub async fn init_database(database_url: &str) -> Result<DbPool, DatabaseError> {
    info!("Initializing database: {}", database_url);

    // Ensure data directory exists
    if let Some(db_path) = database_url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::ConnectionError(sqlx::Error::Configuration(Box::new(e)))
            })?;
        }
    }

    // Create connection options
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .log_statements(tracing::log::LevelFilter::Debug);

    // An in-memory SQLite database exists per connection; a single
    // connection keeps every query on the same database.
    let max_connections = if database_url.contains(":memory:") {
        1
    } else {
        DatabaseConfig::from_env().max_connections
    };

    // Create connection pool
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    // Run migrations
    run_migrations(&pool).await?;

    info!("✓ Database initialized successfully");

    Ok(pool)
}

/// Run database migrations
async fn run_migrations(pool: &DbPool) -> Result<(), DatabaseError> {
    info!("Running database migrations...");

    // Create wallet table (singleton row, inserted on first access)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wallet (
            id INTEGER PRIMARY KEY CHECK(id = 1),
            balance REAL NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("Failed to create wallet table: {}", e)))?;

    // Create stocks catalog table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stocks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            symbol TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("Failed to create stocks table: {}", e)))?;

    // Create stock price history table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stock_prices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            stock_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            close REAL NOT NULL,
            FOREIGN KEY (stock_id) REFERENCES stocks(id)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create stock_prices table: {}", e))
    })?;

    // Create holdings table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS holdings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            stock_id INTEGER NOT NULL UNIQUE,
            quantity INTEGER NOT NULL CHECK(quantity > 0),
            total_price_bought REAL NOT NULL,
            total_current_value REAL NOT NULL,
            profit_loss REAL NOT NULL,
            profit_loss_percentage REAL NOT NULL,
            FOREIGN KEY (stock_id) REFERENCES stocks(id)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create holdings table: {}", e))
    })?;

    // Create transactions table (append-only)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            stock_id INTEGER NOT NULL,
            transaction_type TEXT NOT NULL CHECK(transaction_type IN ('buy', 'sell')),
            quantity INTEGER NOT NULL,
            price REAL NOT NULL,
            total_price REAL NOT NULL,
            executed_at DATETIME NOT NULL,
            FOREIGN KEY (stock_id) REFERENCES stocks(id)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create transactions table: {}", e))
    })?;

    // Create watchlist table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS watchlist (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            stock_id INTEGER NOT NULL UNIQUE,
            stock_name TEXT NOT NULL,
            added_at DATETIME NOT NULL,
            FOREIGN KEY (stock_id) REFERENCES stocks(id)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create watchlist table: {}", e))
    })?;

    // Create indexes for better query performance
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_stock_prices_stock_date ON stock_prices(stock_id, date)")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_transactions_executed_at ON transactions(executed_at)")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_transactions_stock_id ON transactions(stock_id)")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    info!("✓ Database migrations completed successfully");

    Ok(())
}

/// Built-in catalog used when the stocks table is empty: (symbol, name,
/// base price for the generated history).
const DEFAULT_CATALOG: &[(&str, &str, f64)] = &[
    ("AAPL", "Apple Inc.", 175.0),
    ("AMZN", "Amazon.com Inc.", 182.0),
    ("GOOGL", "Alphabet Inc.", 141.0),
    ("JPM", "JPMorgan Chase & Co.", 196.0),
    ("META", "Meta Platforms Inc.", 498.0),
    ("MSFT", "Microsoft Corporation", 411.0),
    ("NFLX", "Netflix Inc.", 622.0),
    ("NVDA", "NVIDIA Corporation", 878.0),
    ("TSLA", "Tesla Inc.", 177.0),
    ("V", "Visa Inc.", 279.0),
];

/// Number of daily closes generated per seeded stock.
const SEED_HISTORY_DAYS: u64 = 30;

/// Seed the stock catalog if it is empty.
///
/// The ledger treats stocks and stock_prices as a read-only price feed, so a
/// fresh database gets a small built-in catalog with a deterministic 30-day
/// closing history. An already-populated catalog is left untouched.
pub async fn seed_catalog(pool: &DbPool) -> Result<(), DatabaseError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stocks")
        .fetch_one(pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("Failed to count stocks: {}", e)))?;

    if count.0 > 0 {
        return Ok(());
    }

    info!("Seeding stock catalog ({} stocks)...", DEFAULT_CATALOG.len());

    let today = Utc::now().date_naive();
    for (idx, (symbol, name, base_price)) in DEFAULT_CATALOG.iter().enumerate() {
        let stock_id: (i64,) =
            sqlx::query_as("INSERT INTO stocks (symbol, name) VALUES (?1, ?2) RETURNING id")
                .bind(symbol)
                .bind(name)
                .fetch_one(pool)
                .await
                .map_err(|e| {
                    DatabaseError::QueryError(format!("Failed to seed stock {}: {}", symbol, e))
                })?;

        for day in 0..SEED_HISTORY_DAYS {
            let date = today
                .checked_sub_days(Days::new(SEED_HISTORY_DAYS - 1 - day))
                .unwrap_or(today);
            // Deterministic daily drift around the base price
            let drift = ((day as f64) * 0.7 + idx as f64).sin() * 0.03;
            let close = (base_price * (1.0 + drift) * 100.0).round() / 100.0;

            sqlx::query("INSERT INTO stock_prices (stock_id, date, close) VALUES (?1, ?2, ?3)")
                .bind(stock_id.0)
                .bind(date)
                .bind(close)
                .execute(pool)
                .await
                .map_err(|e| {
                    DatabaseError::QueryError(format!(
                        "Failed to seed prices for {}: {}",
                        symbol, e
                    ))
                })?;
        }
    }

    info!("✓ Stock catalog seeded");
    Ok(())
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://data/papertrade.db")
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/papertrade.db".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://data/papertrade.db".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Self {
            url,
            max_connections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_init() {
        let pool = init_database("sqlite::memory:").await;
        assert!(pool.is_ok());
    }

    #[tokio::test]
    async fn test_migrations() {
        let pool = init_database("sqlite::memory:").await.unwrap();

        // Verify tables exist
        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN \
             ('wallet', 'stocks', 'stock_prices', 'holdings', 'transactions', 'watchlist')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(result.0, 6);
    }

    #[tokio::test]
    async fn test_seed_catalog() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        seed_catalog(&pool).await.unwrap();

        let stocks: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stocks")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stocks.0, DEFAULT_CATALOG.len() as i64);

        let prices: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stock_prices")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(
            prices.0,
            DEFAULT_CATALOG.len() as i64 * SEED_HISTORY_DAYS as i64
        );

        // Seeding again must not duplicate the catalog
        seed_catalog(&pool).await.unwrap();
        let stocks_after: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stocks")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stocks_after.0, stocks.0);
    }

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.url, "sqlite://data/papertrade.db");
        assert_eq!(config.max_connections, 5);
    }
}
