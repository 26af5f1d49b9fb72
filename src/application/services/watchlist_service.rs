//! Watchlist Service
//!
//! Add/remove/list of watched stocks, independent of any money flow.

use tracing::info;

use crate::domain::errors::LedgerError;
use crate::persistence::models::WatchlistRow;
use crate::persistence::store::LedgerStore;

pub struct WatchlistService {
    store: LedgerStore,
}

impl WatchlistService {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    /// Watch a stock. Fails with `NotFound` for an unknown stock id and
    /// `AlreadyWatched` when an entry already exists.
    pub async fn add(&self, stock_id: i64, stock_name: &str) -> Result<(), LedgerError> {
        if self.store.find_stock(stock_id).await?.is_none() {
            return Err(LedgerError::NotFound(stock_id));
        }
        if self.store.is_watched(stock_id).await? {
            return Err(LedgerError::AlreadyWatched(stock_id));
        }

        self.store.watch_insert(stock_id, stock_name).await?;
        info!("Watching stock {} ({})", stock_id, stock_name);
        Ok(())
    }

    /// Stop watching a stock. Idempotent: removing an absent entry succeeds.
    pub async fn remove(&self, stock_id: i64) -> Result<(), LedgerError> {
        let removed = self.store.watch_remove(stock_id).await?;
        if removed > 0 {
            info!("Stopped watching stock {}", stock_id);
        }
        Ok(())
    }

    /// All watched stocks with their latest close, most recently added first
    pub async fn list(&self) -> Result<Vec<WatchlistRow>, LedgerError> {
        Ok(self.store.watch_list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;

    async fn service() -> WatchlistService {
        let pool = init_database("sqlite::memory:").await.unwrap();
        sqlx::query(
            "INSERT INTO stocks (id, symbol, name) VALUES \
             (1, 'AAA', 'Alpha Corp'), (2, 'BBB', 'Beta Corp')",
        )
        .execute(&pool)
        .await
        .unwrap();
        WatchlistService::new(LedgerStore::new(pool))
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let svc = service().await;
        svc.add(1, "Alpha Corp").await.unwrap();
        svc.add(2, "Beta Corp").await.unwrap();

        let entries = svc.list().await.unwrap();
        assert_eq!(entries.len(), 2);
        // Most recently added first
        assert_eq!(entries[0].stock_id, 2);
        assert_eq!(entries[1].stock_id, 1);
    }

    #[tokio::test]
    async fn test_duplicate_add_fails() {
        let svc = service().await;
        svc.add(1, "Alpha Corp").await.unwrap();
        assert!(matches!(
            svc.add(1, "Alpha Corp").await,
            Err(LedgerError::AlreadyWatched(1))
        ));
    }

    #[tokio::test]
    async fn test_add_unknown_stock_fails() {
        let svc = service().await;
        assert!(matches!(
            svc.add(42, "Ghost Corp").await,
            Err(LedgerError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let svc = service().await;
        svc.add(1, "Alpha Corp").await.unwrap();
        svc.remove(1).await.unwrap();
        // Second remove of the same entry is not an error
        svc.remove(1).await.unwrap();
        assert!(svc.list().await.unwrap().is_empty());
    }
}
