//! Portfolio Ledger
//!
//! The transactional state machine behind every money-affecting operation.
//! Each of buy/sell/deposit/withdraw runs as one atomic unit of work: the
//! wallet balance, the holding row, and the transaction log commit together
//! or not at all. A single mutex serializes these operations so a balance
//! check can never interleave with another mutation of the same wallet.
//!
//! Accounting policy is weighted-average cost: a partial sell shrinks the
//! cost basis pro-rata at the current average buy price instead of matching
//! original purchase lots.

use tokio::sync::Mutex;
use tracing::info;

use crate::domain::entities::trade::{CashAmount, TradeOrder, TradeSide};
use crate::domain::errors::LedgerError;
use crate::persistence::DatabaseError;
use crate::persistence::models::{
    HoldingRecord, HoldingRow, NewTransaction, PortfolioSummary, TransactionRow, WalletRecord,
};
use crate::persistence::store::LedgerStore;

/// Outcome of a completed trade
#[derive(Debug, Clone)]
pub struct TradeReceipt {
    pub side: TradeSide,
    pub stock_id: i64,
    pub quantity: i64,
    pub price: f64,
    pub total_price: f64,
    pub wallet: WalletRecord,
    /// The holding after the trade; None when a sell closed the position.
    pub holding: Option<HoldingRecord>,
}

/// The portfolio ledger engine
pub struct PortfolioLedger {
    store: LedgerStore,
    /// Serializes money-affecting operations on the single wallet.
    trade_lock: Mutex<()>,
}

impl PortfolioLedger {
    pub fn new(store: LedgerStore) -> Self {
        Self {
            store,
            trade_lock: Mutex::new(()),
        }
    }

    /// Buy shares at a caller-supplied price.
    ///
    /// Fails with `NotFound` for an unknown stock and `InsufficientFunds`
    /// when the wallet cannot cover the total; neither failure mutates any
    /// state. On success the wallet debit, transaction append, and holding
    /// upsert commit atomically.
    pub async fn buy(&self, order: &TradeOrder) -> Result<TradeReceipt, LedgerError> {
        let _guard = self.trade_lock.lock().await;
        let mut tx = self.store.begin().await?;

        if !LedgerStore::stock_exists(&mut tx, order.stock_id()).await? {
            return Err(LedgerError::NotFound(order.stock_id()));
        }

        let total_price = order.total_price();
        let wallet = LedgerStore::fetch_wallet(&mut tx).await?;
        if wallet.balance < total_price {
            return Err(LedgerError::InsufficientFunds {
                required: total_price,
                available: wallet.balance,
            });
        }

        let wallet = LedgerStore::adjust_balance(&mut tx, -total_price).await?;

        LedgerStore::append_transaction(
            &mut tx,
            NewTransaction {
                stock_id: order.stock_id(),
                transaction_type: TradeSide::Buy.as_str().to_string(),
                quantity: order.quantity(),
                price: order.price(),
                total_price,
            },
        )
        .await?;

        let holding = match LedgerStore::holding(&mut tx, order.stock_id()).await? {
            None => {
                LedgerStore::insert_holding(
                    &mut tx,
                    order.stock_id(),
                    order.quantity(),
                    total_price,
                    order.quantity() as f64 * order.price(),
                    0.0,
                    0.0,
                )
                .await?
            }
            Some(holding) => {
                let new_quantity = holding.quantity + order.quantity();
                let new_cost = holding.total_price_bought + total_price;
                let current_value = new_quantity as f64 * order.price();
                let profit_loss = current_value - new_cost;
                let profit_loss_percentage = profit_loss / new_cost * 100.0;

                LedgerStore::update_holding(
                    &mut tx,
                    order.stock_id(),
                    new_quantity,
                    new_cost,
                    current_value,
                    profit_loss,
                    profit_loss_percentage,
                )
                .await?
            }
        };

        tx.commit()
            .await
            .map_err(|e| DatabaseError::QueryError(format!("Failed to commit: {}", e)))?;

        info!(
            "Bought {} x stock {} at {:.2} (total {:.2}, balance {:.2})",
            order.quantity(),
            order.stock_id(),
            order.price(),
            total_price,
            wallet.balance
        );

        Ok(TradeReceipt {
            side: TradeSide::Buy,
            stock_id: order.stock_id(),
            quantity: order.quantity(),
            price: order.price(),
            total_price,
            wallet,
            holding: Some(holding),
        })
    }

    /// Sell shares at a caller-supplied price.
    ///
    /// Fails with `InsufficientHoldings` when no position exists or the
    /// quantity exceeds it, leaving all state unchanged. A sell that brings
    /// the quantity to zero deletes the holding; otherwise the cost basis
    /// shrinks pro-rata at the current average buy price.
    pub async fn sell(&self, order: &TradeOrder) -> Result<TradeReceipt, LedgerError> {
        let _guard = self.trade_lock.lock().await;
        let mut tx = self.store.begin().await?;

        let holding = match LedgerStore::holding(&mut tx, order.stock_id()).await? {
            Some(holding) if holding.quantity >= order.quantity() => holding,
            other => {
                return Err(LedgerError::InsufficientHoldings {
                    requested: order.quantity(),
                    held: other.map(|h| h.quantity).unwrap_or(0),
                });
            }
        };

        let total_price = order.total_price();
        LedgerStore::fetch_wallet(&mut tx).await?;
        let wallet = LedgerStore::adjust_balance(&mut tx, total_price).await?;

        LedgerStore::append_transaction(
            &mut tx,
            NewTransaction {
                stock_id: order.stock_id(),
                transaction_type: TradeSide::Sell.as_str().to_string(),
                quantity: order.quantity(),
                price: order.price(),
                total_price,
            },
        )
        .await?;

        let new_quantity = holding.quantity - order.quantity();
        let remaining = if new_quantity == 0 {
            LedgerStore::delete_holding(&mut tx, order.stock_id()).await?;
            None
        } else {
            let avg_buy_price = holding.average_buy_price();
            let new_cost = new_quantity as f64 * avg_buy_price;
            let current_value = new_quantity as f64 * order.price();
            let profit_loss = current_value - new_cost;
            let profit_loss_percentage = profit_loss / new_cost * 100.0;

            Some(
                LedgerStore::update_holding(
                    &mut tx,
                    order.stock_id(),
                    new_quantity,
                    new_cost,
                    current_value,
                    profit_loss,
                    profit_loss_percentage,
                )
                .await?,
            )
        };

        tx.commit()
            .await
            .map_err(|e| DatabaseError::QueryError(format!("Failed to commit: {}", e)))?;

        info!(
            "Sold {} x stock {} at {:.2} (total {:.2}, balance {:.2})",
            order.quantity(),
            order.stock_id(),
            order.price(),
            total_price,
            wallet.balance
        );

        Ok(TradeReceipt {
            side: TradeSide::Sell,
            stock_id: order.stock_id(),
            quantity: order.quantity(),
            price: order.price(),
            total_price,
            wallet,
            holding: remaining,
        })
    }

    /// Add cash to the wallet
    pub async fn deposit(&self, amount: CashAmount) -> Result<WalletRecord, LedgerError> {
        let _guard = self.trade_lock.lock().await;
        let mut tx = self.store.begin().await?;

        LedgerStore::fetch_wallet(&mut tx).await?;
        let wallet = LedgerStore::adjust_balance(&mut tx, amount.value()).await?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::QueryError(format!("Failed to commit: {}", e)))?;

        info!(
            "Deposited {:.2}, balance {:.2}",
            amount.value(),
            wallet.balance
        );
        Ok(wallet)
    }

    /// Withdraw cash from the wallet; fails with `InsufficientFunds` when
    /// the balance cannot cover it
    pub async fn withdraw(&self, amount: CashAmount) -> Result<WalletRecord, LedgerError> {
        let _guard = self.trade_lock.lock().await;
        let mut tx = self.store.begin().await?;

        let wallet = LedgerStore::fetch_wallet(&mut tx).await?;
        if wallet.balance < amount.value() {
            return Err(LedgerError::InsufficientFunds {
                required: amount.value(),
                available: wallet.balance,
            });
        }

        let wallet = LedgerStore::adjust_balance(&mut tx, -amount.value()).await?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::QueryError(format!("Failed to commit: {}", e)))?;

        info!(
            "Withdrew {:.2}, balance {:.2}",
            amount.value(),
            wallet.balance
        );
        Ok(wallet)
    }

    /// Current wallet state, created with a zero balance on first access
    pub async fn balance(&self) -> Result<WalletRecord, LedgerError> {
        Ok(self.store.wallet().await?)
    }

    /// Aggregate valuation over all holdings
    pub async fn summary(&self) -> Result<PortfolioSummary, LedgerError> {
        Ok(self.store.summary().await?)
    }

    /// All holdings with stock metadata, largest position first
    pub async fn holdings(&self) -> Result<Vec<HoldingRow>, LedgerError> {
        Ok(self.store.holdings().await?)
    }

    /// Full transaction history, newest first
    pub async fn transactions(&self) -> Result<Vec<TransactionRow>, LedgerError> {
        Ok(self.store.transactions().await?)
    }
}
