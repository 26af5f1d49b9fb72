//! Trade entities - validated inputs for ledger operations
//!
//! Quantities, prices, and cash amounts are checked at construction so the
//! ledger never sees an invalid value.

use serde::{Deserialize, Serialize};

use crate::domain::errors::LedgerError;

/// Direction of a trade transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated buy/sell request: whole-share quantity and a finite,
/// positive trade price.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOrder {
    stock_id: i64,
    quantity: i64,
    price: f64,
}

impl TradeOrder {
    /// Create a new TradeOrder with validation
    ///
    /// # Arguments
    /// * `stock_id` - Catalog id of the stock being traded
    /// * `quantity` - Number of shares (>= 1)
    /// * `price` - Trade price per share (> 0, finite)
    ///
    /// # Returns
    /// Ok(TradeOrder) if inputs are valid, Err(LedgerError::InvalidAmount) otherwise
    pub fn new(stock_id: i64, quantity: i64, price: f64) -> Result<Self, LedgerError> {
        if quantity < 1 {
            return Err(LedgerError::InvalidAmount);
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(Self {
            stock_id,
            quantity,
            price,
        })
    }

    pub fn stock_id(&self) -> i64 {
        self.stock_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    /// Total cash moved by this trade.
    pub fn total_price(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

/// A validated cash amount for deposits and withdrawals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashAmount(f64);

impl CashAmount {
    pub fn new(amount: f64) -> Result<Self, LedgerError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(Self(amount))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_order_valid() {
        let order = TradeOrder::new(1, 10, 50.0).unwrap();
        assert_eq!(order.stock_id(), 1);
        assert_eq!(order.quantity(), 10);
        assert_eq!(order.price(), 50.0);
        assert_eq!(order.total_price(), 500.0);
    }

    #[test]
    fn test_trade_order_zero_quantity() {
        assert!(matches!(
            TradeOrder::new(1, 0, 50.0),
            Err(LedgerError::InvalidAmount)
        ));
    }

    #[test]
    fn test_trade_order_negative_quantity() {
        assert!(matches!(
            TradeOrder::new(1, -3, 50.0),
            Err(LedgerError::InvalidAmount)
        ));
    }

    #[test]
    fn test_trade_order_non_positive_price() {
        assert!(TradeOrder::new(1, 1, 0.0).is_err());
        assert!(TradeOrder::new(1, 1, -10.0).is_err());
    }

    #[test]
    fn test_trade_order_non_finite_price() {
        assert!(TradeOrder::new(1, 1, f64::NAN).is_err());
        assert!(TradeOrder::new(1, 1, f64::INFINITY).is_err());
    }

    #[test]
    fn test_cash_amount_valid() {
        let amount = CashAmount::new(250.5).unwrap();
        assert_eq!(amount.value(), 250.5);
    }

    #[test]
    fn test_cash_amount_invalid() {
        assert!(CashAmount::new(0.0).is_err());
        assert!(CashAmount::new(-1.0).is_err());
        assert!(CashAmount::new(f64::NAN).is_err());
    }

    #[test]
    fn test_trade_side_as_str() {
        assert_eq!(TradeSide::Buy.as_str(), "buy");
        assert_eq!(TradeSide::Sell.as_str(), "sell");
    }
}
