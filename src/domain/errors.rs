use thiserror::Error;

use crate::persistence::DatabaseError;

/// Errors surfaced at the ledger operation boundary.
///
/// Every variant is recoverable: the operation that produced it leaves all
/// persisted state unchanged, and the caller may retry after correcting the
/// input.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid amount: must be a positive number")]
    InvalidAmount,

    #[error("Insufficient funds: required {required:.2}, available {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("Insufficient holdings: requested {requested}, held {held}")]
    InsufficientHoldings { requested: i64, held: i64 },

    #[error("Stock {0} is already in the watchlist")]
    AlreadyWatched(i64),

    #[error("Stock not found: {0}")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_message() {
        let err = LedgerError::InsufficientFunds {
            required: 500.0,
            available: 123.456,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: required 500.00, available 123.46"
        );
    }

    #[test]
    fn test_insufficient_holdings_message() {
        let err = LedgerError::InsufficientHoldings {
            requested: 11,
            held: 10,
        };
        assert_eq!(err.to_string(), "Insufficient holdings: requested 11, held 10");
    }
}
