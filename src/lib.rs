//! Papertrade Library
//!
//! Core components of the papertrade simulated-trading service: the
//! portfolio ledger engine, watchlist, price feed, and SQLite persistence.

pub mod application;
pub mod config;
pub mod domain;
pub mod persistence;
