use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use papertrade::application::services::{PortfolioLedger, PriceFeed, WatchlistService};
use papertrade::application::services::price_feed::DEFAULT_HISTORY_LIMIT;
use papertrade::config::AppConfig;
use papertrade::domain::entities::trade::{CashAmount, TradeOrder};
use papertrade::domain::errors::LedgerError;
use papertrade::persistence::store::LedgerStore;
use papertrade::persistence::{init_database, seed_catalog};

#[derive(Clone)]
struct AppState {
    ledger: Arc<PortfolioLedger>,
    watchlist: Arc<WatchlistService>,
    feed: Arc<PriceFeed>,
}

/// LedgerError wrapper carrying the HTTP status mapping
struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LedgerError::InvalidAmount
            | LedgerError::InsufficientFunds { .. }
            | LedgerError::InsufficientHoldings { .. }
            | LedgerError::AlreadyWatched(_) => StatusCode::BAD_REQUEST,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Database(e) => {
                error!("Storage failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Deserialize)]
struct TradeRequest {
    stock_id: i64,
    quantity: i64,
    price: f64,
}

#[derive(Deserialize)]
struct AmountRequest {
    amount: f64,
}

#[derive(Deserialize)]
struct WatchRequest {
    stock_id: i64,
    stock_name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "papertrade=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    info!("Papertrade server starting...");

    let pool = init_database(&config.database.url).await?;
    seed_catalog(&pool).await?;

    let store = LedgerStore::new(pool.clone());
    let state = AppState {
        ledger: Arc::new(PortfolioLedger::new(store.clone())),
        watchlist: Arc::new(WatchlistService::new(store)),
        feed: Arc::new(PriceFeed::new(pool)),
    };

    let app = Router::new()
        .route("/", get(|| async { "Papertrade simulated trading server is running!" }))
        .route("/api/stocks", get(list_stocks))
        .route("/api/stocks/search/:query", get(search_stocks))
        .route("/api/stocks/:id", get(get_stock))
        .route("/api/stocks/:id/prices", get(get_price_history))
        .route("/api/wallet", get(get_wallet))
        .route("/api/wallet/add", post(deposit))
        .route("/api/wallet/withdraw", post(withdraw))
        .route("/api/transactions", get(list_transactions))
        .route("/api/transactions/buy", post(buy))
        .route("/api/transactions/sell", post(sell))
        .route("/api/holdings", get(list_holdings))
        .route("/api/holdings/summary", get(get_summary))
        .route("/api/watchlist", get(list_watchlist))
        .route("/api/watchlist/add", post(watch_stock))
        .route("/api/watchlist/:stock_id", delete(unwatch_stock))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Get all stocks in the catalog
async fn list_stocks(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let stocks = state.feed.list_stocks().await?;
    Ok(Json(serde_json::json!(stocks)))
}

/// Search stocks by symbol or name
async fn search_stocks(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stocks = state.feed.search(&query).await?;
    Ok(Json(serde_json::json!(stocks)))
}

/// Get a stock with its current price
async fn get_stock(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let quote = state.feed.get_stock(id).await?;
    Ok(Json(serde_json::json!(quote)))
}

/// Get a stock's closing-price history, most recent first
async fn get_price_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let history = state.feed.get_price_history(id, DEFAULT_HISTORY_LIMIT).await?;
    Ok(Json(serde_json::json!(history)))
}

/// Get the wallet balance
async fn get_wallet(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let wallet = state.ledger.balance().await?;
    Ok(Json(serde_json::json!(wallet)))
}

/// Add money to the wallet
async fn deposit(
    State(state): State<AppState>,
    Json(body): Json<AmountRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let amount = CashAmount::new(body.amount)?;
    let wallet = state.ledger.deposit(amount).await?;
    Ok(Json(serde_json::json!(wallet)))
}

/// Withdraw money from the wallet
async fn withdraw(
    State(state): State<AppState>,
    Json(body): Json<AmountRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let amount = CashAmount::new(body.amount)?;
    let wallet = state.ledger.withdraw(amount).await?;
    Ok(Json(serde_json::json!(wallet)))
}

/// Get the full transaction history
async fn list_transactions(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let transactions = state.ledger.transactions().await?;
    Ok(Json(serde_json::json!(transactions)))
}

/// Buy a stock
async fn buy(
    State(state): State<AppState>,
    Json(body): Json<TradeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let order = TradeOrder::new(body.stock_id, body.quantity, body.price)?;
    let receipt = state.ledger.buy(&order).await?;
    Ok(Json(serde_json::json!({
        "message": "Stock purchased successfully",
        "wallet": receipt.wallet,
        "holding": receipt.holding,
    })))
}

/// Sell a stock
async fn sell(
    State(state): State<AppState>,
    Json(body): Json<TradeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let order = TradeOrder::new(body.stock_id, body.quantity, body.price)?;
    let receipt = state.ledger.sell(&order).await?;
    Ok(Json(serde_json::json!({
        "message": "Stock sold successfully",
        "wallet": receipt.wallet,
        "holding": receipt.holding,
    })))
}

/// Get all holdings
async fn list_holdings(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let holdings = state.ledger.holdings().await?;
    Ok(Json(serde_json::json!(holdings)))
}

/// Get the portfolio summary
async fn get_summary(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let summary = state.ledger.summary().await?;
    Ok(Json(serde_json::json!(summary)))
}

/// Get the watchlist with latest prices
async fn list_watchlist(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let entries = state.watchlist.list().await?;
    Ok(Json(serde_json::json!(entries)))
}

/// Add a stock to the watchlist
async fn watch_stock(
    State(state): State<AppState>,
    Json(body): Json<WatchRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.watchlist.add(body.stock_id, &body.stock_name).await?;
    Ok(Json(serde_json::json!({ "message": "Stock added to watchlist" })))
}

/// Remove a stock from the watchlist
async fn unwatch_stock(
    State(state): State<AppState>,
    Path(stock_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.watchlist.remove(stock_id).await?;
    Ok(Json(serde_json::json!({ "message": "Stock removed from watchlist" })))
}
