//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the marketplace's REST API using Axum. It wires the order-entry service,
// ledger store and password cipher into shared state and exposes the routes for order management,
// market data, accounts, tickets and transfers.
//
// | Component      | Description                                                |
// |----------------|-----------------------------------------------------------|
// | AppState       | Shared application state                                   |
// | Api            | Router construction and serving                            |
// | Routes         | Handler functions for API endpoints                        |
// | DTOs           | Data transfer objects for API requests/responses           |
//--------------------------------------------------------------------------------------------------

mod dto;
mod error;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::PasswordCipher;
use crate::orders::OrderEntry;
use crate::store::LedgerStore;

pub use dto::*;
pub use error::{ApiError, ApiResult};

/// Shared application state accessible by all handlers
pub struct AppState {
    /// The external ledger store
    pub store: Arc<dyn LedgerStore>,
    /// Order entry service with per-event matching serialization
    pub orders: OrderEntry,
    /// Key pair for password-at-rest encryption
    pub cipher: PasswordCipher,
}

impl AppState {
    /// Creates a new application state around a store and key pair
    pub fn new(store: Arc<dyn LedgerStore>, cipher: PasswordCipher) -> Self {
        Self {
            orders: OrderEntry::new(store.clone()),
            store,
            cipher,
        }
    }
}

/// Main API structure
pub struct Api {
    /// API address
    addr: SocketAddr,
    /// Shared application state
    state: Arc<AppState>,
}

impl Api {
    /// Creates a new API instance
    pub fn new(addr: SocketAddr, store: Arc<dyn LedgerStore>, cipher: PasswordCipher) -> Self {
        let state = Arc::new(AppState::new(store, cipher));
        Self { addr, state }
    }

    /// Shared state, exposed for integration tests that seed the store directly.
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Creates all routes for the API
    pub fn routes(&self) -> Router {
        // Allow the local frontends during development
        let cors = CorsLayer::new()
            .allow_origin([
                "http://localhost:3000".parse::<HeaderValue>().unwrap(),
                "http://127.0.0.1:3000".parse::<HeaderValue>().unwrap(),
            ])
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_credentials(true);

        Router::new()
            // Health check
            .route("/health", get(routes::health))
            // Order entry
            .route("/bids", get(routes::list_bids))
            .route("/bids/create", post(routes::create_bid))
            .route("/bids/edit", post(routes::edit_bid))
            .route("/bids/delete", post(routes::delete_bid))
            .route("/asks", get(routes::list_asks))
            .route("/asks/create", post(routes::create_ask))
            .route("/asks/edit", post(routes::edit_ask))
            .route("/asks/delete", post(routes::delete_ask))
            // Market data
            .route("/events", get(routes::list_events))
            .route("/events/create", post(routes::create_event))
            .route("/events/prices/top/:event_id", get(routes::event_depth))
            .route("/events/prices/:event_id", get(routes::event_prices))
            // Accounts and tickets
            .route("/account/create", post(routes::create_account))
            .route("/account/sign-in", post(routes::sign_in))
            .route("/account/profile", get(routes::profile))
            .route("/account/create-ticket", post(routes::create_ticket))
            // Direct transfer
            .route("/transfer/ticket", post(routes::transfer_ticket))
            // Attach application state
            .layer(Extension(self.state.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Starts the API server and runs until shutdown
    pub async fn serve(self) -> std::io::Result<()> {
        let app = self.routes();

        tracing::info!("API listening on {}", self.addr);
        let listener = TcpListener::bind(self.addr).await?;
        axum::serve(listener, app).await
    }
}
