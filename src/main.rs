//! Effideli Server - Main Application Entry Point
//!
//! Backend for the Effideli storefront: checkout, Paystack payment
//! verification and webhooks, the subscription download portal, and the
//! admin order API.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx, or an in-memory store for development
//! - **Payments**: Paystack verify API over reqwest, HMAC-SHA512 signed webhooks
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Open the datastore (create pool and run migrations when `DATABASE_URL` is set)
//! 3. Build the Paystack client
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod extractors;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::db::{MemoryStore, PgStore, Store};
use crate::services::content::ContentCatalog;
use crate::services::paystack::PaystackClient;
use crate::services::views::TracingInvalidator;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!(?config, "Configuration loaded");

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::create_pool(url, config.database_max_connections).await?;
            tracing::info!("Database pool created");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");

            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let gateway = PaystackClient::new(&config)?;

    let state = AppState {
        store,
        gateway: Arc::new(gateway),
        views: Arc::new(TracingInvalidator),
        catalog: Arc::new(ContentCatalog::new(&config.content_base_url)),
        config: Arc::new(config.clone()),
    };

    let app = routes::router(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    axum::serve(listener, app).await?;

    Ok(())
}
