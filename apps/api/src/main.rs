mod applications;
mod auth;
mod config;
mod db;
mod errors;
mod jobs;
mod models;
mod notifications;
mod relay;
mod routes;
mod state;
mod store;
mod users;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::JwtService;
use crate::config::{Config, StoreBackend};
use crate::db::{create_pool, ensure_schema};
use crate::relay::email::HttpMailer;
use crate::relay::push::ExpoPushClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{DocumentStore, MemoryStore, PgDocumentStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting job board API v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres store")?;
            let pool = create_pool(url).await?;
            ensure_schema(&pool).await?;
            Arc::new(PgDocumentStore::new(pool))
        }
        StoreBackend::Memory => {
            info!("Using in-memory document store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let jwt = JwtService::new(&config.jwt_secret, config.jwt_issuer.clone());
    let mailer = Arc::new(HttpMailer::new(config.mail_api_url.clone())?);
    if config.mail_api_url.is_none() {
        info!("MAIL_API_URL not set; email relay calls will fail");
    }
    let push = Arc::new(ExpoPushClient::new(
        config.push_api_url.clone(),
        config.push_access_token.clone(),
    ));
    info!("Push relay endpoint: {}", config.push_api_url);

    let state = AppState {
        store,
        jwt,
        mailer,
        push,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
