pub mod auth;
pub mod error;
pub mod handlers;

pub use error::{ApiError, ErrorResponse};

use crate::bulk::BulkProcessor;
use crate::config::Config;
use crate::statistics::StatisticsCollector;
use crate::usage::UsageStore;
use crate::validator::EmailValidator;
use anyhow::Context;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Shared, cheaply clonable state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub validator: Arc<EmailValidator>,
    pub bulk: BulkProcessor,
    pub stats: StatisticsCollector,
    pub usage: Option<UsageStore>,
}

impl AppState {
    /// Spawns the statistics worker, so this needs a running tokio runtime
    pub fn new(config: Config, validator: EmailValidator, usage: Option<UsageStore>) -> Self {
        let validator = Arc::new(validator);
        Self {
            config: Arc::new(config),
            bulk: BulkProcessor::new(Arc::clone(&validator)),
            validator,
            stats: StatisticsCollector::new(),
            usage,
        }
    }

    /// Build everything from configuration, opening the key store when auth
    /// is enabled
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let validator = EmailValidator::from_config(&config)?;
        let usage = if config.auth.enabled {
            Some(UsageStore::open(&config.auth.database_path)?)
        } else {
            None
        };
        Ok(Self::new(config, validator, usage))
    }
}

/// Bind the listen address; `host:port` may name a host as well as an IP
pub async fn bind_listener(bind: &str) -> anyhow::Result<TcpListener> {
    TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind listen address '{bind}'"))
}

pub fn router(state: AppState) -> Router {
    let guarded = Router::new()
        .route("/verify", get(handlers::verify).fallback(handlers::method_not_allowed))
        .route("/batch", post(handlers::batch).fallback(handlers::method_not_allowed))
        .route("/stats", get(handlers::stats).fallback(handlers::method_not_allowed))
        .route("/domains", get(handlers::domains).fallback(handlers::method_not_allowed))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::api_key_guard,
        ));

    let cors_enabled = state.config.server.cors_enabled;

    let app = Router::new()
        .route("/", get(handlers::home).fallback(handlers::method_not_allowed))
        .route("/health", get(handlers::health).fallback(handlers::method_not_allowed))
        .merge(guarded)
        .fallback(handlers::not_found)
        .with_state(state);

    if cors_enabled {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        app
    }
}
