//! # SlotBook API
//!
//! The API crate provides the web server for the SlotBook booking service.
//! It exposes RESTful endpoints for publishing slots and managing bookings.
//!
//! ## Architecture
//!
//! This crate follows a layered architecture:
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Translate HTTP requests into booking-core calls
//! - **Middleware**: Caller authentication and error mapping
//! - **Config**: Handle environment and application configuration
//!
//! The API uses Axum as the web framework; storage is whatever
//! [`BookingStorage`] engine the binary hands in.

/// Configuration module for API settings
pub mod config;
/// Request handlers
pub mod handlers;
/// Middleware for authentication and error handling
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;

use std::{sync::Arc, time::Duration};

use axum::{
    BoxError, Json, Router,
    error_handling::HandleErrorLayer,
    http::{HeaderValue, Method, StatusCode, header},
};
use eyre::{Result, WrapErr};
use serde_json::{Value, json};
use slotbook_core::{clock::SystemClock, services::Services, store::BookingStorage};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

/// Shared application state that is accessible to all request handlers
pub struct ApiState {
    /// Booking core services wired onto the storage engine
    pub services: Services,
    /// Secret caller tokens are verified with
    pub jwt_secret: String,
}

impl ApiState {
    pub fn new(services: Services, jwt_secret: impl Into<String>) -> Self {
        Self {
            services,
            jwt_secret: jwt_secret.into(),
        }
    }
}

/// Installs the global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise everything at `level` and above is
/// logged.
pub fn init_tracing(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        warn!("Tracing subscriber already installed");
    }
}

async fn handle_timeout(err: BoxError) -> (StatusCode, Json<Value>) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({ "error": "Request timed out" })),
        )
    } else {
        tracing::error!("Unhandled middleware error: {}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal server error" })),
        )
    }
}

/// Builds the application router with every route and layer attached.
pub fn build_router(state: Arc<ApiState>, config: &config::ApiConfig) -> Result<Router> {
    let app = Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Slot publication and browsing
        .merge(routes::slots::routes())
        // Booking lifecycle
        .merge(routes::bookings::routes())
        // Attach shared state to all routes
        .with_state(state);

    // Apply CORS configuration if origins are specified
    let app = if let Some(origins) = &config.cors_origins {
        let origins = origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .wrap_err_with(|| format!("Invalid CORS origin '{}'", origin))
            })
            .collect::<Result<Vec<_>>>()?;
        let cors = CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .allow_origin(origins)
            .allow_credentials(true);

        app.layer(cors)
    } else {
        app
    };

    // Add request timeout and request tracing
    let app = app
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .timeout(Duration::from_secs(config.request_timeout)),
        )
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// Starts the API server on top of `storage`
///
/// # Example
///
/// ```ignore
/// let config = ApiConfig::from_env()?;
/// let pool = slotbook_db::create_pool(&config.database_url, config.database_max_connections).await?;
/// start_server(config, Arc::new(PgStore::new(pool))).await?;
/// ```
pub async fn start_server(config: config::ApiConfig, storage: Arc<dyn BookingStorage>) -> Result<()> {
    init_tracing(config.log_level);

    let policy = config.booking_policy;
    info!(
        "Booking policy: cutoff={}h, tutors bound={}, release={:?}",
        policy.cancellation_cutoff_hours, policy.cutoff_applies_to_tutors, policy.release_on_cancel
    );

    let services = Services::new(storage, Arc::new(SystemClock), policy);
    let state = Arc::new(ApiState::new(services, config.jwt_secret.clone()));
    let app = build_router(state, &config)?;

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
