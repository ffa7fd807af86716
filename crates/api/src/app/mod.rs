//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: use cases over the repositories
//! - `store.rs`: repository trait and the in-memory implementation
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use quill_auth::{PasswordHasher, TokenCodec, TokenError};

use crate::config::AppConfig;
use crate::middleware::AuthState;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;
pub mod store;

use errors::ApiError;
use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Seeds the bootstrap admin account when one is configured.
pub async fn build_app(config: &AppConfig) -> Result<Router, ApiError> {
    let services = Arc::new(build_services(config)?);
    if let Some(seed) = &config.admin {
        services.seed_admin(seed).await?;
    }
    Ok(router(config, services))
}

/// Services over in-memory stores. Fails if the token config is unusable.
pub fn build_services(config: &AppConfig) -> Result<AppServices, TokenError> {
    let codec = TokenCodec::new(&config.tokens)?;
    Ok(AppServices::in_memory(
        Arc::new(codec),
        PasswordHasher::new(config.password_cost),
    ))
}

/// Router over already-built services; tests use this to reach the stores.
pub fn router(config: &AppConfig, services: Arc<AppServices>) -> Router {
    let auth_state = AuthState::new(services.tokens().clone());

    let api = routes::router(auth_state);
    let api = if config.prefix.is_empty() {
        api
    } else {
        Router::new().nest(&config.prefix, api)
    };

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(api)
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
