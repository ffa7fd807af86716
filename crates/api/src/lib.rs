//! HTTP API: configuration, auth middleware, routing, and request/response mapping.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;

pub use app::{build_app, errors::ApiError};
pub use config::{AppConfig, ConfigError};
pub use context::IdentityContext;
