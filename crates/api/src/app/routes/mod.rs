use axum::Router;

use crate::middleware::AuthState;

pub mod auth;
pub mod categories;
pub mod comments;
pub mod posts;
pub mod system;
pub mod users;

/// Router for the content API. Each area decides which of its routes sit
/// behind the auth gate (and the admin role gate).
pub fn router(auth: AuthState) -> Router {
    Router::new()
        .nest("/auth", auth::router(auth.clone()))
        .nest("/users", users::router(auth.clone()))
        .nest("/categories", categories::router(auth.clone()))
        .nest("/posts", posts::router(auth))
}
