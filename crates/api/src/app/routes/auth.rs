use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::IdentityContext;
use crate::middleware::{self, AuthState};

pub fn router(auth: AuthState) -> Router {
    let protected = Router::new().route("/me", get(me));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .merge(middleware::authenticated(protected, auth))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, tokens) = services.register(body.into()).await?;
    Ok((StatusCode::CREATED, Json(dto::AuthResponse { user, tokens })))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, tokens) = services.login(&body.email, body.password).await?;
    Ok(Json(dto::AuthResponse { user, tokens }))
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.refresh(&body.refresh_token)?))
}

pub async fn me(identity: IdentityContext) -> impl IntoResponse {
    Json(dto::MeResponse::from(&identity))
}
