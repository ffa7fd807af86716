use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use quill_auth::ProfileUpdate;
use quill_core::UserId;

use crate::app::dto::{self, parse_id};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::IdentityContext;
use crate::middleware::{self, AuthState, RoleGate};

pub fn router(auth: AuthState) -> Router {
    let admin = Router::new()
        .route("/", get(list_users))
        .route("/:id/role", put(set_role));

    let authenticated = Router::new()
        .route("/me", get(me))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user));

    middleware::role_restricted(admin, auth.clone(), RoleGate::admin_only())
        .merge(middleware::authenticated(authenticated, auth))
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.list_users())
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    identity: IdentityContext,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.get_user(identity.subject_id())?))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: UserId = parse_id(&id)?;
    Ok(Json(services.get_user(id)?))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    identity: IdentityContext,
    Path(id): Path<String>,
    Json(body): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let id: UserId = parse_id(&id)?;
    Ok(Json(services.update_user(&identity.principal(), id, body)?))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    identity: IdentityContext,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: UserId = parse_id(&id)?;
    services.delete_user(&identity.principal(), id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: UserId = parse_id(&id)?;
    Ok(Json(services.set_role(id, body.role()?)?))
}
