use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};

use quill_core::{CategoryId, CategoryUpdate};

use crate::app::dto::{self, parse_id};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::middleware::{self, AuthState, RoleGate};

/// Reads are public; every mutation is admin-only.
pub fn router(auth: AuthState) -> Router {
    let admin = Router::new()
        .route("/", post(create_category))
        .route("/:id", patch(update_category).delete(delete_category));

    Router::new()
        .route("/", get(list_categories))
        .route("/:id", get(get_category))
        .merge(middleware::role_restricted(admin, auth, RoleGate::admin_only()))
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.list_categories())
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: CategoryId = parse_id(&id)?;
    Ok(Json(services.get_category(id)?))
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = services.create_category(&body.name, body.description)?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<CategoryUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let id: CategoryId = parse_id(&id)?;
    Ok(Json(services.update_category(id, body)?))
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: CategoryId = parse_id(&id)?;
    services.delete_category(id)?;
    Ok(StatusCode::NO_CONTENT)
}
