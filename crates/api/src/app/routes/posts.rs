use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};

use quill_core::{PostId, PostUpdate, UserId};

use crate::app::dto::{self, parse_id};
use crate::app::errors::ApiError;
use crate::app::routes::comments;
use crate::app::services::AppServices;
use crate::context::IdentityContext;
use crate::middleware::{self, AuthState};

pub fn router(auth: AuthState) -> Router {
    let authenticated = Router::new()
        .route("/", post(create_post))
        .route("/:id", patch(update_post).delete(delete_post));

    Router::new()
        .route("/", get(list_posts))
        .route("/:id", get(get_post))
        .route("/author/:author_id", get(posts_by_author))
        .merge(middleware::authenticated(authenticated, auth.clone()))
        .merge(comments::router(auth))
}

pub async fn list_posts(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.list_posts())
}

pub async fn get_post(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: PostId = parse_id(&id)?;
    Ok(Json(services.get_post(id)?))
}

pub async fn posts_by_author(
    Extension(services): Extension<Arc<AppServices>>,
    Path(author_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let author_id: UserId = parse_id(&author_id)?;
    Ok(Json(services.posts_by_author(author_id)))
}

pub async fn create_post(
    Extension(services): Extension<Arc<AppServices>>,
    identity: IdentityContext,
    Json(body): Json<dto::CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = services.create_post(&identity.principal(), body.into())?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    Extension(services): Extension<Arc<AppServices>>,
    identity: IdentityContext,
    Path(id): Path<String>,
    Json(body): Json<PostUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let id: PostId = parse_id(&id)?;
    Ok(Json(services.update_post(&identity.principal(), id, body)?))
}

pub async fn delete_post(
    Extension(services): Extension<Arc<AppServices>>,
    identity: IdentityContext,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: PostId = parse_id(&id)?;
    services.delete_post(&identity.principal(), id)?;
    Ok(StatusCode::NO_CONTENT)
}
