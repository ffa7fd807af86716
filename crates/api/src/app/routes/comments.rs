//! Comments live under their post: `/posts/:id/comments[/:comment_id]`.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};

use quill_core::{CommentId, PostId};

use crate::app::dto::{self, parse_id};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::IdentityContext;
use crate::middleware::{self, AuthState};

pub fn router(auth: AuthState) -> Router {
    let authenticated = Router::new()
        .route("/:id/comments", post(create_comment))
        .route("/:id/comments/:comment_id", patch(update_comment).delete(delete_comment));

    Router::new()
        .route("/:id/comments", get(list_comments))
        .merge(middleware::authenticated(authenticated, auth))
}

fn parse_pair(post_id: &str, comment_id: &str) -> Result<(PostId, CommentId), ApiError> {
    Ok((parse_id(post_id)?, parse_id(comment_id)?))
}

pub async fn list_comments(
    Extension(services): Extension<Arc<AppServices>>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id: PostId = parse_id(&post_id)?;
    Ok(Json(services.list_comments(post_id)?))
}

pub async fn create_comment(
    Extension(services): Extension<Arc<AppServices>>,
    identity: IdentityContext,
    Path(post_id): Path<String>,
    Json(body): Json<dto::CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id: PostId = parse_id(&post_id)?;
    let comment = services.create_comment(&identity.principal(), post_id, &body.content)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update_comment(
    Extension(services): Extension<Arc<AppServices>>,
    identity: IdentityContext,
    Path((post_id, comment_id)): Path<(String, String)>,
    Json(body): Json<dto::CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (post_id, comment_id) = parse_pair(&post_id, &comment_id)?;
    let comment = services.update_comment(&identity.principal(), post_id, comment_id, &body.content)?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    Extension(services): Extension<Arc<AppServices>>,
    identity: IdentityContext,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let (post_id, comment_id) = parse_pair(&post_id, &comment_id)?;
    services.delete_comment(&identity.principal(), post_id, comment_id)?;
    Ok(StatusCode::NO_CONTENT)
}
