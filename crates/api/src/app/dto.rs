use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quill_auth::{Role, TokenPair, UserAccount};
use quill_core::{CategoryId, DomainError, UserId};

use crate::app::errors::ApiError;
use crate::app::services::{NewPost, Registration};
use crate::context::IdentityContext;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl From<RegisterRequest> for Registration {
    fn from(body: RegisterRequest) -> Self {
        Registration {
            first_name: body.first_name,
            last_name: body.last_name,
            email: body.email,
            password: body.password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

impl SetRoleRequest {
    pub fn role(&self) -> Result<Role, ApiError> {
        self.role.parse().map_err(|e: quill_auth::UnknownRole| ApiError::Validation(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: Option<String>,
    pub category_id: Option<CategoryId>,
}

impl From<CreatePostRequest> for NewPost {
    fn from(body: CreatePostRequest) -> Self {
        NewPost {
            title: body.title,
            content: body.content,
            category_id: body.category_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserAccount,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Claims of the calling request, as seen by `/auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub subject_id: UserId,
    pub email: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl From<&IdentityContext> for MeResponse {
    fn from(identity: &IdentityContext) -> Self {
        Self {
            subject_id: identity.subject_id(),
            email: identity.email().to_string(),
            role: identity.role(),
            expires_at: identity.expires_at(),
        }
    }
}

// -------------------------
// Helpers
// -------------------------

/// Parse a path segment into a typed id; a bad id is a 400, not a 404.
pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(ApiError::from)
}
