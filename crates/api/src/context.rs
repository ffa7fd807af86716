use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};

use quill_auth::{Claims, Principal, Role};
use quill_core::UserId;

use crate::app::errors::ApiError;

/// Verified identity for one request.
///
/// Created by the auth middleware from verified claims and stored in the
/// request extensions. Fields are private and there are no setters: once a
/// request carries an identity it does not change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    claims: Claims,
}

impl IdentityContext {
    /// Accept verified claims as a request identity.
    ///
    /// A correctly signed token can still carry an unusable identity (nil
    /// subject, blank email); those are rejected here.
    pub fn from_claims(claims: Claims) -> Result<Self, ApiError> {
        if claims.subject_id.is_nil() {
            return Err(ApiError::InvalidIdentity("subject is nil".to_string()));
        }
        if claims.email.trim().is_empty() {
            return Err(ApiError::InvalidIdentity("email is empty".to_string()));
        }
        Ok(Self { claims })
    }

    pub fn subject_id(&self) -> UserId {
        self.claims.subject_id
    }

    pub fn email(&self) -> &str {
        &self.claims.email
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn principal(&self) -> Principal {
        Principal::from(&self.claims)
    }
}

/// Read the identity the auth middleware attached to this request.
pub fn current_identity(parts: &Parts) -> Result<&IdentityContext, ApiError> {
    parts
        .extensions
        .get::<IdentityContext>()
        .ok_or(ApiError::MissingIdentity)
}

/// Handlers take `IdentityContext` as an argument; the extraction fails with
/// `MissingIdentity` (401) when the route is not behind the auth middleware.
#[axum::async_trait]
impl<S> FromRequestParts<S> for IdentityContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_identity(parts).cloned()
    }
}
