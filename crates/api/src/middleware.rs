use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::HeaderMap,
    middleware::{Next, from_fn_with_state},
    response::Response,
};
use chrono::Utc;

use quill_auth::{Role, TokenKind, TokenVerifier, require_role};

use crate::app::errors::ApiError;
use crate::context::IdentityContext;

#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AuthState {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }
}

/// Access-token gate for protected routes.
///
/// On success the verified identity is attached to the request; on any
/// failure the request is answered immediately and never reaches the handler.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;

    let claims = state
        .verifier
        .verify_at(TokenKind::Access, token, Utc::now())
        .map_err(|e| {
            tracing::debug!(code = e.code(), path = %req.uri().path(), "access token rejected");
            ApiError::from(e)
        })?;

    let identity = IdentityContext::from_claims(claims)?;

    if req.extensions().get::<IdentityContext>().is_none() {
        req.extensions_mut().insert(identity);
    }

    Ok(next.run(req).await)
}

/// Parse `Authorization: Bearer <token>`.
///
/// Absent or empty header is `MissingCredentials`; anything that is not
/// exactly two space-separated parts with a literal `Bearer` first is
/// `MalformedHeader`.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(ApiError::MissingCredentials)?;

    let header = header.to_str().map_err(|_| ApiError::MalformedHeader)?;
    if header.is_empty() {
        return Err(ApiError::MissingCredentials);
    }

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(ApiError::MalformedHeader),
    }
}

/// Restricts a route to a fixed set of roles. Must run after `auth_middleware`.
#[derive(Debug, Clone)]
pub struct RoleGate {
    allowed: Arc<[Role]>,
}

impl RoleGate {
    pub fn new(allowed: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn admin_only() -> Self {
        Self::new([Role::Admin])
    }

    pub fn check(&self, identity: Option<&IdentityContext>) -> Result<(), ApiError> {
        let identity = identity.ok_or_else(|| {
            tracing::warn!("role gate reached without an identity; is the auth layer missing?");
            ApiError::MissingIdentity
        })?;

        require_role(identity.role(), &self.allowed).map_err(ApiError::from)
    }
}

pub async fn role_middleware(
    State(gate): State<RoleGate>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    gate.check(req.extensions().get::<IdentityContext>())?;
    Ok(next.run(req).await)
}

/// Put every route of `router` behind the auth gate.
pub fn authenticated<S>(router: Router<S>, auth: AuthState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(from_fn_with_state(auth, auth_middleware))
}

/// Put every route of `router` behind the auth gate followed by `gate`.
pub fn role_restricted<S>(router: Router<S>, auth: AuthState, gate: RoleGate) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // Layers wrap outward: the last one added runs first.
    router
        .route_layer(from_fn_with_state(gate, role_middleware))
        .route_layer(from_fn_with_state(auth, auth_middleware))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{HeaderValue, Request, StatusCode};
    use axum::routing::get;
    use chrono::Duration;
    use tower::ServiceExt;

    use quill_auth::{Claims, Identity, TokenCodec, TokenConfig};
    use quill_core::UserId;

    use super::*;

    /// Router whose single route echoes the email of the request identity.
    fn echo_identity(auth: AuthState) -> Router {
        authenticated(
            Router::new().route("/", get(|id: IdentityContext| async move { id.email().to_string() })),
            auth,
        )
    }

    fn codec_and_token(email: &str) -> (TokenCodec, String) {
        let codec = TokenCodec::new(&TokenConfig::new("access-secret", "refresh-secret")).unwrap();
        let token = codec
            .issue_access_token(&Identity {
                subject_id: UserId::new(),
                email: email.to_string(),
                role: Role::User,
            })
            .unwrap();
        (codec, token)
    }

    fn bearer(token: &str) -> Request<Body> {
        Request::builder()
            .uri("/")
            .header(axum::http::header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    fn identity(role: Role) -> IdentityContext {
        let now = Utc::now();
        IdentityContext::from_claims(Claims {
            subject_id: UserId::new(),
            email: "u@example.com".to_string(),
            role,
            issued_at: now,
            expires_at: now + Duration::hours(1),
            issuer: "quill-api".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn absent_header_is_missing_credentials() {
        assert!(matches!(extract_bearer(&HeaderMap::new()), Err(ApiError::MissingCredentials)));
    }

    #[test]
    fn empty_header_is_missing_credentials() {
        assert!(matches!(extract_bearer(&headers("")), Err(ApiError::MissingCredentials)));
    }

    #[test]
    fn wrong_scheme_is_malformed() {
        assert!(matches!(extract_bearer(&headers("Token abc")), Err(ApiError::MalformedHeader)));
        assert!(matches!(extract_bearer(&headers("bearer abc")), Err(ApiError::MalformedHeader)));
    }

    #[test]
    fn extra_parts_are_malformed() {
        assert!(matches!(extract_bearer(&headers("Bearer a b")), Err(ApiError::MalformedHeader)));
        assert!(matches!(extract_bearer(&headers("Bearer")), Err(ApiError::MalformedHeader)));
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn role_gate_forbids_user_on_admin_route() {
        let gate = RoleGate::admin_only();
        assert!(matches!(gate.check(Some(&identity(Role::User))), Err(ApiError::Forbidden(_))));
        assert!(gate.check(Some(&identity(Role::Admin))).is_ok());
    }

    #[tokio::test]
    async fn auth_gate_attaches_verified_identity() {
        let (codec, token) = codec_and_token("token@example.com");
        let app = echo_identity(AuthState::new(Arc::new(codec)));

        let res = app.oneshot(bearer(&token)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_text(res).await, "token@example.com");
    }

    #[tokio::test]
    async fn auth_gate_keeps_identity_already_on_request() {
        let (codec, token) = codec_and_token("token@example.com");
        let preset = identity(Role::Admin);

        let app = echo_identity(AuthState::new(Arc::new(codec))).layer(axum::middleware::from_fn(
            move |mut req: Request<Body>, next: Next| {
                let preset = preset.clone();
                async move {
                    req.extensions_mut().insert(preset);
                    next.run(req).await
                }
            },
        ));

        let res = app.oneshot(bearer(&token)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_text(res).await, "u@example.com");
    }

    #[tokio::test]
    async fn auth_gate_rejects_before_handler() {
        let (codec, _) = codec_and_token("token@example.com");
        let app = echo_identity(AuthState::new(Arc::new(codec)));

        let res = app.oneshot(bearer("not.a.token")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(res).await.contains("malformed_token"));
    }

    #[test]
    fn role_gate_without_identity_is_missing_identity() {
        let gate = RoleGate::new(Role::ALL);
        assert!(matches!(gate.check(None), Err(ApiError::MissingIdentity)));
    }
}
